use std::sync::Arc;

use anyhow::{Result, anyhow};
use tracing::{error, info};
use tracing_subscriber::{self, EnvFilter};

use contract_scraper::indexer::scanner;
use contract_scraper::metrics::Metrics;
use contract_scraper::models::errors::InitError;
use contract_scraper::utils::load_config;

const DEFAULT_CONFIG_PATH: &str = "config.yml";

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    println!();
    info!("=========================== INITIALIZING ===========================");

    // Load config
    let config_path =
        std::env::var("SCRAPER_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let config = match load_config(&config_path) {
        Ok(config) => {
            info!("Config loaded successfully");
            config
        }
        Err(e) => {
            error!("Failed to load config: {:#}", e);
            return Err(e);
        }
    };

    info!("Target contract: {}", config.target_contract);

    // Initialize optional metrics
    let metrics = if config.metrics.enabled {
        let metrics = Metrics::new(config.target_contract.to_string()).map_err(InitError::from)?;
        metrics
            .start_metrics_server(&config.metrics.address, config.metrics.port)
            .await
            .map_err(InitError::from)?;
        Some(Arc::new(metrics))
    } else {
        info!("Metrics are disabled");
        None
    };

    // Connect to the node and open storage. Nothing is scanned if this fails.
    let scanner = match scanner::init(&config, metrics).await {
        Ok(scanner) => scanner,
        Err(e) => {
            error!("Initialization failed: {}", e);
            return Err(anyhow!(e));
        }
    };

    println!();
    info!("========================= STARTING SCANNER =========================");

    match scanner.run().await {
        Ok(report) => {
            info!(
                "Processed {} blocks ({} to {})",
                report.blocks_in_range, report.start_block, report.end_block
            );
            Ok(())
        }
        Err(e) => {
            error!("Scan failed: {}", e);
            Err(anyhow!(e))
        }
    }
}
