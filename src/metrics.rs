use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info};

use axum::{Router, http::StatusCode, routing::get};
use opentelemetry::KeyValue;
use opentelemetry::metrics::{Counter, Gauge, Histogram, MeterProvider};
use opentelemetry_sdk::metrics::{MetricError, SdkMeterProvider};
use prometheus::{Encoder, TextEncoder};

pub struct Metrics {
    registry: Arc<prometheus::Registry>,
    _provider: SdkMeterProvider,
    pub contract: String,

    // Block processing metrics
    pub blocks_processed: Counter<u64>,
    pub contract_transactions: Counter<u64>,
    pub latest_processed_block: Gauge<u64>,
    pub latest_block_processing_time: Gauge<f64>,

    // Chain metrics
    pub chain_tip_block: Gauge<u64>,

    // RPC metrics
    pub rpc_requests: Counter<u64>,
    pub rpc_errors: Counter<u64>,
    pub rpc_latency: Histogram<f64>,

    // Storage metrics
    pub store_errors: Counter<u64>,
}

impl Metrics {
    pub fn new(contract: String) -> Result<Self, MetricError> {
        // Create a new prometheus registry
        let registry = prometheus::Registry::new();

        // Configure OpenTelemetry to use this registry
        let exporter = opentelemetry_prometheus::exporter()
            .with_registry(registry.clone())
            .build()?;

        // Set up a meter to create instruments
        let provider = SdkMeterProvider::builder().with_reader(exporter).build();
        let meter = provider.meter("scraper_metrics");

        let blocks_processed = meter
            .u64_counter("scraper_blocks_processed")
            .with_description("Total number of blocks processed, by outcome")
            .build();

        let contract_transactions = meter
            .u64_counter("scraper_contract_transactions")
            .with_description("Number of transactions classified as contract-related")
            .build();

        let latest_processed_block = meter
            .u64_gauge("scraper_latest_processed_block_number")
            .with_description("Latest block number processed")
            .build();

        let latest_block_processing_time = meter
            .f64_gauge("scraper_latest_block_processing")
            .with_description("Time spent processing the latest block")
            .with_unit("s")
            .build();

        let chain_tip_block = meter
            .u64_gauge("scraper_chain_tip_block_number")
            .with_description("Chain head at the start of the scan")
            .build();

        let rpc_requests = meter
            .u64_counter("scraper_rpc_requests")
            .with_description("Number of RPC requests made")
            .build();

        let rpc_errors = meter
            .u64_counter("scraper_rpc_errors")
            .with_description("Number of RPC errors encountered")
            .build();

        let rpc_latency = meter
            .f64_histogram("scraper_rpc_latency")
            .with_description("RPC request latency")
            .with_boundaries(vec![
                0.025, 0.05, 0.075, 0.1, 0.15, 0.2, 0.3, 0.5, 1.0, 5.0, 10.0,
            ])
            .with_unit("s")
            .build();

        let store_errors = meter
            .u64_counter("scraper_store_errors")
            .with_description("Number of failed storage writes")
            .build();

        Ok(Self {
            registry: Arc::new(registry),
            _provider: provider,
            contract,
            blocks_processed,
            contract_transactions,
            latest_processed_block,
            latest_block_processing_time,
            chain_tip_block,
            rpc_requests,
            rpc_errors,
            rpc_latency,
            store_errors,
        })
    }

    pub fn contract_label(&self) -> KeyValue {
        KeyValue::new("contract", self.contract.clone())
    }

    pub fn record_rpc(&self, method: &'static str, elapsed_secs: f64, failed: bool) {
        let labels = [self.contract_label(), KeyValue::new("method", method)];
        self.rpc_requests.add(1, &labels);
        self.rpc_latency.record(elapsed_secs, &labels);
        if failed {
            self.rpc_errors.add(1, &labels);
        }
    }

    pub fn record_block(&self, block_number: u64, elapsed_secs: f64, outcome: &'static str) {
        let contract = self.contract_label();
        self.blocks_processed.add(
            1,
            &[contract.clone(), KeyValue::new("outcome", outcome)],
        );
        self.latest_processed_block
            .record(block_number, std::slice::from_ref(&contract));
        self.latest_block_processing_time
            .record(elapsed_secs, &[contract]);
    }

    pub async fn start_metrics_server(&self, addr: &str, port: u16) -> std::io::Result<()> {
        let addr = format!("{addr}:{port}")
            .parse::<SocketAddr>()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;
        let registry = self.registry.clone();

        let app = Router::new().route("/metrics", get(move || metrics_handler(registry.clone())));

        // Determine the access URL based on the binding address. Only used for logging.
        let access_url = if addr.ip().is_unspecified() {
            format!("http://localhost:{port}/metrics")
        } else {
            format!("http://{}:{port}/metrics", addr.ip())
        };

        info!(
            "Starting metrics server - binding to {} (accessible at {})",
            addr, access_url
        );

        let listener = tokio::net::TcpListener::bind(addr).await?;

        // Spawn the server in a separate task
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                error!("Metrics server stopped: {}", e);
            }
        });

        Ok(())
    }
}

async fn metrics_handler(registry: Arc<prometheus::Registry>) -> Result<String, StatusCode> {
    let encoder = TextEncoder::new();
    let metric_families = registry.gather();
    let mut buffer = vec![];
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    String::from_utf8(buffer).map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}
