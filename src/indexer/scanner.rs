use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use alloy_network::AnyNetwork;
use alloy_provider::Provider;
use futures::FutureExt;
use tracing::{error, info};
use url::Url;

use crate::indexer::block_processor::{BlockOutcome, BlockProcessor};
use crate::indexer::filter::RelevanceFilter;
use crate::indexer::{ChainReader, RpcChainReader, connect_http};
use crate::metrics::Metrics;
use crate::models::common::{Config, RetryConfig, ScanRange};
use crate::models::errors::{InitError, ScanError};
use crate::storage::Store;
use crate::utils::retry::retry;

#[derive(Debug, Clone)]
pub struct ScanSettings {
    /// Number of blocks below the chain head to include in the range.
    pub depth: u64,
    /// Pause after every block, whatever its outcome.
    pub block_delay: Duration,
    /// Backoff for reading the chain head. Blocks themselves are never retried.
    pub head_retry: RetryConfig,
}

impl From<&Config> for ScanSettings {
    fn from(config: &Config) -> Self {
        Self {
            depth: config.scan_depth,
            block_delay: Duration::from_millis(config.block_delay_ms),
            head_retry: config.retry.clone(),
        }
    }
}

/// Run-level totals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanReport {
    pub start_block: u64,
    pub end_block: u64,
    pub blocks_in_range: u64,
    pub blocks_succeeded: u64,
    pub blocks_failed: u64,
    pub contract_transactions: u64,
}

impl ScanReport {
    fn new(range: ScanRange) -> Self {
        Self {
            start_block: range.start_block,
            end_block: range.end_block,
            blocks_in_range: range.block_count(),
            blocks_succeeded: 0,
            blocks_failed: 0,
            contract_transactions: 0,
        }
    }

    fn record(&mut self, outcome: BlockOutcome) {
        match outcome {
            BlockOutcome::Processed { contract_txs } => {
                self.blocks_succeeded += 1;
                self.contract_transactions += contract_txs as u64;
            }
            BlockOutcome::Failed => self.blocks_failed += 1,
        }
    }
}

/// Drives one bounded scan over the blocks just below the chain head.
///
/// Owns the store for the whole run and closes it on the way out, whether
/// the range completed, the chain head could not be read, or the scan panicked.
pub struct Scanner<R> {
    reader: R,
    store: Store,
    filter: RelevanceFilter,
    settings: ScanSettings,
    metrics: Option<Arc<Metrics>>,
}

/// Connect to the node and open the store. Nothing is scanned if this fails.
pub async fn init(
    config: &Config,
    metrics: Option<Arc<Metrics>>,
) -> Result<Scanner<RpcChainReader<impl Provider<AnyNetwork>>>, InitError> {
    let rpc_url: Url = config
        .rpc_url
        .parse()
        .map_err(|source| InitError::InvalidRpcUrl {
            url: config.rpc_url.clone(),
            source,
        })?;
    info!("RPC URL: {}", rpc_url);

    let filter = RelevanceFilter::new(config.target_contract);
    let reader = connect_http(rpc_url, metrics.clone());
    let store = Store::open(&config.database_url, filter).await?;

    Ok(Scanner::new(
        reader,
        store,
        filter,
        ScanSettings::from(config),
        metrics,
    ))
}

impl<R> Scanner<R>
where
    R: ChainReader,
{
    pub fn new(
        reader: R,
        store: Store,
        filter: RelevanceFilter,
        settings: ScanSettings,
        metrics: Option<Arc<Metrics>>,
    ) -> Self {
        Self {
            reader,
            store,
            filter,
            settings,
            metrics,
        }
    }

    pub async fn run(self) -> Result<ScanReport, ScanError> {
        let Self {
            reader,
            store,
            filter,
            settings,
            metrics,
        } = self;

        let result = AssertUnwindSafe(scan(
            &reader,
            &store,
            filter,
            &settings,
            metrics.as_deref(),
        ))
        .catch_unwind()
        .await;

        // Teardown runs on every exit path
        store.close().await;

        match result {
            Ok(result) => result,
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!("Scan aborted by panic: {}", message);
                Err(ScanError::Panicked(message))
            }
        }
    }
}

async fn scan<R>(
    reader: &R,
    store: &Store,
    filter: RelevanceFilter,
    settings: &ScanSettings,
    metrics: Option<&Metrics>,
) -> Result<ScanReport, ScanError>
where
    R: ChainReader + ?Sized,
{
    let head = retry(
        || reader.latest_block_number(),
        &settings.head_retry,
        "get_block_number",
    )
    .await
    .map_err(InitError::ChainHead)?;
    info!("Current chain head: {}", head);

    if let Some(metrics) = metrics {
        metrics
            .chain_tip_block
            .record(head, &[metrics.contract_label()]);
    }

    let range = ScanRange::from_head(head, settings.depth);
    info!(
        "Scanning blocks {} to {} for contract {}",
        range.start_block,
        range.end_block,
        filter.target()
    );

    let processor = BlockProcessor::new(reader, store, filter, metrics);
    let mut report = ScanReport::new(range);

    for block_number in range.blocks() {
        let outcome = processor.process(block_number).await;
        report.record(outcome);

        // Rate control against the upstream node
        tokio::time::sleep(settings.block_delay).await;
    }

    info!(
        "Scan complete: {} blocks in range, {} succeeded, {} failed, {} contract-related transactions",
        report.blocks_in_range,
        report.blocks_succeeded,
        report.blocks_failed,
        report.contract_transactions
    );

    Ok(report)
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
