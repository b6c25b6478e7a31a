use alloy_primitives::FixedBytes;
use alloy_transport::TransportError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChainReadError {
    #[error("RPC error calling {method}: {source}")]
    Rpc {
        method: &'static str,
        #[source]
        source: TransportError,
    },
    #[error("Block {block_number} is not available from the node")]
    BlockNotFound { block_number: u64 },
    #[error("Receipt for transaction {tx_hash} is not available from the node")]
    ReceiptNotFound { tx_hash: FixedBytes<32> },
    #[error("Invalid block format: Expected full transaction objects but received only transaction hashes")]
    TransactionHashesOnly,
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Failed to serialize log topics: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Value {value} for column {column} does not fit in a signed 64-bit integer")]
    IntegerOverflow { column: &'static str, value: u64 },
    #[error("{failed} of {total} log inserts for transaction {tx_hash} failed: {source}")]
    LogBatch {
        tx_hash: FixedBytes<32>,
        failed: usize,
        total: usize,
        #[source]
        source: Box<StoreError>,
    },
}

#[derive(Error, Debug)]
pub enum InitError {
    #[error("Invalid RPC URL {url}: {source}")]
    InvalidRpcUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("Failed to open storage: {0}")]
    Store(#[from] StoreError),
    #[error("Failed to read chain head: {0}")]
    ChainHead(#[source] ChainReadError),
    #[error("Failed to build metrics: {0}")]
    Metrics(#[from] opentelemetry_sdk::metrics::MetricError),
    #[error("Failed to start metrics server: {0}")]
    MetricsServer(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum ScanError {
    #[error(transparent)]
    Init(#[from] InitError),
    #[error("Scan aborted by panic: {0}")]
    Panicked(String),
}
