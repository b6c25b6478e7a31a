use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub address: String,
    pub port: u16,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            address: "0.0.0.0".to_string(),
            port: 9100,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub exponential: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 8,
            base_delay_ms: 1_000,
            max_delay_ms: 60_000,
            exponential: 2.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub rpc_url: String,
    #[serde(default = "default_database_url")]
    pub database_url: String,
    pub target_contract: Address,
    #[serde(default = "default_scan_depth")]
    pub scan_depth: u64,
    #[serde(default = "default_block_delay_ms")]
    pub block_delay_ms: u64,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

fn default_database_url() -> String {
    "sqlite://blockchain_data.db".to_string()
}

fn default_scan_depth() -> u64 {
    100
}

fn default_block_delay_ms() -> u64 {
    100
}

/// Inclusive span of block numbers a run processes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanRange {
    pub start_block: u64,
    pub end_block: u64,
}

impl ScanRange {
    /// The `depth` blocks below `head`, plus `head` itself. Clamps at genesis.
    pub fn from_head(head: u64, depth: u64) -> Self {
        Self {
            start_block: head.saturating_sub(depth),
            end_block: head,
        }
    }

    /// Saturates at `u64::MAX` for the full `0..=u64::MAX` span.
    pub fn block_count(&self) -> u64 {
        (self.end_block - self.start_block).saturating_add(1)
    }

    pub fn blocks(&self) -> std::ops::RangeInclusive<u64> {
        self.start_block..=self.end_block
    }
}
