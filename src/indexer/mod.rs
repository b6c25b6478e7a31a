pub mod block_processor;
pub mod filter;
pub mod rpc;
pub mod scanner;

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use alloy_eips::BlockNumberOrTag;
use alloy_network::AnyNetwork;
use alloy_primitives::FixedBytes;
use alloy_provider::{Provider, ProviderBuilder};
use alloy_transport::TransportError;
use async_trait::async_trait;
use tracing::warn;
use url::Url;

use crate::indexer::rpc::{blocks::BlockParser, receipts::ReceiptParser};
use crate::metrics::Metrics;
use crate::models::datasets::blocks::RpcBlockData;
use crate::models::datasets::transactions::RpcReceiptData;
use crate::models::errors::ChainReadError;

/// Read access to the chain node.
///
/// Implementations do not retry; callers decide how to react to a
/// [`ChainReadError`].
#[async_trait]
pub trait ChainReader: Send + Sync {
    async fn latest_block_number(&self) -> Result<u64, ChainReadError>;

    /// Fetch a block together with its full transaction objects.
    async fn fetch_block(&self, block_number: u64) -> Result<RpcBlockData, ChainReadError>;

    async fn fetch_receipt(&self, tx_hash: FixedBytes<32>)
    -> Result<RpcReceiptData, ChainReadError>;
}

/// [`ChainReader`] backed by an alloy provider speaking JSON-RPC.
pub struct RpcChainReader<P> {
    provider: P,
    metrics: Option<Arc<Metrics>>,
}

impl<P> RpcChainReader<P>
where
    P: Provider<AnyNetwork>,
{
    pub fn new(provider: P, metrics: Option<Arc<Metrics>>) -> Self {
        Self { provider, metrics }
    }

    async fn observe<T, F>(&self, method: &'static str, call: F) -> Result<T, ChainReadError>
    where
        F: Future<Output = Result<T, TransportError>> + Send,
    {
        let start = Instant::now();
        let result = call.await;

        // Record metrics if enabled
        if let Some(metrics) = &self.metrics {
            metrics.record_rpc(method, start.elapsed().as_secs_f64(), result.is_err());
        }

        result.map_err(|source| {
            warn!("RPC call {} failed. Error details:\n{:#?}", method, source);
            ChainReadError::Rpc { method, source }
        })
    }
}

/// Build an HTTP reader for `rpc_url`.
pub fn connect_http(
    rpc_url: Url,
    metrics: Option<Arc<Metrics>>,
) -> RpcChainReader<impl Provider<AnyNetwork>> {
    let provider = ProviderBuilder::new()
        .network::<AnyNetwork>()
        .connect_http(rpc_url);
    RpcChainReader::new(provider, metrics)
}

#[async_trait]
impl<P> ChainReader for RpcChainReader<P>
where
    P: Provider<AnyNetwork>,
{
    async fn latest_block_number(&self) -> Result<u64, ChainReadError> {
        self.observe("get_block_number", async {
            self.provider.get_block_number().await
        })
        .await
    }

    async fn fetch_block(&self, block_number: u64) -> Result<RpcBlockData, ChainReadError> {
        let block = self
            .observe("get_block_by_number", async {
                self.provider
                    .get_block_by_number(BlockNumberOrTag::Number(block_number))
                    .full()
                    .await
            })
            .await?
            .ok_or(ChainReadError::BlockNotFound { block_number })?;

        block.parse_block()
    }

    async fn fetch_receipt(
        &self,
        tx_hash: FixedBytes<32>,
    ) -> Result<RpcReceiptData, ChainReadError> {
        let receipt = self
            .observe("get_transaction_receipt", async {
                self.provider.get_transaction_receipt(tx_hash).await
            })
            .await?
            .ok_or(ChainReadError::ReceiptNotFound { tx_hash })?;

        Ok(receipt.parse_receipt())
    }
}
