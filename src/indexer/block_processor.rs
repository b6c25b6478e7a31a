use futures::future::join_all;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::indexer::ChainReader;
use crate::indexer::filter::RelevanceFilter;
use crate::metrics::Metrics;
use crate::models::datasets::blocks::RpcBlockData;
use crate::models::datasets::transactions::TransactionWithReceipt;
use crate::models::errors::StoreError;
use crate::storage::Store;

/// Result of processing one block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockOutcome {
    /// Block row written, along with `contract_txs` contract-related transactions.
    Processed { contract_txs: usize },
    Failed,
}

impl BlockOutcome {
    pub fn is_processed(&self) -> bool {
        matches!(self, BlockOutcome::Processed { .. })
    }
}

/// Fetches, classifies and persists a single block.
///
/// Errors never escape: every failure is logged and reported as
/// [`BlockOutcome::Failed`].
pub struct BlockProcessor<'a, R: ?Sized> {
    reader: &'a R,
    store: &'a Store,
    filter: RelevanceFilter,
    metrics: Option<&'a Metrics>,
}

impl<'a, R> BlockProcessor<'a, R>
where
    R: ChainReader + ?Sized,
{
    pub fn new(
        reader: &'a R,
        store: &'a Store,
        filter: RelevanceFilter,
        metrics: Option<&'a Metrics>,
    ) -> Self {
        Self {
            reader,
            store,
            filter,
            metrics,
        }
    }

    pub async fn process_block(&self, block_number: u64) -> bool {
        self.process(block_number).await.is_processed()
    }

    pub async fn process(&self, block_number: u64) -> BlockOutcome {
        let start = Instant::now();
        let outcome = self.fetch_classify_and_store(block_number).await;

        if let Some(metrics) = self.metrics {
            let label = if outcome.is_processed() { "success" } else { "failed" };
            metrics.record_block(block_number, start.elapsed().as_secs_f64(), label);
        }

        outcome
    }

    async fn fetch_classify_and_store(&self, block_number: u64) -> BlockOutcome {
        let block = match self.reader.fetch_block(block_number).await {
            Ok(block) => block,
            Err(e) => {
                error!("Block {} failed: could not fetch block: {}", block_number, e);
                return BlockOutcome::Failed;
            }
        };

        let transactions = self.fetch_receipts(&block).await;

        let (related, unrelated): (Vec<_>, Vec<_>) = transactions
            .into_iter()
            .partition(|tx| self.filter.is_contract_related(tx));
        debug!(
            "Block {}: {} contract-related, {} unrelated transactions",
            block_number,
            related.len(),
            unrelated.len()
        );

        if let Err(e) = self.persist(&block, &related).await {
            if let Some(metrics) = self.metrics {
                metrics.store_errors.add(1, &[metrics.contract_label()]);
            }
            error!("Block {} failed: could not persist block: {}", block_number, e);
            return BlockOutcome::Failed;
        }

        if let Some(metrics) = self.metrics {
            metrics
                .contract_transactions
                .add(related.len() as u64, &[metrics.contract_label()]);
        }

        if related.is_empty() {
            info!("Block {} processed - no contract-related transactions", block_number);
        } else {
            info!(
                "Block {} processed - found {} contract-related transactions",
                block_number,
                related.len()
            );
        }

        BlockOutcome::Processed {
            contract_txs: related.len(),
        }
    }

    /// Fetch every receipt concurrently. A failed fetch leaves that
    /// transaction without a receipt instead of failing the block.
    async fn fetch_receipts(&self, block: &RpcBlockData) -> Vec<TransactionWithReceipt> {
        let fetches = block.transactions.iter().map(|transaction| async move {
            let receipt = match self.reader.fetch_receipt(transaction.hash).await {
                Ok(receipt) => Some(receipt),
                Err(e) => {
                    warn!(
                        "Failed to fetch receipt for transaction {} in block {}: {}",
                        transaction.hash, block.number, e
                    );
                    None
                }
            };
            TransactionWithReceipt {
                transaction: transaction.clone(),
                receipt,
            }
        });

        join_all(fetches).await
    }

    /// Write the block row, then every contract-related transaction
    /// concurrently. Waits for all writes before reporting the first failure.
    async fn persist(
        &self,
        block: &RpcBlockData,
        related: &[TransactionWithReceipt],
    ) -> Result<(), StoreError> {
        self.store.insert_block(block, related.len()).await?;

        if related.is_empty() {
            return Ok(());
        }

        let results = join_all(
            related
                .iter()
                .map(|tx| self.store.insert_transaction(tx, block.number, true)),
        )
        .await;

        let mut errors = results.into_iter().filter_map(Result::err);
        match errors.next() {
            None => Ok(()),
            Some(first) => {
                let remaining = errors.count();
                if remaining > 0 {
                    if let Some(metrics) = self.metrics {
                        metrics
                            .store_errors
                            .add(remaining as u64, &[metrics.contract_label()]);
                    }
                    warn!(
                        "Block {}: {} further transaction writes failed",
                        block.number, remaining
                    );
                }
                Err(first)
            }
        }
    }
}
