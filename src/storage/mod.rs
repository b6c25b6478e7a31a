pub mod schema;

use std::str::FromStr;
use std::time::Duration;

use alloy_primitives::FixedBytes;
use futures::future::join_all;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use tracing::{debug, info, warn};

use crate::indexer::filter::RelevanceFilter;
use crate::models::datasets::blocks::{RpcBlockData, StoredBlock};
use crate::models::datasets::logs::{RpcLogData, StoredLog};
use crate::models::datasets::transactions::{StoredTransaction, TransactionWithReceipt};
use crate::models::errors::StoreError;

const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(300);

/// Relational store for scanned blocks, contract-related transactions and
/// their target-contract logs.
///
/// Backed by a single SQLite connection. Every write is an independent
/// statement, so concurrent calls from one block's fan-out interleave on that
/// connection. Rows are insert-only; re-inserting an existing block number or
/// transaction hash fails with a constraint violation.
#[derive(Debug)]
pub struct Store {
    pool: SqlitePool,
    filter: RelevanceFilter,
}

impl Store {
    /// Open the database at `database_url` and create any missing tables.
    ///
    /// Safe to call on every process start.
    pub async fn open(database_url: &str, filter: RelevanceFilter) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true);

        // One connection: in-memory databases are per-connection, and the
        // scanner never writes from more than one block at a time. Every
        // insert of a block queues on it, so the acquire wait covers the
        // whole block rather than a single statement.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .acquire_timeout(ACQUIRE_TIMEOUT)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let store = Self { pool, filter };
        store.create_tables().await?;
        info!("Storage ready at {}", database_url);
        Ok(store)
    }

    async fn create_tables(&self) -> Result<(), StoreError> {
        for (table, ddl) in schema::CREATE_TABLES {
            sqlx::query(ddl).execute(&self.pool).await?;
            debug!("Ensured table `{}` exists", table);
        }
        Ok(())
    }

    pub async fn insert_block(
        &self,
        block: &RpcBlockData,
        contract_tx_count: usize,
    ) -> Result<(), StoreError> {
        sqlx::query(schema::INSERT_BLOCK)
            .bind(to_i64("number", block.number)?)
            .bind(block.hash.to_string())
            .bind(to_i64("timestamp", block.timestamp)?)
            .bind(block.difficulty.to_string())
            .bind(to_i64("gasLimit", block.gas_limit)?)
            .bind(to_i64("gasUsed", block.gas_used)?)
            .bind(to_i64("contractTxCount", contract_tx_count as u64)?)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Insert one transaction row and, for contract-related transactions, the
    /// logs its receipt carries from the target contract.
    ///
    /// If the log batch fails the transaction row stays written and the
    /// returned error is [`StoreError::LogBatch`]. Rows from the batch that
    /// did succeed are not rolled back.
    pub async fn insert_transaction(
        &self,
        tx: &TransactionWithReceipt,
        block_number: u64,
        is_contract_related: bool,
    ) -> Result<(), StoreError> {
        let transaction = &tx.transaction;
        sqlx::query(schema::INSERT_TRANSACTION)
            .bind(transaction.hash.to_string())
            .bind(to_i64("blockNumber", block_number)?)
            .bind(transaction.from_address.to_string())
            .bind(transaction.to_address.map(|address| address.to_string()))
            .bind(transaction.value.to_string())
            .bind(transaction.gas_price.to_string())
            .bind(to_i64("gasUsed", tx.gas_used())?)
            .bind(is_contract_related)
            .execute(&self.pool)
            .await?;

        if is_contract_related && !tx.logs().is_empty() {
            let target_logs = self.filter.filter_target_logs(tx.logs());
            if !target_logs.is_empty() {
                self.insert_logs(&target_logs, transaction.hash).await?;
            }
        }

        Ok(())
    }

    /// Insert every log concurrently and wait for all of them to settle.
    pub async fn insert_logs(
        &self,
        logs: &[RpcLogData],
        tx_hash: FixedBytes<32>,
    ) -> Result<(), StoreError> {
        let results = join_all(logs.iter().map(|log| self.insert_log(log, tx_hash))).await;

        let total = results.len();
        let mut errors = results.into_iter().filter_map(Result::err);
        match errors.next() {
            None => Ok(()),
            Some(first) => {
                let failed = 1 + errors.count();
                warn!(
                    "{} of {} log inserts failed for transaction {}",
                    failed, total, tx_hash
                );
                Err(StoreError::LogBatch {
                    tx_hash,
                    failed,
                    total,
                    source: Box::new(first),
                })
            }
        }
    }

    async fn insert_log(&self, log: &RpcLogData, tx_hash: FixedBytes<32>) -> Result<(), StoreError> {
        let topics = serde_json::to_string(&log.topics)?;
        sqlx::query(schema::INSERT_LOG)
            .bind(tx_hash.to_string())
            .bind(log.address.to_string())
            .bind(topics)
            .bind(log.data.to_string())
            .bind(self.filter.is_target(&log.address))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn block(&self, number: u64) -> Result<Option<StoredBlock>, StoreError> {
        let row = sqlx::query("SELECT * FROM blocks WHERE number = ?")
            .bind(to_i64("number", number)?)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|row| block_from_row(&row)).transpose()
    }

    pub async fn block_count(&self) -> Result<u64, StoreError> {
        let row = sqlx::query("SELECT COUNT(*) AS cnt FROM blocks")
            .fetch_one(&self.pool)
            .await?;
        Ok(from_i64(row.try_get("cnt")?))
    }

    pub async fn transactions_in_block(
        &self,
        block_number: u64,
    ) -> Result<Vec<StoredTransaction>, StoreError> {
        let rows = sqlx::query("SELECT * FROM transactions WHERE blockNumber = ? ORDER BY hash")
            .bind(to_i64("blockNumber", block_number)?)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(transaction_from_row).collect()
    }

    pub async fn logs_for_transaction(
        &self,
        tx_hash: FixedBytes<32>,
    ) -> Result<Vec<StoredLog>, StoreError> {
        let rows = sqlx::query("SELECT * FROM logs WHERE transactionHash = ? ORDER BY id")
            .bind(tx_hash.to_string())
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(log_from_row).collect()
    }

    /// Release the connection. Consumes the store, so it cannot be used again.
    pub async fn close(self) {
        self.pool.close().await;
        info!("Storage connection closed");
    }
}

fn to_i64(column: &'static str, value: u64) -> Result<i64, StoreError> {
    i64::try_from(value).map_err(|_| StoreError::IntegerOverflow { column, value })
}

// Integer columns are only ever written through `to_i64`.
fn from_i64(value: i64) -> u64 {
    value as u64
}

fn block_from_row(row: &SqliteRow) -> Result<StoredBlock, StoreError> {
    Ok(StoredBlock {
        number: from_i64(row.try_get("number")?),
        hash: row.try_get("hash")?,
        timestamp: from_i64(row.try_get("timestamp")?),
        difficulty: row.try_get("difficulty")?,
        gas_limit: from_i64(row.try_get("gasLimit")?),
        gas_used: from_i64(row.try_get("gasUsed")?),
        contract_tx_count: from_i64(row.try_get("contractTxCount")?),
    })
}

fn transaction_from_row(row: &SqliteRow) -> Result<StoredTransaction, StoreError> {
    Ok(StoredTransaction {
        hash: row.try_get("hash")?,
        block_number: from_i64(row.try_get("blockNumber")?),
        from_address: row.try_get("fromAddress")?,
        to_address: row.try_get("toAddress")?,
        value: row.try_get("value")?,
        gas_price: row.try_get("gasPrice")?,
        gas_used: from_i64(row.try_get("gasUsed")?),
        is_contract_related: row.try_get("isContractRelated")?,
    })
}

fn log_from_row(row: &SqliteRow) -> Result<StoredLog, StoreError> {
    Ok(StoredLog {
        id: row.try_get("id")?,
        transaction_hash: row.try_get("transactionHash")?,
        address: row.try_get("address")?,
        topics: row.try_get("topics")?,
        data: row.try_get("data")?,
        is_target_contract: row.try_get("isTargetContract")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{Address, Bytes, U256, address, b256};

    use crate::models::datasets::transactions::{RpcReceiptData, RpcTransactionData};

    const TARGET: Address = address!("e7f1725e7734ce288f8367e1bb143e90bb3f0512");
    const OTHER: Address = address!("9a676e781a523b5d0c0e43731313a708cb607508");

    async fn memory_store() -> Store {
        Store::open("sqlite::memory:", RelevanceFilter::new(TARGET))
            .await
            .unwrap()
    }

    fn block(number: u64) -> RpcBlockData {
        RpcBlockData {
            number,
            hash: FixedBytes::with_last_byte(number as u8),
            timestamp: 1_700_000_000 + number,
            difficulty: U256::from(2u64).pow(U256::from(70u64)),
            gas_limit: 30_000_000,
            gas_used: 12_345,
            transactions: vec![],
        }
    }

    fn log(address: Address) -> RpcLogData {
        RpcLogData {
            address,
            topics: vec![b256!(
                "ddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef"
            )],
            data: Bytes::from_static(&[0x01, 0x02]),
        }
    }

    fn transaction(hash_byte: u8, logs: Option<Vec<RpcLogData>>) -> TransactionWithReceipt {
        let hash = FixedBytes::with_last_byte(hash_byte);
        TransactionWithReceipt {
            transaction: RpcTransactionData {
                hash,
                from_address: OTHER,
                to_address: Some(TARGET),
                value: U256::MAX,
                gas_price: 1_000_000_000,
                gas_limit: 21_000,
            },
            receipt: logs.map(|logs| RpcReceiptData {
                tx_hash: hash,
                gas_used: 20_500,
                logs,
            }),
        }
    }

    #[tokio::test]
    async fn open_is_idempotent_on_existing_schema() {
        let store = memory_store().await;
        store.create_tables().await.unwrap();
        assert_eq!(store.block_count().await.unwrap(), 0);
        store.close().await;
    }

    #[tokio::test]
    async fn block_round_trips_with_wide_difficulty() {
        let store = memory_store().await;
        store.insert_block(&block(100), 2).await.unwrap();

        let stored = store.block(100).await.unwrap().unwrap();
        assert_eq!(stored.contract_tx_count, 2);
        assert_eq!(stored.difficulty, "1180591620717411303424");
        assert_eq!(stored.gas_limit, 30_000_000);
        assert!(store.block(101).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_block_number_is_rejected() {
        let store = memory_store().await;
        store.insert_block(&block(100), 0).await.unwrap();

        let err = store.insert_block(&block(100), 5).await.unwrap_err();
        assert!(matches!(err, StoreError::Database(_)));
        assert_eq!(store.block(100).await.unwrap().unwrap().contract_tx_count, 0);
    }

    #[tokio::test]
    async fn transaction_requires_existing_block() {
        let store = memory_store().await;
        let err = store
            .insert_transaction(&transaction(1, None), 42, true)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Database(_)));
    }

    #[tokio::test]
    async fn only_target_logs_are_written() {
        let store = memory_store().await;
        store.insert_block(&block(7), 1).await.unwrap();

        let tx = transaction(1, Some(vec![log(TARGET), log(OTHER), log(TARGET)]));
        store.insert_transaction(&tx, 7, true).await.unwrap();

        let stored = store.transactions_in_block(7).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].value, U256::MAX.to_string());
        assert_eq!(stored[0].gas_used, 20_500);
        assert!(stored[0].is_contract_related);

        let logs = store.logs_for_transaction(tx.transaction.hash).await.unwrap();
        assert_eq!(logs.len(), 2);
        assert!(logs.iter().all(|log| log.is_target_contract));
        assert!(logs.iter().all(|log| log.address == TARGET.to_string()));
        assert_eq!(
            logs[0].topics,
            "[\"0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef\"]"
        );
        assert_eq!(logs[0].data, "0x0102");
    }

    #[tokio::test]
    async fn missing_receipt_stores_gas_limit() {
        let store = memory_store().await;
        store.insert_block(&block(8), 1).await.unwrap();
        store
            .insert_transaction(&transaction(2, None), 8, true)
            .await
            .unwrap();

        let stored = store.transactions_in_block(8).await.unwrap();
        assert_eq!(stored[0].gas_used, 21_000);
    }

    #[tokio::test]
    async fn log_batch_failure_keeps_transaction_row() {
        let store = memory_store().await;
        store.insert_block(&block(9), 1).await.unwrap();
        sqlx::query(
            "CREATE TRIGGER reject_payload BEFORE INSERT ON logs WHEN NEW.data = '0xdead' \
             BEGIN SELECT RAISE(ABORT, 'rejected payload'); END",
        )
        .execute(&store.pool)
        .await
        .unwrap();

        let mut rejected = log(TARGET);
        rejected.data = Bytes::from_static(&[0xde, 0xad]);
        let tx = transaction(3, Some(vec![log(TARGET), rejected]));

        let err = store.insert_transaction(&tx, 9, true).await.unwrap_err();
        match err {
            StoreError::LogBatch { failed, total, .. } => {
                assert_eq!(failed, 1);
                assert_eq!(total, 2);
            }
            other => panic!("unexpected error: {other}"),
        }

        // Neither the transaction row nor the successful log is rolled back
        assert_eq!(store.transactions_in_block(9).await.unwrap().len(), 1);
        let logs = store.logs_for_transaction(tx.transaction.hash).await.unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].data, "0x0102");
    }

    #[tokio::test]
    async fn many_queued_inserts_share_one_connection() {
        let store = memory_store().await;
        store.insert_block(&block(10), 1).await.unwrap();

        let logs = (0..500).map(|_| log(TARGET)).collect();
        let tx = transaction(4, Some(logs));
        store.insert_transaction(&tx, 10, true).await.unwrap();

        let stored = store.logs_for_transaction(tx.transaction.hash).await.unwrap();
        assert_eq!(stored.len(), 500);
    }
}
