use alloy_consensus::Transaction;
use alloy_network::{AnyRpcBlock, AnyRpcTransaction, TransactionResponse};
use alloy_rpc_types_eth::BlockTransactions;

use crate::models::datasets::blocks::RpcBlockData;
use crate::models::datasets::transactions::RpcTransactionData;
use crate::models::errors::ChainReadError;

pub trait BlockParser {
    fn parse_block(&self) -> Result<RpcBlockData, ChainReadError>;
}

impl BlockParser for AnyRpcBlock {
    fn parse_block(&self) -> Result<RpcBlockData, ChainReadError> {
        let inner = &self.header.inner;

        let transactions = match &self.transactions {
            BlockTransactions::Full(transactions) => {
                transactions.iter().map(parse_transaction).collect()
            }
            // An empty block deserializes as `Hashes` regardless of the requested kind
            BlockTransactions::Hashes(hashes) if hashes.is_empty() => Vec::new(),
            _ => return Err(ChainReadError::TransactionHashesOnly),
        };

        Ok(RpcBlockData {
            number: inner.number,
            hash: self.header.hash,
            timestamp: inner.timestamp,
            difficulty: inner.difficulty,
            gas_limit: inner.gas_limit,
            gas_used: inner.gas_used,
            transactions,
        })
    }
}

// Both traits expose overlapping accessors, so calls are fully qualified.
fn parse_transaction(transaction: &AnyRpcTransaction) -> RpcTransactionData {
    RpcTransactionData {
        hash: TransactionResponse::tx_hash(transaction),
        from_address: TransactionResponse::from(transaction),
        to_address: Transaction::to(transaction),
        value: Transaction::value(transaction),
        // Mined dynamic-fee transactions report the price paid as `gasPrice`
        gas_price: transaction
            .effective_gas_price
            .or_else(|| Transaction::gas_price(transaction))
            .unwrap_or_else(|| Transaction::max_fee_per_gas(transaction)),
        gas_limit: Transaction::gas_limit(transaction),
    }
}
