use alloy_primitives::{Address, FixedBytes, U256};

use crate::models::datasets::logs::RpcLogData;

////////////////////////////////////// RPC Data ////////////////////////////////////////
///////////////////////////////// eth_getBlockByNumber /////////////////////////////////
#[derive(Debug, Clone)]
pub struct RpcTransactionData {
    pub hash: FixedBytes<32>,
    pub from_address: Address,
    pub to_address: Option<Address>, // None for contract creation
    pub value: U256,
    pub gas_price: u128,
    pub gas_limit: u64,
}

/////////////////////////////// eth_getTransactionReceipt //////////////////////////////
#[derive(Debug, Clone)]
pub struct RpcReceiptData {
    pub tx_hash: FixedBytes<32>,
    pub gas_used: u64,
    pub logs: Vec<RpcLogData>,
}

/// A block transaction joined with its receipt.
///
/// `receipt` is `None` when the receipt could not be fetched; the transaction
/// is then classified without log data.
#[derive(Debug, Clone)]
pub struct TransactionWithReceipt {
    pub transaction: RpcTransactionData,
    pub receipt: Option<RpcReceiptData>,
}

impl TransactionWithReceipt {
    pub fn logs(&self) -> &[RpcLogData] {
        self.receipt
            .as_ref()
            .map(|receipt| receipt.logs.as_slice())
            .unwrap_or_default()
    }

    /// Receipt gas used, falling back to the transaction gas limit when no
    /// receipt is available.
    pub fn gas_used(&self) -> u64 {
        self.receipt
            .as_ref()
            .map(|receipt| receipt.gas_used)
            .unwrap_or(self.transaction.gas_limit)
    }
}

///////////////////////////////////// Stored Data //////////////////////////////////////
// Row in the `transactions` table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredTransaction {
    pub hash: String,
    pub block_number: u64,
    pub from_address: String,
    pub to_address: Option<String>,
    pub value: String,
    pub gas_price: String,
    pub gas_used: u64,
    pub is_contract_related: bool,
}
