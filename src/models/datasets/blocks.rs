use alloy_primitives::{FixedBytes, U256};

use crate::models::datasets::transactions::RpcTransactionData;

////////////////////////////////////// RPC Data ////////////////////////////////////////
///////////////////////////////// eth_getBlockByNumber /////////////////////////////////
#[derive(Debug, Clone)]
pub struct RpcBlockData {
    pub number: u64,
    pub hash: FixedBytes<32>,
    pub timestamp: u64,
    pub difficulty: U256,
    pub gas_limit: u64,
    pub gas_used: u64,
    pub transactions: Vec<RpcTransactionData>,
}

///////////////////////////////////// Stored Data //////////////////////////////////////
// Row in the `blocks` table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBlock {
    pub number: u64,
    pub hash: String,
    pub timestamp: u64,
    pub difficulty: String,
    pub gas_limit: u64,
    pub gas_used: u64,
    pub contract_tx_count: u64,
}
