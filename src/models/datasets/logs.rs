use alloy_primitives::{Address, Bytes, FixedBytes};

////////////////////////////////////// RPC Data ////////////////////////////////////////
#[derive(Debug, Clone)]
pub struct RpcLogData {
    pub address: Address,
    pub topics: Vec<FixedBytes<32>>,
    pub data: Bytes,
}

///////////////////////////////////// Stored Data //////////////////////////////////////
// Row in the `logs` table. `topics` holds the JSON-encoded topic list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredLog {
    pub id: i64,
    pub transaction_hash: String,
    pub address: String,
    pub topics: String,
    pub data: String,
    pub is_target_contract: bool,
}
