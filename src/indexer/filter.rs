use alloy_primitives::Address;

use crate::models::datasets::logs::RpcLogData;
use crate::models::datasets::transactions::TransactionWithReceipt;

/// Decides which transactions and logs concern the target contract.
///
/// Addresses are compared as 20-byte values, so differences in hex casing
/// (checksummed or not) never affect the outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelevanceFilter {
    target: Address,
}

impl RelevanceFilter {
    pub fn new(target: Address) -> Self {
        Self { target }
    }

    pub fn target(&self) -> Address {
        self.target
    }

    pub fn is_target(&self, address: &Address) -> bool {
        *address == self.target
    }

    /// True if the transaction is sent to the target contract, or if its
    /// receipt holds at least one log emitted by the target contract.
    pub fn is_contract_related(&self, tx: &TransactionWithReceipt) -> bool {
        if tx
            .transaction
            .to_address
            .is_some_and(|to| self.is_target(&to))
        {
            return true;
        }

        tx.logs().iter().any(|log| self.is_target(&log.address))
    }

    pub fn filter_target_logs(&self, logs: &[RpcLogData]) -> Vec<RpcLogData> {
        logs.iter()
            .filter(|log| self.is_target(&log.address))
            .cloned()
            .collect()
    }
}
