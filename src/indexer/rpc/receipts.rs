use alloy_network::AnyTransactionReceipt;

use crate::models::datasets::logs::RpcLogData;
use crate::models::datasets::transactions::RpcReceiptData;

pub trait ReceiptParser {
    fn parse_receipt(&self) -> RpcReceiptData;
}

impl ReceiptParser for AnyTransactionReceipt {
    fn parse_receipt(&self) -> RpcReceiptData {
        // Access the inner ReceiptWithBloom through the AnyReceiptEnvelope
        let receipt_with_bloom = &self.inner.inner.inner;

        let logs = receipt_with_bloom
            .receipt
            .logs
            .iter()
            .map(|log| RpcLogData {
                address: log.inner.address,
                topics: log.inner.data.topics().to_vec(),
                data: log.inner.data.data.clone(),
            })
            .collect();

        RpcReceiptData {
            tx_hash: self.inner.transaction_hash,
            gas_used: self.inner.gas_used,
            logs,
        }
    }
}
