use anyhow::Result;
use url::Url;

use contract_scraper::indexer::{ChainReader, connect_http};

//////// Ethereum test params ////////
const ETH_RPC_URL: &str = "https://eth.drpc.org";
// (block_number, expected_transaction_count)
const ETH_PARAMS: [(u64, usize); 2] = [
    (46147, 1), // First block with a legacy transaction
    (12965001, 257), // First block with an EIP-1559 transaction
];

// Hits a public endpoint: run with `cargo test -- --ignored`
#[tokio::test]
#[ignore]
async fn test_rpc_reader_against_mainnet() -> Result<()> {
    let reader = connect_http(ETH_RPC_URL.parse::<Url>()?, None);

    let head = reader.latest_block_number().await?;
    assert!(head > ETH_PARAMS[1].0);

    for (block_number, expected_txs) in ETH_PARAMS {
        println!("\nProcessing Ethereum block {}", block_number);

        let block = reader.fetch_block(block_number).await?;
        assert_eq!(block.number, block_number);
        assert_eq!(
            block.transactions.len(),
            expected_txs,
            "Block {}: Expected {} transactions, got {}",
            block_number,
            expected_txs,
            block.transactions.len()
        );

        let first = &block.transactions[0];
        let receipt = reader.fetch_receipt(first.hash).await?;
        assert_eq!(receipt.tx_hash, first.hash);
        assert!(receipt.gas_used <= first.gas_limit);

        println!("- {} transactions", block.transactions.len());
        println!("- {} logs in first receipt", receipt.logs.len());
    }

    Ok(())
}
