//! Integration tests covering the full ingest-score-store flow.

use chrono::DateTime;
use fraudscan_core::crawler::{TransactionSource, WalletCrawler};
use fraudscan_core::db::{self, FraudWalletRepository, TransactionRepository};
use fraudscan_core::features::feature_row;
use fraudscan_core::scoring::{FraudScore, RiskLabel, ScoringRules};
use fraudscan_core::types::{BlacklistEntry, Transaction, TxRecord};
use fraudscan_core::Result;
use std::collections::{HashMap, HashSet};

fn record(hash: &str, from: &str, to: &str, block: u64) -> TxRecord {
    TxRecord {
        block_number: block.to_string(),
        time_stamp: "1700000000".to_string(),
        hash: hash.to_string(),
        nonce: "12".to_string(),
        block_hash: "0xblock".to_string(),
        transaction_index: "0".to_string(),
        from: from.to_string(),
        to: to.to_string(),
        value: "1000000000000000000".to_string(),
        gas: "21000".to_string(),
        gas_price: "30000000000".to_string(),
        is_error: "0".to_string(),
        txreceipt_status: "1".to_string(),
        input: "0x".to_string(),
        contract_address: String::new(),
        cumulative_gas_used: "21000".to_string(),
        gas_used: "21000".to_string(),
        confirmations: "250000".to_string(),
    }
}

/// Serves one page per wallet, empty afterwards.
struct MapSource {
    wallets: HashMap<String, Vec<TxRecord>>,
}

#[async_trait::async_trait]
impl TransactionSource for MapSource {
    async fn transactions_page(
        &self,
        address: &str,
        _start_block: u64,
        _end_block: u64,
        page: u32,
        _offset: u32,
    ) -> Result<Vec<TxRecord>> {
        if page > 1 {
            return Ok(Vec::new());
        }
        Ok(self.wallets.get(address).cloned().unwrap_or_default())
    }
}

#[tokio::test]
async fn test_crawl_then_scan_flags_blacklisted_counterparty() {
    let pool = db::create_memory_pool().await.unwrap();
    db::init_schema(&pool).await.unwrap();

    // Wallet graph: the root pays 0xmule, and 0xmule forwards funds on.
    let mut wallets = HashMap::new();
    wallets.insert(
        "0xroot".to_string(),
        vec![record("0x1", "0xroot", "0xmule", 45_000_000)],
    );
    wallets.insert(
        "0xmule".to_string(),
        vec![
            record("0x1", "0xroot", "0xmule", 45_000_000),
            record("0x2", "0xmule", "0xsink", 45_000_010),
        ],
    );

    let crawler = WalletCrawler::new(
        MapSource { wallets },
        TransactionRepository::new(pool.clone()),
    )
    .with_max_depth(1);

    // Depth 1 reaches the mule; 0xsink is seen but never expanded.
    let report = crawler.crawl("0xROOT").await.unwrap();
    assert_eq!(report.wallets_visited, 2);
    assert_eq!(report.rows_inserted, 2);
    assert_eq!(report.duplicates_skipped, 1);

    // Blacklist the mule, then score what the crawl stored.
    let fraud_repo = FraudWalletRepository::new(pool.clone());
    fraud_repo
        .insert_new(&[BlacklistEntry {
            address: "0xMULE".to_string(),
            identified_date: chrono::NaiveDate::from_ymd_opt(2024, 5, 13).unwrap(),
            notes: None,
        }])
        .await
        .unwrap();
    let blacklist = fraud_repo.addresses().await.unwrap();

    let stored = TransactionRepository::new(pool.clone()).all().await.unwrap();
    assert_eq!(stored.len(), 2);

    let labels: HashMap<String, RiskLabel> = stored
        .iter()
        .map(|tx| {
            let score = FraudScore::evaluate(tx, &ScoringRules::CALIBRATED, &blacklist);
            (tx.hash.clone(), score.label)
        })
        .collect();

    // Only the transaction sent by the blacklisted wallet is flagged.
    assert_eq!(labels["0x1"], RiskLabel::Green);
    assert_eq!(labels["0x2"], RiskLabel::Orange);
}

#[tokio::test]
async fn test_reingest_is_idempotent() {
    let pool = db::create_memory_pool().await.unwrap();
    db::init_schema(&pool).await.unwrap();
    let repo = TransactionRepository::new(pool.clone());

    let batch: Vec<Transaction> = (0..5)
        .map(|i| {
            Transaction::try_from(record(
                &format!("0x{i}"),
                "0xaaa",
                "0xbbb",
                45_000_000 + i,
            ))
            .unwrap()
        })
        .collect();

    assert_eq!(repo.insert_new(&batch).await.unwrap(), 5);
    assert_eq!(repo.insert_new(&batch).await.unwrap(), 0);
    assert_eq!(repo.count().await.unwrap(), 5);

    let stored = repo.all().await.unwrap();
    assert_eq!(stored.len(), 5);
    assert!(stored
        .windows(2)
        .all(|pair| pair[0].block_number <= pair[1].block_number));
}

#[tokio::test]
async fn test_stored_transactions_feed_the_feature_matrix() {
    let pool = db::create_memory_pool().await.unwrap();
    db::init_schema(&pool).await.unwrap();
    let repo = TransactionRepository::new(pool.clone());

    let tx = Transaction {
        hash: "0xbig".to_string(),
        nonce: 321,
        block_hash: "0xblock".to_string(),
        block_number: 45_000_000,
        transaction_index: 2,
        from_address: "0xwhale".to_string(),
        to_address: "0xexchange".to_string(),
        // Larger than u64::MAX, must survive storage untouched.
        value: 22_300_000_000_000_000_000_000,
        gas: 80_000,
        gas_price: 95_000_000_000,
        is_error: false,
        receipt_status: Some(true),
        input: "0x".to_string(),
        contract_address: String::new(),
        cumulative_gas_used: 3_000_000,
        gas_used: 72_000,
        confirmations: 80,
        timestamp: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
    };
    repo.insert_new(std::slice::from_ref(&tx)).await.unwrap();

    let stored = repo.all().await.unwrap();
    assert_eq!(stored[0].value, 22_300_000_000_000_000_000_000);

    let row = feature_row(&stored[0], &HashSet::new());
    assert_eq!(row[1], 22_300_000_000_000_000_000_000u128 as f64);
    assert_eq!(row[3], 321.0);
}

#[tokio::test]
async fn test_wallet_history_view() {
    let pool = db::create_memory_pool().await.unwrap();
    db::init_schema(&pool).await.unwrap();
    let repo = TransactionRepository::new(pool.clone());

    let batch: Vec<Transaction> = vec![
        Transaction::try_from(record("0x1", "0xaaa", "0xbbb", 1)).unwrap(),
        Transaction::try_from(record("0x2", "0xbbb", "0xccc", 2)).unwrap(),
        Transaction::try_from(record("0x3", "0xccc", "0xaaa", 3)).unwrap(),
    ];
    repo.insert_new(&batch).await.unwrap();

    let history = repo.for_wallet("0xAAA").await.unwrap();
    let hashes: Vec<&str> = history.iter().map(|tx| tx.hash.as_str()).collect();
    assert_eq!(hashes, vec!["0x1", "0x3"]);
}
