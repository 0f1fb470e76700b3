//! Fraud Classifier
//!
//! Trains a RandomForest on rule-labeled Polygon transactions and
//! screens wallets end to end: crawl, train, predict, export.

mod dataset;
mod model;
mod report;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand, ValueEnum};
use fraudscan_core::api::PolygonscanClient;
use fraudscan_core::config::Config;
use fraudscan_core::crawler::WalletCrawler;
use fraudscan_core::db::{self, FraudWalletRepository, TransactionRepository};
use fraudscan_core::export::{self, ResultRow};
use fraudscan_core::features::{decode_label, feature_row};
use fraudscan_core::scoring::{FraudScore, ScoringRules};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
#[command(
    name = "fraud-classifier",
    about = "RandomForest fraud screening over Polygon transactions",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

/// Which scoring rule profile labels the data.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum Profile {
    Calibrated,
    Legacy,
}

impl Profile {
    fn rules(self) -> ScoringRules {
        match self {
            Profile::Calibrated => ScoringRules::CALIBRATED,
            Profile::Legacy => ScoringRules::LEGACY,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Train on a dataset and print the held-out evaluation.
    Train {
        /// CSV of raw transaction records; omit to train on the database.
        #[arg(long)]
        dataset: Option<PathBuf>,
        #[arg(long, value_enum, default_value = "calibrated")]
        profile: Profile,
        /// Also compute permutation feature importance.
        #[arg(long)]
        importance: bool,
    },
    /// Rule-based scan over the stored transactions.
    Scan {
        #[arg(long, value_enum, default_value = "calibrated")]
        profile: Profile,
    },
    /// Crawl a wallet and predict a label for every stored transaction.
    /// Resets the transactions table first so predictions cover exactly
    /// this crawl.
    Screen {
        /// Root wallet address (0x...).
        wallet: String,
        /// Training dataset CSV of raw transaction records.
        #[arg(long)]
        dataset: PathBuf,
        /// Counterparty levels to expand beyond the root.
        #[arg(long, default_value_t = 1)]
        max_depth: u32,
        #[arg(long, value_enum, default_value = "calibrated")]
        profile: Profile,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fraud_classifier=info,fraudscan_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    let pool = db::create_pool(&config.database).await?;
    db::init_schema(&pool).await?;

    match cli.command {
        Command::Train {
            dataset: dataset_path,
            profile,
            importance,
        } => {
            let fraud_wallets = FraudWalletRepository::new(pool.clone()).addresses().await?;
            let transactions = match dataset_path {
                Some(path) => dataset::load_transactions_csv(&path)?,
                None => TransactionRepository::new(pool.clone()).all().await?,
            };
            if transactions.is_empty() {
                bail!("no training transactions available; run tx-crawler or pass --dataset");
            }

            let labeled = dataset::build_dataset(&transactions, &profile.rules(), &fraud_wallets);
            info!(
                green = labeled.label_counts[0],
                orange = labeled.label_counts[1],
                red = labeled.label_counts[2],
                "dataset labeled"
            );

            let trained = model::train(&labeled, importance)?;
            println!("{}", report::format_evaluation(&trained.evaluation));
        }
        Command::Scan { profile } => {
            let transactions = TransactionRepository::new(pool.clone()).all().await?;
            if transactions.is_empty() {
                bail!("no stored transactions; run tx-crawler first");
            }
            let fraud_wallets = FraudWalletRepository::new(pool.clone()).addresses().await?;
            let rules = profile.rules();

            let mut counts = [0usize; 3];
            let mut flagged = 0usize;
            for tx in &transactions {
                let score = FraudScore::evaluate(tx, &rules, &fraud_wallets);
                counts[score.label.index()] += 1;
                if score.label.is_flagged() {
                    flagged += 1;
                    export::append_flagged(
                        &config.output.flagged_log,
                        &tx.hash,
                        &tx.from_address,
                        score.label,
                        Some(score.total),
                    )?;
                }
            }

            println!("{}", report::format_scan_summary(&counts, flagged));
        }
        Command::Screen {
            wallet,
            dataset: dataset_path,
            max_depth,
            profile,
        } => {
            let fraud_wallets = FraudWalletRepository::new(pool.clone()).addresses().await?;
            let rules = profile.rules();

            // Train before touching the network so a bad dataset fails fast.
            let training = dataset::load_transactions_csv(&dataset_path)?;
            if training.is_empty() {
                bail!("training dataset {} is empty", dataset_path.display());
            }
            let labeled = dataset::build_dataset(&training, &rules, &fraud_wallets);
            let trained = model::train(&labeled, false)?;
            println!("{}", report::format_evaluation(&trained.evaluation));

            db::reset(&pool, false).await?;

            let client = PolygonscanClient::from_config(&config.polygonscan)?;
            let crawler = WalletCrawler::new(client, TransactionRepository::new(pool.clone()))
                .with_max_depth(max_depth)
                .with_page_size(config.polygonscan.page_size)
                .with_error_log(config.output.error_log.clone());

            let crawl = crawler.crawl(&wallet).await?;
            info!(
                wallets = crawl.wallets_visited,
                inserted = crawl.rows_inserted,
                "crawl complete"
            );

            let stored = TransactionRepository::new(pool.clone()).all().await?;
            if stored.is_empty() {
                bail!("crawl stored no transactions for {wallet}");
            }

            let features: Vec<Vec<f64>> = stored
                .iter()
                .map(|tx| feature_row(tx, &fraud_wallets))
                .collect();
            let classes = trained.predict(&features)?;

            let mut rows = Vec::with_capacity(stored.len());
            let mut flagged = 0usize;
            for (tx, class) in stored.iter().zip(classes) {
                let label = decode_label(class);
                if label.is_flagged() {
                    flagged += 1;
                    export::append_flagged(
                        &config.output.flagged_log,
                        &tx.hash,
                        &tx.from_address,
                        label,
                        None,
                    )?;
                }
                rows.push(ResultRow {
                    hash: tx.hash.clone(),
                    from_address: tx.from_address.clone(),
                    predicted_label: label,
                });
            }

            let results_path = export::write_results_csv(&config.output.results_dir, &wallet, &rows)?;
            info!(
                results = %results_path.display(),
                predictions = rows.len(),
                flagged,
                "screening complete"
            );
        }
    }

    Ok(())
}
