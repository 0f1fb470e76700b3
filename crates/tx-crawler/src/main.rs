//! Transaction Crawler
//!
//! Ingests Polygon transaction history into SQLite: single wallets with
//! a windowed full-history fetch, recursive counterparty crawls, raw
//! block archives, and wallet blacklist imports.

mod blacklist;
mod blocks;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use fraudscan_core::api::{PolygonscanClient, BLOCK_CEILING};
use fraudscan_core::config::Config;
use fraudscan_core::crawler::{self, WalletCrawler};
use fraudscan_core::db::{self, FraudWalletRepository, TransactionRepository};
use fraudscan_core::export;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
#[command(
    name = "tx-crawler",
    about = "Polygon transaction ingestion for fraud screening",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch a single wallet's full history into the database.
    Fetch {
        /// Wallet address (0x...).
        wallet: String,
        /// First block to fetch; defaults to the wallet's oldest transaction.
        #[arg(long)]
        start_block: Option<u64>,
        /// Last block to fetch; defaults to the wallet's newest transaction.
        #[arg(long)]
        end_block: Option<u64>,
    },
    /// Recursively ingest a wallet and its counterparties.
    Crawl {
        /// Root wallet address (0x...).
        wallet: String,
        /// Counterparty levels to expand beyond the root.
        #[arg(long, default_value_t = 1)]
        max_depth: u32,
        #[arg(long, default_value_t = 0)]
        start_block: u64,
        #[arg(long, default_value_t = BLOCK_CEILING)]
        end_block: u64,
    },
    /// Archive raw blocks into chunked JSON files.
    Blocks {
        #[arg(long)]
        start_block: u64,
        /// Last block to archive; defaults to the current chain head.
        #[arg(long)]
        end_block: Option<u64>,
        /// Blocks per output file.
        #[arg(long, default_value_t = 5)]
        chunk_size: u64,
    },
    /// Import a blacklist CSV into the fraud_wallets table.
    ImportBlacklist {
        /// CSV with Address, Identified_Date, Notes columns.
        csv_path: PathBuf,
    },
    /// Drop and recreate the transactions table.
    Reset {
        /// Also drop the fraud_wallets table.
        #[arg(long)]
        include_blacklist: bool,
    },
    /// Show tables and row counts.
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tx_crawler=info,fraudscan_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    let pool = db::create_pool(&config.database).await?;
    db::init_schema(&pool).await?;

    match cli.command {
        Command::Fetch {
            wallet,
            start_block,
            end_block,
        } => {
            let client = PolygonscanClient::from_config(&config.polygonscan)?;
            let repo = TransactionRepository::new(pool.clone());
            fetch_wallet(&client, &repo, &config, &wallet, start_block, end_block).await?;
        }
        Command::Crawl {
            wallet,
            max_depth,
            start_block,
            end_block,
        } => {
            let client = PolygonscanClient::from_config(&config.polygonscan)?;
            let repo = TransactionRepository::new(pool.clone());
            let crawler = WalletCrawler::new(client, repo)
                .with_max_depth(max_depth)
                .with_page_size(config.polygonscan.page_size)
                .with_block_range(start_block, end_block)
                .with_error_log(config.output.error_log.clone());

            let report = crawler.crawl(&wallet).await?;
            info!(
                wallets = report.wallets_visited,
                failed = report.failed_wallets,
                pages = report.pages_requested,
                fetched = report.records_fetched,
                invalid = report.invalid_records,
                inserted = report.rows_inserted,
                duplicates = report.duplicates_skipped,
                deepest_level = report.deepest_level,
                "crawl complete"
            );
        }
        Command::Blocks {
            start_block,
            end_block,
            chunk_size,
        } => {
            let client = PolygonscanClient::from_config(&config.polygonscan)?;
            let end_block = match end_block {
                Some(block) => block,
                None => client.latest_block().await?,
            };
            let report = blocks::fetch_block_range(
                &client,
                &config.output.chunk_dir,
                start_block,
                end_block,
                chunk_size,
            )
            .await?;
            info!(
                blocks = report.blocks_fetched,
                failed = report.blocks_failed,
                transactions = report.transactions_found,
                chunks = report.chunks_written,
                total_seconds = format!("{:.2}", report.total_seconds),
                avg_seconds_per_block = format!("{:.3}", report.avg_seconds_per_block),
                "block archive complete"
            );
        }
        Command::ImportBlacklist { csv_path } => {
            let repo = FraudWalletRepository::new(pool.clone());
            let report = blacklist::import_blacklist(&repo, &csv_path).await?;
            info!(
                parsed = report.rows_parsed,
                skipped = report.rows_skipped,
                inserted = report.rows_inserted,
                "blacklist import complete"
            );
        }
        Command::Reset { include_blacklist } => {
            db::reset(&pool, include_blacklist).await?;
            info!(include_blacklist, "database reset");
        }
        Command::Status => {
            let tables = db::table_names(&pool).await?;
            let transactions = TransactionRepository::new(pool.clone()).count().await?;
            let fraud_wallets = FraudWalletRepository::new(pool.clone()).count().await?;
            info!(
                ?tables,
                transactions, fraud_wallets, "database status"
            );
        }
    }

    Ok(())
}

/// Windowed single-wallet ingest. Block bounds default to the wallet's
/// own first and latest transaction blocks.
async fn fetch_wallet(
    client: &PolygonscanClient,
    repo: &TransactionRepository,
    config: &Config,
    wallet: &str,
    start_block: Option<u64>,
    end_block: Option<u64>,
) -> Result<()> {
    let start_block = match start_block {
        Some(block) => block,
        None => client
            .first_transaction_block(wallet)
            .await?
            .ok_or_else(|| anyhow!("no transactions found for {wallet}"))?,
    };
    let end_block = match end_block {
        Some(block) => block,
        None => client
            .latest_transaction_block(wallet)
            .await?
            .ok_or_else(|| anyhow!("no transactions found for {wallet}"))?,
    };

    info!(wallet, start_block, end_block, "fetching wallet history");

    match crawler::populate_wallet(client, repo, wallet, start_block, end_block).await {
        Ok(report) => {
            info!(
                fetched = report.records_fetched,
                invalid = report.invalid_records,
                inserted = report.rows_inserted,
                duplicates = report.duplicates_skipped,
                pages = report.pages_requested,
                windows = report.windows_advanced,
                elapsed_seconds = format!("{:.2}", report.elapsed.as_secs_f64()),
                "wallet fetch complete"
            );
            Ok(())
        }
        Err(e) => {
            if let Err(journal_err) =
                export::append_error_journal(&config.output.error_log, wallet, &e.to_string())
            {
                warn!(error = %journal_err, "could not write error journal");
            }
            Err(e.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blocks_end_block_flag_is_optional() {
        let cli = Cli::try_parse_from(["tx-crawler", "blocks", "--start-block", "45000000"])
            .unwrap();
        match cli.command {
            Command::Blocks {
                start_block,
                end_block,
                chunk_size,
            } => {
                assert_eq!(start_block, 45_000_000);
                // Resolved to the chain head at run time.
                assert_eq!(end_block, None);
                assert_eq!(chunk_size, 5);
            }
            _ => panic!("expected the blocks subcommand"),
        }
    }

    #[test]
    fn test_blocks_end_block_flag_still_binds() {
        let cli = Cli::try_parse_from([
            "tx-crawler",
            "blocks",
            "--start-block",
            "100",
            "--end-block",
            "200",
        ])
        .unwrap();
        match cli.command {
            Command::Blocks { end_block, .. } => assert_eq!(end_block, Some(200)),
            _ => panic!("expected the blocks subcommand"),
        }
    }
}
