//! Depth-limited breadth-first ingestion over the wallet graph.
//!
//! Starting from a root wallet, the crawler fetches full transaction
//! pages, stores them, and expands into every counterparty it has not
//! seen before, level by level. A visited set keyed by lowercased
//! address guarantees no wallet is fetched twice no matter how often it
//! reappears.

use crate::api::polygonscan::{
    page_outcome, FetchStats, PageOutcome, PolygonscanClient, BLOCK_CEILING,
};
use crate::db::TransactionRepository;
use crate::export;
use crate::types::{Transaction, TxRecord};
use crate::Result;
use async_trait::async_trait;
use std::collections::HashSet;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Paged source of wallet transactions. The crawler only sees this
/// interface, which keeps the traversal testable without a network.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TransactionSource {
    async fn transactions_page(
        &self,
        address: &str,
        start_block: u64,
        end_block: u64,
        page: u32,
        offset: u32,
    ) -> Result<Vec<TxRecord>>;
}

#[async_trait]
impl TransactionSource for PolygonscanClient {
    async fn transactions_page(
        &self,
        address: &str,
        start_block: u64,
        end_block: u64,
        page: u32,
        offset: u32,
    ) -> Result<Vec<TxRecord>> {
        self.account_transactions(address, start_block, end_block, page, offset)
            .await
    }
}

/// Summary of one crawl run.
#[derive(Debug, Clone, Default)]
pub struct CrawlReport {
    pub wallets_visited: usize,
    pub failed_wallets: usize,
    pub pages_requested: usize,
    pub records_fetched: usize,
    pub invalid_records: usize,
    pub rows_inserted: u64,
    pub duplicates_skipped: u64,
    pub deepest_level: u32,
}

pub struct WalletCrawler<S> {
    source: S,
    repo: TransactionRepository,
    max_depth: u32,
    page_size: u32,
    start_block: u64,
    end_block: u64,
    error_log: Option<String>,
}

impl<S: TransactionSource> WalletCrawler<S> {
    pub fn new(source: S, repo: TransactionRepository) -> Self {
        Self {
            source,
            repo,
            max_depth: 1,
            page_size: 1000,
            start_block: 0,
            end_block: BLOCK_CEILING,
            error_log: None,
        }
    }

    /// How many counterparty levels to expand beyond the root wallet.
    /// Zero ingests only the root.
    pub fn with_max_depth(mut self, max_depth: u32) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_block_range(mut self, start_block: u64, end_block: u64) -> Self {
        self.start_block = start_block;
        self.end_block = end_block;
        self
    }

    /// Journal per-wallet fetch failures to this JSON file.
    pub fn with_error_log(mut self, path: String) -> Self {
        self.error_log = Some(path);
        self
    }

    /// Run the crawl. A wallet whose fetch fails is journaled and
    /// skipped; the traversal keeps going.
    pub async fn crawl(&self, root: &str) -> Result<CrawlReport> {
        let mut report = CrawlReport::default();
        let mut visited: HashSet<String> = HashSet::new();

        let root = root.to_lowercase();
        visited.insert(root.clone());
        let mut frontier = vec![root];
        let mut depth = 0u32;

        while !frontier.is_empty() && depth <= self.max_depth {
            info!(depth, wallets = frontier.len(), "crawling level");
            let mut next_level = Vec::new();

            for address in frontier.drain(..) {
                let records = match self.fetch_wallet(&address, &mut report).await {
                    Ok(records) => records,
                    Err(e) => {
                        warn!(wallet = %address, error = %e, "wallet fetch failed, skipping");
                        report.failed_wallets += 1;
                        if let Some(path) = &self.error_log {
                            if let Err(journal_err) =
                                export::append_error_journal(path, &address, &e.to_string())
                            {
                                warn!(error = %journal_err, "could not write error journal");
                            }
                        }
                        continue;
                    }
                };

                report.wallets_visited += 1;
                report.records_fetched += records.len();

                let mut transactions = Vec::with_capacity(records.len());
                for record in records {
                    match Transaction::try_from(record) {
                        Ok(tx) => transactions.push(tx),
                        Err(e) => {
                            debug!(error = %e, "dropping malformed record");
                            report.invalid_records += 1;
                        }
                    }
                }

                let inserted = self.repo.insert_new(&transactions).await?;
                report.rows_inserted += inserted;
                report.duplicates_skipped += transactions.len() as u64 - inserted;

                // Counterparties only become frontier wallets while a
                // deeper level remains.
                if depth < self.max_depth {
                    for tx in &transactions {
                        for counterparty in [&tx.from_address, &tx.to_address] {
                            if counterparty.is_empty() {
                                continue;
                            }
                            if visited.insert(counterparty.clone()) {
                                next_level.push(counterparty.clone());
                            }
                        }
                    }
                }
            }

            report.deepest_level = depth;
            frontier = next_level;
            depth += 1;
        }

        info!(
            wallets = report.wallets_visited,
            failed = report.failed_wallets,
            inserted = report.rows_inserted,
            duplicates = report.duplicates_skipped,
            "crawl finished"
        );
        Ok(report)
    }

    /// Paginate one wallet until a short page ends its history or the
    /// result-window ceiling cuts it off. The ceiling truncates deep
    /// histories rather than erroring.
    async fn fetch_wallet(
        &self,
        address: &str,
        report: &mut CrawlReport,
    ) -> Result<Vec<TxRecord>> {
        let mut all = Vec::new();
        let mut page = 1u32;

        loop {
            let records = self
                .source
                .transactions_page(address, self.start_block, self.end_block, page, self.page_size)
                .await?;
            report.pages_requested += 1;

            let fetched = records.len();
            all.extend(records);

            match page_outcome(fetched, page, self.page_size) {
                PageOutcome::Continue => page += 1,
                PageOutcome::RangeExhausted => break,
                PageOutcome::WindowFull => {
                    warn!(
                        wallet = %address,
                        fetched = all.len(),
                        "result window exhausted, deeper history skipped"
                    );
                    break;
                }
            }
        }

        Ok(all)
    }
}

/// Summary of a single-wallet windowed ingest.
#[derive(Debug, Clone)]
pub struct PopulateReport {
    pub records_fetched: usize,
    pub invalid_records: usize,
    pub rows_inserted: u64,
    pub duplicates_skipped: u64,
    pub pages_requested: usize,
    pub windows_advanced: usize,
    pub elapsed: Duration,
}

/// Ingest one wallet's complete history between two blocks, advancing
/// the query window past the 10,000-result ceiling as needed.
pub async fn populate_wallet(
    client: &PolygonscanClient,
    repo: &TransactionRepository,
    wallet: &str,
    start_block: u64,
    end_block: u64,
) -> Result<PopulateReport> {
    let started = Instant::now();
    let (records, stats): (Vec<TxRecord>, FetchStats) = client
        .fetch_all_transactions(wallet, start_block, end_block)
        .await?;

    let fetched = records.len();
    let mut transactions = Vec::with_capacity(fetched);
    let mut invalid = 0usize;
    for record in records {
        match Transaction::try_from(record) {
            Ok(tx) => transactions.push(tx),
            Err(e) => {
                debug!(error = %e, "dropping malformed record");
                invalid += 1;
            }
        }
    }

    let inserted = repo.insert_new(&transactions).await?;

    Ok(PopulateReport {
        records_fetched: fetched,
        invalid_records: invalid,
        rows_inserted: inserted,
        duplicates_skipped: transactions.len() as u64 - inserted,
        pages_requested: stats.pages_requested,
        windows_advanced: stats.windows_advanced,
        elapsed: started.elapsed(),
    })
}
