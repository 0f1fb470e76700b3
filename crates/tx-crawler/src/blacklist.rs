//! Blacklist CSV import.

use anyhow::Result;
use fraudscan_core::db::FraudWalletRepository;
use fraudscan_core::types::BlacklistEntry;
use std::io::Read;
use std::path::Path;
use tracing::{info, warn};

#[derive(Debug, Clone, Default)]
pub struct ImportReport {
    pub rows_parsed: usize,
    pub rows_skipped: usize,
    pub rows_inserted: u64,
}

/// Parse a blacklist CSV with `Address`, `Identified_Date`, `Notes`
/// headers. Malformed rows and rows without an address are skipped with
/// a warning rather than aborting the import.
pub fn parse_blacklist_csv<R: Read>(reader: R) -> Result<(Vec<BlacklistEntry>, usize)> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut entries = Vec::new();
    let mut skipped = 0usize;

    for row in csv_reader.deserialize::<BlacklistEntry>() {
        match row {
            Ok(entry) if entry.address.is_empty() => {
                warn!("skipping blacklist row with empty address");
                skipped += 1;
            }
            Ok(entry) => entries.push(entry),
            Err(e) => {
                warn!(error = %e, "skipping malformed blacklist row");
                skipped += 1;
            }
        }
    }

    Ok((entries, skipped))
}

/// Import a blacklist CSV file into the fraud_wallets table. Known
/// addresses are left untouched.
pub async fn import_blacklist(repo: &FraudWalletRepository, path: &Path) -> Result<ImportReport> {
    let file = std::fs::File::open(path)?;
    let (entries, skipped) = parse_blacklist_csv(file)?;
    let inserted = repo.insert_new(&entries).await?;

    info!(
        parsed = entries.len(),
        skipped, inserted, "blacklist imported"
    );

    Ok(ImportReport {
        rows_parsed: entries.len(),
        rows_skipped: skipped,
        rows_inserted: inserted,
    })
}
