//! File outputs: screening result CSVs, the flagged-transaction log,
//! and the ingestion error journal.

use crate::scoring::RiskLabel;
use crate::Result;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// One row of a per-wallet screening result file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultRow {
    pub hash: String,
    pub from_address: String,
    pub predicted_label: RiskLabel,
}

/// Write screening results to `<results_dir>/<wallet>.csv`, creating the
/// directory on first use. Returns the file path.
pub fn write_results_csv(results_dir: &str, wallet: &str, rows: &[ResultRow]) -> Result<PathBuf> {
    fs::create_dir_all(results_dir)?;
    let path = Path::new(results_dir).join(format!("{wallet}.csv"));

    let mut writer = csv::Writer::from_path(&path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;

    Ok(path)
}

/// Append one flagged transaction to the shared log. The score is only
/// present for rule-based scans; classifier predictions have none.
pub fn append_flagged(
    log_path: &str,
    hash: &str,
    from_address: &str,
    label: RiskLabel,
    score: Option<f64>,
) -> Result<()> {
    ensure_parent_dir(log_path)?;

    let mut file = OpenOptions::new().create(true).append(true).open(log_path)?;
    let timestamp = Utc::now().format("%Y-%m-%d %H:%M:%S");

    match score {
        Some(score) => writeln!(
            file,
            "{timestamp} - Flagged transaction {hash} from {from_address} rated {label} (score {score:.2})"
        )?,
        None => writeln!(
            file,
            "{timestamp} - Flagged transaction {hash} from {from_address} rated {label}"
        )?,
    }

    Ok(())
}

/// One entry of the ingestion error journal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEntry {
    pub wallet_address: String,
    pub error_message: String,
    pub timestamp: String,
}

/// Append an entry to the JSON error journal, creating the file on first
/// use. A corrupt journal is replaced rather than propagated, so one bad
/// write never blocks later ingestion.
pub fn append_error_journal(
    journal_path: &str,
    wallet_address: &str,
    error_message: &str,
) -> Result<()> {
    ensure_parent_dir(journal_path)?;

    let mut entries: Vec<ErrorEntry> = match fs::read_to_string(journal_path) {
        Ok(json) => serde_json::from_str(&json).unwrap_or_default(),
        Err(_) => Vec::new(),
    };

    entries.push(ErrorEntry {
        wallet_address: wallet_address.to_string(),
        error_message: error_message.to_string(),
        timestamp: Utc::now().format("%Y-%m-%d %H:%M:%S").to_string(),
    });

    fs::write(journal_path, serde_json::to_string_pretty(&entries)?)?;
    Ok(())
}

fn ensure_parent_dir(path: &str) -> Result<()> {
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
