//! Dataset loading and matrix assembly for the classifier.
//!
//! Training data comes either from a CSV export of raw transaction
//! records (Polygonscan column names) or straight from the database.
//! Labels are derived by running the rule-based scorer over every row,
//! so the forest learns to reproduce and generalize the rules.

use anyhow::Result;
use fraudscan_core::features::{encode_label, feature_row};
use fraudscan_core::scoring::{FraudScore, ScoringRules};
use fraudscan_core::types::{Transaction, TxRecord};
use std::collections::HashSet;
use std::io::Read;
use std::path::Path;
use tracing::{info, warn};

/// Feature matrix plus rule-derived labels, ready for training.
#[derive(Debug, Clone)]
pub struct LabeledDataset {
    pub features: Vec<Vec<f64>>,
    pub labels: Vec<u32>,
    /// Rows per class in green/orange/red order.
    pub label_counts: [usize; 3],
}

impl LabeledDataset {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn distinct_labels(&self) -> usize {
        self.label_counts.iter().filter(|&&count| count > 0).count()
    }
}

/// Read raw transaction records from a CSV export. Unparseable rows are
/// skipped with a warning so one bad export line never sinks a training
/// run.
pub fn read_transactions_csv<R: Read>(reader: R) -> Result<Vec<Transaction>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut transactions = Vec::new();
    let mut skipped = 0usize;

    for row in csv_reader.deserialize::<TxRecord>() {
        match row {
            Ok(record) => match Transaction::try_from(record) {
                Ok(tx) => transactions.push(tx),
                Err(e) => {
                    warn!(error = %e, "skipping unparseable dataset row");
                    skipped += 1;
                }
            },
            Err(e) => {
                warn!(error = %e, "skipping malformed dataset row");
                skipped += 1;
            }
        }
    }

    if skipped > 0 {
        info!(kept = transactions.len(), skipped, "dataset loaded with skips");
    }

    Ok(transactions)
}

pub fn load_transactions_csv(path: &Path) -> Result<Vec<Transaction>> {
    let file = std::fs::File::open(path)?;
    read_transactions_csv(file)
}

/// Score and label every transaction, producing the training matrix.
pub fn build_dataset(
    transactions: &[Transaction],
    rules: &ScoringRules,
    fraud_wallets: &HashSet<String>,
) -> LabeledDataset {
    let mut features = Vec::with_capacity(transactions.len());
    let mut labels = Vec::with_capacity(transactions.len());
    let mut label_counts = [0usize; 3];

    for tx in transactions {
        let score = FraudScore::evaluate(tx, rules, fraud_wallets);
        let class = encode_label(score.label);
        label_counts[class as usize] += 1;

        features.push(feature_row(tx, fraud_wallets));
        labels.push(class);
    }

    LabeledDataset {
        features,
        labels,
        label_counts,
    }
}
