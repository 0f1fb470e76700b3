//! Terminal report formatting for evaluations and scans.

use crate::model::Evaluation;
use fraudscan_core::features::FEATURE_NAMES;
use fraudscan_core::scoring::RiskLabel;

/// Render the held-out evaluation as a terminal-friendly block.
pub fn format_evaluation(evaluation: &Evaluation) -> String {
    let mut report = String::new();

    report.push_str("=== Classifier Evaluation ===\n");
    report.push_str(&format!("Training rows: {}\n", evaluation.train_rows));
    report.push_str(&format!("Test rows:     {}\n", evaluation.test_rows));
    report.push_str(&format!("Accuracy:      {:.4}\n", evaluation.accuracy));

    report.push_str("\nConfusion matrix (rows = actual, columns = predicted)\n");
    report.push_str(&format!("{:>10}", ""));
    for label in RiskLabel::ALL {
        report.push_str(&format!("{:>8}", label.as_str()));
    }
    report.push('\n');
    for (label, row) in RiskLabel::ALL.iter().zip(&evaluation.confusion) {
        report.push_str(&format!("{:>10}", label.as_str()));
        for count in row {
            report.push_str(&format!("{count:>8}"));
        }
        report.push('\n');
    }

    if let Some(importance) = &evaluation.importance {
        report.push_str("\nPermutation importance (accuracy drop when shuffled)\n");
        for (name, drop) in FEATURE_NAMES.iter().zip(importance) {
            report.push_str(&format!("{name:<22} {drop:+.4}\n"));
        }
    }

    report
}

/// Render a rule-based scan summary.
pub fn format_scan_summary(counts: &[usize; 3], flagged: usize) -> String {
    let total: usize = counts.iter().sum();
    let mut report = String::new();

    report.push_str("=== Scan Summary ===\n");
    report.push_str(&format!("Transactions scored: {total}\n"));
    for (label, count) in RiskLabel::ALL.iter().zip(counts) {
        report.push_str(&format!("{:>8}: {count}\n", label.as_str()));
    }
    report.push_str(&format!("Flagged for review: {flagged}\n"));

    report
}
