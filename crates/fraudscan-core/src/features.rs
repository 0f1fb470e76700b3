//! Feature extraction for the transaction classifier.
//!
//! Every model in the toolkit consumes rows in `FEATURE_NAMES` order, so
//! training and prediction stay aligned by construction.

use crate::scoring::RiskLabel;
use crate::types::Transaction;
use std::collections::HashSet;

/// Column order of the classifier's feature matrix.
pub const FEATURE_NAMES: [&str; 9] = [
    "gas_used",
    "value",
    "confirmations",
    "nonce",
    "receipt_status",
    "gas_price",
    "cumulative_gas_used",
    "is_from_fraud_wallet",
    "is_to_fraud_wallet",
];

/// Build one feature row in `FEATURE_NAMES` order. `fraud_wallets` holds
/// lowercased blacklisted addresses.
pub fn feature_row(tx: &Transaction, fraud_wallets: &HashSet<String>) -> Vec<f64> {
    vec![
        tx.gas_used as f64,
        tx.value as f64,
        tx.confirmations as f64,
        tx.nonce as f64,
        // Missing receipt statuses count as successful, like old
        // pre-receipt transactions.
        match tx.receipt_status {
            Some(false) => 0.0,
            _ => 1.0,
        },
        tx.gas_price as f64,
        tx.cumulative_gas_used as f64,
        if fraud_wallets.contains(&tx.from_address) {
            1.0
        } else {
            0.0
        },
        if fraud_wallets.contains(&tx.to_address) {
            1.0
        } else {
            0.0
        },
    ]
}

/// Encode a label as its classifier class (green=0, orange=1, red=2).
pub fn encode_label(label: RiskLabel) -> u32 {
    label.index() as u32
}

/// Decode a predicted class. Out-of-range classes map to red so an
/// unexpected model output fails toward review, not away from it.
pub fn decode_label(class: u32) -> RiskLabel {
    RiskLabel::from_index(class as usize).unwrap_or(RiskLabel::Red)
}
