//! Rule-based fraud scoring for Polygon transactions.
//!
//! A transaction's score is a weighted sum of independent threshold
//! checks, capped to [0, 1], then bucketed into a traffic-light label.
//! Two rule profiles ship with the toolkit: `CALIBRATED` carries
//! dataset-derived averages, `LEGACY` the first-generation constants.

use crate::types::Transaction;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Thresholds and weights for the fraud score. A weight of zero disables
/// its check entirely.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringRules {
    /// Gas used by a representative transaction.
    pub avg_gas_used: f64,
    pub gas_used_multiplier: f64,
    pub gas_used_weight: f64,

    /// Representative transferred value in wei.
    pub avg_value: f64,
    pub value_multiplier: f64,
    pub value_weight: f64,

    /// Transactions confirmed fewer times than this are recent enough
    /// to be suspicious.
    pub min_confirmations: u64,
    pub confirmations_weight: f64,

    pub max_nonce: u64,
    pub nonce_weight: f64,

    pub avg_gas_price: f64,
    pub gas_price_multiplier: f64,
    pub gas_price_weight: f64,

    pub avg_cumulative_gas: f64,
    pub cumulative_gas_multiplier: f64,
    pub cumulative_gas_weight: f64,

    /// Weight for failed execution (error flag set or zero receipt status).
    pub failure_weight: f64,

    /// Weight added when the sender is a blacklisted wallet.
    pub blacklisted_sender_weight: f64,
}

impl ScoringRules {
    /// Averages measured over an ingested Polygon sample.
    pub const CALIBRATED: Self = Self {
        avg_gas_used: 362103.233422042,
        gas_used_multiplier: 5.0,
        gas_used_weight: 0.4,
        avg_value: 1.88398547269491e19,
        value_multiplier: 100.0,
        value_weight: 0.4,
        min_confirmations: 10_000,
        confirmations_weight: 0.2,
        max_nonce: 100,
        nonce_weight: 0.1,
        avg_gas_price: 83268624715.0,
        gas_price_multiplier: 10.0,
        gas_price_weight: 0.3,
        avg_cumulative_gas: 9187077.1295445,
        cumulative_gas_multiplier: 10.0,
        cumulative_gas_weight: 0.2,
        failure_weight: 0.0,
        blacklisted_sender_weight: 0.5,
    };

    /// First-generation constants, anchored on the 21,000 base transfer
    /// cost. Kept for comparison runs against historical results.
    pub const LEGACY: Self = Self {
        avg_gas_used: 21_000.0,
        gas_used_multiplier: 5.0,
        gas_used_weight: 0.3,
        avg_value: 1.0e19,
        value_multiplier: 100.0,
        value_weight: 0.4,
        min_confirmations: 20_000,
        confirmations_weight: 0.1,
        max_nonce: 100,
        nonce_weight: 0.1,
        avg_gas_price: 0.0,
        gas_price_multiplier: 0.0,
        gas_price_weight: 0.0,
        avg_cumulative_gas: 0.0,
        cumulative_gas_multiplier: 0.0,
        cumulative_gas_weight: 0.0,
        failure_weight: 0.1,
        blacklisted_sender_weight: 0.5,
    };
}

impl Default for ScoringRules {
    fn default() -> Self {
        Self::CALIBRATED
    }
}

/// One triggered scoring check, with the points it contributed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RiskSignal {
    BlacklistedSender { address: String, points: f64 },
    HighGasUsed { gas_used: u64, points: f64 },
    FailedExecution { points: f64 },
    HighValue { value_wei: u128, points: f64 },
    LowConfirmations { confirmations: u64, points: f64 },
    HighNonce { nonce: u64, points: f64 },
    HighGasPrice { gas_price: u64, points: f64 },
    HighCumulativeGas { cumulative_gas_used: u64, points: f64 },
}

/// Scoring result for a single transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FraudScore {
    pub hash: String,
    /// Weighted sum of triggered checks, capped at 1.0.
    pub total: f64,
    pub signals: Vec<RiskSignal>,
    pub label: RiskLabel,
}

impl FraudScore {
    /// Run every enabled check against a transaction. `blacklist` holds
    /// lowercased known-fraudulent addresses.
    pub fn evaluate(tx: &Transaction, rules: &ScoringRules, blacklist: &HashSet<String>) -> Self {
        let mut signals = Vec::new();
        let mut total = 0.0;

        if rules.blacklisted_sender_weight > 0.0 && blacklist.contains(&tx.from_address) {
            signals.push(RiskSignal::BlacklistedSender {
                address: tx.from_address.clone(),
                points: rules.blacklisted_sender_weight,
            });
            total += rules.blacklisted_sender_weight;
        }

        if rules.gas_used_weight > 0.0
            && (tx.gas_used as f64) > rules.avg_gas_used * rules.gas_used_multiplier
        {
            signals.push(RiskSignal::HighGasUsed {
                gas_used: tx.gas_used,
                points: rules.gas_used_weight,
            });
            total += rules.gas_used_weight;
        }

        if rules.failure_weight > 0.0 && tx.failed() {
            signals.push(RiskSignal::FailedExecution {
                points: rules.failure_weight,
            });
            total += rules.failure_weight;
        }

        if rules.value_weight > 0.0 && (tx.value as f64) > rules.avg_value * rules.value_multiplier
        {
            signals.push(RiskSignal::HighValue {
                value_wei: tx.value,
                points: rules.value_weight,
            });
            total += rules.value_weight;
        }

        if rules.confirmations_weight > 0.0 && tx.confirmations < rules.min_confirmations {
            signals.push(RiskSignal::LowConfirmations {
                confirmations: tx.confirmations,
                points: rules.confirmations_weight,
            });
            total += rules.confirmations_weight;
        }

        if rules.nonce_weight > 0.0 && tx.nonce > rules.max_nonce {
            signals.push(RiskSignal::HighNonce {
                nonce: tx.nonce,
                points: rules.nonce_weight,
            });
            total += rules.nonce_weight;
        }

        if rules.gas_price_weight > 0.0
            && (tx.gas_price as f64) > rules.avg_gas_price * rules.gas_price_multiplier
        {
            signals.push(RiskSignal::HighGasPrice {
                gas_price: tx.gas_price,
                points: rules.gas_price_weight,
            });
            total += rules.gas_price_weight;
        }

        if rules.cumulative_gas_weight > 0.0
            && (tx.cumulative_gas_used as f64)
                > rules.avg_cumulative_gas * rules.cumulative_gas_multiplier
        {
            signals.push(RiskSignal::HighCumulativeGas {
                cumulative_gas_used: tx.cumulative_gas_used,
                points: rules.cumulative_gas_weight,
            });
            total += rules.cumulative_gas_weight;
        }

        let total = total.min(1.0);

        Self {
            hash: tx.hash.clone(),
            total,
            signals,
            label: RiskLabel::from_score(total),
        }
    }
}

/// Traffic-light risk bucket for a scored transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLabel {
    Green,
    Orange,
    Red,
}

impl RiskLabel {
    pub const ALL: [RiskLabel; 3] = [RiskLabel::Green, RiskLabel::Orange, RiskLabel::Red];

    /// Bucket a capped score. Boundary values land in the higher-risk
    /// bucket.
    pub fn from_score(score: f64) -> Self {
        if score < 0.5 {
            Self::Green
        } else if score < 0.7 {
            Self::Orange
        } else {
            Self::Red
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Green => "green",
            Self::Orange => "orange",
            Self::Red => "red",
        }
    }

    /// Class index used by the classifier (green=0, orange=1, red=2).
    pub fn index(self) -> usize {
        match self {
            Self::Green => 0,
            Self::Orange => 1,
            Self::Red => 2,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Orange and red transactions go to the flagged log.
    pub fn is_flagged(&self) -> bool {
        matches!(self, Self::Orange | Self::Red)
    }
}

impl fmt::Display for RiskLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
