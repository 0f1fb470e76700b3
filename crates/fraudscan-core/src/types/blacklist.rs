//! Blacklisted wallet entries.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A known-fraudulent wallet, as imported from a blacklist CSV.
///
/// The serde names match the CSV header used by the shared blacklist
/// exports (`Address`, `Identified_Date`, `Notes`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlacklistEntry {
    #[serde(rename = "Address")]
    pub address: String,
    #[serde(rename = "Identified_Date")]
    pub identified_date: NaiveDate,
    #[serde(rename = "Notes")]
    pub notes: Option<String>,
}

impl BlacklistEntry {
    /// Addresses are compared lowercased everywhere.
    pub fn normalized_address(&self) -> String {
        self.address.to_lowercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_normalization() {
        let entry = BlacklistEntry {
            address: "0xDEADbeefDEADbeefDEADbeefDEADbeefDEADbeef".to_string(),
            identified_date: NaiveDate::from_ymd_opt(2024, 5, 13).unwrap(),
            notes: Some("phishing cluster".to_string()),
        };

        assert_eq!(
            entry.normalized_address(),
            "0xdeadbeefdeadbeefdeadbeefdeadbeefdeadbeef"
        );
    }
}
