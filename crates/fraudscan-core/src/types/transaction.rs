//! Transaction records: the Polygonscan wire shape and the typed domain form.

use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A transaction exactly as Polygonscan's `txlist` action returns it:
/// every field is a decimal string. Also the row format of raw dataset
/// CSV exports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TxRecord {
    #[serde(rename = "blockNumber")]
    pub block_number: String,
    #[serde(rename = "timeStamp")]
    pub time_stamp: String,
    pub hash: String,
    pub nonce: String,
    #[serde(rename = "blockHash", default)]
    pub block_hash: String,
    #[serde(rename = "transactionIndex", default)]
    pub transaction_index: String,
    pub from: String,
    #[serde(default)]
    pub to: String,
    pub value: String,
    pub gas: String,
    #[serde(rename = "gasPrice")]
    pub gas_price: String,
    #[serde(rename = "isError", default)]
    pub is_error: String,
    /// Empty for transactions that predate receipt statuses.
    #[serde(rename = "txreceipt_status", default)]
    pub txreceipt_status: String,
    #[serde(default)]
    pub input: String,
    #[serde(rename = "contractAddress", default)]
    pub contract_address: String,
    #[serde(rename = "cumulativeGasUsed")]
    pub cumulative_gas_used: String,
    #[serde(rename = "gasUsed")]
    pub gas_used: String,
    pub confirmations: String,
}

/// A fully typed transaction ready for storage and scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub hash: String,
    pub nonce: u64,
    pub block_hash: String,
    pub block_number: u64,
    pub transaction_index: u32,
    /// Sender address, lowercased.
    pub from_address: String,
    /// Recipient address, lowercased. Empty for contract creation.
    pub to_address: String,
    /// Transferred amount in wei. Values on Polygon routinely overflow u64.
    pub value: u128,
    pub gas: u64,
    pub gas_price: u64,
    pub is_error: bool,
    /// Post-Byzantium receipt status; `None` when the chain did not record one.
    pub receipt_status: Option<bool>,
    pub input: String,
    pub contract_address: String,
    pub cumulative_gas_used: u64,
    pub gas_used: u64,
    pub confirmations: u64,
    pub timestamp: DateTime<Utc>,
}

impl Transaction {
    /// True when execution failed: the error flag is set or the receipt
    /// status is zero.
    pub fn failed(&self) -> bool {
        self.is_error || self.receipt_status == Some(false)
    }
}

impl TryFrom<TxRecord> for Transaction {
    type Error = Error;

    fn try_from(record: TxRecord) -> Result<Self> {
        let timestamp_secs = parse_u64("timeStamp", &record.time_stamp)?;
        let timestamp =
            DateTime::from_timestamp(timestamp_secs as i64, 0).ok_or_else(|| Error::InvalidField {
                field: "timeStamp",
                value: record.time_stamp.clone(),
            })?;

        Ok(Self {
            hash: record.hash,
            nonce: parse_u64("nonce", &record.nonce)?,
            block_hash: record.block_hash,
            block_number: parse_u64("blockNumber", &record.block_number)?,
            transaction_index: parse_u64("transactionIndex", &record.transaction_index)? as u32,
            from_address: record.from.to_lowercase(),
            to_address: record.to.to_lowercase(),
            value: parse_u128("value", &record.value)?,
            gas: parse_u64("gas", &record.gas)?,
            gas_price: parse_u64("gasPrice", &record.gas_price)?,
            is_error: record.is_error == "1",
            receipt_status: match record.txreceipt_status.as_str() {
                "" => None,
                "0" => Some(false),
                _ => Some(true),
            },
            input: record.input,
            contract_address: record.contract_address.to_lowercase(),
            cumulative_gas_used: parse_u64("cumulativeGasUsed", &record.cumulative_gas_used)?,
            gas_used: parse_u64("gasUsed", &record.gas_used)?,
            confirmations: parse_u64("confirmations", &record.confirmations)?,
            timestamp,
        })
    }
}

/// Missing numeric fields default to zero, matching what the explorer
/// omits for old or internal records.
fn parse_u64(field: &'static str, value: &str) -> Result<u64> {
    if value.is_empty() {
        return Ok(0);
    }
    value.parse().map_err(|_| Error::InvalidField {
        field,
        value: value.to_string(),
    })
}

fn parse_u128(field: &'static str, value: &str) -> Result<u128> {
    if value.is_empty() {
        return Ok(0);
    }
    value.parse().map_err(|_| Error::InvalidField {
        field,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> TxRecord {
        TxRecord {
            block_number: "45123456".to_string(),
            time_stamp: "1700000000".to_string(),
            hash: "0xabc123".to_string(),
            nonce: "7".to_string(),
            block_hash: "0xblockhash".to_string(),
            transaction_index: "12".to_string(),
            from: "0xAAAAaaaaAAAAaaaaAAAAaaaaAAAAaaaaAAAAaaaa".to_string(),
            to: "0xBBBBbbbbBBBBbbbbBBBBbbbbBBBBbbbbBBBBbbbb".to_string(),
            value: "340282366920938463463374607431768211455".to_string(),
            gas: "21000".to_string(),
            gas_price: "30000000000".to_string(),
            is_error: "0".to_string(),
            txreceipt_status: "1".to_string(),
            input: "0x".to_string(),
            contract_address: String::new(),
            cumulative_gas_used: "500000".to_string(),
            gas_used: "21000".to_string(),
            confirmations: "15000".to_string(),
        }
    }

    #[test]
    fn test_record_conversion() {
        let tx = Transaction::try_from(sample_record()).unwrap();

        assert_eq!(tx.hash, "0xabc123");
        assert_eq!(tx.block_number, 45123456);
        assert_eq!(tx.nonce, 7);
        assert_eq!(tx.from_address, "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa");
        assert_eq!(tx.to_address, "0xbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb");
        assert_eq!(tx.value, u128::MAX);
        assert_eq!(tx.receipt_status, Some(true));
        assert!(!tx.is_error);
        assert_eq!(tx.timestamp.timestamp(), 1_700_000_000);
    }

    #[test]
    fn test_missing_receipt_status_is_none() {
        let mut record = sample_record();
        record.txreceipt_status = String::new();

        let tx = Transaction::try_from(record).unwrap();
        assert_eq!(tx.receipt_status, None);
        assert!(!tx.failed());
    }

    #[test]
    fn test_failed_execution() {
        let mut record = sample_record();
        record.is_error = "1".to_string();
        assert!(Transaction::try_from(record).unwrap().failed());

        let mut record = sample_record();
        record.txreceipt_status = "0".to_string();
        assert!(Transaction::try_from(record).unwrap().failed());
    }

    #[test]
    fn test_invalid_numeric_field_is_rejected() {
        let mut record = sample_record();
        record.nonce = "not-a-number".to_string();

        let err = Transaction::try_from(record).unwrap_err();
        match err {
            Error::InvalidField { field, .. } => assert_eq!(field, "nonce"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_empty_numeric_field_defaults_to_zero() {
        let mut record = sample_record();
        record.transaction_index = String::new();

        let tx = Transaction::try_from(record).unwrap();
        assert_eq!(tx.transaction_index, 0);
    }

    #[test]
    fn test_wire_deserialization_uses_explorer_names() {
        let json = r#"{
            "blockNumber": "40000000",
            "timeStamp": "1690000000",
            "hash": "0xdeadbeef",
            "nonce": "101",
            "blockHash": "0xfeed",
            "transactionIndex": "3",
            "from": "0x1111111111111111111111111111111111111111",
            "to": "0x2222222222222222222222222222222222222222",
            "value": "18839854726949100000",
            "gas": "250000",
            "gasPrice": "95000000000",
            "isError": "0",
            "txreceipt_status": "1",
            "input": "0x",
            "contractAddress": "",
            "cumulativeGasUsed": "1200000",
            "gasUsed": "180000",
            "confirmations": "9000"
        }"#;

        let record: TxRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.gas_used, "180000");
        assert_eq!(record.time_stamp, "1690000000");

        let tx = Transaction::try_from(record).unwrap();
        assert_eq!(tx.value, 18_839_854_726_949_100_000u128);
        assert_eq!(tx.confirmations, 9000);
    }
}
