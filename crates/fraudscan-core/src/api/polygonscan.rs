//! Polygonscan client for Polygon transaction history and raw blocks.
//!
//! Covers the two endpoint families the toolkit needs: the `account`
//! module for per-wallet transaction lists and the `proxy` module for
//! JSON-RPC style block queries. Every request is throttled to stay
//! inside the free-tier rate limit.

use crate::config::PolygonscanConfig;
use crate::types::TxRecord;
use crate::{Error, Result};
use serde::Deserialize;
use std::time::Duration;
use tokio::time::sleep;
use tracing::debug;

/// Polygonscan caps any single `txlist` query window at 10,000 results
/// (`page * offset`); past that the window start block must advance.
pub const RESULT_WINDOW_LIMIT: u32 = 10_000;

/// End-block bound meaning "up to the chain head".
pub const BLOCK_CEILING: u64 = 99_999_999;

/// Where pagination stands after one `txlist` page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PageOutcome {
    /// A full page with room left in the window; keep paging.
    Continue,
    /// A short page; the queried range has nothing more.
    RangeExhausted,
    /// A full page with no room left; the next request would overrun
    /// the result window.
    WindowFull,
}

/// Decide the next step from the page just fetched. A short page is the
/// last one the range has, and past `RESULT_WINDOW_LIMIT` results
/// Polygonscan rejects the query instead of serving it.
pub(crate) fn page_outcome(fetched: usize, page: u32, page_size: u32) -> PageOutcome {
    if fetched < page_size as usize {
        PageOutcome::RangeExhausted
    } else if page.saturating_add(1).saturating_mul(page_size) > RESULT_WINDOW_LIMIT {
        PageOutcome::WindowFull
    } else {
        PageOutcome::Continue
    }
}

/// Statistics from a windowed full-history fetch.
#[derive(Debug, Clone, Default)]
pub struct FetchStats {
    pub records: usize,
    pub pages_requested: usize,
    pub windows_advanced: usize,
}

pub struct PolygonscanClient {
    api_url: String,
    api_key: String,
    page_size: u32,
    request_delay: Duration,
    http_client: reqwest::Client,
}

impl PolygonscanClient {
    pub fn new(api_url: String, api_key: String) -> Self {
        Self {
            api_url,
            api_key,
            page_size: 1000,
            request_delay: Duration::from_millis(200),
            http_client: reqwest::Client::new(),
        }
    }

    /// Build a client from the Polygonscan config section. Fails when no
    /// API key is configured.
    pub fn from_config(config: &PolygonscanConfig) -> Result<Self> {
        let api_key = config.require_api_key()?.to_string();
        Ok(Self {
            api_url: config.api_url.clone(),
            api_key,
            page_size: config.page_size,
            request_delay: Duration::from_millis(config.request_delay_ms),
            http_client: reqwest::Client::new(),
        })
    }

    /// Fetch one page of `module=account&action=txlist`, oldest first.
    ///
    /// "No transactions found" is an empty page, not an error.
    pub async fn account_transactions(
        &self,
        address: &str,
        start_block: u64,
        end_block: u64,
        page: u32,
        offset: u32,
    ) -> Result<Vec<TxRecord>> {
        self.txlist(address, start_block, end_block, page, offset, "asc")
            .await
    }

    /// Block of the wallet's oldest transaction, if it has any.
    pub async fn first_transaction_block(&self, address: &str) -> Result<Option<u64>> {
        self.boundary_block(address, "asc").await
    }

    /// Block of the wallet's newest transaction, if it has any.
    pub async fn latest_transaction_block(&self, address: &str) -> Result<Option<u64>> {
        self.boundary_block(address, "desc").await
    }

    /// Fetch a wallet's complete history between two blocks, advancing the
    /// query window past the 10,000-result ceiling as often as needed.
    pub async fn fetch_all_transactions(
        &self,
        address: &str,
        start_block: u64,
        end_block: u64,
    ) -> Result<(Vec<TxRecord>, FetchStats)> {
        let mut stats = FetchStats::default();
        let mut all = Vec::new();
        let mut window_start = start_block;

        'windows: loop {
            let mut page = 1u32;
            let mut highest_block = window_start;

            loop {
                let records = self
                    .account_transactions(address, window_start, end_block, page, self.page_size)
                    .await?;
                stats.pages_requested += 1;

                for record in &records {
                    if let Ok(block) = record.block_number.parse::<u64>() {
                        highest_block = highest_block.max(block);
                    }
                }
                stats.records += records.len();
                let fetched = records.len();
                all.extend(records);

                match page_outcome(fetched, page, self.page_size) {
                    PageOutcome::Continue => page += 1,
                    // A short or empty page carries the last of the
                    // remaining range; the history is complete.
                    PageOutcome::RangeExhausted => break 'windows,
                    PageOutcome::WindowFull => {
                        if highest_block >= end_block {
                            break 'windows;
                        }
                        debug!(
                            address,
                            window_start, highest_block, "result window full, advancing start block"
                        );
                        window_start = highest_block + 1;
                        stats.windows_advanced += 1;
                        continue 'windows;
                    }
                }
            }
        }

        Ok((all, stats))
    }

    /// Current chain head via `proxy.eth_blockNumber`.
    pub async fn latest_block(&self) -> Result<u64> {
        let params = [
            ("module", "proxy"),
            ("action", "eth_blockNumber"),
            ("apikey", self.api_key.as_str()),
        ];
        let proxy: ProxyResponse<String> = self.proxy_call(&params).await?;

        let hex = proxy.result.ok_or_else(|| Error::Api {
            message: proxy
                .error
                .map(|e| e.message)
                .unwrap_or_else(|| "empty eth_blockNumber result".to_string()),
            status: None,
        })?;
        parse_hex_u64(&hex)
    }

    /// One full block, transactions included, via `proxy.eth_getBlockByNumber`.
    pub async fn block_by_number(&self, block: u64) -> Result<BlockRecord> {
        let tag = format!("0x{block:x}");
        let params = [
            ("module", "proxy"),
            ("action", "eth_getBlockByNumber"),
            ("tag", tag.as_str()),
            ("boolean", "true"),
            ("apikey", self.api_key.as_str()),
        ];
        let proxy: ProxyResponse<BlockRecord> = self.proxy_call(&params).await?;

        proxy.result.ok_or_else(|| Error::Api {
            message: proxy
                .error
                .map(|e| e.message)
                .unwrap_or_else(|| format!("block {block} not found")),
            status: None,
        })
    }

    async fn txlist(
        &self,
        address: &str,
        start_block: u64,
        end_block: u64,
        page: u32,
        offset: u32,
        sort: &str,
    ) -> Result<Vec<TxRecord>> {
        let start = start_block.to_string();
        let end = end_block.to_string();
        let page_param = page.to_string();
        let offset_param = offset.to_string();
        let params = [
            ("module", "account"),
            ("action", "txlist"),
            ("address", address),
            ("startblock", start.as_str()),
            ("endblock", end.as_str()),
            ("sort", sort),
            ("page", page_param.as_str()),
            ("offset", offset_param.as_str()),
            ("apikey", self.api_key.as_str()),
        ];

        let response = self.http_client.get(&self.api_url).query(&params).send().await?;
        self.throttle().await;

        if !response.status().is_success() {
            return Err(Error::Api {
                message: format!("txlist request failed: {}", response.status()),
                status: Some(response.status().as_u16()),
            });
        }

        let envelope: TxListEnvelope = response.json().await?;
        decode_txlist(envelope)
    }

    /// Ordered by `sort`, `page=1&offset=1` returns exactly the boundary
    /// transaction of the wallet's history.
    async fn boundary_block(&self, address: &str, sort: &str) -> Result<Option<u64>> {
        let records = self.txlist(address, 0, BLOCK_CEILING, 1, 1, sort).await?;
        Ok(records
            .first()
            .and_then(|record| record.block_number.parse().ok()))
    }

    async fn proxy_call<T: serde::de::DeserializeOwned>(
        &self,
        params: &[(&str, &str)],
    ) -> Result<ProxyResponse<T>> {
        let response = self.http_client.get(&self.api_url).query(params).send().await?;
        self.throttle().await;

        if !response.status().is_success() {
            return Err(Error::Api {
                message: format!("proxy request failed: {}", response.status()),
                status: Some(response.status().as_u16()),
            });
        }

        Ok(response.json().await?)
    }

    async fn throttle(&self) {
        sleep(self.request_delay).await;
    }
}

/// The `txlist` response envelope. `result` is an array of records on
/// success and a bare explanation string on errors such as rate limiting.
#[derive(Debug, Deserialize)]
struct TxListEnvelope {
    status: String,
    message: String,
    result: TxListResult,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TxListResult {
    Records(Vec<TxRecord>),
    Message(String),
}

fn decode_txlist(envelope: TxListEnvelope) -> Result<Vec<TxRecord>> {
    match envelope.result {
        TxListResult::Records(records) => Ok(records),
        TxListResult::Message(detail) => {
            if envelope.message.contains("No transactions found") {
                Ok(Vec::new())
            } else {
                Err(Error::Api {
                    message: format!(
                        "txlist returned status {}: {} ({detail})",
                        envelope.status, envelope.message
                    ),
                    status: None,
                })
            }
        }
    }
}

/// JSON-RPC style envelope used by the `proxy` module.
#[derive(Debug, Deserialize)]
struct ProxyResponse<T> {
    result: Option<T>,
    error: Option<ProxyError>,
}

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct ProxyError {
    code: i64,
    message: String,
}

/// A raw block as `eth_getBlockByNumber` returns it. Quantities stay in
/// their hex form; the transaction objects stay untyped because they are
/// archived verbatim.
#[derive(Debug, Clone, Deserialize, serde::Serialize)]
pub struct BlockRecord {
    pub number: String,
    pub hash: String,
    pub timestamp: String,
    #[serde(default)]
    pub transactions: Vec<serde_json::Value>,
}

fn parse_hex_u64(hex: &str) -> Result<u64> {
    u64::from_str_radix(hex.trim_start_matches("0x"), 16).map_err(|e| Error::Api {
        message: format!("failed to parse hex quantity {hex:?}: {e}"),
        status: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_outcome_short_page_ends_the_range() {
        assert_eq!(page_outcome(999, 10, 1000), PageOutcome::RangeExhausted);
        assert_eq!(page_outcome(0, 1, 1000), PageOutcome::RangeExhausted);
    }

    #[test]
    fn test_page_outcome_window_boundary() {
        // Page 10 at offset 1000 is the last request the window allows.
        assert_eq!(page_outcome(1000, 9, 1000), PageOutcome::Continue);
        assert_eq!(page_outcome(1000, 10, 1000), PageOutcome::WindowFull);
        // An offset that does not divide the window evenly stops before
        // a request the API would reject.
        assert_eq!(page_outcome(3000, 3, 3000), PageOutcome::WindowFull);
    }

    #[test]
    fn test_parse_hex_u64() {
        assert_eq!(parse_hex_u64("0x0").unwrap(), 0);
        assert_eq!(parse_hex_u64("0x2b1a9d1").unwrap(), 45_197_777);
        assert!(parse_hex_u64("0xzz").is_err());
    }

    #[test]
    fn test_decode_txlist_records() {
        let json = r#"{
            "status": "1",
            "message": "OK",
            "result": [{
                "blockNumber": "40000000",
                "timeStamp": "1690000000",
                "hash": "0x1",
                "nonce": "0",
                "blockHash": "0x2",
                "transactionIndex": "0",
                "from": "0xaa",
                "to": "0xbb",
                "value": "0",
                "gas": "21000",
                "gasPrice": "1",
                "isError": "0",
                "txreceipt_status": "1",
                "input": "0x",
                "contractAddress": "",
                "cumulativeGasUsed": "21000",
                "gasUsed": "21000",
                "confirmations": "5"
            }]
        }"#;

        let envelope: TxListEnvelope = serde_json::from_str(json).unwrap();
        let records = decode_txlist(envelope).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].hash, "0x1");
    }

    #[test]
    fn test_decode_txlist_empty_wallet() {
        let json = r#"{
            "status": "0",
            "message": "No transactions found",
            "result": []
        }"#;

        let envelope: TxListEnvelope = serde_json::from_str(json).unwrap();
        assert!(decode_txlist(envelope).unwrap().is_empty());
    }

    #[test]
    fn test_decode_txlist_error_string() {
        let json = r#"{
            "status": "0",
            "message": "NOTOK",
            "result": "Max rate limit reached"
        }"#;

        let envelope: TxListEnvelope = serde_json::from_str(json).unwrap();
        let err = decode_txlist(envelope).unwrap_err();
        assert!(err.to_string().contains("Max rate limit reached"));
    }

    #[test]
    fn test_proxy_block_number_envelope() {
        let json = r#"{"jsonrpc": "2.0", "id": 83, "result": "0x2b1a9d1"}"#;
        let proxy: ProxyResponse<String> = serde_json::from_str(json).unwrap();
        assert_eq!(proxy.result.as_deref(), Some("0x2b1a9d1"));
        assert!(proxy.error.is_none());
    }

    #[test]
    fn test_block_record_deserialization() {
        let json = r#"{
            "number": "0x2625a00",
            "hash": "0xfeed",
            "timestamp": "0x64b5f000",
            "transactions": [{"hash": "0x1"}, {"hash": "0x2"}]
        }"#;

        let block: BlockRecord = serde_json::from_str(json).unwrap();
        assert_eq!(block.transactions.len(), 2);
        assert_eq!(block.number, "0x2625a00");
    }
}
