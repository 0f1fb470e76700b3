//! Configuration management for the fraudscan toolkit.

use crate::{Error, Result};
use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub polygonscan: PolygonscanConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path of the SQLite database file, created on first use.
    pub path: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PolygonscanConfig {
    pub api_url: String,
    /// Only required for commands that hit the network.
    pub api_key: Option<String>,
    /// Pause after every request; the free tier allows 5 req/s.
    pub request_delay_ms: u64,
    /// Transactions per `txlist` page.
    pub page_size: u32,
}

impl PolygonscanConfig {
    pub fn require_api_key(&self) -> Result<&str> {
        self.api_key.as_deref().ok_or_else(|| Error::Config {
            message: "POLYGONSCAN_API_KEY environment variable not set".to_string(),
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Directory for per-wallet screening result CSVs.
    pub results_dir: String,
    /// Directory for raw block chunk files.
    pub chunk_dir: String,
    /// Append-only log of flagged transactions.
    pub flagged_log: String,
    /// JSON journal of per-wallet ingestion failures.
    pub error_log: String,
}

impl Config {
    /// Load configuration from environment variables (and `.env` if present).
    #[allow(clippy::result_large_err)]
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            database: DatabaseConfig {
                path: env::var("DATABASE_PATH").unwrap_or_else(|_| "fraudscan.db".to_string()),
                max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(5),
            },
            polygonscan: PolygonscanConfig {
                api_url: env::var("POLYGONSCAN_API_URL")
                    .unwrap_or_else(|_| "https://api.polygonscan.com/api".to_string()),
                api_key: env::var("POLYGONSCAN_API_KEY").ok(),
                request_delay_ms: env::var("REQUEST_DELAY_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(200),
                page_size: env::var("PAGE_SIZE")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(1000),
            },
            output: OutputConfig {
                results_dir: env::var("RESULTS_DIR").unwrap_or_else(|_| "results".to_string()),
                chunk_dir: env::var("CHUNK_DIR").unwrap_or_else(|_| "data".to_string()),
                flagged_log: env::var("FLAGGED_LOG_PATH")
                    .unwrap_or_else(|_| "flagged_transactions.log".to_string()),
                error_log: env::var("ERROR_LOG_PATH")
                    .unwrap_or_else(|_| "errors/errors.json".to_string()),
            },
        })
    }

    /// Load configuration for testing (with defaults).
    #[cfg(test)]
    pub fn test_config() -> Self {
        Self {
            database: DatabaseConfig {
                path: ":memory:".to_string(),
                max_connections: 1,
            },
            polygonscan: PolygonscanConfig {
                api_url: "https://api.polygonscan.com/api".to_string(),
                api_key: Some("test-key".to_string()),
                request_delay_ms: 0,
                page_size: 1000,
            },
            output: OutputConfig {
                results_dir: "results".to_string(),
                chunk_dir: "data".to_string(),
                flagged_log: "flagged_transactions.log".to_string(),
                error_log: "errors/errors.json".to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_creation() {
        let config = Config::test_config();
        assert_eq!(config.database.max_connections, 1);
        assert_eq!(config.polygonscan.page_size, 1000);
        assert_eq!(config.output.results_dir, "results");
    }

    #[test]
    fn test_require_api_key() {
        let mut config = Config::test_config();
        assert_eq!(config.polygonscan.require_api_key().unwrap(), "test-key");

        config.polygonscan.api_key = None;
        assert!(config.polygonscan.require_api_key().is_err());
    }
}
