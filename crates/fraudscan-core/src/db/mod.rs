//! SQLite storage for ingested transactions and the wallet blacklist.

pub mod fraud_wallets;
pub mod transactions;

pub use fraud_wallets::FraudWalletRepository;
pub use transactions::TransactionRepository;

use crate::config::DatabaseConfig;
use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::path::Path;

/// Open the database file, creating it (and its parent directory) on
/// first use.
pub async fn create_pool(config: &DatabaseConfig) -> Result<SqlitePool> {
    if let Some(parent) = Path::new(&config.path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let options = SqliteConnectOptions::new()
        .filename(&config.path)
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .connect_with(options)
        .await?;

    Ok(pool)
}

/// Single-connection in-memory pool for tests and throwaway runs. One
/// connection only, because every `:memory:` connection is its own
/// database.
pub async fn create_memory_pool() -> Result<SqlitePool> {
    let options = SqliteConnectOptions::new().in_memory(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;

    Ok(pool)
}

/// Create both tables and their indexes if they do not exist yet.
pub async fn init_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS transactions (
            hash TEXT PRIMARY KEY,
            nonce INTEGER NOT NULL,
            block_hash TEXT NOT NULL,
            block_number INTEGER NOT NULL,
            transaction_index INTEGER NOT NULL,
            from_address TEXT NOT NULL,
            to_address TEXT NOT NULL,
            value TEXT NOT NULL,
            gas INTEGER NOT NULL,
            gas_price INTEGER NOT NULL,
            is_error INTEGER NOT NULL,
            receipt_status INTEGER,
            input TEXT NOT NULL,
            contract_address TEXT NOT NULL,
            cumulative_gas_used INTEGER NOT NULL,
            gas_used INTEGER NOT NULL,
            confirmations INTEGER NOT NULL,
            timestamp INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_transactions_from ON transactions (from_address)",
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_transactions_to ON transactions (to_address)")
        .execute(pool)
        .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS fraud_wallets (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            address TEXT UNIQUE NOT NULL,
            identified_date TEXT NOT NULL,
            notes TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Drop and recreate the transactions table, and optionally the
/// blacklist as well.
pub async fn reset(pool: &SqlitePool, include_blacklist: bool) -> Result<()> {
    sqlx::query("DROP TABLE IF EXISTS transactions")
        .execute(pool)
        .await?;

    if include_blacklist {
        sqlx::query("DROP TABLE IF EXISTS fraud_wallets")
            .execute(pool)
            .await?;
    }

    init_schema(pool).await
}

/// Names of the user tables currently in the database.
pub async fn table_names(pool: &SqlitePool) -> Result<Vec<String>> {
    let rows = sqlx::query(
        "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(|row| row.get("name")).collect())
}
