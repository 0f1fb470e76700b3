//! Repository for stored transactions.

use crate::types::Transaction;
use crate::{Error, Result};
use chrono::DateTime;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

pub struct TransactionRepository {
    pool: SqlitePool,
}

impl TransactionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert transactions, skipping any hash already stored. Returns the
    /// number of rows actually inserted; the difference from the input
    /// length is the duplicate count.
    pub async fn insert_new(&self, transactions: &[Transaction]) -> Result<u64> {
        let mut inserted = 0;

        for tx in transactions {
            let result = sqlx::query(
                r#"
                INSERT INTO transactions (
                    hash, nonce, block_hash, block_number, transaction_index,
                    from_address, to_address, value, gas, gas_price,
                    is_error, receipt_status, input, contract_address,
                    cumulative_gas_used, gas_used, confirmations, timestamp
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)
                ON CONFLICT(hash) DO NOTHING
                "#,
            )
            .bind(&tx.hash)
            .bind(tx.nonce as i64)
            .bind(&tx.block_hash)
            .bind(tx.block_number as i64)
            .bind(tx.transaction_index as i64)
            .bind(&tx.from_address)
            .bind(&tx.to_address)
            .bind(tx.value.to_string())
            .bind(tx.gas as i64)
            .bind(tx.gas_price as i64)
            .bind(tx.is_error)
            .bind(tx.receipt_status)
            .bind(&tx.input)
            .bind(&tx.contract_address)
            .bind(tx.cumulative_gas_used as i64)
            .bind(tx.gas_used as i64)
            .bind(tx.confirmations as i64)
            .bind(tx.timestamp.timestamp())
            .execute(&self.pool)
            .await?;

            inserted += result.rows_affected();
        }

        Ok(inserted)
    }

    /// Every stored transaction in chain order.
    pub async fn all(&self) -> Result<Vec<Transaction>> {
        let rows =
            sqlx::query("SELECT * FROM transactions ORDER BY block_number, transaction_index")
                .fetch_all(&self.pool)
                .await?;

        rows.into_iter().map(row_to_transaction).collect()
    }

    /// Transactions where the wallet is sender or recipient.
    pub async fn for_wallet(&self, address: &str) -> Result<Vec<Transaction>> {
        let address = address.to_lowercase();
        let rows = sqlx::query(
            r#"
            SELECT * FROM transactions
            WHERE from_address = ?1 OR to_address = ?2
            ORDER BY block_number, transaction_index
            "#,
        )
        .bind(&address)
        .bind(&address)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(row_to_transaction).collect()
    }

    pub async fn count(&self) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM transactions")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("n"))
    }

    pub async fn contains(&self, hash: &str) -> Result<bool> {
        let row = sqlx::query("SELECT 1 FROM transactions WHERE hash = ?1")
            .bind(hash)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }
}

fn row_to_transaction(row: SqliteRow) -> Result<Transaction> {
    let value_text: String = row.get("value");
    let value = value_text.parse::<u128>().map_err(|_| Error::InvalidField {
        field: "value",
        value: value_text.clone(),
    })?;

    Ok(Transaction {
        hash: row.get("hash"),
        nonce: row.get::<i64, _>("nonce") as u64,
        block_hash: row.get("block_hash"),
        block_number: row.get::<i64, _>("block_number") as u64,
        transaction_index: row.get::<i64, _>("transaction_index") as u32,
        from_address: row.get("from_address"),
        to_address: row.get("to_address"),
        value,
        gas: row.get::<i64, _>("gas") as u64,
        gas_price: row.get::<i64, _>("gas_price") as u64,
        is_error: row.get("is_error"),
        receipt_status: row.get("receipt_status"),
        input: row.get("input"),
        contract_address: row.get("contract_address"),
        cumulative_gas_used: row.get::<i64, _>("cumulative_gas_used") as u64,
        gas_used: row.get::<i64, _>("gas_used") as u64,
        confirmations: row.get::<i64, _>("confirmations") as u64,
        timestamp: DateTime::from_timestamp(row.get::<i64, _>("timestamp"), 0)
            .unwrap_or(DateTime::UNIX_EPOCH),
    })
}
