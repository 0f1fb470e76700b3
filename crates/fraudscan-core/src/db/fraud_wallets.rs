//! Repository for the wallet blacklist.

use crate::types::BlacklistEntry;
use crate::Result;
use chrono::NaiveDate;
use sqlx::{Row, SqlitePool};
use std::collections::HashSet;

pub struct FraudWalletRepository {
    pool: SqlitePool,
}

impl FraudWalletRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert blacklist entries, ignoring addresses already present.
    /// Returns the number of rows actually inserted.
    pub async fn insert_new(&self, entries: &[BlacklistEntry]) -> Result<u64> {
        let mut inserted = 0;

        for entry in entries {
            let result = sqlx::query(
                r#"
                INSERT INTO fraud_wallets (address, identified_date, notes)
                VALUES (?1, ?2, ?3)
                ON CONFLICT(address) DO NOTHING
                "#,
            )
            .bind(entry.normalized_address())
            .bind(entry.identified_date)
            .bind(&entry.notes)
            .execute(&self.pool)
            .await?;

            inserted += result.rows_affected();
        }

        Ok(inserted)
    }

    /// Every blacklisted address as a lowercased lookup set, the shape
    /// the scorer and feature extractor expect.
    pub async fn addresses(&self) -> Result<HashSet<String>> {
        let rows = sqlx::query("SELECT address FROM fraud_wallets")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| row.get::<String, _>("address").to_lowercase())
            .collect())
    }

    /// All entries in import order.
    pub async fn all(&self) -> Result<Vec<BlacklistEntry>> {
        let rows =
            sqlx::query("SELECT address, identified_date, notes FROM fraud_wallets ORDER BY id")
                .fetch_all(&self.pool)
                .await?;

        Ok(rows
            .into_iter()
            .map(|row| BlacklistEntry {
                address: row.get("address"),
                identified_date: row.get::<NaiveDate, _>("identified_date"),
                notes: row.get("notes"),
            })
            .collect())
    }

    pub async fn count(&self) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM fraud_wallets")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("n"))
    }

    pub async fn contains(&self, address: &str) -> Result<bool> {
        let row = sqlx::query("SELECT 1 FROM fraud_wallets WHERE address = ?1")
            .bind(address.to_lowercase())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_memory_pool, init_schema};

    fn entry(address: &str, notes: Option<&str>) -> BlacklistEntry {
        BlacklistEntry {
            address: address.to_string(),
            identified_date: NaiveDate::from_ymd_opt(2024, 5, 13).unwrap(),
            notes: notes.map(str::to_string),
        }
    }

    async fn repo() -> FraudWalletRepository {
        let pool = create_memory_pool().await.unwrap();
        init_schema(&pool).await.unwrap();
        FraudWalletRepository::new(pool)
    }

    #[tokio::test]
    async fn test_insert_ignores_known_addresses() {
        let repo = repo().await;

        let inserted = repo
            .insert_new(&[entry("0xBAD1", Some("mixer")), entry("0xbad2", None)])
            .await
            .unwrap();
        assert_eq!(inserted, 2);

        // Same wallet again, different casing.
        let inserted = repo.insert_new(&[entry("0xbad1", None)]).await.unwrap();
        assert_eq!(inserted, 0);
        assert_eq!(repo.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_addresses_are_lowercased() {
        let repo = repo().await;
        repo.insert_new(&[entry("0xAbCd", None)]).await.unwrap();

        let addresses = repo.addresses().await.unwrap();
        assert!(addresses.contains("0xabcd"));
        assert!(repo.contains("0xABCD").await.unwrap());
    }

    #[tokio::test]
    async fn test_round_trip_preserves_entry_fields() {
        let repo = repo().await;
        repo.insert_new(&[entry("0xbad1", Some("rug pull"))])
            .await
            .unwrap();

        let stored = repo.all().await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].address, "0xbad1");
        assert_eq!(stored[0].notes.as_deref(), Some("rug pull"));
        assert_eq!(
            stored[0].identified_date,
            NaiveDate::from_ymd_opt(2024, 5, 13).unwrap()
        );
    }
}
