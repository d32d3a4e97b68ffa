//! # Invoice Sequencer
//!
//! Allocates `{PREFIX}-{YYYYMMDD}-{NNNN}` invoice numbers, unique per store.
//!
//! ## Allocation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  next(store_id)                                                         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  INSERT INTO invoice_counters (store, date, last_seq) VALUES (.., 1)    │
//! │  ON CONFLICT (store, date) DO UPDATE SET last_seq = last_seq + 1        │
//! │  RETURNING last_seq                  ← one statement, one write lock    │
//! │       │                                                                 │
//! │       ├── Busy / pool exhausted → sleep(backoff × attempt), retry ≤ 5   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  format_invoice_number(prefix, business_date, seq)                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Two cashiers committing at the same instant each get their own
//! `last_seq`: SQLite serializes the upserts, there is no read-then-write.

use std::time::Duration;

use chrono::{DateTime, FixedOffset, Utc};
use sqlx::SqlitePool;
use tracing::{debug, warn};

use crate::error::DbResult;
use meridian_core::invoice::{business_date, format_invoice_number};

/// Attempts before giving up on a contended counter.
pub const MAX_SEQUENCE_ATTEMPTS: u32 = 5;

const BASE_BACKOFF: Duration = Duration::from_millis(20);

/// Per-store, per-day invoice number allocator.
#[derive(Debug, Clone)]
pub struct InvoiceSequencer {
    pool: SqlitePool,
    prefix: String,
    offset: FixedOffset,
    max_attempts: u32,
    backoff: Duration,
}

impl InvoiceSequencer {
    /// Creates a sequencer whose business date follows `offset`.
    pub fn new(pool: SqlitePool, prefix: impl Into<String>, offset: FixedOffset) -> Self {
        InvoiceSequencer {
            pool,
            prefix: prefix.into(),
            offset,
            max_attempts: MAX_SEQUENCE_ATTEMPTS,
            backoff: BASE_BACKOFF,
        }
    }

    /// Overrides the retry budget.
    pub fn with_retry(mut self, max_attempts: u32, backoff: Duration) -> Self {
        self.max_attempts = max_attempts.max(1);
        self.backoff = backoff;
        self
    }

    /// Allocates the next invoice number for the store, dated today.
    pub async fn next(&self, store_id: &str) -> DbResult<String> {
        self.next_at(store_id, Utc::now()).await
    }

    /// Allocates the next invoice number as of `now`.
    ///
    /// ## Errors
    /// The last database error once the retry budget is spent, or the first
    /// non-retryable one.
    pub async fn next_at(&self, store_id: &str, now: DateTime<Utc>) -> DbResult<String> {
        let date = business_date(now, self.offset);
        let date_key = date.format("%Y-%m-%d").to_string();

        let mut attempt = 1;
        loop {
            match self.allocate(store_id, &date_key, now).await {
                Ok(seq) => {
                    let invoice = format_invoice_number(&self.prefix, date, seq);
                    debug!(store_id = %store_id, invoice = %invoice, attempt, "Invoice allocated");
                    return Ok(invoice);
                }
                Err(e) if e.is_retryable() && attempt < self.max_attempts => {
                    warn!(
                        store_id = %store_id,
                        attempt,
                        error = %e,
                        "Invoice counter contended, retrying"
                    );
                    tokio::time::sleep(self.backoff * attempt).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn allocate(&self, store_id: &str, date_key: &str, now: DateTime<Utc>) -> DbResult<i64> {
        let seq: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO invoice_counters (store_id, business_date, last_seq, updated_at)
            VALUES (?1, ?2, 1, ?3)
            ON CONFLICT (store_id, business_date) DO UPDATE SET
                last_seq = last_seq + 1,
                updated_at = excluded.updated_at
            RETURNING last_seq
            "#,
        )
        .bind(store_id)
        .bind(date_key)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(seq)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use chrono::TimeZone;
    use std::collections::HashSet;

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    #[tokio::test]
    async fn test_sequence_per_store_per_day() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let seq = db.invoices("INV", utc());
        let day1 = Utc.with_ymd_and_hms(2024, 3, 6, 9, 0, 0).unwrap();
        let day2 = Utc.with_ymd_and_hms(2024, 3, 7, 9, 0, 0).unwrap();

        assert_eq!(seq.next_at("store-1", day1).await.unwrap(), "INV-20240306-0001");
        assert_eq!(seq.next_at("store-1", day1).await.unwrap(), "INV-20240306-0002");
        assert_eq!(seq.next_at("store-2", day1).await.unwrap(), "INV-20240306-0001");
        assert_eq!(seq.next_at("store-1", day2).await.unwrap(), "INV-20240307-0001");
    }

    #[tokio::test]
    async fn test_business_date_uses_store_offset() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let seq = db.invoices("POS", FixedOffset::east_opt(7 * 3600).unwrap());
        let late_utc = Utc.with_ymd_and_hms(2024, 3, 6, 20, 0, 0).unwrap();

        assert_eq!(
            seq.next_at("store-1", late_utc).await.unwrap(),
            "POS-20240307-0001"
        );
    }

    #[tokio::test]
    async fn test_concurrent_allocation_is_unique() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(DbConfig::new(dir.path().join("seq.db")).max_connections(8))
            .await
            .unwrap();
        let seq = db.invoices("INV", utc());

        let handles: Vec<_> = (0..100)
            .map(|_| {
                let seq = seq.clone();
                tokio::spawn(async move { seq.next("store-1").await })
            })
            .collect();

        let mut invoices = HashSet::new();
        for result in futures_util::future::join_all(handles).await {
            let invoice = result.unwrap().unwrap();
            assert!(invoices.insert(invoice), "duplicate invoice number");
        }
        assert_eq!(invoices.len(), 100);
    }
}
