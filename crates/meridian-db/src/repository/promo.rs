//! # Promo Repository
//!
//! Promo definitions, the per-customer usage count, and the usage log.
//!
//! ## Storage Mapping
//! ```text
//! ┌──────────────────────────┬──────────────────────────────────────────────┐
//! │ promos column            │ Promo field                                  │
//! ├──────────────────────────┼──────────────────────────────────────────────┤
//! │ type, value,             │ kind: PromoKind (closed enum)                │
//! │ max_discount, buy_/get_  │   value = bps (PERCENTAGE) | minor (FIXED)   │
//! │ applicable_* (JSON)      │ Vec<String>                                  │
//! │ days_of_week (JSON)      │ Vec<DayOfWeek>                               │
//! │ time_window "HH:MM-HH:MM"│ Option<TimeWindow>                           │
//! └──────────────────────────┴──────────────────────────────────────────────┘
//! ```
//!
//! Usage is recorded only after a transaction is persisted; the log row and
//! `usage_count = usage_count + 1` share one SQL transaction.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use meridian_core::promo::{DayOfWeek, Promo, PromoKind, TimeWindow};
use meridian_core::{Money, PromoUsageLog};

const PROMO_COLUMNS: &str = "id, store_id, code, name, description, type, value, max_discount, \
     min_purchase, buy_quantity, get_quantity, get_product_id, applicable_categories, \
     applicable_products, start_at, end_at, days_of_week, time_window, usage_limit, \
     per_customer_limit, usage_count, is_active, created_at, updated_at";

/// Flat `promos` row before it is turned into a [`Promo`].
#[derive(Debug, FromRow)]
struct PromoRow {
    id: String,
    store_id: String,
    code: String,
    name: String,
    description: Option<String>,
    #[sqlx(rename = "type")]
    promo_type: String,
    value: i64,
    max_discount: Option<Money>,
    min_purchase: Money,
    buy_quantity: Option<i64>,
    get_quantity: Option<i64>,
    get_product_id: Option<String>,
    applicable_categories: String,
    applicable_products: String,
    start_at: DateTime<Utc>,
    end_at: DateTime<Utc>,
    days_of_week: String,
    time_window: Option<String>,
    usage_limit: Option<i64>,
    per_customer_limit: Option<i64>,
    usage_count: i64,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<PromoRow> for Promo {
    type Error = DbError;

    fn try_from(row: PromoRow) -> Result<Self, Self::Error> {
        let corrupt = |reason: &dyn std::fmt::Display| DbError::corrupt("Promo", &row.id, reason);

        let kind = PromoKind::from_parts(
            &row.promo_type,
            row.value,
            row.max_discount,
            row.buy_quantity,
            row.get_quantity,
            row.get_product_id.clone(),
        )
        .map_err(|e| corrupt(&e))?;
        let applicable_categories: Vec<String> =
            serde_json::from_str(&row.applicable_categories).map_err(|e| corrupt(&e))?;
        let applicable_products: Vec<String> =
            serde_json::from_str(&row.applicable_products).map_err(|e| corrupt(&e))?;
        let days_of_week: Vec<DayOfWeek> =
            serde_json::from_str(&row.days_of_week).map_err(|e| corrupt(&e))?;
        let time_window = row
            .time_window
            .as_deref()
            .filter(|w| !w.trim().is_empty())
            .map(str::parse::<TimeWindow>)
            .transpose()
            .map_err(|e| corrupt(&e))?;

        Ok(Promo {
            id: row.id,
            store_id: row.store_id,
            code: row.code,
            name: row.name,
            description: row.description,
            kind,
            min_purchase: row.min_purchase,
            applicable_categories,
            applicable_products,
            start_at: row.start_at,
            end_at: row.end_at,
            days_of_week,
            time_window,
            usage_limit: row.usage_limit,
            per_customer_limit: row.per_customer_limit,
            usage_count: row.usage_count,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> DbResult<String> {
    serde_json::to_string(value).map_err(|e| DbError::Internal(e.to_string()))
}

/// Repository for promo database operations.
#[derive(Debug, Clone)]
pub struct PromoRepository {
    pool: SqlitePool,
}

impl PromoRepository {
    /// Creates a new PromoRepository.
    pub fn new(pool: SqlitePool) -> Self {
        PromoRepository { pool }
    }

    /// Looks up an active promo by code within a store.
    ///
    /// `code` is upper-cased here as well, so callers may pass raw input.
    pub async fn find_active_by_code(&self, store_id: &str, code: &str) -> DbResult<Option<Promo>> {
        let sql = format!(
            "SELECT {} FROM promos WHERE store_id = ?1 AND code = ?2 AND is_active = 1",
            PROMO_COLUMNS
        );
        let row = sqlx::query_as::<_, PromoRow>(&sql)
            .bind(store_id)
            .bind(code.trim().to_uppercase())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Promo::try_from).transpose()
    }

    /// Gets a promo by ID regardless of its active flag.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Promo>> {
        let sql = format!("SELECT {} FROM promos WHERE id = ?1", PROMO_COLUMNS);
        let row = sqlx::query_as::<_, PromoRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Promo::try_from).transpose()
    }

    /// Counts prior redemptions of `code` by `phone` in the store.
    pub async fn count_customer_usage(&self, store_id: &str, code: &str, phone: &str) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM promo_usage_logs
            WHERE store_id = ?1 AND promo_code = ?2 AND customer_phone = ?3
            "#,
        )
        .bind(store_id)
        .bind(code.trim().to_uppercase())
        .bind(phone)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    /// Writes the usage log row and bumps `usage_count`, atomically.
    ///
    /// ## Errors
    /// `NotFound` when the promo no longer exists (nothing is written).
    pub async fn record_usage(&self, log: &PromoUsageLog) -> DbResult<()> {
        debug!(
            promo_code = %log.promo_code,
            invoice = %log.invoice_number,
            discount = %log.discount,
            "Recording promo usage"
        );

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO promo_usage_logs (
                id, promo_id, promo_code, customer_phone, transaction_id,
                invoice_number, discount, cashier_id, store_id, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&log.id)
        .bind(&log.promo_id)
        .bind(&log.promo_code)
        .bind(&log.customer_phone)
        .bind(&log.transaction_id)
        .bind(&log.invoice_number)
        .bind(log.discount)
        .bind(&log.cashier_id)
        .bind(&log.store_id)
        .bind(log.created_at)
        .execute(&mut *tx)
        .await?;

        let updated = sqlx::query(
            "UPDATE promos SET usage_count = usage_count + 1, updated_at = ?1 WHERE id = ?2",
        )
        .bind(log.created_at)
        .bind(&log.promo_id)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(DbError::not_found("Promo", &log.promo_id));
        }

        tx.commit().await?;
        Ok(())
    }

    /// Inserts a promo (seed data and tests). The code is stored upper-case.
    pub async fn insert(&self, promo: &Promo) -> DbResult<()> {
        let (max_discount, buy_quantity, get_quantity, get_product_id) = match &promo.kind {
            PromoKind::Percentage { max_discount, .. } => (*max_discount, None, None, None),
            PromoKind::Fixed { .. } => (None, None, None, None),
            PromoKind::BuyXGetY {
                buy_quantity,
                get_quantity,
                get_product_id,
            } => (
                None,
                Some(*buy_quantity),
                Some(*get_quantity),
                Some(get_product_id.clone()),
            ),
        };

        sqlx::query(
            r#"
            INSERT INTO promos (
                id, store_id, code, name, description, type, value, max_discount,
                min_purchase, buy_quantity, get_quantity, get_product_id,
                applicable_categories, applicable_products, start_at, end_at,
                days_of_week, time_window, usage_limit, per_customer_limit,
                usage_count, is_active, created_at, updated_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8,
                ?9, ?10, ?11, ?12,
                ?13, ?14, ?15, ?16,
                ?17, ?18, ?19, ?20,
                ?21, ?22, ?23, ?24
            )
            "#,
        )
        .bind(&promo.id)
        .bind(&promo.store_id)
        .bind(promo.code.trim().to_uppercase())
        .bind(&promo.name)
        .bind(&promo.description)
        .bind(promo.kind.type_name())
        .bind(promo.kind.value())
        .bind(max_discount)
        .bind(promo.min_purchase)
        .bind(buy_quantity)
        .bind(get_quantity)
        .bind(get_product_id)
        .bind(to_json(&promo.applicable_categories)?)
        .bind(to_json(&promo.applicable_products)?)
        .bind(promo.start_at)
        .bind(promo.end_at)
        .bind(to_json(&promo.days_of_week)?)
        .bind(promo.time_window.map(|w| w.to_string()))
        .bind(promo.usage_limit)
        .bind(promo.per_customer_limit)
        .bind(promo.usage_count)
        .bind(promo.is_active)
        .bind(promo.created_at)
        .bind(promo.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{percentage_promo, usage_log};
    use crate::pool::{Database, DbConfig};

    #[tokio::test]
    async fn test_round_trip_and_case_insensitive_lookup() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.promos();
        let mut promo = percentage_promo("promo-1", "lunch10", 1000);
        promo.days_of_week = vec![DayOfWeek::Monday, DayOfWeek::Friday];
        promo.time_window = Some("11:00-14:00".parse().unwrap());
        promo.applicable_categories = vec!["food".to_string()];
        repo.insert(&promo).await.unwrap();

        let found = repo
            .find_active_by_code("store-1", " Lunch10 ")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.code, "LUNCH10");
        assert_eq!(found.days_of_week, promo.days_of_week);
        assert_eq!(found.time_window, promo.time_window);
        assert_eq!(found.applicable_categories, vec!["food".to_string()]);
        assert_eq!(found.kind, promo.kind);

        assert!(repo
            .find_active_by_code("store-2", "LUNCH10")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_inactive_promo_not_found() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.promos();
        let mut promo = percentage_promo("promo-1", "OLD", 500);
        promo.is_active = false;
        repo.insert(&promo).await.unwrap();

        assert!(repo.find_active_by_code("store-1", "OLD").await.unwrap().is_none());
        assert!(repo.get_by_id("promo-1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_record_usage_increments_counter() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.promos();
        repo.insert(&percentage_promo("promo-1", "SAVE", 1000)).await.unwrap();

        repo.record_usage(&usage_log("promo-1", "SAVE", Some("0811")))
            .await
            .unwrap();
        repo.record_usage(&usage_log("promo-1", "SAVE", None))
            .await
            .unwrap();

        let promo = repo.get_by_id("promo-1").await.unwrap().unwrap();
        assert_eq!(promo.usage_count, 2);
        assert_eq!(
            repo.count_customer_usage("store-1", "save", "0811").await.unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn test_record_usage_for_missing_promo_writes_nothing() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.promos();

        let err = repo
            .record_usage(&usage_log("ghost", "GHOST", Some("0811")))
            .await
            .unwrap_err();
        // The log row's FK fails before the counter update is reached.
        assert!(matches!(
            err,
            DbError::ForeignKeyViolation { .. } | DbError::NotFound { .. }
        ));
        assert_eq!(
            repo.count_customer_usage("store-1", "GHOST", "0811").await.unwrap(),
            0
        );
    }
}
