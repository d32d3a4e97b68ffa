//! # Transaction Repository
//!
//! Database operations for transactions and their items.
//!
//! ## Write Path
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  insert_with_items(tx)                                                  │
//! │                                                                         │
//! │   BEGIN                                                                 │
//! │     INSERT transactions        (UNIQUE store_id + invoice_number)       │
//! │     INSERT transaction_items × N                                        │
//! │   COMMIT                                                                │
//! │                                                                         │
//! │   any failure → the SQL transaction is dropped → ROLLBACK               │
//! │   (either the transaction and every item exist, or none do)             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Read Path
//! Listing filters by store, cashier, a UTC `created_at` range and a search
//! term; the summary (count, revenue) covers the whole filtered set, not
//! just the page.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::{FromRow, QueryBuilder, Sqlite, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use meridian_core::{KitchenStatus, Money, Transaction, TransactionItem};

const TRANSACTION_COLUMNS: &str = "id, store_id, invoice_number, subtotal, tax, discount, \
     promo_code, promo_discount, total, payment_method, payment_channel, payment_reference, \
     amount_paid, change, customer_name, customer_phone, cashier_id, notes, order_type, \
     table_number, kitchen_status, sent_to_kitchen_at, kitchen_completed_at, created_at";

const ITEM_COLUMNS: &str = "id, transaction_id, product_id, product_name, quantity, price, \
     discount, subtotal, notes, station, kitchen_status, prep_time_minutes, modifiers, created_at";

// =============================================================================
// Rows and Filters
// =============================================================================

/// `transaction_items` row; `modifiers` is a JSON array in a TEXT column.
#[derive(Debug, FromRow)]
struct ItemRow {
    id: String,
    transaction_id: String,
    product_id: String,
    product_name: String,
    quantity: i64,
    price: Money,
    discount: Money,
    subtotal: Money,
    notes: Option<String>,
    station: Option<String>,
    kitchen_status: Option<KitchenStatus>,
    prep_time_minutes: Option<i64>,
    modifiers: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<ItemRow> for TransactionItem {
    type Error = DbError;

    fn try_from(row: ItemRow) -> Result<Self, Self::Error> {
        let modifiers = row
            .modifiers
            .as_deref()
            .map(serde_json::from_str::<Vec<String>>)
            .transpose()
            .map_err(|e| DbError::corrupt("TransactionItem", &row.id, e))?;

        Ok(TransactionItem {
            id: row.id,
            transaction_id: row.transaction_id,
            product_id: row.product_id,
            product_name: row.product_name,
            quantity: row.quantity,
            price: row.price,
            discount: row.discount,
            subtotal: row.subtotal,
            notes: row.notes,
            station: row.station,
            kitchen_status: row.kitchen_status,
            prep_time_minutes: row.prep_time_minutes,
            modifiers,
            created_at: row.created_at,
        })
    }
}

/// Listing filter. All bounds are inclusive-exclusive UTC instants.
#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    pub store_id: String,
    pub cashier_id: Option<String>,
    pub created_from: Option<DateTime<Utc>>,
    pub created_before: Option<DateTime<Utc>>,
    /// Substring of invoice number, customer name or customer phone.
    pub search: Option<String>,
}

/// One page of transactions plus whole-set aggregates.
#[derive(Debug, Clone)]
pub struct TransactionPage {
    pub transactions: Vec<Transaction>,
    pub total_count: i64,
    pub total_revenue: Money,
}

fn push_filters(qb: &mut QueryBuilder<'_, Sqlite>, filter: &TransactionFilter) {
    qb.push(" WHERE store_id = ");
    qb.push_bind(filter.store_id.clone());

    if let Some(cashier_id) = &filter.cashier_id {
        qb.push(" AND cashier_id = ");
        qb.push_bind(cashier_id.clone());
    }
    if let Some(from) = filter.created_from {
        qb.push(" AND created_at >= ");
        qb.push_bind(from);
    }
    if let Some(before) = filter.created_before {
        qb.push(" AND created_at < ");
        qb.push_bind(before);
    }
    if let Some(term) = filter.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        let escaped = term
            .replace('\\', "\\\\")
            .replace('%', "\\%")
            .replace('_', "\\_");
        let pattern = format!("%{}%", escaped);
        qb.push(" AND (invoice_number LIKE ");
        qb.push_bind(pattern.clone());
        qb.push(" ESCAPE '\\' OR customer_name LIKE ");
        qb.push_bind(pattern.clone());
        qb.push(" ESCAPE '\\' OR customer_phone LIKE ");
        qb.push_bind(pattern);
        qb.push(" ESCAPE '\\')");
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for transaction database operations.
#[derive(Debug, Clone)]
pub struct TransactionRepository {
    pool: SqlitePool,
}

impl TransactionRepository {
    /// Creates a new TransactionRepository.
    pub fn new(pool: SqlitePool) -> Self {
        TransactionRepository { pool }
    }

    /// Persists a transaction and all of its items in one SQL transaction.
    ///
    /// ## Errors
    /// `UniqueViolation` on `invoice_number` when the number is already used
    /// in the store; nothing is written in that case.
    pub async fn insert_with_items(&self, tx: &Transaction) -> DbResult<()> {
        debug!(
            id = %tx.id,
            invoice = %tx.invoice_number,
            items = tx.items.len(),
            "Inserting transaction"
        );

        let mut db_tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO transactions (
                id, store_id, invoice_number, subtotal, tax, discount,
                promo_code, promo_discount, total, payment_method, payment_channel,
                payment_reference, amount_paid, change, customer_name, customer_phone,
                cashier_id, notes, order_type, table_number, kitchen_status,
                sent_to_kitchen_at, kitchen_completed_at, created_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6,
                ?7, ?8, ?9, ?10, ?11,
                ?12, ?13, ?14, ?15, ?16,
                ?17, ?18, ?19, ?20, ?21,
                ?22, ?23, ?24
            )
            "#,
        )
        .bind(&tx.id)
        .bind(&tx.store_id)
        .bind(&tx.invoice_number)
        .bind(tx.subtotal)
        .bind(tx.tax)
        .bind(tx.discount)
        .bind(&tx.promo_code)
        .bind(tx.promo_discount)
        .bind(tx.total)
        .bind(&tx.payment_method)
        .bind(&tx.payment_channel)
        .bind(&tx.payment_reference)
        .bind(tx.amount_paid)
        .bind(tx.change)
        .bind(&tx.customer_name)
        .bind(&tx.customer_phone)
        .bind(&tx.cashier_id)
        .bind(&tx.notes)
        .bind(tx.order_type)
        .bind(&tx.table_number)
        .bind(tx.kitchen_status)
        .bind(tx.sent_to_kitchen_at)
        .bind(tx.kitchen_completed_at)
        .bind(tx.created_at)
        .execute(&mut *db_tx)
        .await?;

        for item in &tx.items {
            let modifiers = item
                .modifiers
                .as_ref()
                .map(serde_json::to_string)
                .transpose()
                .map_err(|e| DbError::Internal(e.to_string()))?;

            sqlx::query(
                r#"
                INSERT INTO transaction_items (
                    id, transaction_id, product_id, product_name, quantity, price,
                    discount, subtotal, notes, station, kitchen_status,
                    prep_time_minutes, modifiers, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
                "#,
            )
            .bind(&item.id)
            .bind(&item.transaction_id)
            .bind(&item.product_id)
            .bind(&item.product_name)
            .bind(item.quantity)
            .bind(item.price)
            .bind(item.discount)
            .bind(item.subtotal)
            .bind(&item.notes)
            .bind(&item.station)
            .bind(item.kitchen_status)
            .bind(item.prep_time_minutes)
            .bind(modifiers)
            .bind(item.created_at)
            .execute(&mut *db_tx)
            .await?;
        }

        db_tx.commit().await?;
        Ok(())
    }

    /// Gets a transaction with its items.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Transaction>> {
        let sql = format!("SELECT {} FROM transactions WHERE id = ?1", TRANSACTION_COLUMNS);
        let Some(mut tx) = sqlx::query_as::<_, Transaction>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
        else {
            return Ok(None);
        };

        let mut items = self.items_for(&[tx.id.clone()]).await?;
        tx.items = items.remove(&tx.id).unwrap_or_default();
        Ok(Some(tx))
    }

    /// Counts transactions in a store (tests and diagnostics).
    pub async fn count(&self, store_id: &str) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM transactions WHERE store_id = ?1")
            .bind(store_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Lists one page (newest first) plus aggregates over the filtered set.
    pub async fn list(&self, filter: &TransactionFilter, page: u32, limit: u32) -> DbResult<TransactionPage> {
        let mut summary_qb: QueryBuilder<'_, Sqlite> =
            QueryBuilder::new("SELECT COUNT(*), COALESCE(SUM(total), 0) FROM transactions");
        push_filters(&mut summary_qb, filter);
        let (total_count, revenue): (i64, i64) = summary_qb
            .build_query_as()
            .fetch_one(&self.pool)
            .await?;

        let mut page_qb: QueryBuilder<'_, Sqlite> =
            QueryBuilder::new(format!("SELECT {} FROM transactions", TRANSACTION_COLUMNS));
        push_filters(&mut page_qb, filter);
        page_qb.push(" ORDER BY created_at DESC, id DESC LIMIT ");
        page_qb.push_bind(i64::from(limit));
        page_qb.push(" OFFSET ");
        page_qb.push_bind(i64::from(page.saturating_sub(1)) * i64::from(limit));

        let mut transactions: Vec<Transaction> = page_qb
            .build_query_as()
            .fetch_all(&self.pool)
            .await?;

        let ids: Vec<String> = transactions.iter().map(|t| t.id.clone()).collect();
        let mut items = self.items_for(&ids).await?;
        for tx in &mut transactions {
            tx.items = items.remove(&tx.id).unwrap_or_default();
        }

        Ok(TransactionPage {
            transactions,
            total_count,
            total_revenue: Money::from_minor(revenue),
        })
    }

    /// Hard-deletes a transaction; items cascade.
    ///
    /// Stock and promo counters are left as they are.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM transactions WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Transaction", id));
        }
        Ok(())
    }

    async fn items_for(&self, transaction_ids: &[String]) -> DbResult<HashMap<String, Vec<TransactionItem>>> {
        let mut grouped: HashMap<String, Vec<TransactionItem>> = HashMap::new();
        if transaction_ids.is_empty() {
            return Ok(grouped);
        }

        let mut qb: QueryBuilder<'_, Sqlite> = QueryBuilder::new(format!(
            "SELECT {} FROM transaction_items WHERE transaction_id IN (",
            ITEM_COLUMNS
        ));
        let mut separated = qb.separated(", ");
        for id in transaction_ids {
            separated.push_bind(id.clone());
        }
        separated.push_unseparated(") ORDER BY rowid");

        let rows: Vec<ItemRow> = qb.build_query_as().fetch_all(&self.pool).await?;
        for row in rows {
            let item = TransactionItem::try_from(row)?;
            grouped
                .entry(item.transaction_id.clone())
                .or_default()
                .push(item);
        }
        Ok(grouped)
    }
}

// =============================================================================
// Tests
// =============================================================================
