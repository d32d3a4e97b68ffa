//! # Product Repository
//!
//! Read access to the product projection and the stock ledger.
//!
//! ## Stock Ledger
//! ```text
//! UPDATE products SET stock = stock - :qty WHERE id = :id
//!
//!   • atomic in SQLite, no read-modify-write in Rust
//!   • no clamping: stock < 0 records an oversell
//!   • 0 rows affected → DbError::NotFound
//! ```

use std::collections::HashMap;

use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use meridian_core::Product;

const PRODUCT_COLUMNS: &str = "id, store_id, category_id, name, price, cost, stock, min_stock, \
     is_active, kitchen_station, prep_time_minutes, created_at, updated_at";

/// Repository for product database operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Gets a product by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let sql = format!("SELECT {} FROM products WHERE id = ?", PRODUCT_COLUMNS);
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(product)
    }

    /// Loads the store's products with the given ids, keyed by id.
    ///
    /// Unknown ids are simply absent from the map.
    pub async fn find_many(&self, store_id: &str, ids: &[String]) -> DbResult<HashMap<String, Product>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let mut qb: QueryBuilder<'_, Sqlite> = QueryBuilder::new(format!(
            "SELECT {} FROM products WHERE store_id = ",
            PRODUCT_COLUMNS
        ));
        qb.push_bind(store_id.to_string());
        qb.push(" AND id IN (");
        let mut separated = qb.separated(", ");
        for id in ids {
            separated.push_bind(id.clone());
        }
        separated.push_unseparated(")");

        let products = qb
            .build_query_as::<Product>()
            .fetch_all(&self.pool)
            .await?;

        Ok(products.into_iter().map(|p| (p.id.clone(), p)).collect())
    }

    /// Decrements the store's stock of a product by `quantity`.
    ///
    /// ## Errors
    /// `NotFound` when the store has no product with this id.
    pub async fn decrement_stock(
        &self,
        store_id: &str,
        product_id: &str,
        quantity: i64,
    ) -> DbResult<()> {
        debug!(store_id = %store_id, product_id = %product_id, quantity, "Decrementing stock");

        let result = sqlx::query(
            "UPDATE products SET stock = stock - ?1, updated_at = ?2 WHERE id = ?3 AND store_id = ?4",
        )
        .bind(quantity)
        .bind(Utc::now())
        .bind(product_id)
        .bind(store_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", product_id));
        }
        Ok(())
    }

    /// Inserts a product (seed data and tests).
    pub async fn insert(&self, product: &Product) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO products (
                id, store_id, category_id, name, price, cost, stock, min_stock,
                is_active, kitchen_station, prep_time_minutes, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            "#,
        )
        .bind(&product.id)
        .bind(&product.store_id)
        .bind(&product.category_id)
        .bind(&product.name)
        .bind(product.price)
        .bind(product.cost)
        .bind(product.stock)
        .bind(product.min_stock)
        .bind(product.is_active)
        .bind(&product.kitchen_station)
        .bind(product.prep_time_minutes)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Counts the store's products.
    pub async fn count(&self, store_id: &str) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE store_id = ?")
            .bind(store_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::product;
    use crate::pool::{Database, DbConfig};

    #[tokio::test]
    async fn test_decrement_allows_negative_stock() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.products();
        repo.insert(&product("p-1", 1)).await.unwrap();

        repo.decrement_stock("store-1", "p-1", 3).await.unwrap();

        let stored = repo.get_by_id("p-1").await.unwrap().unwrap();
        assert_eq!(stored.stock, -2);
        assert!(stored.is_low_stock());
    }

    #[tokio::test]
    async fn test_decrement_unknown_product() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let err = db.products().decrement_stock("store-1", "missing", 1).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_decrement_scoped_to_store() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.products();
        let mut other = product("p-2", 10);
        other.store_id = "store-2".to_string();
        repo.insert(&other).await.unwrap();

        let err = repo.decrement_stock("store-1", "p-2", 3).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
        assert_eq!(repo.get_by_id("p-2").await.unwrap().unwrap().stock, 10);

        repo.decrement_stock("store-2", "p-2", 3).await.unwrap();
        assert_eq!(repo.get_by_id("p-2").await.unwrap().unwrap().stock, 7);
    }

    #[tokio::test]
    async fn test_find_many_scoped_to_store() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.products();
        repo.insert(&product("p-1", 10)).await.unwrap();
        repo.insert(&product("p-2", 10)).await.unwrap();
        let mut other = product("p-3", 10);
        other.store_id = "store-2".to_string();
        repo.insert(&other).await.unwrap();

        let ids = vec!["p-1".to_string(), "p-3".to_string(), "nope".to_string()];
        let found = repo.find_many("store-1", &ids).await.unwrap();

        assert_eq!(found.len(), 1);
        assert_eq!(found["p-1"].category_id.as_deref(), Some("drinks"));
        assert_eq!(repo.count("store-1").await.unwrap(), 2);
    }
}
