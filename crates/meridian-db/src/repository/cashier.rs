//! # Cashier Repository
//!
//! Read-only view of the users table used to authorize a commit.

use sqlx::SqlitePool;

use crate::error::DbResult;
use meridian_core::Cashier;

/// Repository for cashier lookups.
#[derive(Debug, Clone)]
pub struct CashierRepository {
    pool: SqlitePool,
}

impl CashierRepository {
    /// Creates a new CashierRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CashierRepository { pool }
    }

    /// Returns the cashier only if it exists, belongs to `store_id` and is active.
    pub async fn find_active(&self, store_id: &str, cashier_id: &str) -> DbResult<Option<Cashier>> {
        let cashier = sqlx::query_as::<_, Cashier>(
            r#"
            SELECT id, store_id, name, role, is_active, created_at
            FROM users
            WHERE id = ?1 AND store_id = ?2 AND is_active = 1
            "#,
        )
        .bind(cashier_id)
        .bind(store_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(cashier)
    }

    /// Inserts a user (seed data and tests).
    pub async fn insert(&self, cashier: &Cashier) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, store_id, name, role, is_active, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&cashier.id)
        .bind(&cashier.store_id)
        .bind(&cashier.name)
        .bind(&cashier.role)
        .bind(cashier.is_active)
        .bind(cashier.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
