//! # Domain Types
//!
//! Core domain types used throughout Meridian POS.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │  Transaction    │   │ TransactionItem │   │  PromoUsageLog  │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │◄──│  transaction_id │   │  promo_id       │       │
//! │  │  invoice_number │   │  product_id     │   │  transaction_id │       │
//! │  │  totals         │   │  name snapshot  │   │  customer_phone │       │
//! │  │  kitchen fields │   │  kitchen fields │   │  discount       │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │    Cashier      │   │  KitchenStatus  │       │
//! │  │  (stock view)   │   │  (user view)    │   │  OrderType      │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has:
//! - `id`: UUID v4 - immutable, used for database relations
//! - Business ID where one exists (`invoice_number`, promo `code`)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Kitchen Enums
// =============================================================================

/// How the order leaves the counter. Only recorded when KDS is enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderType {
    DineIn,
    Takeaway,
    Delivery,
}

impl Default for OrderType {
    fn default() -> Self {
        OrderType::DineIn
    }
}

/// Progress of an order (or a single line) on the kitchen display.
///
/// The commit pipeline only ever writes `Pending`; the kitchen collaborator
/// advances the status out of band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum KitchenStatus {
    Pending,
    Preparing,
    Ready,
    Served,
}

// =============================================================================
// Product (stock projection)
// =============================================================================

/// The slice of a product the commit pipeline reads.
///
/// Product lifecycle (CRUD, pricing, categories) belongs to another service;
/// this core only reads these columns and decrements `stock`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub store_id: String,
    pub category_id: Option<String>,
    pub name: String,
    pub price: Money,
    pub cost: Money,
    /// Current stock. May be negative after concurrent overselling.
    pub stock: i64,
    /// Reorder threshold.
    pub min_stock: i64,
    pub is_active: bool,
    /// Kitchen station that prepares this product (e.g. "GRILL", "BAR").
    pub kitchen_station: Option<String>,
    pub prep_time_minutes: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns true once stock has fallen to or below the reorder threshold.
    pub fn is_low_stock(&self) -> bool {
        self.stock <= self.min_stock
    }
}

// =============================================================================
// Cashier (user projection)
// =============================================================================

/// A staff member allowed to ring up sales in one store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct Cashier {
    pub id: String,
    pub store_id: String,
    pub name: String,
    pub role: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Transaction
// =============================================================================

/// One completed sale.
///
/// ## Invariants
/// - `total == max(0, subtotal + tax - discount - promo_discount)`
/// - `change == max(0, amount_paid - total)`
/// - kitchen fields are `None` unless the store had KDS enabled at commit time
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Transaction {
    pub id: String,
    pub store_id: String,
    /// Unique within the store.
    pub invoice_number: String,
    pub subtotal: Money,
    pub tax: Money,
    /// Manual (cashier) discount.
    pub discount: Money,
    pub promo_code: Option<String>,
    pub promo_discount: Money,
    pub total: Money,
    pub payment_method: String,
    pub payment_channel: Option<String>,
    pub payment_reference: Option<String>,
    pub amount_paid: Money,
    pub change: Money,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub cashier_id: String,
    pub notes: Option<String>,
    pub order_type: Option<OrderType>,
    pub table_number: Option<String>,
    pub kitchen_status: Option<KitchenStatus>,
    #[ts(as = "Option<String>")]
    pub sent_to_kitchen_at: Option<DateTime<Utc>>,
    #[ts(as = "Option<String>")]
    pub kitchen_completed_at: Option<DateTime<Utc>>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[cfg_attr(feature = "sqlx", sqlx(skip))]
    pub items: Vec<TransactionItem>,
}

// =============================================================================
// Transaction Item
// =============================================================================

/// A line of a transaction.
/// Uses the snapshot pattern: the product name is frozen at sale time.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct TransactionItem {
    pub id: String,
    pub transaction_id: String,
    pub product_id: String,
    /// Product name at time of sale (frozen).
    pub product_name: String,
    pub quantity: i64,
    /// Unit price at time of sale (frozen).
    pub price: Money,
    /// Line discount.
    pub discount: Money,
    /// `price * quantity - discount`.
    pub subtotal: Money,
    pub notes: Option<String>,
    pub station: Option<String>,
    pub kitchen_status: Option<KitchenStatus>,
    pub prep_time_minutes: Option<i64>,
    pub modifiers: Option<Vec<String>>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Promo Usage Log
// =============================================================================

/// Append-only audit row written when a promo discount is actually charged.
/// Read back only to enforce per-customer limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct PromoUsageLog {
    pub id: String,
    pub promo_id: String,
    pub promo_code: String,
    pub customer_phone: Option<String>,
    pub transaction_id: String,
    pub invoice_number: String,
    pub discount: Money,
    pub cashier_id: String,
    pub store_id: String,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================
