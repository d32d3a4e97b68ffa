//! # meridian-core: Pure Business Logic for Meridian POS
//!
//! This crate holds the rules of the order commit pipeline and the promotion
//! engine as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Meridian POS Architecture                          │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              POS clients / kitchen display                      │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ HTTP + WebSocket                       │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    apps/api (axum)                              │   │
//! │  │    POST /transactions, POST /promos/validate, /kitchen/ws       │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │             ★ meridian-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐  │   │
//! │  │   │  money  │ │  promo  │ │  order  │ │ invoice │ │ kitchen │  │   │
//! │  │   │  Money  │ │ evaluate│ │ validate│ │ format  │ │ Ticket  │  │   │
//! │  │   └─────────┘ └─────────┘ └─────────┘ └─────────┘ └─────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • NO CLOCK READS            │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 meridian-db (Database Layer)                    │   │
//! │  │        SQLite queries, migrations, repositories, sequencer      │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Transaction, TransactionItem, Product, ...)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`promo`] - Promo eligibility rules and discount computation
//! - [`order`] - Commit request DTOs, shape validation, totals
//! - [`invoice`] - Invoice number format
//! - [`kitchen`] - Kitchen display payloads
//! - [`error`] - Domain error types
//! - [`validation`] - Field-level validation
//!
//! ## Example Usage
//!
//! ```rust
//! use meridian_core::money::Money;
//!
//! let price = Money::from_minor(1099);
//! let line = price.multiply_quantity(2);
//!
//! // 10% off, rounded half-up
//! assert_eq!(line.percentage(1000).minor(), 220);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod invoice;
pub mod kitchen;
pub mod money;
pub mod order;
pub mod promo;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum lines allowed in a single order.
pub const MAX_CART_ITEMS: usize = 100;

/// Maximum quantity of a single line.
///
/// ## Business Reason
/// Prevents accidental over-ordering (e.g., typing 1000 instead of 10).
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Largest unit price a line may carry, in minor units.
pub const MAX_UNIT_PRICE: i64 = 100_000_000_000;

/// Largest order-level amount (tax, discount, amount paid, subtotal).
///
/// ```text
/// MAX_UNIT_PRICE × MAX_ITEM_QUANTITY × MAX_CART_ITEMS ≈ 1e16  <  i64::MAX ≈ 9.2e18
/// ```
/// Any cart that passes validation can be totalled without overflow.
pub const MAX_ORDER_AMOUNT: i64 = MAX_UNIT_PRICE * MAX_ITEM_QUANTITY * MAX_CART_ITEMS as i64;

/// Longest free-text note accepted on an order or a line.
pub const MAX_NOTES_LEN: usize = 500;

/// Page size for transaction listings when none is requested.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Largest page size a listing may request.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Store setting key that turns on the kitchen display flow.
pub const KDS_ENABLED_SETTING: &str = "kds_enabled";
