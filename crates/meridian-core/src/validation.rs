//! # Validation Module
//!
//! Field-level input validation for Meridian POS.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: HTTP extractor (axum Json)                                    │
//! │  └── Type validation (deserialization) → 400                            │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE + CommitOrderRequest::validate                    │
//! │  └── Business rule validation before any side effect                    │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                             │
//! │  ├── NOT NULL / CHECK constraints                                       │
//! │  ├── UNIQUE (store_id, invoice_number)                                  │
//! │  └── Foreign key constraints                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use meridian_core::validation::{validate_promo_code, validate_quantity};
//!
//! assert_eq!(validate_promo_code("  lunch10 ").unwrap(), "LUNCH10");
//! assert!(validate_quantity(5).is_ok());
//! ```

use chrono::NaiveDate;

use crate::error::ValidationError;
use crate::money::Money;
use crate::{DEFAULT_PAGE_SIZE, MAX_ITEM_QUANTITY, MAX_PAGE_SIZE};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Longest identifier accepted for store, cashier and product ids.
const MAX_ID_LEN: usize = 64;

/// Longest promo code accepted.
const MAX_PROMO_CODE_LEN: usize = 32;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a required identifier (store id, cashier id, product id).
///
/// ## Rules
/// - Must not be empty after trimming
/// - At most 64 characters
///
/// ## Example
/// ```rust
/// use meridian_core::validation::validate_id;
///
/// assert!(validate_id("storeId", "store-1").is_ok());
/// assert!(validate_id("storeId", "   ").is_err());
/// ```
pub fn validate_id(field: &str, value: &str) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.len() > MAX_ID_LEN {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_ID_LEN,
        });
    }

    Ok(())
}

/// Normalizes a promo code for lookup.
///
/// ## Rules
/// - Must not be empty after trimming
/// - At most 32 characters
///
/// ## Returns
/// The trimmed, upper-cased code (codes are stored upper-case).
pub fn validate_promo_code(code: &str) -> ValidationResult<String> {
    let code = code.trim();

    if code.is_empty() {
        return Err(ValidationError::Required {
            field: "code".to_string(),
        });
    }

    if code.len() > MAX_PROMO_CODE_LEN {
        return Err(ValidationError::TooLong {
            field: "code".to_string(),
            max: MAX_PROMO_CODE_LEN,
        });
    }

    Ok(code.to_uppercase())
}

/// Validates optional free text (notes, customer name, table number).
pub fn validate_optional_text(field: &str, value: Option<&str>, max: usize) -> ValidationResult<()> {
    match value {
        Some(text) if text.chars().count() > max => Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        }),
        _ => Ok(()),
    }
}

/// Parses a `YYYY-MM-DD` business date from a query string.
///
/// ## Example
/// ```rust
/// use meridian_core::validation::parse_business_date;
///
/// assert!(parse_business_date("startDate", "2024-03-01").is_ok());
/// assert!(parse_business_date("startDate", "03/01/2024").is_err());
/// ```
pub fn parse_business_date(field: &str, value: &str) -> ValidationResult<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| {
        ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: "expected YYYY-MM-DD".to_string(),
        }
    })
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a quantity value.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_ITEM_QUANTITY (999)
///
/// ```text
/// validate_quantity(qty)
///      │
///      ├── qty <= 0?   → "quantity must be positive"
///      ├── qty > 999?  → "quantity must be between 1 and 999"
///      └── OK
/// ```
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates that an amount is zero or more.
///
/// Zero is allowed (free items, no tax, exact change).
pub fn validate_non_negative(field: &str, amount: Money) -> ValidationResult<()> {
    if amount.is_negative() {
        return Err(ValidationError::Negative {
            field: field.to_string(),
        });
    }

    Ok(())
}

/// Validates an amount against `0..=max`.
///
/// ```text
/// validate_amount("price", amount, MAX_UNIT_PRICE)
///      │
///      ├── amount < 0?    → "price cannot be negative"
///      ├── amount > max?  → "price must be between 0 and max"
///      └── OK
/// ```
pub fn validate_amount(field: &str, amount: Money, max: i64) -> ValidationResult<()> {
    validate_non_negative(field, amount)?;
    if amount.minor() > max {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max,
        });
    }

    Ok(())
}

// =============================================================================
// Pagination
// =============================================================================

/// Normalizes list pagination.
///
/// Missing or zero page → 1; missing limit → 20; limit is capped at 100.
pub fn normalize_pagination(page: Option<u32>, limit: Option<u32>) -> (u32, u32) {
    let page = page.filter(|p| *p > 0).unwrap_or(1);
    let limit = limit
        .filter(|l| *l > 0)
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .min(MAX_PAGE_SIZE);
    (page, limit)
}

// =============================================================================
// Unit Tests
// =============================================================================
