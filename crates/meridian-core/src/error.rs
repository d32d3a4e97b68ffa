//! # Error Types
//!
//! Domain-specific error types for meridian-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  meridian-core errors (this file)                                       │
//! │  ├── CoreError        - Order rule violations                           │
//! │  └── ValidationError  - Field-level input failures                      │
//! │                                                                         │
//! │  meridian-db errors (separate crate)                                    │
//! │  └── DbError          - Database operation failures                     │
//! │                                                                         │
//! │  HTTP errors (in apps/api)                                              │
//! │  ├── CommitError      - Order commit pipeline taxonomy                  │
//! │  └── ApiError         - What the POS client sees (serialized)           │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → CommitError → ApiError → Client    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Promo rejections are NOT errors: an ineligible promo is a normal outcome
//! of [`crate::promo::evaluate`] and lives in [`crate::promo::PromoRejection`].

use thiserror::Error;

use crate::money::Money;

// =============================================================================
// Core Error
// =============================================================================

/// Order-level business rule violations.
///
/// All of these are raised before any side effect and map to HTTP 400.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The cart has no lines.
    #[error("Transaction must contain at least one item")]
    EmptyOrder,

    /// Cart has exceeded maximum allowed lines.
    #[error("Cart cannot have more than {max} items")]
    CartTooLarge { max: usize },

    /// Item quantity exceeds maximum allowed.
    #[error("Quantity {requested} exceeds maximum allowed ({max})")]
    QuantityTooLarge { requested: i64, max: i64 },

    /// A line discount is larger than the line itself.
    ///
    /// ## When This Occurs
    /// ```text
    /// price 15.00 × qty 2 = 30.00
    ///      │
    ///      ▼
    /// line discount 35.00  ──►  LineDiscountTooLarge { line: 1, .. }
    /// ```
    #[error("Discount {discount} on line {line} exceeds the line amount {line_amount}")]
    LineDiscountTooLarge {
        line: usize,
        discount: Money,
        line_amount: Money,
    },

    /// Cash tendered does not cover the server-computed total.
    #[error("Insufficient payment: total {total}, paid {paid}")]
    InsufficientPayment { total: Money, paid: Money },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when user input doesn't meet requirements.
/// Used for early validation before business logic runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must be zero or more.
    #[error("{field} must not be negative")]
    Negative { field: String },

    /// Invalid format (e.g., bad time window, bad date).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InsufficientPayment {
            total: Money::from_minor(25_000),
            paid: Money::from_minor(20_000),
        };
        assert_eq!(
            err.to_string(),
            "Insufficient payment: total 250.00, paid 200.00"
        );
        assert_eq!(
            CoreError::EmptyOrder.to_string(),
            "Transaction must contain at least one item"
        );
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "storeId".to_string(),
        };
        assert_eq!(err.to_string(), "storeId is required");

        let err = ValidationError::Negative {
            field: "tax".to_string(),
        };
        assert_eq!(err.to_string(), "tax must not be negative");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "cashierId".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
