//! # API Error Type
//!
//! Unified error type for HTTP handlers.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in Meridian POS                           │
//! │                                                                         │
//! │  Handler: Result<T, ApiError>                                           │
//! │         │                                                               │
//! │         ├── JsonRejection / QueryRejection ──────────┐                  │
//! │         ├── CoreError / ValidationError ─────────────┤                  │
//! │         ├── CommitError ─────────────────────────────┼──► ApiError      │
//! │         └── DbError (details logged, not returned) ──┘        │         │
//! │                                                               ▼         │
//! │   HTTP status + { "success": false,                                     │
//! │                   "error": { "code": "FORBIDDEN", "message": ".." } }   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

use meridian_core::{CoreError, ValidationError};
use meridian_db::DbError;

/// Result type for handlers.
pub type ApiResult<T> = Result<T, ApiError>;

/// Error returned from HTTP handlers.
///
/// ## Serialization
/// ```json
/// {
///   "success": false,
///   "error": { "code": "NOT_FOUND", "message": "Transaction not found: 4f1c.." }
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,
}

/// Error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Input validation failed (400)
    ValidationError,

    /// Cashier missing, inactive or from another store (403)
    Forbidden,

    /// Resource not found (404)
    NotFound,

    /// No unique invoice number could be assigned (500)
    SequencingFailed,

    /// Database operation failed (500)
    DatabaseError,

    /// Internal server error (500)
    Internal,
}

impl ErrorCode {
    pub fn status(&self) -> StatusCode {
        match self {
            ErrorCode::ValidationError => StatusCode::BAD_REQUEST,
            ErrorCode::Forbidden => StatusCode::FORBIDDEN,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::SequencingFailed | ErrorCode::DatabaseError | ErrorCode::Internal => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    /// Creates a not found error.
    pub fn not_found(resource: &str, id: &str) -> Self {
        ApiError::new(ErrorCode::NotFound, format!("{} not found: {}", resource, id))
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Internal, message)
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.code.status();
        let body = json!({
            "success": false,
            "error": self,
        });
        (status, Json(body)).into_response()
    }
}

// =============================================================================
// Commit Pipeline Errors
// =============================================================================

/// Why an order could not be committed. Nothing was persisted in any case.
#[derive(Debug, Error)]
pub enum CommitError {
    /// Bad request shape or cash shortfall.
    #[error(transparent)]
    Validation(#[from] CoreError),

    /// Cashier missing, inactive, or from another store.
    #[error("Invalid or inactive cashier")]
    Unauthorized,

    /// The invoice counter stayed contended, or every allocated number
    /// collided at insert time.
    #[error("Could not assign an invoice number: {0}")]
    SequencingFailed(DbError),

    /// The transaction write (or a pre-commit read) failed.
    #[error("Failed to persist transaction: {0}")]
    Persistence(DbError),
}

impl From<ValidationError> for CommitError {
    fn from(err: ValidationError) -> Self {
        CommitError::Validation(err.into())
    }
}

impl From<CommitError> for ApiError {
    fn from(err: CommitError) -> Self {
        match err {
            CommitError::Validation(e) => e.into(),
            CommitError::Unauthorized => {
                ApiError::new(ErrorCode::Forbidden, "Invalid or inactive cashier")
            }
            CommitError::SequencingFailed(e) => {
                tracing::error!(error = %e, "Invoice sequencing failed");
                ApiError::new(
                    ErrorCode::SequencingFailed,
                    "Could not assign an invoice number, please retry",
                )
            }
            CommitError::Persistence(e) => {
                tracing::error!(error = %e, "Transaction persistence failed");
                ApiError::new(ErrorCode::DatabaseError, "Failed to save transaction")
            }
        }
    }
}

// =============================================================================
// Conversions
// =============================================================================

/// Converts database errors to API errors.
impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => ApiError::not_found(&entity, &id),
            DbError::UniqueViolation { field, .. } => {
                ApiError::validation(format!("Duplicate value for {}", field))
            }
            DbError::ForeignKeyViolation { message } => {
                tracing::error!("Foreign key violation: {}", message);
                ApiError::validation("Invalid reference")
            }
            DbError::Busy(e) => {
                tracing::warn!("Database busy: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database is busy, please retry")
            }
            DbError::PoolExhausted => {
                ApiError::new(ErrorCode::DatabaseError, "Database pool exhausted")
            }
            DbError::ConnectionFailed(_) => {
                ApiError::new(ErrorCode::DatabaseError, "Database connection failed")
            }
            DbError::MigrationFailed(_) => {
                ApiError::new(ErrorCode::DatabaseError, "Database migration failed")
            }
            other => {
                // Log the actual error but return a generic message
                tracing::error!("Database operation failed: {}", other);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
        }
    }
}

/// Converts core errors to API errors. Every core error is a client mistake.
impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation(e) => ApiError::validation(e.to_string()),
            other => ApiError::validation(other.to_string()),
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::validation(err.to_string())
    }
}

/// Malformed or mistyped JSON bodies.
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::validation(rejection.body_text())
    }
}

/// Malformed query strings.
impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::validation(rejection.body_text())
    }
}
