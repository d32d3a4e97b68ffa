//! # Invoice Numbers
//!
//! Formatting rules for human-facing invoice numbers.
//!
//! ```text
//! INV-20240306-0042
//! ─┬─ ───┬──── ──┬─
//!  │     │       └── per-store, per-day sequence (≥ 4 digits, grows past 9999)
//!  │     └────────── store business date
//!  └──────────────── configurable prefix
//! ```
//!
//! Allocation of the sequence itself is atomic in the database
//! (`meridian_db::repository::invoice::InvoiceSequencer`).

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};

use crate::error::ValidationError;

/// Prefix used when none is configured.
pub const DEFAULT_INVOICE_PREFIX: &str = "INV";

const MAX_PREFIX_LEN: usize = 10;

/// Builds `{PREFIX}-{YYYYMMDD}-{NNNN}`.
///
/// ## Example
/// ```rust
/// use chrono::NaiveDate;
/// use meridian_core::invoice::format_invoice_number;
///
/// let date = NaiveDate::from_ymd_opt(2024, 3, 6).unwrap();
/// assert_eq!(format_invoice_number("INV", date, 42), "INV-20240306-0042");
/// ```
pub fn format_invoice_number(prefix: &str, business_date: NaiveDate, seq: i64) -> String {
    format!("{}-{}-{:04}", prefix, business_date.format("%Y%m%d"), seq)
}

/// The store's calendar date at `now`.
pub fn business_date(now: DateTime<Utc>, offset: FixedOffset) -> NaiveDate {
    now.with_timezone(&offset).date_naive()
}

/// Checks a configured prefix: 1-10 ASCII letters or digits.
pub fn validate_prefix(prefix: &str) -> Result<(), ValidationError> {
    if prefix.is_empty() {
        return Err(ValidationError::Required {
            field: "INVOICE_PREFIX".to_string(),
        });
    }
    if prefix.len() > MAX_PREFIX_LEN {
        return Err(ValidationError::TooLong {
            field: "INVOICE_PREFIX".to_string(),
            max: MAX_PREFIX_LEN,
        });
    }
    if !prefix.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ValidationError::InvalidFormat {
            field: "INVOICE_PREFIX".to_string(),
            reason: "must contain only letters and digits".to_string(),
        });
    }
    Ok(())
}
