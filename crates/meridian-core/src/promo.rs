//! # Promotion Rules
//!
//! Pure eligibility and discount rules for promo codes.
//!
//! ## Evaluation Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  evaluate(promo, ctx)            short-circuits on the first failure    │
//! │                                                                         │
//! │   1. start_at <= now <= end_at ............... OutsideValidity          │
//! │   2. weekday ∈ days_of_week (if set) ......... DayNotAllowed            │
//! │   3. HH:MM ∈ time_window (if set) ............ OutsideHours             │
//! │   4. usage_count < usage_limit (if set) ...... QuotaExhausted           │
//! │   5. customer uses < per_customer_limit ...... CustomerLimitReached     │
//! │   6. subtotal >= min_purchase ................ BelowMinimumPurchase     │
//! │   7. some line in applicable categories ...... CategoryNotInCart        │
//! │   8. some line in applicable products ........ ProductNotInCart         │
//! │            │                                                            │
//! │            ▼                                                            │
//! │   discount_for(kind) ──► min(discount, subtotal) ──► PromoApplication   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The lookup step (code + store + active) and the per-customer usage count
//! need the database, so they happen in the caller; everything else is here.
//! Nothing in this module reads the clock: `now` is an input, already in the
//! store's business timezone.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, FixedOffset, Timelike, Utc, Weekday};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::ValidationError;
use crate::money::{Money, BPS_SCALE};

// =============================================================================
// Day of Week
// =============================================================================

/// A day on which a promo may be redeemed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DayOfWeek {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl DayOfWeek {
    pub fn as_str(&self) -> &'static str {
        match self {
            DayOfWeek::Monday => "MONDAY",
            DayOfWeek::Tuesday => "TUESDAY",
            DayOfWeek::Wednesday => "WEDNESDAY",
            DayOfWeek::Thursday => "THURSDAY",
            DayOfWeek::Friday => "FRIDAY",
            DayOfWeek::Saturday => "SATURDAY",
            DayOfWeek::Sunday => "SUNDAY",
        }
    }
}

impl From<Weekday> for DayOfWeek {
    fn from(day: Weekday) -> Self {
        match day {
            Weekday::Mon => DayOfWeek::Monday,
            Weekday::Tue => DayOfWeek::Tuesday,
            Weekday::Wed => DayOfWeek::Wednesday,
            Weekday::Thu => DayOfWeek::Thursday,
            Weekday::Fri => DayOfWeek::Friday,
            Weekday::Sat => DayOfWeek::Saturday,
            Weekday::Sun => DayOfWeek::Sunday,
        }
    }
}

impl fmt::Display for DayOfWeek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn join_days(days: &[DayOfWeek]) -> String {
    days.iter()
        .map(DayOfWeek::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

// =============================================================================
// Intraday Window
// =============================================================================

/// An intraday `HH:MM-HH:MM` window, both ends inclusive.
///
/// The window is compared literally as minutes since midnight, so a window
/// whose start is after its end (e.g. `22:00-02:00`) never matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    start_minute: u32,
    end_minute: u32,
}

impl TimeWindow {
    pub fn new(start_minute: u32, end_minute: u32) -> Result<Self, ValidationError> {
        if start_minute >= 24 * 60 || end_minute >= 24 * 60 {
            return Err(ValidationError::OutOfRange {
                field: "timeWindow".to_string(),
                min: 0,
                max: 24 * 60 - 1,
            });
        }
        Ok(Self {
            start_minute,
            end_minute,
        })
    }

    /// Returns true when `minute_of_day` (hour*60+minute) is inside the window.
    pub fn contains(&self, minute_of_day: u32) -> bool {
        self.start_minute <= minute_of_day && minute_of_day <= self.end_minute
    }
}

fn parse_clock(part: &str) -> Option<u32> {
    let (h, m) = part.trim().split_once(':')?;
    let h: u32 = h.parse().ok()?;
    let m: u32 = m.parse().ok()?;
    (h < 24 && m < 60).then_some(h * 60 + m)
}

impl FromStr for TimeWindow {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ValidationError::InvalidFormat {
            field: "timeWindow".to_string(),
            reason: format!("expected HH:MM-HH:MM, got '{}'", s),
        };
        let (start, end) = s.split_once('-').ok_or_else(invalid)?;
        let start = parse_clock(start).ok_or_else(invalid)?;
        let end = parse_clock(end).ok_or_else(invalid)?;
        TimeWindow::new(start, end)
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}:{:02}-{:02}:{:02}",
            self.start_minute / 60,
            self.start_minute % 60,
            self.end_minute / 60,
            self.end_minute % 60
        )
    }
}

// =============================================================================
// Promo Kind
// =============================================================================

/// What a promo gives, with the parameters only that kind needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromoKind {
    /// `percent_bps` basis points off the subtotal (1000 = 10%).
    Percentage {
        percent_bps: u32,
        max_discount: Option<Money>,
    },
    /// Flat amount off.
    Fixed { amount: Money },
    /// Buy `buy_quantity` qualifying units, get `get_quantity` of
    /// `get_product_id` free.
    BuyXGetY {
        buy_quantity: i64,
        get_quantity: i64,
        get_product_id: String,
    },
}

impl PromoKind {
    pub const PERCENTAGE: &'static str = "PERCENTAGE";
    pub const FIXED: &'static str = "FIXED";
    pub const BUY_X_GET_Y: &'static str = "BUY_X_GET_Y";

    /// The wire/storage name of the kind.
    pub fn type_name(&self) -> &'static str {
        match self {
            PromoKind::Percentage { .. } => Self::PERCENTAGE,
            PromoKind::Fixed { .. } => Self::FIXED,
            PromoKind::BuyXGetY { .. } => Self::BUY_X_GET_Y,
        }
    }

    /// The stored `value` column: basis points for percentage, minor units
    /// for fixed, zero for buy-x-get-y.
    pub fn value(&self) -> i64 {
        match self {
            PromoKind::Percentage { percent_bps, .. } => i64::from(*percent_bps),
            PromoKind::Fixed { amount } => amount.minor(),
            PromoKind::BuyXGetY { .. } => 0,
        }
    }

    /// Rebuilds a kind from its flat storage columns.
    ///
    /// ## Errors
    /// Unknown type names and parameters that make no sense for the kind
    /// (negative amounts, percentages over 100%, missing free product).
    pub fn from_parts(
        type_name: &str,
        value: i64,
        max_discount: Option<Money>,
        buy_quantity: Option<i64>,
        get_quantity: Option<i64>,
        get_product_id: Option<String>,
    ) -> Result<Self, ValidationError> {
        match type_name {
            Self::PERCENTAGE => {
                if !(0..=BPS_SCALE).contains(&value) {
                    return Err(ValidationError::OutOfRange {
                        field: "value".to_string(),
                        min: 0,
                        max: BPS_SCALE,
                    });
                }
                Ok(PromoKind::Percentage {
                    percent_bps: value as u32,
                    max_discount,
                })
            }
            Self::FIXED => {
                if value < 0 {
                    return Err(ValidationError::Negative {
                        field: "value".to_string(),
                    });
                }
                Ok(PromoKind::Fixed {
                    amount: Money::from_minor(value),
                })
            }
            Self::BUY_X_GET_Y => {
                let buy_quantity = buy_quantity.filter(|q| *q > 0).ok_or_else(|| {
                    ValidationError::MustBePositive {
                        field: "buyQuantity".to_string(),
                    }
                })?;
                let get_quantity = get_quantity.filter(|q| *q > 0).ok_or_else(|| {
                    ValidationError::MustBePositive {
                        field: "getQuantity".to_string(),
                    }
                })?;
                let get_product_id = get_product_id
                    .filter(|id| !id.trim().is_empty())
                    .ok_or_else(|| ValidationError::Required {
                        field: "getProductId".to_string(),
                    })?;
                Ok(PromoKind::BuyXGetY {
                    buy_quantity,
                    get_quantity,
                    get_product_id,
                })
            }
            other => Err(ValidationError::NotAllowed {
                field: format!("type '{}'", other),
                allowed: vec![
                    Self::PERCENTAGE.to_string(),
                    Self::FIXED.to_string(),
                    Self::BUY_X_GET_Y.to_string(),
                ],
            }),
        }
    }
}

// =============================================================================
// Promo
// =============================================================================

/// A promotion definition.
///
/// Empty `applicable_categories` / `applicable_products` / `days_of_week`
/// mean "no restriction".
#[derive(Debug, Clone)]
pub struct Promo {
    pub id: String,
    pub store_id: String,
    /// Stored upper-case.
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub kind: PromoKind,
    pub min_purchase: Money,
    pub applicable_categories: Vec<String>,
    pub applicable_products: Vec<String>,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub days_of_week: Vec<DayOfWeek>,
    pub time_window: Option<TimeWindow>,
    /// Store-wide redemption cap.
    pub usage_limit: Option<i64>,
    pub per_customer_limit: Option<i64>,
    pub usage_count: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Evaluation Inputs / Outputs
// =============================================================================

/// One cart line as the promo rules see it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromoCartLine {
    pub product_id: String,
    #[serde(default)]
    pub category_id: Option<String>,
    pub quantity: i64,
    pub price: Money,
}

/// Everything besides the promo itself that eligibility depends on.
#[derive(Debug, Clone)]
pub struct PromoContext<'a> {
    /// Current instant in the store's business timezone.
    pub now: DateTime<FixedOffset>,
    pub subtotal: Money,
    pub lines: &'a [PromoCartLine],
    /// Prior usage-log rows for this customer, code and store.
    /// `None` when no phone was supplied.
    pub customer_uses: Option<i64>,
}

/// An eligible promo and what it is worth on this cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromoApplication {
    pub discount: Money,
    pub message: String,
}

/// Why a promo code cannot be applied. `Display` is the user-facing reason.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PromoRejection {
    #[error("Promo code not found or inactive")]
    NotFound,

    #[error("Promo is only valid from {} to {}", .start_at.format("%Y-%m-%d %H:%M"), .end_at.format("%Y-%m-%d %H:%M"))]
    OutsideValidity {
        start_at: DateTime<FixedOffset>,
        end_at: DateTime<FixedOffset>,
    },

    #[error("Promo is only valid on: {}", join_days(.allowed))]
    DayNotAllowed { allowed: Vec<DayOfWeek> },

    #[error("Promo is only valid between {window}")]
    OutsideHours { window: TimeWindow },

    #[error("Promo usage quota has been exhausted")]
    QuotaExhausted,

    #[error("Customer has reached the usage limit of {limit} for this promo")]
    CustomerLimitReached { limit: i64 },

    #[error("Minimum purchase of {minimum} required for this promo")]
    BelowMinimumPurchase { minimum: Money },

    #[error("Promo does not apply to any product category in the cart")]
    CategoryNotInCart,

    #[error("Promo does not apply to any product in the cart")]
    ProductNotInCart,
}

// =============================================================================
// Evaluation
// =============================================================================

/// Runs the eligibility checks in order and computes the discount.
///
/// Inactive promos are filtered out by the lookup; `is_active` is checked
/// again here so a stale row can never slip through.
pub fn evaluate(promo: &Promo, ctx: &PromoContext<'_>) -> Result<PromoApplication, PromoRejection> {
    if !promo.is_active {
        return Err(PromoRejection::NotFound);
    }

    let now_utc = ctx.now.with_timezone(&Utc);
    if now_utc < promo.start_at || now_utc > promo.end_at {
        let tz = *ctx.now.offset();
        return Err(PromoRejection::OutsideValidity {
            start_at: promo.start_at.with_timezone(&tz),
            end_at: promo.end_at.with_timezone(&tz),
        });
    }

    if !promo.days_of_week.is_empty() {
        let today = DayOfWeek::from(ctx.now.weekday());
        if !promo.days_of_week.contains(&today) {
            return Err(PromoRejection::DayNotAllowed {
                allowed: promo.days_of_week.clone(),
            });
        }
    }

    if let Some(window) = promo.time_window {
        let minute_of_day = ctx.now.hour() * 60 + ctx.now.minute();
        if !window.contains(minute_of_day) {
            return Err(PromoRejection::OutsideHours { window });
        }
    }

    if let Some(limit) = promo.usage_limit {
        if promo.usage_count >= limit {
            return Err(PromoRejection::QuotaExhausted);
        }
    }

    if let (Some(limit), Some(uses)) = (promo.per_customer_limit, ctx.customer_uses) {
        if uses >= limit {
            return Err(PromoRejection::CustomerLimitReached { limit });
        }
    }

    if ctx.subtotal < promo.min_purchase {
        return Err(PromoRejection::BelowMinimumPurchase {
            minimum: promo.min_purchase,
        });
    }

    if !promo.applicable_categories.is_empty() {
        let hit = ctx.lines.iter().any(|line| {
            line.category_id
                .as_ref()
                .is_some_and(|c| promo.applicable_categories.contains(c))
        });
        if !hit {
            return Err(PromoRejection::CategoryNotInCart);
        }
    }

    if !promo.applicable_products.is_empty() {
        let hit = ctx
            .lines
            .iter()
            .any(|line| promo.applicable_products.contains(&line.product_id));
        if !hit {
            return Err(PromoRejection::ProductNotInCart);
        }
    }

    Ok(discount_for(promo, ctx.subtotal, ctx.lines))
}

/// Computes the discount an eligible promo is worth.
///
/// ```text
/// PERCENTAGE   subtotal × bps / 10000 (half-up), capped at max_discount
/// FIXED        amount
/// BUY_X_GET_Y  qualifying qty >= buy AND free product in cart
///                 → free line unit price × get_quantity
///              otherwise 0 (still valid, message explains)
///
/// every kind   min(discount, subtotal), never negative
/// ```
pub fn discount_for(promo: &Promo, subtotal: Money, lines: &[PromoCartLine]) -> PromoApplication {
    let applied = format!("Promo {} applied", promo.code);

    let (raw, message) = match &promo.kind {
        PromoKind::Percentage {
            percent_bps,
            max_discount,
        } => {
            let discount = subtotal.percentage(*percent_bps);
            let discount = match max_discount {
                Some(cap) if discount > *cap => *cap,
                _ => discount,
            };
            (discount, applied)
        }
        PromoKind::Fixed { amount } => (*amount, applied),
        PromoKind::BuyXGetY {
            buy_quantity,
            get_quantity,
            get_product_id,
        } => {
            let qualifying: i64 = lines
                .iter()
                .filter(|line| {
                    promo.applicable_products.is_empty()
                        || promo.applicable_products.contains(&line.product_id)
                })
                .fold(0_i64, |acc, line| acc.saturating_add(line.quantity.max(0)));
            let free_line = lines.iter().find(|line| &line.product_id == get_product_id);

            match free_line {
                _ if qualifying < *buy_quantity => (
                    Money::zero(),
                    format!(
                        "Buy {} qualifying items to get {} free ({} in cart)",
                        buy_quantity, get_quantity, qualifying
                    ),
                ),
                None => (
                    Money::zero(),
                    "Add the free item to the cart to receive the discount".to_string(),
                ),
                Some(line) => (line.price.multiply_quantity(*get_quantity), applied),
            }
        }
    };

    let discount = if raw > subtotal { subtotal } else { raw };
    PromoApplication {
        discount: discount.non_negative(),
        message,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
