//! # Order Requests
//!
//! The commit request a POS client sends, its shape validation, and the
//! server-side totals computation.
//!
//! ## Totals Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  per line:   price × quantity − line discount  ──►  line subtotal       │
//! │                                                                         │
//! │  subtotal  = Σ line subtotal                                            │
//! │  total     = max(0, subtotal + tax − discount − promo discount)         │
//! │  change    = max(0, amount paid − total)                                │
//! │                                                                         │
//! │  CASH and amount paid < total  ──►  CoreError::InsufficientPayment      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Client-sent `subtotal`, `total`, `change` and `promoDiscount` are accepted
//! for compatibility but never persisted; the server recomputes all of them.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::promo::PromoCartLine;
use crate::types::OrderType;
use crate::validation::{
    validate_amount, validate_id, validate_non_negative, validate_optional_text,
    validate_promo_code, validate_quantity,
};
use crate::{MAX_CART_ITEMS, MAX_NOTES_LEN, MAX_ORDER_AMOUNT, MAX_UNIT_PRICE};

/// Payment method that requires the tendered amount to cover the total.
pub const CASH_PAYMENT_METHOD: &str = "CASH";

// =============================================================================
// Request DTOs
// =============================================================================

/// One line of a commit request.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct OrderLineRequest {
    #[serde(default)]
    pub product_id: String,
    #[serde(default)]
    pub name: String,
    pub quantity: i64,
    pub price: Money,
    /// Client-computed line subtotal. Ignored.
    #[serde(default)]
    pub subtotal: Option<Money>,
    #[serde(default)]
    pub discount: Option<Money>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub modifiers: Option<Vec<String>>,
}

impl OrderLineRequest {
    /// `price × quantity` before the line discount.
    pub fn gross(&self) -> Money {
        self.price.multiply_quantity(self.quantity)
    }

    pub fn line_discount(&self) -> Money {
        self.discount.unwrap_or_default()
    }

    /// `price × quantity − line discount`.
    pub fn line_subtotal(&self) -> Money {
        self.gross() - self.line_discount()
    }
}

/// Body of `POST /transactions`.
///
/// Required strings default to empty so that a missing field is reported by
/// [`CommitOrderRequest::validate`] with its field name instead of a generic
/// deserialization error.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CommitOrderRequest {
    #[serde(default)]
    pub items: Vec<OrderLineRequest>,
    #[serde(default)]
    pub subtotal: Option<Money>,
    #[serde(default)]
    pub tax: Option<Money>,
    #[serde(default)]
    pub discount: Option<Money>,
    #[serde(default)]
    pub total: Option<Money>,
    #[serde(default)]
    pub payment_method: String,
    #[serde(default)]
    pub payment_channel: Option<String>,
    #[serde(default)]
    pub payment_reference: Option<String>,
    #[serde(default)]
    pub amount_paid: Money,
    #[serde(default)]
    pub change: Option<Money>,
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub customer_phone: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub store_id: String,
    #[serde(default)]
    pub cashier_id: String,
    #[serde(default)]
    pub promo_code: Option<String>,
    /// Client-claimed promo discount. Never trusted.
    #[serde(default)]
    pub promo_discount: Option<Money>,
    #[serde(default)]
    pub order_type: Option<OrderType>,
    #[serde(default)]
    pub table_number: Option<String>,
}

impl CommitOrderRequest {
    /// Checks the request shape. Runs before any side effect.
    ///
    /// ## Rules
    /// - at least one item, at most MAX_CART_ITEMS
    /// - store id, cashier id, payment method present
    /// - each line: product id present, 1 ≤ quantity ≤ 999,
    ///   0 ≤ price ≤ MAX_UNIT_PRICE, 0 ≤ line discount ≤ price × quantity
    /// - 0 ≤ tax, discount, amount paid ≤ MAX_ORDER_AMOUNT
    pub fn validate(&self) -> CoreResult<()> {
        if self.items.is_empty() {
            return Err(CoreError::EmptyOrder);
        }
        if self.items.len() > MAX_CART_ITEMS {
            return Err(CoreError::CartTooLarge {
                max: MAX_CART_ITEMS,
            });
        }

        validate_id("storeId", &self.store_id)?;
        validate_id("cashierId", &self.cashier_id)?;
        if self.payment_method.trim().is_empty() {
            return Err(ValidationError::Required {
                field: "paymentMethod".to_string(),
            }
            .into());
        }

        for (idx, item) in self.items.iter().enumerate() {
            let line = idx + 1;
            validate_id("productId", &item.product_id)?;
            if item.quantity > crate::MAX_ITEM_QUANTITY {
                return Err(CoreError::QuantityTooLarge {
                    requested: item.quantity,
                    max: crate::MAX_ITEM_QUANTITY,
                });
            }
            validate_quantity(item.quantity)?;
            validate_amount("price", item.price, MAX_UNIT_PRICE)?;
            validate_non_negative("discount", item.line_discount())?;
            if item.line_discount() > item.gross() {
                return Err(CoreError::LineDiscountTooLarge {
                    line,
                    discount: item.line_discount(),
                    line_amount: item.gross(),
                });
            }
            validate_optional_text("notes", item.notes.as_deref(), MAX_NOTES_LEN)?;
        }

        validate_amount("tax", self.tax.unwrap_or_default(), MAX_ORDER_AMOUNT)?;
        validate_amount("discount", self.discount.unwrap_or_default(), MAX_ORDER_AMOUNT)?;
        validate_amount("amountPaid", self.amount_paid, MAX_ORDER_AMOUNT)?;
        validate_optional_text("notes", self.notes.as_deref(), MAX_NOTES_LEN)?;
        validate_optional_text("tableNumber", self.table_number.as_deref(), 32)?;
        if let Some(code) = self.promo_code() {
            validate_promo_code(code)?;
        }

        Ok(())
    }

    /// Case-insensitive `CASH`.
    pub fn is_cash(&self) -> bool {
        self.payment_method
            .trim()
            .eq_ignore_ascii_case(CASH_PAYMENT_METHOD)
    }

    /// The promo code when one was actually supplied (blank counts as none).
    pub fn promo_code(&self) -> Option<&str> {
        self.promo_code
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
    }

    /// The customer phone when one was actually supplied.
    pub fn customer_phone(&self) -> Option<&str> {
        self.customer_phone
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
    }

    /// Σ line subtotals, the base every promo is evaluated against.
    pub fn items_subtotal(&self) -> Money {
        self.items.iter().map(OrderLineRequest::line_subtotal).sum()
    }

    /// Projects the cart for the promo rules. `category_of` resolves a
    /// product id to its category, when known.
    pub fn promo_lines<F>(&self, category_of: F) -> Vec<PromoCartLine>
    where
        F: Fn(&str) -> Option<String>,
    {
        self.items
            .iter()
            .map(|item| PromoCartLine {
                product_id: item.product_id.clone(),
                category_id: category_of(&item.product_id),
                quantity: item.quantity,
                price: item.price,
            })
            .collect()
    }
}

// =============================================================================
// Totals
// =============================================================================

/// Server-computed amounts for a commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderTotals {
    /// One entry per request line, same order.
    pub line_subtotals: Vec<Money>,
    pub subtotal: Money,
    pub tax: Money,
    pub discount: Money,
    pub promo_discount: Money,
    pub total: Money,
    pub amount_paid: Money,
    pub change: Money,
}

impl OrderTotals {
    /// Recomputes every amount from the request lines and the server-side
    /// promo discount.
    ///
    /// ## Errors
    /// `InsufficientPayment` when paying cash and `amount_paid < total`.
    pub fn compute(request: &CommitOrderRequest, promo_discount: Money) -> CoreResult<Self> {
        let line_subtotals: Vec<Money> = request
            .items
            .iter()
            .map(OrderLineRequest::line_subtotal)
            .collect();
        let subtotal: Money = line_subtotals.iter().copied().sum();
        let tax = request.tax.unwrap_or_default();
        let discount = request.discount.unwrap_or_default();

        let total = (subtotal + tax - discount - promo_discount).non_negative();
        let amount_paid = request.amount_paid;

        if request.is_cash() && amount_paid < total {
            return Err(CoreError::InsufficientPayment {
                total,
                paid: amount_paid,
            });
        }

        Ok(Self {
            line_subtotals,
            subtotal,
            tax,
            discount,
            promo_discount,
            total,
            amount_paid,
            change: (amount_paid - total).non_negative(),
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
