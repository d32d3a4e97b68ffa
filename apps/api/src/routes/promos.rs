//! `POST /promos/validate`: checks a code against a cart without redeeming it.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use meridian_core::promo::{PromoCartLine, PromoKind};
use meridian_core::validation::{validate_amount, validate_id, validate_quantity};
use meridian_core::{CoreError, Money, MAX_CART_ITEMS, MAX_ORDER_AMOUNT, MAX_UNIT_PRICE};

use crate::error::ApiResult;
use crate::services::promo::PromoOutcome;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/promos/validate", post(validate_promo))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidatePromoRequest {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub store_id: String,
    /// Defaults to Σ price × quantity of `items`.
    #[serde(default)]
    pub subtotal: Option<Money>,
    #[serde(default)]
    pub items: Vec<ValidatePromoItem>,
    #[serde(default)]
    pub customer_phone: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidatePromoItem {
    pub product_id: String,
    #[serde(default)]
    pub category_id: Option<String>,
    pub quantity: i64,
    pub price: Money,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PromoSummary {
    pub id: String,
    pub code: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    /// Percent for PERCENTAGE (`12.5`), minor units for FIXED, 0 for BUY_X_GET_Y.
    pub value: Value,
}

fn wire_value(kind: &PromoKind) -> Value {
    match kind {
        PromoKind::Percentage { percent_bps, .. } if *percent_bps % 100 == 0 => {
            Value::from(*percent_bps / 100)
        }
        PromoKind::Percentage { percent_bps, .. } => Value::from(f64::from(*percent_bps) / 100.0),
        other => Value::from(other.value()),
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidatePromoResponse {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub promo: Option<PromoSummary>,
    pub discount: Money,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Business rejections are a `200` with `valid: false`. A malformed body, a
/// missing store id or an out-of-range item or subtotal is a `400`.
async fn validate_promo(
    State(state): State<AppState>,
    body: Result<Json<ValidatePromoRequest>, JsonRejection>,
) -> ApiResult<Json<ValidatePromoResponse>> {
    let Json(request) = body?;
    let store_id = request.store_id.trim();
    validate_id("storeId", store_id)?;
    if request.items.len() > MAX_CART_ITEMS {
        return Err(CoreError::CartTooLarge {
            max: MAX_CART_ITEMS,
        }
        .into());
    }
    for item in &request.items {
        validate_quantity(item.quantity)?;
        validate_amount("price", item.price, MAX_UNIT_PRICE)?;
    }
    if let Some(subtotal) = request.subtotal {
        validate_amount("subtotal", subtotal, MAX_ORDER_AMOUNT)?;
    }

    let mut lines: Vec<PromoCartLine> = request
        .items
        .into_iter()
        .map(|item| PromoCartLine {
            product_id: item.product_id,
            category_id: item.category_id.filter(|c| !c.trim().is_empty()),
            quantity: item.quantity,
            price: item.price,
        })
        .collect();
    state.promos.fill_categories(store_id, &mut lines).await;

    let subtotal = request
        .subtotal
        .unwrap_or_else(|| lines.iter().map(|l| l.price.multiply_quantity(l.quantity)).sum());

    let outcome = state
        .promos
        .validate(
            store_id,
            &request.code,
            subtotal,
            &lines,
            request.customer_phone.as_deref(),
        )
        .await?;

    Ok(Json(match outcome {
        PromoOutcome::Valid { promo, application } => ValidatePromoResponse {
            valid: true,
            discount: application.discount,
            message: Some(application.message),
            error: None,
            promo: Some(PromoSummary {
                kind: promo.kind.type_name(),
                value: wire_value(&promo.kind),
                id: promo.id,
                code: promo.code,
                name: promo.name,
            }),
        },
        PromoOutcome::Invalid { reason } => ValidatePromoResponse {
            valid: false,
            promo: None,
            discount: Money::zero(),
            message: None,
            error: Some(reason),
        },
    }))
}
