//! `/transactions`: commit, list and delete.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use meridian_core::order::CommitOrderRequest;
use meridian_core::validation::{normalize_pagination, parse_business_date, validate_id};
use meridian_core::{Money, Transaction};
use meridian_db::TransactionFilter;

use crate::error::{ApiError, ApiResult};
use crate::services::order_commit::CommitPerformance;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route(
        "/transactions",
        post(create_transaction)
            .get(list_transactions)
            .delete(delete_transaction),
    )
}

// =============================================================================
// POST /transactions
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitResponse {
    pub success: bool,
    pub data: Transaction,
    pub performance: CommitPerformance,
}

async fn create_transaction(
    State(state): State<AppState>,
    body: Result<Json<CommitOrderRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<CommitResponse>)> {
    let Json(request) = body?;
    let outcome = state.commits.commit(request).await?;

    Ok((
        StatusCode::CREATED,
        Json(CommitResponse {
            success: true,
            data: outcome.transaction,
            performance: outcome.performance,
        }),
    ))
}

// =============================================================================
// GET /transactions
// =============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub store_id: Option<String>,
    pub cashier_id: Option<String>,
    /// `YYYY-MM-DD` business date, inclusive.
    pub start_date: Option<String>,
    /// `YYYY-MM-DD` business date, inclusive.
    pub end_date: Option<String>,
    pub search: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: i64,
    pub total_pages: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListSummary {
    pub count: i64,
    pub total_revenue: Money,
    pub average_transaction: Money,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResponse {
    pub success: bool,
    pub data: Vec<Transaction>,
    pub pagination: Pagination,
    pub summary: ListSummary,
}

async fn list_transactions(
    State(state): State<AppState>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> ApiResult<Json<ListResponse>> {
    let Query(query) = query?;
    let filter = build_filter(&query, state.config.business_offset)?;
    let (page, limit) = normalize_pagination(query.page, query.limit);

    let result = state.db.transactions().list(&filter, page, limit).await?;

    let total = result.total_count;
    let limit_i64 = i64::from(limit);
    Ok(Json(ListResponse {
        success: true,
        data: result.transactions,
        pagination: Pagination {
            page,
            limit,
            total,
            total_pages: (total + limit_i64 - 1) / limit_i64,
        },
        summary: ListSummary {
            count: total,
            total_revenue: result.total_revenue,
            average_transaction: average(result.total_revenue, total),
        },
    }))
}

/// Turns query parameters into a repository filter. Business dates become
/// a half-open UTC range `[start 00:00 local, end+1 00:00 local)`.
fn build_filter(query: &ListQuery, offset: FixedOffset) -> ApiResult<TransactionFilter> {
    let store_id = query.store_id.as_deref().unwrap_or_default().trim();
    validate_id("storeId", store_id)?;

    let start = query
        .start_date
        .as_deref()
        .filter(|d| !d.trim().is_empty())
        .map(|d| parse_business_date("startDate", d))
        .transpose()?;
    let end = query
        .end_date
        .as_deref()
        .filter(|d| !d.trim().is_empty())
        .map(|d| parse_business_date("endDate", d))
        .transpose()?;

    if let (Some(start), Some(end)) = (start, end) {
        if start > end {
            return Err(ApiError::validation("startDate must not be after endDate"));
        }
    }

    let non_blank = |value: &Option<String>| {
        value
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };

    Ok(TransactionFilter {
        store_id: store_id.to_string(),
        cashier_id: non_blank(&query.cashier_id),
        created_from: start.map(|d| local_midnight(d, offset)),
        created_before: end
            .and_then(|d| d.succ_opt())
            .map(|d| local_midnight(d, offset)),
        search: non_blank(&query.search),
    })
}

fn local_midnight(date: NaiveDate, offset: FixedOffset) -> DateTime<Utc> {
    let local = date.and_time(NaiveTime::MIN);
    Utc.from_utc_datetime(&(local - Duration::seconds(i64::from(offset.local_minus_utc()))))
}

/// Mean transaction value, rounded half-up.
fn average(total: Money, count: i64) -> Money {
    if count <= 0 {
        return Money::zero();
    }
    Money::from_minor((total.minor() * 2 + count) / (count * 2))
}

// =============================================================================
// DELETE /transactions?id=
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct DeleteQuery {
    pub id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub success: bool,
    pub message: String,
}

/// Administrative hard delete. Stock and promo usage are not reversed.
async fn delete_transaction(
    State(state): State<AppState>,
    query: Result<Query<DeleteQuery>, QueryRejection>,
) -> ApiResult<Json<DeleteResponse>> {
    let Query(query) = query?;
    let id = query.id.as_deref().unwrap_or_default().trim();
    validate_id("id", id)?;

    state.db.transactions().delete(id).await?;
    info!(transaction_id = %id, "Transaction deleted");

    Ok(Json(DeleteResponse {
        success: true,
        message: "Transaction deleted".to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::build_router;
    use crate::test_support::{insert_cashier, insert_product, recording_state, test_db, test_state};
    use meridian_core::KDS_ENABLED_SETTING;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    async fn send(state: &AppState, request: Request<Body>) -> (StatusCode, Value) {
        let response = build_router(state.clone()).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn order_body(quantity: i64) -> Value {
        json!({
            "items": [{ "productId": "p-1", "name": "Iced Latte", "quantity": quantity, "price": 15000 }],
            "paymentMethod": "CASH",
            "amountPaid": 50000,
            "storeId": "store-1",
            "cashierId": "cashier-1"
        })
    }

    async fn seeded_state() -> AppState {
        let state = test_state().await;
        insert_cashier(&state.db, "cashier-1", true).await;
        insert_product(&state.db, "p-1", 50, None).await;
        state
    }

    #[tokio::test]
    async fn test_create_returns_201_with_items_and_timing() {
        let state = seeded_state().await;

        let (status, body) = send(&state, post_json("/transactions", order_body(2))).await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["total"], 30000);
        assert_eq!(body["data"]["change"], 20000);
        assert_eq!(body["data"]["items"].as_array().unwrap().len(), 1);
        assert!(body["performance"]["totalMs"].is_u64());
    }

    #[tokio::test]
    async fn test_create_rejects_empty_and_malformed_bodies() {
        let state = seeded_state().await;

        let mut empty = order_body(1);
        empty["items"] = json!([]);
        let (status, body) = send(&state, post_json("/transactions", empty)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

        let (status, body) = send(&state, post_json("/transactions", json!({ "items": "nope" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);

        assert_eq!(state.db.transactions().count("store-1").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_create_rejects_amounts_that_would_overflow() {
        let state = seeded_state().await;

        let mut huge_price = order_body(3);
        huge_price["items"][0]["price"] = json!(i64::MAX / 2);
        let (status, body) = send(&state, post_json("/transactions", huge_price)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

        let mut huge_tax = order_body(1);
        huge_tax["tax"] = json!(i64::MAX);
        let (status, _) = send(&state, post_json("/transactions", huge_tax)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        assert_eq!(state.db.transactions().count("store-1").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_create_with_unknown_cashier_is_forbidden() {
        let state = seeded_state().await;
        let mut body = order_body(1);
        body["cashierId"] = json!("cashier-x");

        let (status, body) = send(&state, post_json("/transactions", body)).await;

        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"]["code"], "FORBIDDEN");
        assert_eq!(body["error"]["message"], "Invalid or inactive cashier");
    }

    #[tokio::test]
    async fn test_kds_store_gets_ticket() {
        let (state, notifier) = recording_state(test_db().await);
        insert_cashier(&state.db, "cashier-1", true).await;
        insert_product(&state.db, "p-1", 50, None).await;
        state
            .db
            .settings()
            .set("store-1", KDS_ENABLED_SETTING, "true")
            .await
            .unwrap();
        let mut order = order_body(1);
        order["orderType"] = json!("TAKEAWAY");
        order["tableNumber"] = json!("5");

        let (status, body) = send(&state, post_json("/transactions", order)).await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["data"]["orderType"], "TAKEAWAY");
        assert_eq!(body["data"]["kitchenStatus"], "PENDING");
        assert_eq!(body["data"]["items"][0]["station"], "KITCHEN");
        assert_eq!(notifier.events().len(), 1);
    }

    #[tokio::test]
    async fn test_list_paginates_and_summarizes_whole_set() {
        let state = seeded_state().await;
        for quantity in [1, 2, 2] {
            let (status, _) = send(&state, post_json("/transactions", order_body(quantity))).await;
            assert_eq!(status, StatusCode::CREATED);
        }

        let (status, body) = send(&state, get("/transactions?storeId=store-1&limit=2")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"].as_array().unwrap().len(), 2);
        assert_eq!(body["pagination"]["total"], 3);
        assert_eq!(body["pagination"]["totalPages"], 2);
        assert_eq!(body["summary"]["count"], 3);
        assert_eq!(body["summary"]["totalRevenue"], 75000);
        assert_eq!(body["summary"]["averageTransaction"], 25000);
    }

    #[tokio::test]
    async fn test_list_validates_query() {
        let state = seeded_state().await;

        let (status, _) = send(&state, get("/transactions")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(&state, get("/transactions?storeId=store-1&startDate=01-03-2024")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(
            &state,
            get("/transactions?storeId=store-1&startDate=2024-03-02&endDate=2024-03-01"),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_delete_then_404() {
        let state = seeded_state().await;
        let (_, created) = send(&state, post_json("/transactions", order_body(1))).await;
        let id = created["data"]["id"].as_str().unwrap().to_string();

        let delete = |id: &str| {
            Request::builder()
                .method("DELETE")
                .uri(format!("/transactions?id={}", id))
                .body(Body::empty())
                .unwrap()
        };

        let (status, _) = send(&state, delete(&id)).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send(&state, delete(&id)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NOT_FOUND");
    }

    #[test]
    fn test_business_dates_become_local_midnights() {
        let offset = FixedOffset::east_opt(7 * 3600).unwrap();
        let query = ListQuery {
            store_id: Some("store-1".to_string()),
            start_date: Some("2024-03-01".to_string()),
            end_date: Some("2024-03-01".to_string()),
            ..Default::default()
        };

        let filter = build_filter(&query, offset).unwrap();

        assert_eq!(
            filter.created_from,
            Some(Utc.with_ymd_and_hms(2024, 2, 29, 17, 0, 0).unwrap())
        );
        assert_eq!(
            filter.created_before,
            Some(Utc.with_ymd_and_hms(2024, 3, 1, 17, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_average_rounds_half_up() {
        assert_eq!(average(Money::from_minor(10), 4).minor(), 3);
        assert_eq!(average(Money::from_minor(9), 4).minor(), 2);
        assert_eq!(average(Money::from_minor(500), 0).minor(), 0);
    }
}
