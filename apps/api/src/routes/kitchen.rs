//! `GET /kitchen/ws?storeId=`: kitchen display event stream.

use axum::extract::rejection::QueryRejection;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Query, State};
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use serde::Deserialize;

use meridian_core::validation::validate_id;

use crate::error::ApiResult;
use crate::kitchen::run_display_session;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/kitchen/ws", get(kitchen_ws))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KitchenQuery {
    pub store_id: Option<String>,
}

async fn kitchen_ws(
    State(state): State<AppState>,
    query: Result<Query<KitchenQuery>, QueryRejection>,
    ws: WebSocketUpgrade,
) -> ApiResult<Response> {
    let Query(query) = query?;
    let store_id = query.store_id.unwrap_or_default().trim().to_string();
    validate_id("storeId", &store_id)?;

    let hub = state.hub.clone();
    Ok(ws.on_upgrade(move |socket| run_display_session(socket, hub, store_id)))
}
