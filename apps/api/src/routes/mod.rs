//! HTTP routes.
//!
//! | Method | Path                  | Handler                              |
//! |--------|-----------------------|--------------------------------------|
//! | POST   | `/transactions`       | commit an order                      |
//! | GET    | `/transactions`       | filtered, paginated listing          |
//! | DELETE | `/transactions?id=`   | administrative hard delete           |
//! | POST   | `/promos/validate`    | check a promo code against a cart    |
//! | GET    | `/kitchen/ws?storeId=`| kitchen display WebSocket            |
//! | GET    | `/health`             | liveness + database check            |

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub mod health;
pub mod kitchen;
pub mod promos;
pub mod transactions;

/// Builds the application with every route, middleware and the state.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(transactions::router())
        .merge(promos::router())
        .merge(kitchen::router())
        .merge(health::router())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
