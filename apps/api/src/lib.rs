//! # Meridian API
//!
//! HTTP/WebSocket front of the order commit pipeline.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  routes ──► services::order_commit ──► meridian-db repositories         │
//! │    │              │                                                     │
//! │    │              └──► kitchen::KitchenNotifier ──► KitchenHub ──► /ws  │
//! │    │                                                                    │
//! │    └──► services::promo (PromoValidator) ──► meridian-core::promo       │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod kitchen;
pub mod routes;
pub mod services;
pub mod state;

#[cfg(test)]
mod test_support;

pub use config::{ApiConfig, ConfigError};
pub use error::{ApiError, ApiResult, CommitError, ErrorCode};
pub use routes::build_router;
pub use state::AppState;
