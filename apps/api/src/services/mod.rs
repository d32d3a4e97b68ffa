//! Business services sitting between the HTTP handlers and the repositories.
//!
//! - [`order_commit`] - The transaction commit pipeline
//! - [`promo`] - Promo code validation against a cart

pub mod order_commit;
pub mod promo;
