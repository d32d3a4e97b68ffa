//! # Promo Validator
//!
//! The I/O half of promo validation: look the promo up, count the
//! customer's prior redemptions, then hand everything to the pure rules in
//! [`meridian_core::promo::evaluate`].
//!
//! ```text
//! code ──► validate_promo_code ──► PromoRepository::find_active_by_code
//!                                          │
//!               per-customer limit + phone? ──► count_customer_usage
//!                                          │
//!                                          ▼
//!              evaluate(promo, PromoContext { now (store tz), subtotal, lines })
//!                                          │
//!                        ┌─────────────────┴─────────────────┐
//!                        ▼                                   ▼
//!          PromoOutcome::Valid { promo, application }   PromoOutcome::Invalid { reason }
//! ```
//!
//! Nothing is written here. Usage is recorded by the commit pipeline after
//! the transaction is persisted.

use std::collections::HashMap;

use chrono::{DateTime, FixedOffset, Utc};
use tracing::{debug, warn};

use meridian_core::promo::{evaluate, Promo, PromoApplication, PromoCartLine, PromoContext, PromoRejection};
use meridian_core::validation::validate_promo_code;
use meridian_core::{Money, Product};
use meridian_db::{Database, DbResult};

/// Result of validating a code against a cart.
#[derive(Debug, Clone)]
pub enum PromoOutcome {
    Valid {
        promo: Promo,
        application: PromoApplication,
    },
    Invalid {
        reason: String,
    },
}

impl PromoOutcome {
    fn invalid(reason: impl ToString) -> Self {
        PromoOutcome::Invalid {
            reason: reason.to_string(),
        }
    }
}

/// Validates promo codes for one deployment's business timezone.
#[derive(Debug, Clone)]
pub struct PromoValidator {
    db: Database,
    offset: FixedOffset,
}

impl PromoValidator {
    pub fn new(db: Database, offset: FixedOffset) -> Self {
        PromoValidator { db, offset }
    }

    /// Validates `code` as of now.
    pub async fn validate(
        &self,
        store_id: &str,
        code: &str,
        subtotal: Money,
        lines: &[PromoCartLine],
        customer_phone: Option<&str>,
    ) -> DbResult<PromoOutcome> {
        self.validate_at(store_id, code, subtotal, lines, customer_phone, Utc::now())
            .await
    }

    /// Validates `code` as of `now`.
    ///
    /// ## Errors
    /// Only database failures; every business rejection is a
    /// [`PromoOutcome::Invalid`].
    pub async fn validate_at(
        &self,
        store_id: &str,
        code: &str,
        subtotal: Money,
        lines: &[PromoCartLine],
        customer_phone: Option<&str>,
        now: DateTime<Utc>,
    ) -> DbResult<PromoOutcome> {
        let code = match validate_promo_code(code) {
            Ok(code) => code,
            Err(e) => return Ok(PromoOutcome::invalid(e)),
        };

        let Some(promo) = self.db.promos().find_active_by_code(store_id, &code).await? else {
            debug!(store_id = %store_id, code = %code, "Promo not found");
            return Ok(PromoOutcome::invalid(PromoRejection::NotFound));
        };

        let phone = customer_phone.map(str::trim).filter(|p| !p.is_empty());
        let customer_uses = match (promo.per_customer_limit, phone) {
            (Some(_), Some(phone)) => Some(
                self.db
                    .promos()
                    .count_customer_usage(store_id, &code, phone)
                    .await?,
            ),
            _ => None,
        };

        let ctx = PromoContext {
            now: now.with_timezone(&self.offset),
            subtotal,
            lines,
            customer_uses,
        };

        Ok(match evaluate(&promo, &ctx) {
            Ok(application) => {
                debug!(
                    store_id = %store_id,
                    code = %code,
                    discount = %application.discount,
                    "Promo eligible"
                );
                PromoOutcome::Valid { promo, application }
            }
            Err(rejection) => {
                debug!(store_id = %store_id, code = %code, reason = %rejection, "Promo rejected");
                PromoOutcome::invalid(rejection)
            }
        })
    }

    /// Fills in missing line categories from the product table.
    ///
    /// A lookup failure leaves the lines as they are; category-restricted
    /// promos then simply do not match.
    pub async fn fill_categories(&self, store_id: &str, lines: &mut [PromoCartLine]) {
        let missing: Vec<String> = lines
            .iter()
            .filter(|l| l.category_id.is_none())
            .map(|l| l.product_id.clone())
            .collect();
        if missing.is_empty() {
            return;
        }

        let products: HashMap<String, Product> =
            match self.db.products().find_many(store_id, &missing).await {
                Ok(products) => products,
                Err(e) => {
                    warn!(store_id = %store_id, error = %e, "Product lookup for promo failed");
                    return;
                }
            };

        for line in lines.iter_mut().filter(|l| l.category_id.is_none()) {
            line.category_id = products
                .get(&line.product_id)
                .and_then(|p| p.category_id.clone());
        }
    }
}
