//! # Order Commit Pipeline
//!
//! Turns a cart into a durable, uniquely numbered transaction.
//!
//! ## Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  PRE-COMMIT (any failure aborts, nothing is written)                    │
//! │                                                                         │
//! │  1. request.validate()                 ── CoreError ──► 400             │
//! │  2. kds_enabled setting                ── read error ──► false          │
//! │  3. active cashier in store            ── missing ──► 403               │
//! │  4. products, promo re-validation      ── invalid ──► promo dropped     │
//! │     OrderTotals::compute               ── cash short ──► 400            │
//! │                                                                         │
//! │  COMMIT                                                                 │
//! │                                                                         │
//! │  5. InvoiceSequencer::next_at          ── exhausted ──► 500             │
//! │  6. insert_with_items (one SQL tx)     ── invoice collision ──► step 5  │
//! │                                           (bounded) else 500            │
//! │                                                                         │
//! │  POST-COMMIT (each step logged on failure, the sale stands)             │
//! │                                                                         │
//! │  7. decrement_stock per line (concurrent)                               │
//! │  8. kitchen notify (KDS only)                                           │
//! │  9. promo usage log + usage_count + 1 (discount > 0 only)               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use serde::Serialize;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use meridian_core::kitchen::{KitchenEvent, KitchenTicket, DEFAULT_KITCHEN_STATION};
use meridian_core::order::{CommitOrderRequest, OrderTotals};
use meridian_core::promo::Promo;
use meridian_core::{
    Cashier, KitchenStatus, Money, Product, PromoUsageLog, Transaction, TransactionItem,
    KDS_ENABLED_SETTING,
};
use meridian_db::{Database, InvoiceSequencer};

use crate::config::ApiConfig;
use crate::error::CommitError;
use crate::kitchen::KitchenNotifier;
use crate::services::promo::{PromoOutcome, PromoValidator};

/// Invoice numbers tried when the insert hits the unique index.
const MAX_INVOICE_COLLISIONS: u32 = 3;

// =============================================================================
// Context and Outcome
// =============================================================================

/// Per-request facts resolved once before the commit and threaded through.
#[derive(Debug, Clone)]
pub struct CommitContext {
    pub received_at: DateTime<Utc>,
    pub kds_enabled: bool,
    pub cashier: Cashier,
}

/// The promo that survived server-side re-validation.
#[derive(Debug, Clone)]
struct AppliedPromo {
    promo: Promo,
    discount: Money,
}

/// Wall-clock time per pipeline step, in milliseconds.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitPerformance {
    pub validate_ms: u64,
    pub settings_ms: u64,
    pub cashier_ms: u64,
    pub pricing_ms: u64,
    pub invoice_ms: u64,
    pub persist_ms: u64,
    pub stock_ms: u64,
    pub kitchen_ms: u64,
    pub promo_log_ms: u64,
    pub total_ms: u64,
}

/// A committed order.
#[derive(Debug, Clone)]
pub struct CommitOutcome {
    pub transaction: Transaction,
    pub performance: CommitPerformance,
}

fn elapsed_ms(since: Instant) -> u64 {
    since.elapsed().as_millis() as u64
}

// =============================================================================
// Service
// =============================================================================

/// Runs the order commit pipeline.
pub struct OrderCommitService {
    db: Database,
    promos: PromoValidator,
    invoices: InvoiceSequencer,
    notifier: Arc<dyn KitchenNotifier>,
}

impl OrderCommitService {
    pub fn new(db: Database, config: &ApiConfig, notifier: Arc<dyn KitchenNotifier>) -> Self {
        OrderCommitService {
            promos: PromoValidator::new(db.clone(), config.business_offset),
            invoices: db.invoices(config.invoice_prefix.clone(), config.business_offset),
            db,
            notifier,
        }
    }

    /// Commits an order.
    ///
    /// ## Errors
    /// See [`CommitError`]. Once this returns `Ok`, the transaction and all
    /// of its items are durable; post-commit problems are only logged.
    pub async fn commit(&self, request: CommitOrderRequest) -> Result<CommitOutcome, CommitError> {
        let started = Instant::now();
        let mut perf = CommitPerformance::default();

        // 1. Shape
        let step = Instant::now();
        request.validate()?;
        perf.validate_ms = elapsed_ms(step);

        // 2-3. Context
        let step = Instant::now();
        let kds_enabled = self.kds_enabled(&request.store_id).await;
        perf.settings_ms = elapsed_ms(step);

        let step = Instant::now();
        let cashier = self.verify_cashier(&request).await?;
        perf.cashier_ms = elapsed_ms(step);

        let ctx = CommitContext {
            received_at: Utc::now(),
            kds_enabled,
            cashier,
        };

        // 4. Pricing
        let step = Instant::now();
        let products = self.load_products(&request).await;
        let promo = self.revalidate_promo(&request, &products, &ctx).await;
        let promo_discount = promo.as_ref().map(|p| p.discount).unwrap_or_default();
        let totals = OrderTotals::compute(&request, promo_discount)?;
        perf.pricing_ms = elapsed_ms(step);

        // 5-6. Invoice + persist
        let transaction = self
            .persist(&request, &ctx, &products, &totals, promo.as_ref(), &mut perf)
            .await?;

        info!(
            store_id = %transaction.store_id,
            invoice = %transaction.invoice_number,
            total = %transaction.total,
            items = transaction.items.len(),
            kds = ctx.kds_enabled,
            "Transaction committed"
        );

        // 7. Stock
        let step = Instant::now();
        self.adjust_stock(&transaction).await;
        perf.stock_ms = elapsed_ms(step);

        // 8. Kitchen
        let step = Instant::now();
        if ctx.kds_enabled {
            self.dispatch_to_kitchen(&transaction).await;
        }
        perf.kitchen_ms = elapsed_ms(step);

        // 9. Promo usage
        let step = Instant::now();
        if let Some(applied) = promo.as_ref().filter(|p| p.discount.is_positive()) {
            self.log_promo_usage(applied, &transaction).await;
        }
        perf.promo_log_ms = elapsed_ms(step);

        perf.total_ms = elapsed_ms(started);
        Ok(CommitOutcome {
            transaction,
            performance: perf,
        })
    }

    // =========================================================================
    // Pre-commit
    // =========================================================================

    async fn kds_enabled(&self, store_id: &str) -> bool {
        match self.db.settings().get_bool(store_id, KDS_ENABLED_SETTING).await {
            Ok(enabled) => enabled,
            Err(e) => {
                warn!(store_id = %store_id, error = %e, "KDS setting lookup failed, assuming disabled");
                false
            }
        }
    }

    async fn verify_cashier(&self, request: &CommitOrderRequest) -> Result<Cashier, CommitError> {
        match self
            .db
            .cashiers()
            .find_active(&request.store_id, &request.cashier_id)
            .await
        {
            Ok(Some(cashier)) => Ok(cashier),
            Ok(None) => {
                warn!(
                    store_id = %request.store_id,
                    cashier_id = %request.cashier_id,
                    "Commit rejected: invalid or inactive cashier"
                );
                Err(CommitError::Unauthorized)
            }
            Err(e) => Err(CommitError::Persistence(e)),
        }
    }

    /// Products referenced by the cart. Missing rows only cost enrichment
    /// (categories for promos, stations for the kitchen).
    async fn load_products(&self, request: &CommitOrderRequest) -> HashMap<String, Product> {
        let mut ids: Vec<String> = request.items.iter().map(|i| i.product_id.clone()).collect();
        ids.sort();
        ids.dedup();

        match self.db.products().find_many(&request.store_id, &ids).await {
            Ok(products) => products,
            Err(e) => {
                warn!(store_id = %request.store_id, error = %e, "Product lookup failed, continuing without it");
                HashMap::new()
            }
        }
    }

    /// Re-runs promo validation with server data. The client's promo
    /// discount is never used.
    async fn revalidate_promo(
        &self,
        request: &CommitOrderRequest,
        products: &HashMap<String, Product>,
        ctx: &CommitContext,
    ) -> Option<AppliedPromo> {
        let code = request.promo_code()?;
        let lines = request.promo_lines(|id| products.get(id).and_then(|p| p.category_id.clone()));

        let outcome = self
            .promos
            .validate_at(
                &request.store_id,
                code,
                request.items_subtotal(),
                &lines,
                request.customer_phone(),
                ctx.received_at,
            )
            .await;

        match outcome {
            Ok(PromoOutcome::Valid { promo, application }) => {
                if application.discount.is_zero() {
                    debug!(code = %promo.code, message = %application.message, "Promo valid but not triggered");
                    return None;
                }
                if let Some(claimed) = request.promo_discount.filter(|c| *c != application.discount) {
                    debug!(
                        code = %promo.code,
                        claimed = %claimed,
                        computed = %application.discount,
                        "Client promo discount overridden"
                    );
                }
                Some(AppliedPromo {
                    promo,
                    discount: application.discount,
                })
            }
            Ok(PromoOutcome::Invalid { reason }) => {
                info!(store_id = %request.store_id, code = %code, reason = %reason, "Promo dropped");
                None
            }
            Err(e) => {
                warn!(store_id = %request.store_id, code = %code, error = %e, "Promo re-validation failed, promo dropped");
                None
            }
        }
    }

    // =========================================================================
    // Commit
    // =========================================================================

    async fn persist(
        &self,
        request: &CommitOrderRequest,
        ctx: &CommitContext,
        products: &HashMap<String, Product>,
        totals: &OrderTotals,
        promo: Option<&AppliedPromo>,
        perf: &mut CommitPerformance,
    ) -> Result<Transaction, CommitError> {
        let mut transaction = assemble(request, ctx, products, totals, promo);
        let repo = self.db.transactions();

        let mut attempt = 1;
        loop {
            let step = Instant::now();
            transaction.invoice_number = self
                .invoices
                .next_at(&request.store_id, ctx.received_at)
                .await
                .map_err(CommitError::SequencingFailed)?;
            perf.invoice_ms += elapsed_ms(step);

            let step = Instant::now();
            let result = repo.insert_with_items(&transaction).await;
            perf.persist_ms += elapsed_ms(step);

            match result {
                Ok(()) => return Ok(transaction),
                Err(e) if e.is_unique_violation_on("invoice_number") => {
                    if attempt >= MAX_INVOICE_COLLISIONS {
                        return Err(CommitError::SequencingFailed(e));
                    }
                    warn!(
                        store_id = %request.store_id,
                        invoice = %transaction.invoice_number,
                        attempt,
                        "Invoice number already used, allocating another"
                    );
                    attempt += 1;
                }
                Err(e) => return Err(CommitError::Persistence(e)),
            }
        }
    }

    // =========================================================================
    // Post-commit
    // =========================================================================

    /// One decrement per line, run concurrently. Failures are independent.
    async fn adjust_stock(&self, transaction: &Transaction) {
        let repo = self.db.products();
        let results = join_all(transaction.items.iter().map(|item| {
            let repo = repo.clone();
            async move {
                let result = repo
                    .decrement_stock(&transaction.store_id, &item.product_id, item.quantity)
                    .await;
                (item, result)
            }
        }))
        .await;

        for (item, result) in results {
            if let Err(e) = result {
                warn!(
                    invoice = %transaction.invoice_number,
                    product_id = %item.product_id,
                    quantity = item.quantity,
                    error = %e,
                    "Stock decrement failed"
                );
            }
        }
    }

    async fn dispatch_to_kitchen(&self, transaction: &Transaction) {
        let Some(ticket) = KitchenTicket::from_transaction(transaction) else {
            return;
        };
        if let Err(e) = self.notifier.notify(KitchenEvent::OrderCreated(ticket)).await {
            warn!(
                store_id = %transaction.store_id,
                invoice = %transaction.invoice_number,
                error = %e,
                "Kitchen dispatch failed"
            );
        }
    }

    async fn log_promo_usage(&self, applied: &AppliedPromo, transaction: &Transaction) {
        let log = PromoUsageLog {
            id: Uuid::new_v4().to_string(),
            promo_id: applied.promo.id.clone(),
            promo_code: applied.promo.code.clone(),
            customer_phone: transaction.customer_phone.clone(),
            transaction_id: transaction.id.clone(),
            invoice_number: transaction.invoice_number.clone(),
            discount: applied.discount,
            cashier_id: transaction.cashier_id.clone(),
            store_id: transaction.store_id.clone(),
            created_at: Utc::now(),
        };

        if let Err(e) = self.db.promos().record_usage(&log).await {
            error!(
                code = %log.promo_code,
                invoice = %log.invoice_number,
                error = %e,
                "Promo usage logging failed"
            );
        }
    }
}

// =============================================================================
// Assembly
// =============================================================================

/// Builds the transaction row (invoice number filled in later).
fn assemble(
    request: &CommitOrderRequest,
    ctx: &CommitContext,
    products: &HashMap<String, Product>,
    totals: &OrderTotals,
    promo: Option<&AppliedPromo>,
) -> Transaction {
    let transaction_id = Uuid::new_v4().to_string();
    let now = ctx.received_at;
    let kds = ctx.kds_enabled;

    let items = request
        .items
        .iter()
        .zip(&totals.line_subtotals)
        .map(|(line, subtotal)| {
            let product = products.get(&line.product_id);
            let name = Some(line.name.trim())
                .filter(|n| !n.is_empty())
                .map(str::to_string)
                .or_else(|| product.map(|p| p.name.clone()))
                .unwrap_or_else(|| line.product_id.clone());

            TransactionItem {
                id: Uuid::new_v4().to_string(),
                transaction_id: transaction_id.clone(),
                product_id: line.product_id.clone(),
                product_name: name,
                quantity: line.quantity,
                price: line.price,
                discount: line.line_discount(),
                subtotal: *subtotal,
                notes: line.notes.clone(),
                station: kds.then(|| {
                    product
                        .and_then(|p| p.kitchen_station.clone())
                        .unwrap_or_else(|| DEFAULT_KITCHEN_STATION.to_string())
                }),
                kitchen_status: kds.then_some(KitchenStatus::Pending),
                prep_time_minutes: if kds {
                    product.and_then(|p| p.prep_time_minutes)
                } else {
                    None
                },
                modifiers: if kds { line.modifiers.clone() } else { None },
                created_at: now,
            }
        })
        .collect();

    Transaction {
        id: transaction_id,
        store_id: request.store_id.clone(),
        invoice_number: String::new(),
        subtotal: totals.subtotal,
        tax: totals.tax,
        discount: totals.discount,
        promo_code: promo.map(|p| p.promo.code.clone()),
        promo_discount: totals.promo_discount,
        total: totals.total,
        payment_method: request.payment_method.trim().to_uppercase(),
        payment_channel: request.payment_channel.clone(),
        payment_reference: request.payment_reference.clone(),
        amount_paid: totals.amount_paid,
        change: totals.change,
        customer_name: request.customer_name.clone(),
        customer_phone: request.customer_phone().map(str::to_string),
        cashier_id: ctx.cashier.id.clone(),
        notes: request.notes.clone(),
        order_type: kds.then(|| request.order_type.unwrap_or_default()),
        table_number: if kds { request.table_number.clone() } else { None },
        kitchen_status: kds.then_some(KitchenStatus::Pending),
        sent_to_kitchen_at: kds.then_some(now),
        kitchen_completed_at: None,
        created_at: now,
        items,
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kitchen::KitchenHub;
    use crate::test_support::{
        commit_request, file_db, insert_cashier, insert_product, insert_promo, order_line,
        product_row, test_config, test_db, FailingNotifier, RecordingNotifier,
    };
    use meridian_core::promo::PromoKind;
    use meridian_core::OrderType;
    use std::collections::HashSet;

    fn service(db: &Database, notifier: Arc<dyn KitchenNotifier>) -> OrderCommitService {
        OrderCommitService::new(db.clone(), &test_config(), notifier)
    }

    async fn seeded_db() -> Database {
        let db = test_db().await;
        insert_cashier(&db, "cashier-1", true).await;
        insert_product(&db, "p-1", 10, Some("BAR")).await;
        insert_product(&db, "p-2", 10, None).await;
        db
    }

    async fn stock(db: &Database, id: &str) -> i64 {
        db.products().get_by_id(id).await.unwrap().unwrap().stock
    }

    /// Forgets every allocated sequence, as after restoring an old counter table.
    async fn reset_invoice_counters(db: &Database) {
        sqlx::query("DELETE FROM invoice_counters")
            .execute(db.pool())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_commit_computes_totals_server_side() {
        let db = seeded_db().await;
        let svc = service(&db, Arc::new(KitchenHub::new(8)));
        let mut request = commit_request(vec![order_line("p-1", 2, 15_000), order_line("p-2", 1, 20_000)]);
        request.tax = Some(Money::from_minor(5_000));
        request.total = Some(Money::from_minor(1));
        request.change = Some(Money::from_minor(1));

        let outcome = svc.commit(request).await.unwrap();
        let tx = &outcome.transaction;

        assert_eq!(tx.subtotal.minor(), 50_000);
        assert_eq!(tx.total.minor(), 55_000);
        assert_eq!(tx.change.minor(), 100_000 - 55_000);
        assert_eq!(tx.payment_method, "CASH");
        assert!(tx.invoice_number.starts_with("INV-"));

        let stored = db.transactions().get_by_id(&tx.id).await.unwrap().unwrap();
        assert_eq!(stored.items.len(), 2);
        assert_eq!(stored.total, tx.total);
    }

    #[tokio::test]
    async fn test_empty_order_writes_nothing() {
        let db = seeded_db().await;
        let svc = service(&db, Arc::new(KitchenHub::new(8)));

        let err = svc.commit(commit_request(Vec::new())).await.unwrap_err();

        assert!(matches!(err, CommitError::Validation(_)));
        assert_eq!(db.transactions().count("store-1").await.unwrap(), 0);
        assert_eq!(stock(&db, "p-1").await, 10);
    }

    #[tokio::test]
    async fn test_inactive_cashier_rejected() {
        let db = seeded_db().await;
        insert_cashier(&db, "cashier-gone", false).await;
        let svc = service(&db, Arc::new(KitchenHub::new(8)));

        let mut request = commit_request(vec![order_line("p-1", 1, 15_000)]);
        request.cashier_id = "cashier-gone".to_string();
        assert!(matches!(
            svc.commit(request).await,
            Err(CommitError::Unauthorized)
        ));

        let mut request = commit_request(vec![order_line("p-1", 1, 15_000)]);
        request.store_id = "store-2".to_string();
        assert!(matches!(
            svc.commit(request).await,
            Err(CommitError::Unauthorized)
        ));
        assert_eq!(db.transactions().count("store-1").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_cash_shortfall_rejected() {
        let db = seeded_db().await;
        let svc = service(&db, Arc::new(KitchenHub::new(8)));
        let mut request = commit_request(vec![order_line("p-1", 2, 15_000)]);
        request.amount_paid = Money::from_minor(20_000);

        let err = svc.commit(request.clone()).await.unwrap_err();
        assert!(matches!(err, CommitError::Validation(_)));

        // Non-cash payments are not checked against the total.
        request.payment_method = "QRIS".to_string();
        assert!(svc.commit(request).await.is_ok());
    }

    #[tokio::test]
    async fn test_same_product_twice_decrements_by_sum() {
        let db = seeded_db().await;
        let svc = service(&db, Arc::new(KitchenHub::new(8)));

        svc.commit(commit_request(vec![order_line("p-1", 2, 15_000), order_line("p-1", 3, 15_000)]))
            .await
            .unwrap();

        assert_eq!(stock(&db, "p-1").await, 10 - 5);
    }

    #[tokio::test]
    async fn test_other_store_product_stock_untouched() {
        let db = seeded_db().await;
        let mut foreign = product_row("p-9", 10, None);
        foreign.store_id = "store-2".to_string();
        db.products().insert(&foreign).await.unwrap();
        let svc = service(&db, Arc::new(KitchenHub::new(8)));

        let outcome = svc
            .commit(commit_request(vec![order_line("p-9", 3, 15_000)]))
            .await
            .unwrap();

        assert_eq!(outcome.transaction.store_id, "store-1");
        assert_eq!(stock(&db, "p-9").await, 10);
    }

    #[tokio::test]
    async fn test_overflowing_line_rejected_before_side_effects() {
        let db = seeded_db().await;
        let svc = service(&db, Arc::new(KitchenHub::new(8)));

        let err = svc
            .commit(commit_request(vec![order_line("p-1", 3, i64::MAX / 2)]))
            .await
            .unwrap_err();

        assert!(matches!(err, CommitError::Validation(_)));
        assert_eq!(db.transactions().count("store-1").await.unwrap(), 0);
        assert_eq!(stock(&db, "p-1").await, 10);
    }

    #[tokio::test]
    async fn test_invoice_collision_retries_with_next_number() {
        let db = seeded_db().await;
        let svc = service(&db, Arc::new(KitchenHub::new(8)));
        let first = svc
            .commit(commit_request(vec![order_line("p-1", 1, 15_000)]))
            .await
            .unwrap();
        reset_invoice_counters(&db).await;

        let second = svc
            .commit(commit_request(vec![order_line("p-2", 1, 20_000)]))
            .await
            .unwrap();

        assert!(first.transaction.invoice_number.ends_with("-0001"));
        assert!(second.transaction.invoice_number.ends_with("-0002"));
        assert_eq!(db.transactions().count("store-1").await.unwrap(), 2);
        assert_eq!(stock(&db, "p-2").await, 9);
    }

    #[tokio::test]
    async fn test_exhausted_invoice_collisions_write_nothing() {
        let db = seeded_db().await;
        let svc = service(&db, Arc::new(KitchenHub::new(8)));
        for _ in 0..MAX_INVOICE_COLLISIONS {
            svc.commit(commit_request(vec![order_line("p-1", 1, 15_000)]))
                .await
                .unwrap();
        }
        reset_invoice_counters(&db).await;

        let err = svc
            .commit(commit_request(vec![order_line("p-2", 2, 20_000)]))
            .await
            .unwrap_err();

        assert!(matches!(err, CommitError::SequencingFailed(_)));
        assert_eq!(
            db.transactions().count("store-1").await.unwrap(),
            i64::from(MAX_INVOICE_COLLISIONS)
        );
        assert_eq!(stock(&db, "p-2").await, 10);
    }

    #[tokio::test]
    async fn test_storage_failure_is_persistence_error() {
        let db = seeded_db().await;
        sqlx::query(
            "CREATE TRIGGER reject_items BEFORE INSERT ON transaction_items \
             BEGIN SELECT RAISE(ABORT, 'disk I/O error'); END",
        )
        .execute(db.pool())
        .await
        .unwrap();
        let notifier = Arc::new(RecordingNotifier::default());
        let svc = service(&db, notifier.clone());

        let err = svc
            .commit(commit_request(vec![order_line("p-1", 1, 15_000)]))
            .await
            .unwrap_err();

        assert!(matches!(err, CommitError::Persistence(_)));
        assert_eq!(db.transactions().count("store-1").await.unwrap(), 0);
        assert_eq!(stock(&db, "p-1").await, 10);
        assert!(notifier.events().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_product_still_commits() {
        let db = seeded_db().await;
        let svc = service(&db, Arc::new(KitchenHub::new(8)));

        let outcome = svc
            .commit(commit_request(vec![order_line("ghost", 1, 5_000), order_line("p-2", 1, 20_000)]))
            .await
            .unwrap();

        assert_eq!(outcome.transaction.items.len(), 2);
        assert_eq!(stock(&db, "p-2").await, 9);
    }

    #[tokio::test]
    async fn test_failing_notifier_does_not_block_commit() {
        let db = seeded_db().await;
        db.settings().set("store-1", KDS_ENABLED_SETTING, "true").await.unwrap();
        let notifier = Arc::new(FailingNotifier::default());
        let svc = service(&db, notifier.clone());

        let outcome = svc
            .commit(commit_request(vec![order_line("p-1", 1, 15_000)]))
            .await
            .unwrap();

        assert_eq!(notifier.calls(), 1);
        assert!(db
            .transactions()
            .get_by_id(&outcome.transaction.id)
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_kds_disabled_leaves_kitchen_fields_empty() {
        let db = seeded_db().await;
        let notifier = Arc::new(RecordingNotifier::default());
        let svc = service(&db, notifier.clone());
        let mut request = commit_request(vec![order_line("p-1", 1, 15_000)]);
        request.order_type = Some(OrderType::Takeaway);
        request.table_number = Some("4".to_string());
        request.items[0].modifiers = Some(vec!["no ice".to_string()]);

        let tx = svc.commit(request).await.unwrap().transaction;

        assert!(tx.order_type.is_none());
        assert!(tx.table_number.is_none());
        assert!(tx.kitchen_status.is_none());
        assert!(tx.sent_to_kitchen_at.is_none());
        assert!(tx.items[0].station.is_none());
        assert!(tx.items[0].modifiers.is_none());
        assert!(notifier.events().is_empty());
    }

    #[tokio::test]
    async fn test_kds_enabled_stamps_and_dispatches() {
        let db = seeded_db().await;
        db.settings().set("store-1", KDS_ENABLED_SETTING, "1").await.unwrap();
        let notifier = Arc::new(RecordingNotifier::default());
        let svc = service(&db, notifier.clone());
        let mut request = commit_request(vec![order_line("p-1", 1, 15_000), order_line("p-2", 2, 20_000)]);
        request.table_number = Some("12".to_string());
        request.items[0].modifiers = Some(vec!["oat milk".to_string()]);

        let tx = svc.commit(request).await.unwrap().transaction;

        assert_eq!(tx.order_type, Some(OrderType::DineIn));
        assert_eq!(tx.kitchen_status, Some(KitchenStatus::Pending));
        assert!(tx.sent_to_kitchen_at.is_some());
        assert_eq!(tx.items[0].station.as_deref(), Some("BAR"));
        assert_eq!(tx.items[1].station.as_deref(), Some(DEFAULT_KITCHEN_STATION));
        assert_eq!(tx.items[0].kitchen_status, Some(KitchenStatus::Pending));

        let events = notifier.events();
        assert_eq!(events.len(), 1);
        let KitchenEvent::OrderCreated(ticket) = &events[0];
        assert_eq!(ticket.invoice_number, tx.invoice_number);
        assert_eq!(ticket.table_number.as_deref(), Some("12"));
        assert_eq!(ticket.items[0].modifiers, vec!["oat milk".to_string()]);
    }

    #[tokio::test]
    async fn test_promo_discount_recomputed_and_logged() {
        let db = seeded_db().await;
        let promo = insert_promo(&db, "SAVE10", |_| {}).await;
        let svc = service(&db, Arc::new(KitchenHub::new(8)));
        let mut request = commit_request(vec![order_line("p-1", 2, 15_000), order_line("p-2", 1, 20_000)]);
        request.promo_code = Some("save10".to_string());
        request.promo_discount = Some(Money::from_minor(49_000));
        request.customer_phone = Some("0811".to_string());

        let tx = svc.commit(request).await.unwrap().transaction;

        assert_eq!(tx.promo_code.as_deref(), Some("SAVE10"));
        assert_eq!(tx.promo_discount.minor(), 5_000);
        assert_eq!(tx.total.minor(), 45_000);

        let stored = db.promos().get_by_id(&promo.id).await.unwrap().unwrap();
        assert_eq!(stored.usage_count, 1);
        assert_eq!(
            db.promos().count_customer_usage("store-1", "SAVE10", "0811").await.unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn test_invalid_promo_dropped() {
        let db = seeded_db().await;
        insert_promo(&db, "BIGSPEND", |p| p.min_purchase = Money::from_minor(1_000_000)).await;
        let svc = service(&db, Arc::new(KitchenHub::new(8)));
        let mut request = commit_request(vec![order_line("p-1", 1, 15_000)]);
        request.promo_code = Some("BIGSPEND".to_string());
        request.promo_discount = Some(Money::from_minor(10_000));

        let tx = svc.commit(request).await.unwrap().transaction;

        assert!(tx.promo_code.is_none());
        assert!(tx.promo_discount.is_zero());
        assert_eq!(tx.total.minor(), 15_000);
    }

    #[tokio::test]
    async fn test_untriggered_buy_x_get_y_not_logged() {
        let db = seeded_db().await;
        let promo = insert_promo(&db, "B2G1", |p| {
            p.kind = PromoKind::BuyXGetY {
                buy_quantity: 2,
                get_quantity: 1,
                get_product_id: "p-2".to_string(),
            };
        })
        .await;
        let svc = service(&db, Arc::new(KitchenHub::new(8)));
        let mut request = commit_request(vec![order_line("p-1", 1, 15_000)]);
        request.promo_code = Some("B2G1".to_string());

        let tx = svc.commit(request).await.unwrap().transaction;

        assert!(tx.promo_code.is_none());
        let stored = db.promos().get_by_id(&promo.id).await.unwrap().unwrap();
        assert_eq!(stored.usage_count, 0);
    }

    #[tokio::test]
    async fn test_concurrent_commits_get_distinct_invoices() {
        let (db, _dir) = file_db().await;
        insert_cashier(&db, "cashier-1", true).await;
        insert_product(&db, "p-1", 1_000, None).await;
        let svc = Arc::new(service(&db, Arc::new(KitchenHub::new(8))));

        let handles: Vec<_> = (0..100)
            .map(|_| {
                let svc = svc.clone();
                tokio::spawn(async move {
                    svc.commit(commit_request(vec![order_line("p-1", 1, 15_000)])).await
                })
            })
            .collect();

        let mut invoices = HashSet::new();
        for handle in join_all(handles).await {
            let outcome = handle.unwrap().unwrap();
            assert!(invoices.insert(outcome.transaction.invoice_number));
        }
        assert_eq!(invoices.len(), 100);
        assert_eq!(db.transactions().count("store-1").await.unwrap(), 100);
        assert_eq!(stock(&db, "p-1").await, 900);
    }

    #[tokio::test]
    async fn test_usage_limit_race_logs_at_least_once() {
        let (db, _dir) = file_db().await;
        insert_cashier(&db, "cashier-1", true).await;
        insert_product(&db, "p-1", 100, None).await;
        let promo = insert_promo(&db, "ONLYONE", |p| p.usage_limit = Some(1)).await;
        let svc = Arc::new(service(&db, Arc::new(KitchenHub::new(8))));

        let handles: Vec<_> = (0..2)
            .map(|_| {
                let svc = svc.clone();
                tokio::spawn(async move {
                    let mut request = commit_request(vec![order_line("p-1", 1, 15_000)]);
                    request.promo_code = Some("ONLYONE".to_string());
                    request.customer_phone = Some("0811".to_string());
                    svc.commit(request).await
                })
            })
            .collect();
        for handle in join_all(handles).await {
            handle.unwrap().unwrap();
        }

        // The limit is checked before commit, so both may pass; usage is
        // never lost either way.
        let stored = db.promos().get_by_id(&promo.id).await.unwrap().unwrap();
        let logged = db
            .promos()
            .count_customer_usage("store-1", "ONLYONE", "0811")
            .await
            .unwrap();
        assert!(stored.usage_count >= 1);
        assert_eq!(logged, stored.usage_count);
    }
}
