//! Shared helpers for the API tests. Everything lives in `store-1`.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use tempfile::TempDir;
use uuid::Uuid;

use meridian_core::kitchen::KitchenEvent;
use meridian_core::order::{CommitOrderRequest, OrderLineRequest};
use meridian_core::promo::{Promo, PromoCartLine, PromoKind};
use meridian_core::{Cashier, Money, Product, PromoUsageLog};
use meridian_db::{Database, DbConfig};

use crate::config::ApiConfig;
use crate::kitchen::{KitchenError, KitchenNotifier};
use crate::state::AppState;

// =============================================================================
// Databases
// =============================================================================

pub async fn test_db() -> Database {
    Database::new(DbConfig::in_memory()).await.unwrap()
}

/// File-backed database for tests that need real connection concurrency.
/// Keep the `TempDir` alive for as long as the database is used.
pub async fn file_db() -> (Database, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::new(DbConfig::new(dir.path().join("test.db")).max_connections(8))
        .await
        .unwrap();
    (db, dir)
}

pub fn test_config() -> ApiConfig {
    ApiConfig::default()
}

pub async fn test_state() -> AppState {
    AppState::new(test_db().await, test_config())
}

// =============================================================================
// Rows
// =============================================================================

pub async fn insert_cashier(db: &Database, id: &str, active: bool) -> Cashier {
    let cashier = Cashier {
        id: id.to_string(),
        store_id: "store-1".to_string(),
        name: format!("Cashier {}", id),
        role: "CASHIER".to_string(),
        is_active: active,
        created_at: Utc::now(),
    };
    db.cashiers().insert(&cashier).await.unwrap();
    cashier
}

pub async fn insert_product(db: &Database, id: &str, stock: i64, station: Option<&str>) -> Product {
    let product = product_row(id, stock, station);
    db.products().insert(&product).await.unwrap();
    product
}

/// A store-1 product priced 150,00, not yet stored.
pub fn product_row(id: &str, stock: i64, station: Option<&str>) -> Product {
    let now = Utc::now();
    Product {
        id: id.to_string(),
        store_id: "store-1".to_string(),
        category_id: Some("drinks".to_string()),
        name: format!("Product {}", id),
        price: Money::from_minor(15_000),
        cost: Money::from_minor(6_000),
        stock,
        min_stock: 2,
        is_active: true,
        kitchen_station: station.map(str::to_string),
        prep_time_minutes: station.map(|_| 5),
        created_at: now,
        updated_at: now,
    }
}

/// Inserts a 10% promo valid from yesterday to tomorrow, after `customize`.
pub async fn insert_promo<F>(db: &Database, code: &str, customize: F) -> Promo
where
    F: FnOnce(&mut Promo),
{
    let now = Utc::now();
    let mut promo = Promo {
        id: Uuid::new_v4().to_string(),
        store_id: "store-1".to_string(),
        code: code.to_uppercase(),
        name: format!("{} promo", code),
        description: None,
        kind: PromoKind::Percentage {
            percent_bps: 1000,
            max_discount: None,
        },
        min_purchase: Money::zero(),
        applicable_categories: Vec::new(),
        applicable_products: Vec::new(),
        start_at: now - Duration::days(1),
        end_at: now + Duration::days(1),
        days_of_week: Vec::new(),
        time_window: None,
        usage_limit: None,
        per_customer_limit: None,
        usage_count: 0,
        is_active: true,
        created_at: now,
        updated_at: now,
    };
    customize(&mut promo);
    db.promos().insert(&promo).await.unwrap();
    promo
}

pub fn usage_log(promo: &Promo, phone: Option<&str>) -> PromoUsageLog {
    PromoUsageLog {
        id: Uuid::new_v4().to_string(),
        promo_id: promo.id.clone(),
        promo_code: promo.code.clone(),
        customer_phone: phone.map(str::to_string),
        transaction_id: Uuid::new_v4().to_string(),
        invoice_number: "INV-20240306-0001".to_string(),
        discount: Money::from_minor(1_000),
        cashier_id: "cashier-1".to_string(),
        store_id: promo.store_id.clone(),
        created_at: Utc::now(),
    }
}

// =============================================================================
// Requests
// =============================================================================

pub fn line(product_id: &str, quantity: i64, price: i64) -> PromoCartLine {
    PromoCartLine {
        product_id: product_id.to_string(),
        category_id: None,
        quantity,
        price: Money::from_minor(price),
    }
}

pub fn order_line(product_id: &str, quantity: i64, price: i64) -> OrderLineRequest {
    OrderLineRequest {
        product_id: product_id.to_string(),
        name: format!("Product {}", product_id),
        quantity,
        price: Money::from_minor(price),
        subtotal: None,
        discount: None,
        notes: None,
        modifiers: None,
    }
}

/// Cash order by `cashier-1` paying 1.000,00.
pub fn commit_request(items: Vec<OrderLineRequest>) -> CommitOrderRequest {
    CommitOrderRequest {
        items,
        subtotal: None,
        tax: None,
        discount: None,
        total: None,
        payment_method: "cash".to_string(),
        payment_channel: None,
        payment_reference: None,
        amount_paid: Money::from_minor(100_000),
        change: None,
        customer_name: None,
        customer_phone: None,
        notes: None,
        store_id: "store-1".to_string(),
        cashier_id: "cashier-1".to_string(),
        promo_code: None,
        promo_discount: None,
        order_type: None,
        table_number: None,
    }
}

// =============================================================================
// Kitchen Notifiers
// =============================================================================

/// Records every event it is handed.
#[derive(Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<KitchenEvent>>,
}

impl RecordingNotifier {
    pub fn events(&self) -> Vec<KitchenEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl KitchenNotifier for RecordingNotifier {
    async fn notify(&self, event: KitchenEvent) -> Result<(), KitchenError> {
        self.events.lock().unwrap().push(event);
        Ok(())
    }
}

/// Fails every dispatch, counting the attempts.
#[derive(Default)]
pub struct FailingNotifier {
    calls: Mutex<usize>,
}

impl FailingNotifier {
    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl KitchenNotifier for FailingNotifier {
    async fn notify(&self, _event: KitchenEvent) -> Result<(), KitchenError> {
        *self.calls.lock().unwrap() += 1;
        Err(KitchenError::Dispatch("display offline".to_string()))
    }
}

pub fn recording_state(db: Database) -> (AppState, Arc<RecordingNotifier>) {
    let notifier = Arc::new(RecordingNotifier::default());
    let state = AppState::with_notifier(db, test_config(), notifier.clone());
    (state, notifier)
}
