//! Test rows shared by the repository tests. Everything lives in `store-1`.

use chrono::{Duration, Utc};
use uuid::Uuid;

use meridian_core::promo::{Promo, PromoKind};
use meridian_core::{Cashier, Money, Product, PromoUsageLog, Transaction, TransactionItem};

pub fn product(id: &str, stock: i64) -> Product {
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
        kitchen_station: None,
        prep_time_minutes: None,
        created_at: now,
        updated_at: now,
    }
}

pub fn cashier(id: &str, active: bool) -> Cashier {
    Cashier {
        id: id.to_string(),
        store_id: "store-1".to_string(),
        name: format!("Cashier {}", id),
        role: "CASHIER".to_string(),
        is_active: active,
        created_at: Utc::now(),
    }
}

pub fn percentage_promo(id: &str, code: &str, percent_bps: u32) -> Promo {
    let now = Utc::now();
    Promo {
        id: id.to_string(),
        store_id: "store-1".to_string(),
        code: code.to_string(),
        name: format!("{} promo", code),
        description: None,
        kind: PromoKind::Percentage {
            percent_bps,
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
    }
}

pub fn usage_log(promo_id: &str, code: &str, phone: Option<&str>) -> PromoUsageLog {
    PromoUsageLog {
        id: Uuid::new_v4().to_string(),
        promo_id: promo_id.to_string(),
        promo_code: code.to_uppercase(),
        customer_phone: phone.map(str::to_string),
        transaction_id: Uuid::new_v4().to_string(),
        invoice_number: "INV-20240306-0001".to_string(),
        discount: Money::from_minor(1_000),
        cashier_id: "cashier-1".to_string(),
        store_id: "store-1".to_string(),
        created_at: Utc::now(),
    }
}

/// Two-line cash sale: 2 × 15.000 + 1 × 20.000, no discounts.
pub fn transaction(id: &str, invoice_number: &str) -> Transaction {
    let now = Utc::now();
    let line = |n: usize, quantity: i64, price: i64| TransactionItem {
        id: format!("{}-item-{}", id, n),
        transaction_id: id.to_string(),
        product_id: format!("p-{}", n),
        product_name: format!("Product {}", n),
        quantity,
        price: Money::from_minor(price),
        discount: Money::zero(),
        subtotal: Money::from_minor(price * quantity),
        notes: None,
        station: None,
        kitchen_status: None,
        prep_time_minutes: None,
        modifiers: None,
        created_at: now,
    };
    let items = vec![line(1, 2, 15_000), line(2, 1, 20_000)];
    let subtotal: Money = items.iter().map(|i| i.subtotal).sum();

    Transaction {
        id: id.to_string(),
        store_id: "store-1".to_string(),
        invoice_number: invoice_number.to_string(),
        subtotal,
        tax: Money::zero(),
        discount: Money::zero(),
        promo_code: None,
        promo_discount: Money::zero(),
        total: subtotal,
        payment_method: "CASH".to_string(),
        payment_channel: None,
        payment_reference: None,
        amount_paid: Money::from_minor(100_000),
        change: Money::from_minor(100_000) - subtotal,
        customer_name: None,
        customer_phone: None,
        cashier_id: "cashier-1".to_string(),
        notes: None,
        order_type: None,
        table_number: None,
        kitchen_status: None,
        sent_to_kitchen_at: None,
        kitchen_completed_at: None,
        created_at: now,
        items,
    }
}
