//! # Seed Data Generator
//!
//! Populates a database with one demo store for local development.
//!
//! ## Usage
//! ```bash
//! # Seed the default database
//! cargo run -p meridian-db --bin seed
//!
//! # Specify database path and store
//! cargo run -p meridian-db --bin seed -- --db ./data/meridian.db --store demo-store
//! ```
//!
//! ## Generated Data
//! - Two active cashiers and one inactive one
//! - A small cafe menu; food items carry a kitchen station
//! - Promos: `WELCOME10` (10%, capped), `HEMAT5K` (fixed),
//!   `BUY2GET1` (free coffee), `MONDAY15` (Mondays only, 14:00-17:00)
//! - `kds_enabled = true`

use chrono::{Duration, Utc};
use std::env;
use uuid::Uuid;

use meridian_core::promo::{DayOfWeek, Promo, PromoKind, TimeWindow};
use meridian_core::{Cashier, Money, Product, KDS_ENABLED_SETTING};
use meridian_db::{Database, DbConfig};

/// (id, category, name, price, stock, kitchen station, prep minutes)
const MENU: &[(&str, &str, &str, i64, i64, Option<&str>, Option<i64>)] = &[
    ("prod-espresso", "coffee", "Espresso", 18_000, 200, Some("BAR"), Some(2)),
    ("prod-latte", "coffee", "Cafe Latte", 28_000, 150, Some("BAR"), Some(4)),
    ("prod-cappuccino", "coffee", "Cappuccino", 27_000, 150, Some("BAR"), Some(4)),
    ("prod-iced-tea", "drinks", "Iced Tea", 15_000, 80, None, None),
    ("prod-mineral", "drinks", "Mineral Water", 8_000, 120, None, None),
    ("prod-nasi-goreng", "food", "Nasi Goreng", 35_000, 40, Some("KITCHEN"), Some(12)),
    ("prod-mie-goreng", "food", "Mie Goreng", 32_000, 40, Some("KITCHEN"), Some(10)),
    ("prod-sate", "food", "Sate Ayam", 38_000, 30, Some("GRILL"), Some(15)),
    ("prod-croissant", "pastry", "Butter Croissant", 22_000, 25, None, None),
    ("prod-brownie", "pastry", "Chocolate Brownie", 20_000, 3, None, None),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./data/meridian.db");
    let mut store_id = String::from("demo-store");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--store" | "-s" => {
                if i + 1 < args.len() {
                    store_id = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Meridian POS Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>      Database file path (default: ./data/meridian.db)");
                println!("  -s, --store <ID>     Store id to seed (default: demo-store)");
                println!("  -h, --help           Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Meridian POS Seed Data Generator");
    println!("===================================");
    println!("Database: {}", db_path);
    println!("Store:    {}", store_id);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.products().count(&store_id).await?;
    if existing > 0 {
        println!("⚠ Store already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let now = Utc::now();

    // Cashiers
    for (id, name, active) in [
        ("cashier-ayu", "Ayu", true),
        ("cashier-budi", "Budi", true),
        ("cashier-former", "Former Staff", false),
    ] {
        db.cashiers()
            .insert(&Cashier {
                id: id.to_string(),
                store_id: store_id.clone(),
                name: name.to_string(),
                role: "CASHIER".to_string(),
                is_active: active,
                created_at: now,
            })
            .await?;
    }
    println!("✓ Seeded 3 cashiers");

    // Products
    for (id, category, name, price, stock, station, prep) in MENU {
        let product = Product {
            id: id.to_string(),
            store_id: store_id.clone(),
            category_id: Some(category.to_string()),
            name: name.to_string(),
            price: Money::from_minor(*price),
            cost: Money::from_minor(price * 40 / 100),
            stock: *stock,
            min_stock: 5,
            is_active: true,
            kitchen_station: station.map(str::to_string),
            prep_time_minutes: *prep,
            created_at: now,
            updated_at: now,
        };

        if let Err(e) = db.products().insert(&product).await {
            eprintln!("Failed to insert {}: {}", product.id, e);
        }
    }
    println!("✓ Seeded {} products", MENU.len());

    // Promos
    let promos = [
        demo_promo(
            &store_id,
            "WELCOME10",
            "Welcome 10%",
            PromoKind::Percentage {
                percent_bps: 1000,
                max_discount: Some(Money::from_minor(25_000)),
            },
            |p| p.per_customer_limit = Some(1),
        ),
        demo_promo(
            &store_id,
            "HEMAT5K",
            "Save 5.000",
            PromoKind::Fixed {
                amount: Money::from_minor(5_000),
            },
            |p| {
                p.min_purchase = Money::from_minor(50_000);
                p.usage_limit = Some(100);
            },
        ),
        demo_promo(
            &store_id,
            "BUY2GET1",
            "Buy 2 coffees, espresso on us",
            PromoKind::BuyXGetY {
                buy_quantity: 2,
                get_quantity: 1,
                get_product_id: "prod-espresso".to_string(),
            },
            |p| p.applicable_categories = vec!["coffee".to_string()],
        ),
        demo_promo(
            &store_id,
            "MONDAY15",
            "Monday afternoon 15%",
            PromoKind::Percentage {
                percent_bps: 1500,
                max_discount: None,
            },
            |p| {
                p.days_of_week = vec![DayOfWeek::Monday];
                p.time_window = TimeWindow::new(14 * 60, 17 * 60).ok();
            },
        ),
    ];

    for promo in &promos {
        db.promos().insert(promo).await?;
        println!("  Promo {:<10} {}", promo.code, promo.kind.type_name());
    }
    println!("✓ Seeded {} promos", promos.len());

    db.settings().set(&store_id, KDS_ENABLED_SETTING, "true").await?;
    println!("✓ Enabled kitchen display");

    println!();
    println!("✓ Seed complete!");

    Ok(())
}

/// Builds a promo valid for the next 90 days, then lets `customize` adjust it.
fn demo_promo(
    store_id: &str,
    code: &str,
    name: &str,
    kind: PromoKind,
    customize: impl FnOnce(&mut Promo),
) -> Promo {
    let now = Utc::now();
    let mut promo = Promo {
        id: Uuid::new_v4().to_string(),
        store_id: store_id.to_string(),
        code: code.to_string(),
        name: name.to_string(),
        description: None,
        kind,
        min_purchase: Money::zero(),
        applicable_categories: Vec::new(),
        applicable_products: Vec::new(),
        start_at: now - Duration::days(1),
        end_at: now + Duration::days(90),
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
    promo
}
