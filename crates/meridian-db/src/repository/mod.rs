//! # Repository Module
//!
//! Database repository implementations for Meridian POS.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  OrderCommitService (apps/api)                                          │
//! │       │                                                                 │
//! │       │  db.transactions().insert_with_items(&tx)                       │
//! │       ▼                                                                 │
//! │  TransactionRepository                                                  │
//! │  ├── insert_with_items(&self, tx)   one SQL transaction                 │
//! │  ├── get_by_id(&self, id)                                               │
//! │  ├── list(&self, filter, page, limit)                                   │
//! │  └── delete(&self, id)                                                  │
//! │       │                                                                 │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite Database                                                        │
//! │                                                                         │
//! │  Shared counters are only ever changed in SQL:                          │
//! │    stock        = stock - ?          (ProductRepository)                │
//! │    usage_count  = usage_count + 1    (PromoRepository)                  │
//! │    last_seq     = last_seq + 1       (InvoiceSequencer)                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`transaction::TransactionRepository`] - Transactions and their items
//! - [`product::ProductRepository`] - Product lookup and stock ledger
//! - [`promo::PromoRepository`] - Promo definitions and usage log
//! - [`invoice::InvoiceSequencer`] - Per-store, per-day invoice numbers
//! - [`cashier::CashierRepository`] - Cashier verification
//! - [`settings::SettingsRepository`] - Store key/value settings

pub mod cashier;
pub mod invoice;
pub mod product;
pub mod promo;
pub mod settings;
pub mod transaction;
