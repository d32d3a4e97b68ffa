//! # Kitchen Tickets
//!
//! The denormalized payload sent to the kitchen display when an order is
//! committed in a KDS-enabled store.
//!
//! ```text
//! {"type":"ORDER_CREATED","data":{"invoiceNumber":"INV-20240306-0042",
//!   "orderType":"DINE_IN","tableNumber":"12","items":[{"station":"GRILL",..}]}}
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::types::{OrderType, Transaction};

/// Station used for products that do not name one.
pub const DEFAULT_KITCHEN_STATION: &str = "KITCHEN";

/// One line as the kitchen sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct KitchenTicketItem {
    pub item_id: String,
    pub product_id: String,
    pub product_name: String,
    pub quantity: i64,
    pub station: String,
    pub prep_time_minutes: Option<i64>,
    pub modifiers: Vec<String>,
    pub notes: Option<String>,
}

/// A committed order, flattened for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct KitchenTicket {
    pub transaction_id: String,
    pub store_id: String,
    pub invoice_number: String,
    pub order_type: OrderType,
    pub table_number: Option<String>,
    pub notes: Option<String>,
    pub items: Vec<KitchenTicketItem>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl KitchenTicket {
    /// Builds the ticket from a persisted transaction.
    ///
    /// Returns `None` when the transaction was not stamped for the kitchen
    /// (KDS disabled at commit time).
    pub fn from_transaction(tx: &Transaction) -> Option<Self> {
        let (Some(order_type), Some(_)) = (tx.order_type, tx.kitchen_status.as_ref()) else {
            return None;
        };

        let items = tx
            .items
            .iter()
            .map(|item| KitchenTicketItem {
                item_id: item.id.clone(),
                product_id: item.product_id.clone(),
                product_name: item.product_name.clone(),
                quantity: item.quantity,
                station: item
                    .station
                    .clone()
                    .unwrap_or_else(|| DEFAULT_KITCHEN_STATION.to_string()),
                prep_time_minutes: item.prep_time_minutes,
                modifiers: item.modifiers.clone().unwrap_or_default(),
                notes: item.notes.clone(),
            })
            .collect();

        Some(Self {
            transaction_id: tx.id.clone(),
            store_id: tx.store_id.clone(),
            invoice_number: tx.invoice_number.clone(),
            order_type,
            table_number: tx.table_number.clone(),
            notes: tx.notes.clone(),
            items,
            created_at: tx.created_at,
        })
    }
}

/// Events pushed on a store's kitchen channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(tag = "type", content = "data", rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum KitchenEvent {
    OrderCreated(KitchenTicket),
}

impl KitchenEvent {
    pub fn store_id(&self) -> &str {
        match self {
            KitchenEvent::OrderCreated(ticket) => &ticket.store_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Money;
    use crate::types::{KitchenStatus, TransactionItem};

    fn transaction(kitchen: bool) -> Transaction {
        let now = Utc::now();
        let item = TransactionItem {
            id: "item-1".to_string(),
            transaction_id: "tx-1".to_string(),
            product_id: "p-1".to_string(),
            product_name: "Nasi Goreng".to_string(),
            quantity: 2,
            price: Money::from_minor(25_000),
            discount: Money::zero(),
            subtotal: Money::from_minor(50_000),
            notes: Some("extra egg".to_string()),
            station: None,
            kitchen_status: kitchen.then_some(KitchenStatus::Pending),
            prep_time_minutes: Some(10),
            modifiers: None,
            created_at: now,
        };
        Transaction {
            id: "tx-1".to_string(),
            store_id: "store-1".to_string(),
            invoice_number: "INV-20240306-0001".to_string(),
            subtotal: Money::from_minor(50_000),
            tax: Money::zero(),
            discount: Money::zero(),
            promo_code: None,
            promo_discount: Money::zero(),
            total: Money::from_minor(50_000),
            payment_method: "CASH".to_string(),
            payment_channel: None,
            payment_reference: None,
            amount_paid: Money::from_minor(50_000),
            change: Money::zero(),
            customer_name: None,
            customer_phone: None,
            cashier_id: "cashier-1".to_string(),
            notes: None,
            order_type: kitchen.then_some(OrderType::DineIn),
            table_number: kitchen.then(|| "7".to_string()),
            kitchen_status: kitchen.then_some(KitchenStatus::Pending),
            sent_to_kitchen_at: kitchen.then_some(now),
            kitchen_completed_at: None,
            created_at: now,
            items: vec![item],
        }
    }

    #[test]
    fn test_ticket_only_for_kitchen_orders() {
        assert!(KitchenTicket::from_transaction(&transaction(false)).is_none());

        let mut unstamped = transaction(true);
        unstamped.kitchen_status = None;
        assert!(KitchenTicket::from_transaction(&unstamped).is_none());

        let ticket = KitchenTicket::from_transaction(&transaction(true)).unwrap();
        assert_eq!(ticket.table_number.as_deref(), Some("7"));
        assert_eq!(ticket.items[0].station, DEFAULT_KITCHEN_STATION);
        assert!(ticket.items[0].modifiers.is_empty());
    }

    #[test]
    fn test_event_wire_format() {
        let ticket = KitchenTicket::from_transaction(&transaction(true)).unwrap();
        let json = serde_json::to_value(KitchenEvent::OrderCreated(ticket)).unwrap();
        assert_eq!(json["type"], "ORDER_CREATED");
        assert_eq!(json["data"]["invoiceNumber"], "INV-20240306-0001");
        assert_eq!(json["data"]["orderType"], "DINE_IN");
    }
}
