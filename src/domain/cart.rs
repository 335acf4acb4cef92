use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::money::line_total;

/// One product held in a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: String,
    /// Always at least 1.
    pub quantity: u32,
    /// Price captured when the item was added or last merged.
    pub unit_price: Decimal,
    pub added_at: DateTime<Utc>,
}

/// A customer's cart, keyed by customer id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    pub customer_id: String,
    pub items: Vec<CartItem>,
    /// Sync payload ids already applied, oldest first.
    pub applied_syncs: Vec<String>,
    pub updated_at: DateTime<Utc>,
}

impl Cart {
    pub fn new(customer_id: impl Into<String>) -> Self {
        Self {
            customer_id: customer_id.into(),
            items: Vec::new(),
            applied_syncs: Vec::new(),
            updated_at: Utc::now(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn item(&self, product_id: &str) -> Option<&CartItem> {
        self.items.iter().find(|item| item.product_id == product_id)
    }

    pub fn total(&self) -> Decimal {
        self.items
            .iter()
            .map(|item| line_total(item.unit_price, item.quantity))
            .sum()
    }

    pub fn total_quantity(&self) -> u32 {
        self.items.iter().map(|item| item.quantity).sum()
    }
}

/// One requested (product, quantity) pair. Comes from untrusted input, so the
/// quantity may be zero or negative and the product id may be blank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncEntry {
    pub product_id: String,
    pub quantity: i64,
}

impl SyncEntry {
    pub fn new(product_id: impl Into<String>, quantity: i64) -> Self {
        Self {
            product_id: product_id.into(),
            quantity,
        }
    }
}

/// A batch of entries merged into a cart, typically an anonymous pre-login cart.
///
/// `sync_id` identifies the payload; replaying an id the cart has already
/// applied leaves the cart unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartSync {
    pub sync_id: String,
    pub entries: Vec<SyncEntry>,
}
