use chrono::{DateTime, Utc};

use crate::domain::{Cart, CartSync, ProductSnapshot, SyncEntry};
use super::reconcile::{ReconcileReport, StockSnapshot};

/// Cart mutations. Each carries the stock snapshot it must respect, gathered
/// by the client just before sending, so the merge itself runs atomically
/// inside the cart actor.
#[derive(Debug, Clone)]
pub enum CartAction {
    /// Merge a whole payload; replaying an applied `sync_id` is a no-op.
    Sync {
        sync: CartSync,
        snapshot: StockSnapshot,
        at: DateTime<Utc>,
    },
    /// Add one product using the same merge rule as sync.
    AddItem {
        entry: SyncEntry,
        snapshot: StockSnapshot,
        at: DateTime<Utc>,
    },
    /// Replace the quantity of a line already in the cart; 0 removes it.
    SetQuantity {
        product_id: String,
        quantity: u32,
        product: Option<ProductSnapshot>,
    },
    RemoveItem(String),
    Clear,
    /// Brings stored lines in line with current stock. Lines for ids in
    /// `checked` that are missing from the snapshot, unavailable or sold out
    /// are dropped; the rest are clamped to stock and repriced.
    Revalidate {
        checked: Vec<String>,
        snapshot: StockSnapshot,
    },
}

#[derive(Debug, Clone)]
pub enum CartActionResult {
    Reconciled(ReconcileReport),
    QuantitySet { quantity: u32, limited: bool },
    Removed(bool),
    Cleared,
    /// The cart after revalidation and the product ids whose lines changed.
    Revalidated { cart: Cart, adjusted: Vec<String> },
}
