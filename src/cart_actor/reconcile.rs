//! Stock-aware merge of requested (product, quantity) pairs into a cart.
//!
//! Shared by cart sync (anonymous cart merged after login) and by ordinary
//! add-to-cart. Given the same items, entries and stock snapshot the result is
//! always the same.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{CartItem, ProductSnapshot, SyncEntry};

/// Stock and price per product id, captured just before the merge.
pub type StockSnapshot = HashMap<String, ProductSnapshot>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// Blank product id or non-positive quantity.
    InvalidEntry,
    /// Unknown product, or one marked unavailable.
    ProductUnavailable,
    /// Product has no stock at all.
    OutOfStock,
    /// Request exceeded stock; the remainder was dropped.
    PartialFulfillment,
    /// Existing quantity plus the request exceeded stock.
    StockLimited,
}

/// Units of an entry that did not make it into the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rejection {
    pub product_id: String,
    pub quantity: i64,
    pub reason: RejectReason,
}

/// A cart line created or grown by the merge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineChange {
    pub product_id: String,
    /// Quantity now in the cart.
    pub quantity: u32,
    /// Set when clamping reduced what was asked for.
    pub adjustment: Option<RejectReason>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileReport {
    pub inserted: Vec<LineChange>,
    pub merged: Vec<LineChange>,
    pub rejected: Vec<Rejection>,
    /// The payload had already been applied; nothing changed.
    pub replayed: bool,
}

impl ReconcileReport {
    pub fn replayed() -> Self {
        Self {
            replayed: true,
            ..Self::default()
        }
    }

    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty()
    }
}

/// Merges `entries` into `items` in order and reports what happened to each.
pub fn reconcile(
    items: &mut Vec<CartItem>,
    entries: &[SyncEntry],
    snapshot: &StockSnapshot,
    at: DateTime<Utc>,
) -> ReconcileReport {
    let mut report = ReconcileReport::default();
    for entry in entries {
        merge_entry(items, entry, snapshot, at, &mut report);
    }
    report
}

fn merge_entry(
    items: &mut Vec<CartItem>,
    entry: &SyncEntry,
    snapshot: &StockSnapshot,
    at: DateTime<Utc>,
    report: &mut ReconcileReport,
) {
    let mut reject = |quantity: i64, reason: RejectReason| {
        report.rejected.push(Rejection {
            product_id: entry.product_id.clone(),
            quantity,
            reason,
        });
    };

    if entry.product_id.trim().is_empty() || entry.quantity <= 0 {
        reject(entry.quantity, RejectReason::InvalidEntry);
        return;
    }
    let Some(product) = snapshot.get(&entry.product_id).filter(|p| p.available) else {
        reject(entry.quantity, RejectReason::ProductUnavailable);
        return;
    };

    let requested = u32::try_from(entry.quantity).unwrap_or(u32::MAX);
    let mut adjustment = None;
    let incoming = if requested > product.stock {
        if product.stock == 0 {
            reject(entry.quantity, RejectReason::OutOfStock);
            return;
        }
        reject(i64::from(requested - product.stock), RejectReason::PartialFulfillment);
        adjustment = Some(RejectReason::PartialFulfillment);
        product.stock
    } else {
        requested
    };

    match items.iter_mut().find(|item| item.product_id == entry.product_id) {
        Some(item) => {
            let wanted = item.quantity.saturating_add(incoming);
            let quantity = wanted.min(product.stock);
            if wanted > quantity {
                reject(i64::from(wanted - quantity), RejectReason::StockLimited);
                adjustment = Some(RejectReason::StockLimited);
            }
            item.quantity = quantity;
            item.unit_price = product.price;
            report.merged.push(LineChange {
                product_id: entry.product_id.clone(),
                quantity,
                adjustment,
            });
        }
        None => {
            items.push(CartItem {
                product_id: entry.product_id.clone(),
                quantity: incoming,
                unit_price: product.price,
                added_at: at,
            });
            report.inserted.push(LineChange {
                product_id: entry.product_id.clone(),
                quantity: incoming,
                adjustment,
            });
        }
    }
}
