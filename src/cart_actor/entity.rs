use std::slice;

use chrono::Utc;

use crate::actor_framework::Entity;
use crate::domain::{Cart, ProductSnapshot};
use super::actions::{CartAction, CartActionResult};
use super::error::CartError;
use super::reconcile::{reconcile, ReconcileReport, StockSnapshot};

/// How many applied sync ids a cart remembers for replay detection.
const SYNC_HISTORY: usize = 32;

impl Entity for Cart {
    type Id = String;
    type CreateParams = ();
    type Patch = ();
    type Action = CartAction;
    type ActionResult = CartActionResult;
    type Error = CartError;

    fn id(&self) -> &String {
        &self.customer_id
    }

    /// Carts start empty and are created lazily on first access.
    fn from_create_params(id: String, _params: ()) -> Result<Self, CartError> {
        if id.trim().is_empty() {
            return Err(CartError::ValidationError("customer id required".to_string()));
        }
        Ok(Cart::new(id))
    }

    fn on_update(&mut self, _patch: ()) -> Result<(), CartError> {
        Err(CartError::ValidationError("carts change through cart actions".to_string()))
    }

    fn handle_action(&mut self, action: CartAction) -> Result<CartActionResult, CartError> {
        match action {
            CartAction::Sync { sync, snapshot, at } => {
                if self.applied_syncs.contains(&sync.sync_id) {
                    return Ok(CartActionResult::Reconciled(ReconcileReport::replayed()));
                }
                let report = reconcile(&mut self.items, &sync.entries, &snapshot, at);
                self.applied_syncs.push(sync.sync_id);
                if self.applied_syncs.len() > SYNC_HISTORY {
                    self.applied_syncs.remove(0);
                }
                self.updated_at = at;
                Ok(CartActionResult::Reconciled(report))
            }
            CartAction::AddItem { entry, snapshot, at } => {
                let report = reconcile(&mut self.items, slice::from_ref(&entry), &snapshot, at);
                self.updated_at = at;
                Ok(CartActionResult::Reconciled(report))
            }
            CartAction::SetQuantity { product_id, quantity, product } => {
                self.set_quantity(product_id, quantity, product)
            }
            CartAction::RemoveItem(product_id) => {
                let before = self.items.len();
                self.items.retain(|item| item.product_id != product_id);
                let removed = self.items.len() != before;
                if removed {
                    self.updated_at = Utc::now();
                }
                Ok(CartActionResult::Removed(removed))
            }
            CartAction::Clear => {
                self.items.clear();
                self.updated_at = Utc::now();
                Ok(CartActionResult::Cleared)
            }
            CartAction::Revalidate { checked, snapshot } => {
                let adjusted = self.revalidate(&checked, &snapshot);
                Ok(CartActionResult::Revalidated {
                    cart: self.clone(),
                    adjusted,
                })
            }
        }
    }
}

impl Cart {
    fn revalidate(&mut self, checked: &[String], snapshot: &StockSnapshot) -> Vec<String> {
        let mut adjusted = Vec::new();
        self.items.retain_mut(|item| {
            let current = snapshot
                .get(&item.product_id)
                .filter(|product| product.available && product.stock > 0);
            match current {
                // Added after the snapshot was taken; checked on the next read.
                None if !checked.contains(&item.product_id) => true,
                None => {
                    adjusted.push(item.product_id.clone());
                    false
                }
                Some(product) => {
                    if item.quantity > product.stock {
                        item.quantity = product.stock;
                        adjusted.push(item.product_id.clone());
                    }
                    item.unit_price = product.price;
                    true
                }
            }
        });
        if !adjusted.is_empty() {
            self.updated_at = Utc::now();
        }
        adjusted
    }

    fn set_quantity(
        &mut self,
        product_id: String,
        quantity: u32,
        product: Option<ProductSnapshot>,
    ) -> Result<CartActionResult, CartError> {
        let position = self
            .items
            .iter()
            .position(|item| item.product_id == product_id)
            .ok_or_else(|| CartError::ItemNotFound(product_id.clone()))?;

        if quantity == 0 {
            self.items.remove(position);
            self.updated_at = Utc::now();
            return Ok(CartActionResult::QuantitySet { quantity: 0, limited: false });
        }

        let product = product
            .filter(|p| p.available)
            .ok_or_else(|| CartError::ProductUnavailable(product_id.clone()))?;
        if product.stock == 0 {
            return Err(CartError::OutOfStock(product_id));
        }

        let granted = quantity.min(product.stock);
        let item = &mut self.items[position];
        item.quantity = granted;
        item.unit_price = product.price;
        self.updated_at = Utc::now();
        Ok(CartActionResult::QuantitySet {
            quantity: granted,
            limited: granted < quantity,
        })
    }
}
