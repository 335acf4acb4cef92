use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{debug, info, instrument, warn};

use crate::actor_framework::ResourceClient;
use crate::cart_actor::{CartAction, CartActionResult, CartError, ReconcileReport};
use crate::clients::ProductClient;
use crate::domain::{Cart, CartSync, SyncEntry};

/// Client for per-customer carts.
///
/// Every mutation first reads fresh stock from the catalog and hands it to the
/// cart actor, which applies the merge rules in one step.
#[derive(Clone)]
pub struct CartClient {
    inner: ResourceClient<Cart>,
    products: ProductClient,
}

impl CartClient {
    pub fn new(inner: ResourceClient<Cart>, products: ProductClient) -> Self {
        Self { inner, products }
    }

    /// Returns the customer's cart, creating an empty one on first access.
    /// Stored lines are checked against current stock: quantities above stock
    /// are clamped and lines that can no longer be bought are dropped.
    #[instrument(skip(self))]
    pub async fn get_cart(&self, customer_id: String) -> Result<Cart, CartError> {
        let cart = self.ensure_cart(customer_id.clone()).await?;
        if cart.is_empty() {
            return Ok(cart);
        }
        let checked: Vec<String> = cart.items.iter().map(|item| item.product_id.clone()).collect();
        let snapshot = self
            .products
            .snapshot(checked.iter().map(String::as_str))
            .await
            .map_err(catalog_error)?;
        match self.inner.perform_action(customer_id, CartAction::Revalidate { checked, snapshot }).await? {
            CartActionResult::Revalidated { cart, adjusted } => {
                if !adjusted.is_empty() {
                    warn!(?adjusted, "Stale cart lines adjusted to current stock");
                }
                Ok(cart)
            }
            other => Err(unexpected_result!(CartError, other)),
        }
    }

    async fn ensure_cart(&self, customer_id: String) -> Result<Cart, CartError> {
        debug!("Sending request");
        self.inner.get_or_insert(customer_id, ()).await
    }

    #[instrument(skip(self))]
    pub async fn add_item(
        &self,
        customer_id: String,
        product_id: String,
        quantity: i64,
    ) -> Result<ReconcileReport, CartError> {
        let snapshot = self.products.snapshot([product_id.as_str()]).await.map_err(catalog_error)?;
        self.ensure_cart(customer_id.clone()).await?;
        let action = CartAction::AddItem {
            entry: SyncEntry::new(product_id, quantity),
            snapshot,
            at: Utc::now(),
        };
        self.reconciled(customer_id, action).await
    }

    /// Sets a line's quantity, clamped to stock; 0 removes the line.
    /// Returns the quantity actually stored.
    #[instrument(skip(self))]
    pub async fn update_quantity(
        &self,
        customer_id: String,
        product_id: String,
        quantity: u32,
    ) -> Result<u32, CartError> {
        let product = if quantity == 0 {
            None
        } else {
            self.products
                .get_product(product_id.clone())
                .await
                .map_err(catalog_error)?
                .map(|product| product.snapshot())
        };
        self.ensure_cart(customer_id.clone()).await?;
        let action = CartAction::SetQuantity {
            product_id,
            quantity,
            product,
        };
        match self.inner.perform_action(customer_id, action).await? {
            CartActionResult::QuantitySet { quantity, limited } => {
                if limited {
                    info!(quantity, "Quantity limited by stock");
                }
                Ok(quantity)
            }
            other => Err(unexpected_result!(CartError, other)),
        }
    }

    /// Returns whether the product was in the cart.
    #[instrument(skip(self))]
    pub async fn remove_item(&self, customer_id: String, product_id: String) -> Result<bool, CartError> {
        self.ensure_cart(customer_id.clone()).await?;
        match self.inner.perform_action(customer_id, CartAction::RemoveItem(product_id)).await? {
            CartActionResult::Removed(removed) => Ok(removed),
            other => Err(unexpected_result!(CartError, other)),
        }
    }

    /// Empties the cart but keeps the record.
    #[instrument(skip(self))]
    pub async fn clear_cart(&self, customer_id: String) -> Result<(), CartError> {
        self.ensure_cart(customer_id.clone()).await?;
        match self.inner.perform_action(customer_id, CartAction::Clear).await? {
            CartActionResult::Cleared => Ok(()),
            other => Err(unexpected_result!(CartError, other)),
        }
    }

    /// Merges a client-side cart into the stored one.
    #[instrument(skip(self, sync), fields(sync_id = %sync.sync_id, entries = sync.entries.len()))]
    pub async fn sync_cart(&self, customer_id: String, sync: CartSync) -> Result<ReconcileReport, CartError> {
        let snapshot = self
            .products
            .snapshot(sync.entries.iter().map(|entry| entry.product_id.as_str()))
            .await
            .map_err(catalog_error)?;
        self.ensure_cart(customer_id.clone()).await?;
        let report = self
            .reconciled(customer_id, CartAction::Sync { sync, snapshot, at: Utc::now() })
            .await?;
        info!(
            inserted = report.inserted.len(),
            merged = report.merged.len(),
            rejected = report.rejected.len(),
            replayed = report.replayed,
            "Cart synced"
        );
        Ok(report)
    }

    #[instrument(skip(self))]
    pub async fn cart_total(&self, customer_id: String) -> Result<Decimal, CartError> {
        Ok(self
            .inner
            .get(customer_id)
            .await?
            .map(|cart| cart.total())
            .unwrap_or_default())
    }

    async fn reconciled(&self, customer_id: String, action: CartAction) -> Result<ReconcileReport, CartError> {
        debug!("Sending request");
        match self.inner.perform_action(customer_id, action).await? {
            CartActionResult::Reconciled(report) => Ok(report),
            other => Err(unexpected_result!(CartError, other)),
        }
    }
}

fn catalog_error(err: crate::product_actor::ProductError) -> CartError {
    CartError::ActorCommunicationError(format!("catalog lookup failed: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor_framework::ResourceActor;
    use crate::cart_actor::RejectReason;
    use crate::domain::{Product, ProductCreate};
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;

    async fn setup() -> (CartClient, ProductClient) {
        let counter = Arc::new(AtomicU64::new(1));
        let (product_actor, product_inner) = ResourceActor::<Product>::new(8, move || {
            format!("product_{}", counter.fetch_add(1, Ordering::SeqCst))
        });
        tokio::spawn(product_actor.run());
        let (cart_actor, cart_inner) = ResourceActor::<Cart>::new(8, String::new);
        tokio::spawn(cart_actor.run());
        let products = ProductClient::new(product_inner);
        (CartClient::new(cart_inner, products.clone()), products)
    }

    #[tokio::test]
    async fn sync_clamps_to_stock_and_replays_cleanly() {
        let (carts, products) = setup().await;
        let pid = products
            .create_product(ProductCreate::new("Mug", "kitchen", dec!(8), 3))
            .await
            .unwrap();
        let sync = CartSync {
            sync_id: "anon-1".into(),
            entries: vec![SyncEntry::new(pid.clone(), 5)],
        };

        let report = carts.sync_cart("cust_1".into(), sync.clone()).await.unwrap();
        assert_eq!(report.inserted[0].quantity, 3);
        assert_eq!(report.inserted[0].adjustment, Some(RejectReason::PartialFulfillment));
        assert_eq!(report.rejected[0].quantity, 2);

        let replay = carts.sync_cart("cust_1".into(), sync).await.unwrap();
        assert!(replay.replayed);
        assert_eq!(carts.get_cart("cust_1".into()).await.unwrap().item(&pid).map(|i| i.quantity), Some(3));
    }

    #[tokio::test]
    async fn cart_operations_keep_the_record() {
        let (carts, products) = setup().await;
        let pid = products
            .create_product(ProductCreate::new("Pen", "office", dec!(1.50), 10))
            .await
            .unwrap();

        carts.add_item("cust_1".into(), pid.clone(), 2).await.unwrap();
        assert_eq!(carts.update_quantity("cust_1".into(), pid.clone(), 4).await, Ok(4));
        assert_eq!(carts.cart_total("cust_1".into()).await, Ok(dec!(6)));

        carts.clear_cart("cust_1".into()).await.unwrap();
        let cart = carts.get_cart("cust_1".into()).await.unwrap();
        assert!(cart.is_empty());
        assert_eq!(carts.remove_item("cust_1".into(), pid).await, Ok(false));
    }

    #[tokio::test]
    async fn reading_a_cart_clamps_lines_to_current_stock() {
        let (carts, products) = setup().await;
        let pid = products
            .create_product(ProductCreate::new("Lamp", "home", dec!(20), 5))
            .await
            .unwrap();
        carts.add_item("cust_1".into(), pid.clone(), 4).await.unwrap();

        products.decrement_stock(pid.clone(), 3).await.unwrap();
        let cart = carts.get_cart("cust_1".into()).await.unwrap();
        assert_eq!(cart.item(&pid).map(|i| i.quantity), Some(2));

        products.decrement_stock(pid.clone(), 2).await.unwrap();
        assert!(carts.get_cart("cust_1".into()).await.unwrap().is_empty());
    }
}
