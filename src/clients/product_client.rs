use tracing::{debug, instrument, warn};

use crate::actor_framework::ResourceClient;
use crate::cart_actor::StockSnapshot;
use crate::domain::{Product, ProductCreate, ProductPatch};
use crate::product_actor::{ProductAction, ProductActionResult, ProductError, StockChange};

/// Client for the inventory ledger (products with embedded stock).
#[derive(Clone)]
pub struct ProductClient {
    inner: ResourceClient<Product>,
}

impl_basic_client!(ProductClient, Product, ProductError, product);

impl ProductClient {
    #[instrument(skip(self, params), fields(name = %params.name))]
    pub async fn create_product(&self, params: ProductCreate) -> Result<String, ProductError> {
        debug!("Sending request");
        self.inner.create(params).await
    }

    #[instrument(skip(self))]
    pub async fn update_product(&self, id: String, patch: ProductPatch) -> Result<Product, ProductError> {
        debug!("Sending request");
        self.inner.update(id, patch).await
    }

    #[instrument(skip(self))]
    pub async fn check_stock(&self, id: String) -> Result<u32, ProductError> {
        debug!("Sending request");
        match self.inner.perform_action(id, ProductAction::CheckStock).await? {
            ProductActionResult::CheckStock(level) => Ok(level),
            other => Err(unexpected_result!(ProductError, other)),
        }
    }

    /// Takes sold units out of stock. Logs a warning when this decrement is the
    /// one that drops the product to its low-stock threshold.
    #[instrument(skip(self))]
    pub async fn decrement_stock(&self, id: String, quantity: u32) -> Result<StockChange, ProductError> {
        debug!("Sending request");
        match self.inner.perform_action(id.clone(), ProductAction::Decrement(quantity)).await? {
            ProductActionResult::Decrement(change) => {
                if change.low_stock {
                    warn!(product_id = %id, remaining = change.remaining, "Product is low on stock");
                }
                Ok(change)
            }
            other => Err(unexpected_result!(ProductError, other)),
        }
    }

    #[instrument(skip(self))]
    pub async fn increment_stock(&self, id: String, quantity: u32) -> Result<StockChange, ProductError> {
        debug!("Sending request");
        match self.inner.perform_action(id, ProductAction::Increment(quantity)).await? {
            ProductActionResult::Increment(change) => Ok(change),
            other => Err(unexpected_result!(ProductError, other)),
        }
    }

    /// Current availability, stock and price for each id. Unknown ids are left
    /// out, which the cart merge treats as unavailable.
    #[instrument(skip(self, ids))]
    pub async fn snapshot<'a>(&self, ids: impl IntoIterator<Item = &'a str>) -> Result<StockSnapshot, ProductError> {
        let mut snapshot = StockSnapshot::new();
        for id in ids {
            if snapshot.contains_key(id) {
                continue;
            }
            if let Some(product) = self.get_product(id.to_string()).await? {
                snapshot.insert(id.to_string(), product.snapshot());
            }
        }
        Ok(snapshot)
    }
}
