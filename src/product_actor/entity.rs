use crate::actor_framework::Entity;
use crate::domain::{Inventory, Product, ProductCreate, ProductPatch};
use super::actions::{ProductAction, ProductActionResult, StockChange};
use super::error::ProductError;

impl Entity for Product {
    type Id = String;
    type CreateParams = ProductCreate;
    type Patch = ProductPatch;
    type Action = ProductAction;
    type ActionResult = ProductActionResult;
    type Error = ProductError;

    fn id(&self) -> &String {
        &self.id
    }

    /// Creates a new Product from creation parameters.
    ///
    /// # Errors
    /// Rejects a blank name or a negative price.
    fn from_create_params(id: String, params: ProductCreate) -> Result<Self, ProductError> {
        if params.name.trim().is_empty() {
            return Err(ProductError::ValidationError("name required".to_string()));
        }
        if params.price.is_sign_negative() {
            return Err(ProductError::ValidationError(format!("negative price {}", params.price)));
        }
        Ok(Self {
            id,
            name: params.name,
            category: params.category,
            price: params.price,
            image: params.image,
            available: params.available,
            inventory: Inventory {
                quantity: params.quantity,
                low_stock_threshold: params.low_stock_threshold,
                sold: 0,
            },
        })
    }

    /// Updates price, availability and the low-stock threshold. Stock levels
    /// only move through [`ProductAction`]s.
    fn on_update(&mut self, patch: ProductPatch) -> Result<(), ProductError> {
        if let Some(price) = patch.price {
            if price.is_sign_negative() {
                return Err(ProductError::ValidationError(format!("negative price {price}")));
            }
            self.price = price;
        }
        if let Some(available) = patch.available {
            self.available = available;
        }
        if let Some(threshold) = patch.low_stock_threshold {
            self.inventory.low_stock_threshold = threshold;
        }
        Ok(())
    }

    /// # Actions
    /// - `CheckStock`: Returns the current stock level
    /// - `Decrement(n)`: Sells `n` units; stock never goes negative
    /// - `Increment(n)`: Puts `n` units back
    fn handle_action(&mut self, action: ProductAction) -> Result<ProductActionResult, ProductError> {
        match action {
            ProductAction::CheckStock => Ok(ProductActionResult::CheckStock(self.inventory.quantity)),
            ProductAction::Decrement(0) | ProductAction::Increment(0) => Err(ProductError::InvalidQuantity(0)),
            ProductAction::Decrement(amount) => {
                let available = self.inventory.quantity;
                let remaining = available
                    .checked_sub(amount)
                    .ok_or(ProductError::InsufficientStock { requested: amount, available })?;
                let was_low = self.inventory.is_low();
                self.inventory.quantity = remaining;
                self.inventory.sold += u64::from(amount);
                Ok(ProductActionResult::Decrement(self.stock_change(!was_low && self.inventory.is_low())))
            }
            ProductAction::Increment(amount) => {
                self.inventory.quantity = self.inventory.quantity.saturating_add(amount);
                Ok(ProductActionResult::Increment(self.stock_change(false)))
            }
        }
    }
}

impl Product {
    fn stock_change(&self, crossed_low_stock: bool) -> StockChange {
        StockChange {
            remaining: self.inventory.quantity,
            sold: self.inventory.sold,
            low_stock: crossed_low_stock,
            category: self.category.clone(),
        }
    }
}
