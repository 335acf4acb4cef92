use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

const DEFAULT_LOW_STOCK_THRESHOLD: u32 = 5;

/// Stock bookkeeping embedded in every product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    /// Units available for sale. Never negative.
    pub quantity: u32,
    pub low_stock_threshold: u32,
    /// Cumulative units sold through settled orders.
    pub sold: u64,
}

impl Inventory {
    pub fn is_low(&self) -> bool {
        self.quantity <= self.low_stock_threshold
    }
}

/// A catalog entry as seen by checkout: price, availability and stock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub category: String,
    pub price: Decimal,
    pub image: Option<String>,
    /// Whether the product may be sold at all, independent of stock.
    pub available: bool,
    pub inventory: Inventory,
}

impl Product {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        category: impl Into<String>,
        price: Decimal,
        quantity: u32,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            category: category.into(),
            price,
            image: None,
            available: true,
            inventory: Inventory {
                quantity,
                low_stock_threshold: DEFAULT_LOW_STOCK_THRESHOLD,
                sold: 0,
            },
        }
    }

    pub fn stock(&self) -> u32 {
        self.inventory.quantity
    }

    /// Point-in-time view used by cart reconciliation.
    pub fn snapshot(&self) -> ProductSnapshot {
        ProductSnapshot {
            product_id: self.id.clone(),
            available: self.available,
            stock: self.inventory.quantity,
            price: self.price,
        }
    }
}

/// Payload for creating a new product.
#[derive(Debug, Clone)]
pub struct ProductCreate {
    pub name: String,
    pub category: String,
    pub price: Decimal,
    pub image: Option<String>,
    pub quantity: u32,
    pub low_stock_threshold: u32,
    pub available: bool,
}

impl ProductCreate {
    pub fn new(name: impl Into<String>, category: impl Into<String>, price: Decimal, quantity: u32) -> Self {
        Self {
            name: name.into(),
            category: category.into(),
            price,
            image: None,
            quantity,
            low_stock_threshold: DEFAULT_LOW_STOCK_THRESHOLD,
            available: true,
        }
    }

    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    pub fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }
}

/// Payload for updating an existing product. Stock is only changed through actions.
#[derive(Debug, Clone, Default)]
pub struct ProductPatch {
    pub price: Option<Decimal>,
    pub available: Option<bool>,
    pub low_stock_threshold: Option<u32>,
}

/// Availability, stock and current price of one product at one instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSnapshot {
    pub product_id: String,
    pub available: bool,
    pub stock: u32,
    pub price: Decimal,
}
