/// Stock operations on a product beyond plain CRUD.
#[derive(Debug, Clone)]
pub enum ProductAction {
    /// Reads the current stock level without modifying it.
    CheckStock,
    /// Removes sold units from stock and adds them to the sold counter.
    ///
    /// # Errors
    /// Fails without changing anything if the quantity exceeds available stock.
    Decrement(u32),
    /// Returns units to stock (restock or compensation).
    Increment(u32),
}

/// Results from ProductActions - variants match 1:1 with ProductAction
#[derive(Debug, Clone)]
pub enum ProductActionResult {
    CheckStock(u32),
    Decrement(StockChange),
    Increment(StockChange),
}

/// Inventory state right after a stock change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockChange {
    pub remaining: u32,
    pub sold: u64,
    /// This change took stock from above the low-stock threshold to at or below it.
    pub low_stock: bool,
    pub category: String,
}
