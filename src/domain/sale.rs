use chrono::{DateTime, Datelike, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::money::line_total;
use super::order::OrderLine;

/// One fulfilled order line in the sales ledger. Never changed after insert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sale {
    /// `<order id>#<line index>`; at most one sale per order line.
    pub id: String,
    pub order_id: String,
    pub line_index: usize,
    pub product_id: String,
    pub product_name: String,
    pub category: String,
    pub unit_price: Decimal,
    pub quantity: u32,
    pub total: Decimal,
    pub sold_at: DateTime<Utc>,
    pub month: u32,
    pub year: i32,
}

impl Sale {
    pub fn ledger_key(order_id: &str, line_index: usize) -> String {
        format!("{order_id}#{line_index}")
    }
}

/// Payload for appending a sale.
#[derive(Debug, Clone)]
pub struct SaleRecord {
    pub order_id: String,
    pub line_index: usize,
    pub product_id: String,
    pub product_name: String,
    pub category: String,
    pub unit_price: Decimal,
    pub quantity: u32,
    pub sold_at: DateTime<Utc>,
}

impl SaleRecord {
    pub fn from_line(
        order_id: impl Into<String>,
        line_index: usize,
        line: &OrderLine,
        category: impl Into<String>,
        sold_at: DateTime<Utc>,
    ) -> Self {
        Self {
            order_id: order_id.into(),
            line_index,
            product_id: line.product_id.clone(),
            product_name: line.name.clone(),
            category: category.into(),
            unit_price: line.unit_price,
            quantity: line.quantity,
            sold_at,
        }
    }

    pub fn into_sale(self, id: String) -> Sale {
        Sale {
            id,
            total: line_total(self.unit_price, self.quantity),
            month: self.sold_at.month(),
            year: self.sold_at.year(),
            order_id: self.order_id,
            line_index: self.line_index,
            product_id: self.product_id,
            product_name: self.product_name,
            category: self.category,
            unit_price: self.unit_price,
            quantity: self.quantity,
            sold_at: self.sold_at,
        }
    }
}

/// Revenue and units for one calendar month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlySales {
    pub year: i32,
    pub month: u32,
    pub units: u64,
    pub revenue: Decimal,
}
