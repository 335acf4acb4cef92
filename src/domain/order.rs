use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::money::{line_total, round_money};

/// Postal address captured on the order at checkout time.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Address {
    pub full_name: String,
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub postal_code: String,
    pub country: String,
    pub phone: Option<String>,
}

impl Address {
    pub fn new(
        full_name: impl Into<String>,
        line1: impl Into<String>,
        city: impl Into<String>,
        postal_code: impl Into<String>,
        country: impl Into<String>,
    ) -> Self {
        Self {
            full_name: full_name.into(),
            line1: line1.into(),
            line2: None,
            city: city.into(),
            postal_code: postal_code.into(),
            country: country.into(),
            phone: None,
        }
    }

    /// Names the first required field that is blank, if any.
    pub fn missing_field(&self) -> Option<&'static str> {
        [
            ("full_name", &self.full_name),
            ("line1", &self.line1),
            ("city", &self.city),
            ("postal_code", &self.postal_code),
            ("country", &self.country),
        ]
        .into_iter()
        .find(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
    }
}

/// One purchased product, snapshotted when the order is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: String,
    pub name: String,
    pub unit_price: Decimal,
    pub quantity: u32,
    pub image: Option<String>,
}

impl OrderLine {
    pub fn total(&self) -> Decimal {
        line_total(self.unit_price, self.quantity)
    }
}

/// Frozen money breakdown. `total = subtotal + shipping + tax - discount`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmountBreakdown {
    pub subtotal: Decimal,
    pub shipping: Decimal,
    pub tax: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
}

impl AmountBreakdown {
    pub fn new(subtotal: Decimal, shipping: Decimal, tax: Decimal, discount: Decimal) -> Self {
        let subtotal = round_money(subtotal);
        let shipping = round_money(shipping);
        let tax = round_money(tax);
        let discount = round_money(discount);
        Self {
            subtotal,
            shipping,
            tax,
            discount,
            total: subtotal + shipping + tax - discount,
        }
    }

    pub fn is_consistent(&self) -> bool {
        let parts = [self.subtotal, self.shipping, self.tax, self.discount, self.total];
        parts.iter().all(|v| !v.is_sign_negative())
            && self.total == self.subtotal + self.shipping + self.tax - self.discount
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Authorized,
    Succeeded,
    Failed,
    Refunded,
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Authorized => "authorized",
            PaymentStatus::Succeeded => "succeeded",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
        };
        f.write_str(name)
    }
}

/// Which provider protocol settles the order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Pre-authorize, then capture.
    Card,
    /// Create a provider-side order, buyer approves, then capture.
    Wallet,
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentMethod::Card => f.write_str("card"),
            PaymentMethod::Wallet => f.write_str("wallet"),
        }
    }
}

/// Progress of an order through the settlement pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettlementStage {
    Created,
    PaymentPending,
    PaymentConfirmed,
    InventoryApplied,
    Notified,
    Cancelled,
    Failed,
}

impl SettlementStage {
    /// Stages from which the order may still be cancelled.
    pub fn is_cancellable(self) -> bool {
        matches!(
            self,
            SettlementStage::Created
                | SettlementStage::PaymentPending
                | SettlementStage::PaymentConfirmed
                | SettlementStage::Failed
        )
    }
}

/// The durable record of a checkout and its settlement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: String,
    /// `None` for guest checkouts.
    pub customer_id: Option<String>,
    pub lines: Vec<OrderLine>,
    pub shipping_address: Address,
    pub billing_address: Address,
    pub amounts: AmountBreakdown,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub payment_method: PaymentMethod,
    pub payment_reference: Option<String>,
    pub promo_code: Option<String>,
    pub stage: SettlementStage,
    /// Indices of lines whose inventory decrement has been applied.
    pub applied_lines: BTreeSet<usize>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn is_guest(&self) -> bool {
        self.customer_id.is_none()
    }

    pub fn is_paid(&self) -> bool {
        self.payment_status == PaymentStatus::Succeeded
    }

    pub fn all_lines_applied(&self) -> bool {
        (0..self.lines.len()).all(|idx| self.applied_lines.contains(&idx))
    }
}

/// Payload for creating a new order. The order id is assigned by the store.
#[derive(Debug, Clone)]
pub struct OrderCreate {
    pub customer_id: Option<String>,
    pub lines: Vec<OrderLine>,
    pub shipping_address: Address,
    pub billing_address: Address,
    pub amounts: AmountBreakdown,
    pub payment_method: PaymentMethod,
    pub promo_code: Option<String>,
}
