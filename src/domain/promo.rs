use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountType {
    Percentage,
    Fixed,
}

/// Audit entry written each time a code is redeemed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromoUsage {
    pub customer_id: Option<String>,
    pub used_at: DateTime<Utc>,
    pub order_amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromoCode {
    /// Upper-case; lookups are case-insensitive.
    pub code: String,
    pub discount_type: DiscountType,
    pub value: Decimal,
    pub min_purchase: Option<Decimal>,
    pub max_discount: Option<Decimal>,
    pub usage_limit: Option<u32>,
    pub per_user_limit: Option<u32>,
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
    pub active: bool,
    /// Only ever increases, and always together with `usages`.
    pub used_count: u32,
    pub usages: Vec<PromoUsage>,
}

impl PromoCode {
    pub fn normalize(code: &str) -> String {
        code.trim().to_uppercase()
    }

    pub fn uses_by(&self, customer_id: &str) -> u32 {
        let count = self
            .usages
            .iter()
            .filter(|usage| usage.customer_id.as_deref() == Some(customer_id))
            .count();
        u32::try_from(count).unwrap_or(u32::MAX)
    }
}

/// Payload for registering a promo code.
#[derive(Debug, Clone)]
pub struct PromoCreate {
    pub discount_type: DiscountType,
    pub value: Decimal,
    pub min_purchase: Option<Decimal>,
    pub max_discount: Option<Decimal>,
    pub usage_limit: Option<u32>,
    pub per_user_limit: Option<u32>,
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
    pub active: bool,
}

impl PromoCreate {
    pub fn percentage(value: Decimal, valid_from: DateTime<Utc>, valid_until: DateTime<Utc>) -> Self {
        Self::new(DiscountType::Percentage, value, valid_from, valid_until)
    }

    pub fn fixed(value: Decimal, valid_from: DateTime<Utc>, valid_until: DateTime<Utc>) -> Self {
        Self::new(DiscountType::Fixed, value, valid_from, valid_until)
    }

    fn new(
        discount_type: DiscountType,
        value: Decimal,
        valid_from: DateTime<Utc>,
        valid_until: DateTime<Utc>,
    ) -> Self {
        Self {
            discount_type,
            value,
            min_purchase: None,
            max_discount: None,
            usage_limit: None,
            per_user_limit: None,
            valid_from,
            valid_until,
            active: true,
        }
    }

    pub fn with_max_discount(mut self, max: Decimal) -> Self {
        self.max_discount = Some(max);
        self
    }

    pub fn with_min_purchase(mut self, min: Decimal) -> Self {
        self.min_purchase = Some(min);
        self
    }

    pub fn with_usage_limit(mut self, limit: u32) -> Self {
        self.usage_limit = Some(limit);
        self
    }

    pub fn with_per_user_limit(mut self, limit: u32) -> Self {
        self.per_user_limit = Some(limit);
        self
    }
}

/// A validated discount for a given cart total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscountQuote {
    pub code: String,
    pub discount: Decimal,
    pub final_amount: Decimal,
}
