use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

#[derive(Debug, Clone)]
pub enum PromoAction {
    /// Counts one redemption and appends its audit entry. Does not re-check
    /// any gate; callers only send this after the order has settled.
    RecordUsage {
        customer_id: Option<String>,
        order_amount: Decimal,
        at: DateTime<Utc>,
    },
}

#[derive(Debug, Clone)]
pub enum PromoActionResult {
    /// New usage count.
    RecordUsage(u32),
}
