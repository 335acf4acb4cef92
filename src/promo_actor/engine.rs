use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::domain::money::round_money;
use crate::domain::{DiscountQuote, DiscountType, PromoCode};
use super::error::PromoError;

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

impl PromoCode {
    /// Runs the validation gates and prices the discount for `cart_total`.
    ///
    /// Gates short-circuit in order: active, validity window, usage limit,
    /// minimum purchase, per-customer limit. Guests are not subject to the
    /// per-customer limit.
    pub fn quote(
        &self,
        cart_total: Decimal,
        customer_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<DiscountQuote, PromoError> {
        if !self.active {
            return Err(PromoError::Inactive(self.code.clone()));
        }
        if now < self.valid_from {
            return Err(PromoError::NotYetValid(self.code.clone()));
        }
        if now > self.valid_until {
            return Err(PromoError::Expired(self.code.clone()));
        }
        if self.usage_limit.is_some_and(|limit| self.used_count >= limit) {
            return Err(PromoError::UsageLimitReached(self.code.clone()));
        }
        if let Some(minimum) = self.min_purchase {
            if cart_total < minimum {
                return Err(PromoError::MinimumNotMet { minimum });
            }
        }
        if let (Some(limit), Some(customer)) = (self.per_user_limit, customer_id) {
            if self.uses_by(customer) >= limit {
                return Err(PromoError::PerUserLimitReached(self.code.clone()));
            }
        }

        let discount = self.discount_for(cart_total);
        Ok(DiscountQuote {
            code: self.code.clone(),
            discount,
            final_amount: cart_total - discount,
        })
    }

    /// Discount before gates: formula, then the max cap, then the cart total.
    pub fn discount_for(&self, cart_total: Decimal) -> Decimal {
        let cart_total = cart_total.max(Decimal::ZERO);
        let raw = match self.discount_type {
            DiscountType::Percentage => cart_total * self.value / HUNDRED,
            DiscountType::Fixed => self.value,
        };
        let capped = match self.max_discount {
            Some(max) => raw.min(max),
            None => raw,
        };
        round_money(capped.min(cart_total).max(Decimal::ZERO))
    }
}
