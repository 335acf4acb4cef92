use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::money::round_money;
use super::order::AmountBreakdown;

/// Shipping and tax rules applied at checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingPolicy {
    /// Fraction, e.g. `0.08`.
    pub tax_rate: Decimal,
    pub shipping_flat: Decimal,
    /// Subtotals at or above this ship free.
    pub free_shipping_threshold: Decimal,
}

impl Default for PricingPolicy {
    fn default() -> Self {
        Self {
            tax_rate: dec!(0.08),
            shipping_flat: dec!(5.99),
            free_shipping_threshold: dec!(50),
        }
    }
}

impl PricingPolicy {
    /// Tax is charged on the discounted subtotal; shipping is not taxed.
    pub fn breakdown(&self, subtotal: Decimal, discount: Decimal) -> AmountBreakdown {
        let subtotal = round_money(subtotal);
        let discount = round_money(discount.clamp(Decimal::ZERO, subtotal));
        let shipping = if subtotal >= self.free_shipping_threshold {
            Decimal::ZERO
        } else {
            self.shipping_flat
        };
        let tax = round_money((subtotal - discount) * self.tax_rate);
        AmountBreakdown::new(subtotal, shipping, tax, discount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_orders_pay_flat_shipping() {
        let amounts = PricingPolicy::default().breakdown(dec!(20), dec!(0));
        assert_eq!(amounts.shipping, dec!(5.99));
        assert_eq!(amounts.tax, dec!(1.60));
        assert_eq!(amounts.total, dec!(27.59));
        assert!(amounts.is_consistent());
    }

    #[test]
    fn discount_reduces_taxable_amount_only() {
        let amounts = PricingPolicy::default().breakdown(dec!(100), dec!(15));
        assert_eq!(amounts.shipping, dec!(0));
        assert_eq!(amounts.tax, dec!(6.80));
        assert_eq!(amounts.total, dec!(91.80));
    }
}
