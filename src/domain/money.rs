//! Decimal helpers for monetary values. All amounts are kept at two decimal
//! places, rounded half away from zero.

use rust_decimal::{Decimal, RoundingStrategy};

const DECIMAL_PLACES: u32 = 2;

pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
}

/// Price of `quantity` units, rounded.
pub fn line_total(unit_price: Decimal, quantity: u32) -> Decimal {
    round_money(unit_price * Decimal::from(quantity))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn rounds_half_away_from_zero() {
        assert_eq!(round_money(dec!(1.005)), dec!(1.01));
        assert_eq!(round_money(dec!(2.344)), dec!(2.34));
    }

    #[test]
    fn line_total_multiplies_and_rounds() {
        assert_eq!(line_total(dec!(19.99), 3), dec!(59.97));
        assert_eq!(line_total(dec!(0.333), 3), dec!(1.00));
    }
}
