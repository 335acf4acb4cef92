use rust_decimal::Decimal;

use crate::actor_framework::Entity;
use crate::domain::{DiscountType, PromoCode, PromoCreate, PromoUsage};
use super::actions::{PromoAction, PromoActionResult};
use super::error::PromoError;

impl Entity for PromoCode {
    type Id = String;
    type CreateParams = PromoCreate;
    type Patch = bool;
    type Action = PromoAction;
    type ActionResult = PromoActionResult;
    type Error = PromoError;

    fn id(&self) -> &String {
        &self.code
    }

    /// The id is normalized to upper case before it is stored.
    fn from_create_params(id: String, params: PromoCreate) -> Result<Self, PromoError> {
        let code = PromoCode::normalize(&id);
        if code.is_empty() {
            return Err(PromoError::ValidationError("code required".to_string()));
        }
        if params.value <= Decimal::ZERO {
            return Err(PromoError::ValidationError(format!("non-positive value {}", params.value)));
        }
        if params.discount_type == DiscountType::Percentage && params.value > Decimal::ONE_HUNDRED {
            return Err(PromoError::ValidationError(format!("percentage {} above 100", params.value)));
        }
        if params.valid_until < params.valid_from {
            return Err(PromoError::ValidationError("validity window ends before it starts".to_string()));
        }
        if params.max_discount.is_some_and(|max| max.is_sign_negative()) {
            return Err(PromoError::ValidationError("negative max discount".to_string()));
        }

        Ok(Self {
            code,
            discount_type: params.discount_type,
            value: params.value,
            min_purchase: params.min_purchase,
            max_discount: params.max_discount,
            usage_limit: params.usage_limit,
            per_user_limit: params.per_user_limit,
            valid_from: params.valid_from,
            valid_until: params.valid_until,
            active: params.active,
            used_count: 0,
            usages: Vec::new(),
        })
    }

    /// The patch toggles the active flag.
    fn on_update(&mut self, active: bool) -> Result<(), PromoError> {
        self.active = active;
        Ok(())
    }

    fn handle_action(&mut self, action: PromoAction) -> Result<PromoActionResult, PromoError> {
        match action {
            PromoAction::RecordUsage { customer_id, order_amount, at } => {
                self.used_count = self.used_count.saturating_add(1);
                self.usages.push(PromoUsage {
                    customer_id,
                    used_at: at,
                    order_amount,
                });
                Ok(PromoActionResult::RecordUsage(self.used_count))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use rust_decimal_macros::dec;

    #[test]
    fn code_is_stored_upper_case() {
        let now = Utc::now();
        let promo = PromoCode::from_create_params(
            "  spring20 ".into(),
            PromoCreate::percentage(dec!(20), now, now + Duration::days(7)),
        )
        .unwrap();
        assert_eq!(promo.code, "SPRING20");
    }

    #[test]
    fn rejects_percentages_over_one_hundred() {
        let now = Utc::now();
        let result = PromoCode::from_create_params(
            "BIG".into(),
            PromoCreate::percentage(dec!(120), now, now + Duration::days(1)),
        );
        assert!(matches!(result, Err(PromoError::ValidationError(_))));
    }

    #[test]
    fn usage_counter_and_audit_move_together() {
        let now = Utc::now();
        let mut promo = PromoCode::from_create_params(
            "TEN".into(),
            PromoCreate::fixed(dec!(10), now, now + Duration::days(1)).with_usage_limit(1),
        )
        .unwrap();

        for _ in 0..2 {
            promo
                .handle_action(PromoAction::RecordUsage {
                    customer_id: None,
                    order_amount: dec!(42),
                    at: now,
                })
                .unwrap();
        }

        assert_eq!(promo.used_count, 2);
        assert_eq!(promo.usages.len(), 2);
    }
}
