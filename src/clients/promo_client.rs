use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{debug, info, instrument};

use crate::actor_framework::ResourceClient;
use crate::domain::{DiscountQuote, PromoCode, PromoCreate};
use crate::promo_actor::{PromoAction, PromoActionResult, PromoError};

/// Client for promo codes. Codes are matched case-insensitively.
#[derive(Clone)]
pub struct PromoClient {
    inner: ResourceClient<PromoCode>,
}

impl_client_new!(PromoClient, PromoCode);

impl PromoClient {
    #[instrument(skip(self, params))]
    pub async fn create_promo(&self, code: String, params: PromoCreate) -> Result<String, PromoError> {
        debug!("Sending request");
        self.inner.insert(PromoCode::normalize(&code), params).await
    }

    #[instrument(skip(self))]
    pub async fn get_promo(&self, code: String) -> Result<Option<PromoCode>, PromoError> {
        self.inner.get(PromoCode::normalize(&code)).await
    }

    #[instrument(skip(self))]
    pub async fn set_active(&self, code: String, active: bool) -> Result<PromoCode, PromoError> {
        self.inner.update(PromoCode::normalize(&code), active).await
    }

    /// Validates `code` against the cart and prices the discount. Reads only.
    #[instrument(skip(self))]
    pub async fn compute_discount(
        &self,
        code: String,
        cart_total: Decimal,
        customer_id: Option<String>,
    ) -> Result<DiscountQuote, PromoError> {
        let promo = self
            .get_promo(code.clone())
            .await?
            .ok_or_else(|| PromoError::NotFound(PromoCode::normalize(&code)))?;
        promo.quote(cart_total, customer_id.as_deref(), Utc::now())
    }

    /// Counts a redemption. Call only once the order has been paid; the gates
    /// are not re-checked here.
    #[instrument(skip(self))]
    pub async fn apply_usage(
        &self,
        code: String,
        customer_id: Option<String>,
        order_amount: Decimal,
    ) -> Result<u32, PromoError> {
        debug!("Sending request");
        let action = PromoAction::RecordUsage {
            customer_id,
            order_amount,
            at: Utc::now(),
        };
        match self.inner.perform_action(PromoCode::normalize(&code), action).await? {
            PromoActionResult::RecordUsage(count) => {
                info!(used_count = count, "Promo usage recorded");
                Ok(count)
            }
        }
    }
}
