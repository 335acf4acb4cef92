use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{debug, info, instrument, warn};

use crate::domain::{Order, PaymentMethod};
use super::{
    AuthorizationRequest, AuthorizeCaptureGateway, GatewayError, IntentCaptureGateway, IntentLineItem,
    PaymentHandle, ProviderStatus,
};

/// Result of asking the provider whether a payment has gone through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    /// Funds are captured.
    Captured,
    /// Not captured; carries what the provider reported.
    Incomplete(ProviderStatus),
}

/// Routes payment calls to the provider that matches the order's method.
#[derive(Clone)]
pub struct PaymentGatewayAdapter {
    card: Arc<dyn AuthorizeCaptureGateway>,
    wallet: Arc<dyn IntentCaptureGateway>,
    currency: String,
}

impl PaymentGatewayAdapter {
    pub fn new(
        card: Arc<dyn AuthorizeCaptureGateway>,
        wallet: Arc<dyn IntentCaptureGateway>,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            card,
            wallet,
            currency: currency.into(),
        }
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    /// Starts a payment for the order's total. A zero total gets a no-charge
    /// handle without contacting the provider.
    #[instrument(skip(self, order), fields(order_id = %order.order_id, method = %order.payment_method))]
    pub async fn open(&self, order: &Order) -> Result<PaymentHandle, GatewayError> {
        let amount = order.amounts.total;
        if amount < Decimal::ZERO {
            return Err(GatewayError::InvalidAmount(amount));
        }
        if amount.is_zero() {
            info!("Nothing to charge");
            return Ok(PaymentHandle::no_charge(order.payment_method, &order.order_id));
        }
        debug!(%amount, "Opening payment");
        match order.payment_method {
            PaymentMethod::Card => {
                let request = AuthorizationRequest {
                    amount,
                    currency: self.currency.clone(),
                    order_ref: order.order_id.clone(),
                    customer_ref: order.customer_id.clone(),
                };
                self.card.authorize(&request).await
            }
            PaymentMethod::Wallet => {
                let items: Vec<IntentLineItem> = order
                    .lines
                    .iter()
                    .map(|line| IntentLineItem {
                        name: line.name.clone(),
                        unit_amount: line.unit_price,
                        quantity: line.quantity,
                    })
                    .collect();
                let reference = self
                    .wallet
                    .create_intent(amount, &self.currency, &order.amounts, &items)
                    .await?;
                Ok(PaymentHandle {
                    method: PaymentMethod::Wallet,
                    reference,
                    client_secret: None,
                })
            }
        }
    }

    /// Checks the provider and captures an authorized payment.
    ///
    /// A capture is attempted at most once per call; a rejected capture is
    /// returned to the caller rather than retried.
    #[instrument(skip(self), fields(reference = %handle.reference, method = %handle.method))]
    pub async fn confirm(&self, handle: &PaymentHandle) -> Result<Confirmation, GatewayError> {
        if handle.is_no_charge() {
            return Ok(Confirmation::Captured);
        }
        let status = match handle.method {
            PaymentMethod::Card => self.card.retrieve_status(&handle.reference).await?,
            PaymentMethod::Wallet => self.wallet.retrieve_intent(&handle.reference).await?,
        };
        debug!(%status, "Provider status");

        match status {
            ProviderStatus::Captured => Ok(Confirmation::Captured),
            ProviderStatus::Authorized => {
                let receipt = match handle.method {
                    PaymentMethod::Card => self.card.capture(&handle.reference).await,
                    PaymentMethod::Wallet => self.wallet.capture_intent(&handle.reference).await,
                }
                .inspect_err(|e| warn!(error = %e, "Capture failed"))?;
                info!(amount = %receipt.amount, currency = %receipt.currency, "Payment captured");
                Ok(Confirmation::Captured)
            }
            other => Ok(Confirmation::Incomplete(other)),
        }
    }
}
