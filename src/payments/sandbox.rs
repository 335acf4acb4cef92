use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use crate::domain::{AmountBreakdown, PaymentMethod};
use super::{
    AuthorizationRequest, AuthorizeCaptureGateway, CapturedReceipt, GatewayError, IntentCaptureGateway,
    IntentLineItem, PaymentHandle, ProviderStatus,
};

struct SandboxPayment {
    amount: Decimal,
    currency: String,
    status: ProviderStatus,
    receipt: Option<CapturedReceipt>,
}

#[derive(Default)]
struct SandboxState {
    payments: HashMap<String, SandboxPayment>,
    unavailable: bool,
    auto_approve: bool,
    captures: usize,
}

/// In-memory provider for the demo binary and tests.
///
/// Payments start `Pending` until [`approve`](Self::approve) or
/// [`decline`](Self::decline) is called, unless auto-approve is on. Captures
/// are idempotent: capturing a captured payment returns the first receipt.
pub struct SandboxGateway {
    method: PaymentMethod,
    prefix: &'static str,
    state: Mutex<SandboxState>,
}

impl SandboxGateway {
    pub fn card() -> Self {
        Self::new(PaymentMethod::Card, "pi")
    }

    pub fn wallet() -> Self {
        Self::new(PaymentMethod::Wallet, "wo")
    }

    fn new(method: PaymentMethod, prefix: &'static str) -> Self {
        Self {
            method,
            prefix,
            state: Mutex::new(SandboxState::default()),
        }
    }

    /// Approves every new payment on creation.
    pub fn auto_approving(mut self) -> Self {
        self.state.get_mut().auto_approve = true;
        self
    }

    pub async fn approve(&self, reference: &str) {
        self.set_status(reference, ProviderStatus::Authorized).await;
    }

    pub async fn decline(&self, reference: &str) {
        self.set_status(reference, ProviderStatus::Failed).await;
    }

    pub async fn set_unavailable(&self, unavailable: bool) {
        self.state.lock().await.unavailable = unavailable;
    }

    /// Number of captures that actually moved funds.
    pub async fn capture_count(&self) -> usize {
        self.state.lock().await.captures
    }

    async fn set_status(&self, reference: &str, status: ProviderStatus) {
        if let Some(payment) = self.state.lock().await.payments.get_mut(reference) {
            if payment.status != ProviderStatus::Captured {
                payment.status = status;
            }
        }
    }

    async fn open(&self, amount: Decimal, currency: &str) -> Result<String, GatewayError> {
        let mut state = self.state.lock().await;
        if state.unavailable {
            return Err(GatewayError::GatewayUnavailable(format!("{} sandbox offline", self.method)));
        }
        if amount <= Decimal::ZERO {
            return Err(GatewayError::InvalidAmount(amount));
        }
        let reference = format!("{}_{}", self.prefix, Uuid::new_v4().simple());
        let status = if state.auto_approve {
            ProviderStatus::Authorized
        } else {
            ProviderStatus::Pending
        };
        state.payments.insert(
            reference.clone(),
            SandboxPayment {
                amount,
                currency: currency.to_string(),
                status,
                receipt: None,
            },
        );
        debug!(%reference, %amount, "Sandbox payment opened");
        Ok(reference)
    }

    async fn status(&self, reference: &str) -> Result<ProviderStatus, GatewayError> {
        let state = self.state.lock().await;
        if state.unavailable {
            return Err(GatewayError::GatewayUnavailable(format!("{} sandbox offline", self.method)));
        }
        state
            .payments
            .get(reference)
            .map(|payment| payment.status)
            .ok_or_else(|| GatewayError::UnknownReference(reference.to_string()))
    }

    async fn capture_payment(&self, reference: &str) -> Result<CapturedReceipt, GatewayError> {
        let mut state = self.state.lock().await;
        if state.unavailable {
            return Err(GatewayError::GatewayUnavailable(format!("{} sandbox offline", self.method)));
        }
        let payment = state
            .payments
            .get_mut(reference)
            .ok_or_else(|| GatewayError::UnknownReference(reference.to_string()))?;

        if let Some(receipt) = &payment.receipt {
            return Ok(receipt.clone());
        }
        if payment.status != ProviderStatus::Authorized {
            return Err(GatewayError::CaptureRejected {
                reference: reference.to_string(),
                status: payment.status,
            });
        }

        let receipt = CapturedReceipt {
            reference: reference.to_string(),
            amount: payment.amount,
            currency: payment.currency.clone(),
            captured_at: Utc::now(),
        };
        payment.status = ProviderStatus::Captured;
        payment.receipt = Some(receipt.clone());
        state.captures += 1;
        Ok(receipt)
    }
}

#[async_trait]
impl AuthorizeCaptureGateway for SandboxGateway {
    async fn authorize(&self, request: &AuthorizationRequest) -> Result<PaymentHandle, GatewayError> {
        let reference = self.open(request.amount, &request.currency).await?;
        Ok(PaymentHandle {
            method: self.method,
            client_secret: Some(format!("{reference}_secret")),
            reference,
        })
    }

    async fn retrieve_status(&self, reference: &str) -> Result<ProviderStatus, GatewayError> {
        self.status(reference).await
    }

    async fn capture(&self, reference: &str) -> Result<CapturedReceipt, GatewayError> {
        self.capture_payment(reference).await
    }
}

#[async_trait]
impl IntentCaptureGateway for SandboxGateway {
    async fn create_intent(
        &self,
        amount: Decimal,
        currency: &str,
        breakdown: &AmountBreakdown,
        line_items: &[IntentLineItem],
    ) -> Result<String, GatewayError> {
        if breakdown.total != amount {
            return Err(GatewayError::InvalidAmount(amount));
        }
        debug!(items = line_items.len(), "Creating sandbox intent");
        self.open(amount, currency).await
    }

    async fn retrieve_intent(&self, provider_order_id: &str) -> Result<ProviderStatus, GatewayError> {
        self.status(provider_order_id).await
    }

    async fn capture_intent(&self, provider_order_id: &str) -> Result<CapturedReceipt, GatewayError> {
        self.capture_payment(provider_order_id).await
    }
}
