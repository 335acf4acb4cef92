//! Payment provider seams.
//!
//! Two provider protocols are supported: card payments that are authorized
//! and then captured, and wallet payments where an intent is created, approved
//! by the buyer on the provider side, and then captured. Both sit behind
//! [`PaymentGatewayAdapter`], which picks the protocol from the order's
//! [`PaymentMethod`]. Nothing here touches local stores.

mod adapter;
mod sandbox;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{AmountBreakdown, PaymentMethod, PaymentStatus};

pub use adapter::*;
pub use sandbox::*;

/// What the storefront keeps to find a payment again at the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentHandle {
    pub method: PaymentMethod,
    /// Provider payment id (card) or provider order id (wallet).
    pub reference: String,
    /// Handed to the buyer's client to complete approval, when the provider issues one.
    pub client_secret: Option<String>,
}

const NO_CHARGE_PREFIX: &str = "nocharge_";

impl PaymentHandle {
    /// Handle for an order whose total is zero. No provider holds it.
    pub fn no_charge(method: PaymentMethod, order_id: &str) -> Self {
        Self {
            method,
            reference: format!("{NO_CHARGE_PREFIX}{order_id}"),
            client_secret: None,
        }
    }

    pub fn is_no_charge(&self) -> bool {
        self.reference.starts_with(NO_CHARGE_PREFIX)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderStatus {
    /// Waiting for the buyer to confirm or approve.
    Pending,
    Authorized,
    Captured,
    Failed,
}

impl ProviderStatus {
    /// Payment status to record on an order that is not settling.
    pub fn as_payment_status(self) -> PaymentStatus {
        match self {
            ProviderStatus::Pending => PaymentStatus::Pending,
            ProviderStatus::Authorized => PaymentStatus::Authorized,
            ProviderStatus::Captured => PaymentStatus::Succeeded,
            ProviderStatus::Failed => PaymentStatus::Failed,
        }
    }
}

impl std::fmt::Display for ProviderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ProviderStatus::Pending => "pending",
            ProviderStatus::Authorized => "authorized",
            ProviderStatus::Captured => "captured",
            ProviderStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapturedReceipt {
    pub reference: String,
    pub amount: Decimal,
    pub currency: String,
    pub captured_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationRequest {
    /// Major units, e.g. dollars.
    pub amount: Decimal,
    pub currency: String,
    pub order_ref: String,
    pub customer_ref: Option<String>,
}

/// Itemization sent along with a wallet intent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntentLineItem {
    pub name: String,
    pub unit_amount: Decimal,
    pub quantity: u32,
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum GatewayError {
    #[error("Payment gateway unavailable: {0}")]
    GatewayUnavailable(String),
    #[error("Invalid payment amount: {0}")]
    InvalidAmount(Decimal),
    #[error("Capture rejected for {reference}: payment is {status}")]
    CaptureRejected { reference: String, status: ProviderStatus },
    #[error("Unknown payment reference: {0}")]
    UnknownReference(String),
    #[error("Payment handle is for {actual}, order expects {expected}")]
    MethodMismatch { expected: PaymentMethod, actual: PaymentMethod },
}

/// Card-style provider: authorize, confirm out of band, then capture.
#[async_trait]
pub trait AuthorizeCaptureGateway: Send + Sync {
    async fn authorize(&self, request: &AuthorizationRequest) -> Result<PaymentHandle, GatewayError>;

    /// Must be safe to call any number of times.
    async fn retrieve_status(&self, reference: &str) -> Result<ProviderStatus, GatewayError>;

    /// # Errors
    /// `CaptureRejected` unless the payment is authorized or already captured.
    async fn capture(&self, reference: &str) -> Result<CapturedReceipt, GatewayError>;
}

/// Wallet-style provider: create an intent, the buyer approves it, then capture.
#[async_trait]
pub trait IntentCaptureGateway: Send + Sync {
    /// Returns the provider order id.
    async fn create_intent(
        &self,
        amount: Decimal,
        currency: &str,
        breakdown: &AmountBreakdown,
        line_items: &[IntentLineItem],
    ) -> Result<String, GatewayError>;

    async fn retrieve_intent(&self, provider_order_id: &str) -> Result<ProviderStatus, GatewayError>;

    async fn capture_intent(&self, provider_order_id: &str) -> Result<CapturedReceipt, GatewayError>;
}
