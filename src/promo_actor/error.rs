use rust_decimal::Decimal;
use thiserror::Error;

use crate::actor_framework::FrameworkError;

/// Validation gate failures, in the order the gates are checked.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum PromoError {
    #[error("Promo code not found: {0}")]
    NotFound(String),
    #[error("Promo code already exists: {0}")]
    AlreadyExists(String),
    #[error("Promo code is not active: {0}")]
    Inactive(String),
    #[error("Promo code is not valid yet: {0}")]
    NotYetValid(String),
    #[error("Promo code has expired: {0}")]
    Expired(String),
    #[error("Promo code usage limit reached: {0}")]
    UsageLimitReached(String),
    #[error("Minimum purchase of {minimum} not met")]
    MinimumNotMet { minimum: Decimal },
    #[error("Promo code already used the maximum number of times by this customer: {0}")]
    PerUserLimitReached(String),
    #[error("Promo validation error: {0}")]
    ValidationError(String),
    #[error("Actor communication error: {0}")]
    ActorCommunicationError(String),
}

impl PromoError {
    /// Whether the failure comes from a usage cap rather than from the code
    /// or the cart.
    pub fn is_usage_exceeded(&self) -> bool {
        matches!(self, PromoError::UsageLimitReached(_) | PromoError::PerUserLimitReached(_))
    }
}

impl From<FrameworkError> for PromoError {
    fn from(err: FrameworkError) -> Self {
        match err {
            FrameworkError::NotFound(code) => PromoError::NotFound(code),
            FrameworkError::AlreadyExists(code) => PromoError::AlreadyExists(code),
            other => PromoError::ActorCommunicationError(other.to_string()),
        }
    }
}
