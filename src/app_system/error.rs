use thiserror::Error;
use tokio::task::JoinError;

use crate::cart_actor::CartError;
use crate::order_actor::OrderError;
use crate::payments::GatewayError;
use crate::product_actor::ProductError;
use crate::promo_actor::PromoError;
use crate::sales_actor::SalesError;

/// Errors surfaced by checkout and settlement.
///
/// Everything up to the payment commit is reported to the caller. After the
/// commit, failures are logged as [`SettlementError::InternalInconsistency`]
/// and the settlement still succeeds.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SettlementError {
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error("Insufficient stock for {product_id}: requested {requested}, available {available}")]
    StockConflict { product_id: String, requested: u32, available: u32 },
    #[error("Promo code usage exceeded: {0}")]
    UsageExceeded(String),
    #[error("Internal inconsistency on order {order_id}: {detail}")]
    InternalInconsistency { order_id: String, detail: String },
    #[error("Store unavailable: {0}")]
    Store(String),
}

impl SettlementError {
    pub fn validation(msg: impl Into<String>) -> Self {
        SettlementError::Validation(msg.into())
    }

    pub fn inconsistency(order_id: impl Into<String>, detail: impl ToString) -> Self {
        SettlementError::InternalInconsistency {
            order_id: order_id.into(),
            detail: detail.to_string(),
        }
    }
}

impl From<OrderError> for SettlementError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::NotFound(id) => SettlementError::NotFound { entity: "order", id },
            OrderError::ValidationError(msg) => SettlementError::Validation(msg),
            e @ (OrderError::InvalidTransition { .. } | OrderError::Immutable) => {
                SettlementError::Validation(e.to_string())
            }
            e @ (OrderError::AlreadyExists(_) | OrderError::ActorCommunicationError(_)) => {
                SettlementError::Store(e.to_string())
            }
        }
    }
}

impl From<ProductError> for SettlementError {
    fn from(err: ProductError) -> Self {
        match err {
            ProductError::NotFound(id) => SettlementError::NotFound { entity: "product", id },
            e @ (ProductError::ValidationError(_)
            | ProductError::InvalidQuantity(_)
            | ProductError::InsufficientStock { .. }) => SettlementError::Validation(e.to_string()),
            e @ (ProductError::AlreadyExists(_) | ProductError::ActorCommunicationError(_)) => {
                SettlementError::Store(e.to_string())
            }
        }
    }
}

impl From<CartError> for SettlementError {
    fn from(err: CartError) -> Self {
        match err {
            CartError::NotFound(id) => SettlementError::NotFound { entity: "cart", id },
            CartError::ItemNotFound(id) => SettlementError::NotFound { entity: "cart item", id },
            e @ (CartError::AlreadyExists(_) | CartError::ActorCommunicationError(_)) => {
                SettlementError::Store(e.to_string())
            }
            e => SettlementError::Validation(e.to_string()),
        }
    }
}

impl From<SalesError> for SettlementError {
    fn from(err: SalesError) -> Self {
        match err {
            SalesError::NotFound(id) => SettlementError::NotFound { entity: "sale", id },
            e @ SalesError::ActorCommunicationError(_) => SettlementError::Store(e.to_string()),
            e => SettlementError::Validation(e.to_string()),
        }
    }
}

impl From<PromoError> for SettlementError {
    fn from(err: PromoError) -> Self {
        match err {
            PromoError::NotFound(code) => SettlementError::NotFound { entity: "promo code", id: code },
            e if e.is_usage_exceeded() => SettlementError::UsageExceeded(e.to_string()),
            e @ (PromoError::AlreadyExists(_) | PromoError::ActorCommunicationError(_)) => {
                SettlementError::Store(e.to_string())
            }
            e => SettlementError::Validation(e.to_string()),
        }
    }
}

/// Failure while stopping the system.
#[derive(Debug, Error)]
pub enum ShutdownError {
    #[error("Actor task failed: {0}")]
    TaskFailed(#[from] JoinError),
}
