use thiserror::Error;

use crate::actor_framework::FrameworkError;
use crate::domain::SettlementStage;

/// Errors that can occur during order operations.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum OrderError {
    #[error("Order not found: {0}")]
    NotFound(String),
    #[error("Order already exists: {0}")]
    AlreadyExists(String),
    #[error("Order validation error: {0}")]
    ValidationError(String),
    #[error("Invalid transition for order in stage {stage:?}: {reason}")]
    InvalidTransition { stage: SettlementStage, reason: String },
    #[error("Orders cannot be patched once created")]
    Immutable,
    #[error("Actor communication error: {0}")]
    ActorCommunicationError(String),
}

impl From<FrameworkError> for OrderError {
    fn from(err: FrameworkError) -> Self {
        match err {
            FrameworkError::NotFound(id) => OrderError::NotFound(id),
            FrameworkError::AlreadyExists(id) => OrderError::AlreadyExists(id),
            other => OrderError::ActorCommunicationError(other.to_string()),
        }
    }
}
