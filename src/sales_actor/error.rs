use thiserror::Error;

use crate::actor_framework::FrameworkError;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum SalesError {
    #[error("Sale not found: {0}")]
    NotFound(String),
    #[error("Sale already recorded: {0}")]
    AlreadyRecorded(String),
    #[error("Sales ledger is append-only")]
    AppendOnly,
    #[error("Sale validation error: {0}")]
    ValidationError(String),
    #[error("Actor communication error: {0}")]
    ActorCommunicationError(String),
}

impl From<FrameworkError> for SalesError {
    fn from(err: FrameworkError) -> Self {
        match err {
            FrameworkError::NotFound(id) => SalesError::NotFound(id),
            FrameworkError::AlreadyExists(id) => SalesError::AlreadyRecorded(id),
            other => SalesError::ActorCommunicationError(other.to_string()),
        }
    }
}
