//! Best-effort customer notifications, delivered off the settlement path.

mod dispatcher;

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

use crate::domain::{Order, OrderStatus};

pub use dispatcher::*;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum NotifyError {
    #[error("Notification delivery failed: {0}")]
    Delivery(String),
    #[error("Notification timed out after {0} ms")]
    TimedOut(u128),
    #[error("Notification queue is full")]
    QueueFull,
    #[error("Notification dispatcher has stopped")]
    Closed,
}

/// Outbound channel to customers (email, SMS, ...). Failures are never fatal
/// to the caller.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_order_confirmation(&self, order: &Order) -> Result<(), NotifyError>;

    async fn send_status_update(&self, order: &Order, status: OrderStatus) -> Result<(), NotifyError>;
}

/// Writes notifications to the log instead of sending them.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send_order_confirmation(&self, order: &Order) -> Result<(), NotifyError> {
        info!(
            order_id = %order.order_id,
            customer_id = ?order.customer_id,
            total = %order.amounts.total,
            "Order confirmation sent"
        );
        Ok(())
    }

    async fn send_status_update(&self, order: &Order, status: OrderStatus) -> Result<(), NotifyError> {
        info!(order_id = %order.order_id, %status, "Order status update sent");
        Ok(())
    }
}
