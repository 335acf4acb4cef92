use tracing::{debug, info, instrument};

use crate::actor_framework::ResourceClient;
use crate::domain::{Order, OrderCreate, OrderStatus, PaymentStatus};
use crate::order_actor::{OrderAction, OrderActionResult, OrderError};

/// Outcome of the conditional payment commit.
#[derive(Debug, Clone, PartialEq)]
pub enum PaymentCommit {
    /// This call moved the order to paid; the caller owns the side effects.
    Committed(Order),
    /// Another call got there first; the order is returned unchanged.
    AlreadySettled(Order),
}

/// Client for interacting with the Order actor.
#[derive(Clone)]
pub struct OrderClient {
    inner: ResourceClient<Order>,
}

impl_basic_client!(OrderClient, Order, OrderError, order);

impl OrderClient {
    #[instrument(skip(self, params), fields(customer_id = ?params.customer_id, lines = params.lines.len()))]
    pub async fn create_order(&self, params: OrderCreate) -> Result<String, OrderError> {
        debug!("Sending request");
        let order_id = self.inner.create(params).await?;
        info!(%order_id, "Order created");
        Ok(order_id)
    }

    /// Like `get_order` but a missing order is an error.
    #[instrument(skip(self))]
    pub async fn require_order(&self, id: String) -> Result<Order, OrderError> {
        self.inner.get(id.clone()).await?.ok_or(OrderError::NotFound(id))
    }

    #[instrument(skip(self))]
    pub async fn attach_payment(&self, id: String, reference: String) -> Result<Order, OrderError> {
        self.updated(id, OrderAction::AttachPayment { reference }).await
    }

    /// Compare-and-swap on the payment status: exactly one caller sees
    /// [`PaymentCommit::Committed`] for a given order.
    #[instrument(skip(self))]
    pub async fn commit_payment(&self, id: String) -> Result<PaymentCommit, OrderError> {
        debug!("Sending request");
        match self.inner.perform_action(id, OrderAction::CommitPayment).await? {
            OrderActionResult::Committed(order) => Ok(PaymentCommit::Committed(order)),
            OrderActionResult::AlreadySettled(order) => Ok(PaymentCommit::AlreadySettled(order)),
            other => Err(unexpected_result!(OrderError, other)),
        }
    }

    #[instrument(skip(self))]
    pub async fn record_payment_status(&self, id: String, status: PaymentStatus) -> Result<Order, OrderError> {
        self.updated(id, OrderAction::RecordPaymentStatus(status)).await
    }

    /// Returns `true` only the first time a line is marked.
    #[instrument(skip(self))]
    pub async fn mark_line_applied(&self, id: String, line_index: usize) -> Result<bool, OrderError> {
        debug!("Sending request");
        match self.inner.perform_action(id, OrderAction::MarkLineApplied(line_index)).await? {
            OrderActionResult::LineApplied { newly_applied } => Ok(newly_applied),
            other => Err(unexpected_result!(OrderError, other)),
        }
    }

    /// Returns `true` if the line was claimed and is now free again.
    #[instrument(skip(self))]
    pub async fn release_line(&self, id: String, line_index: usize) -> Result<bool, OrderError> {
        debug!("Sending request");
        match self.inner.perform_action(id, OrderAction::ReleaseLine(line_index)).await? {
            OrderActionResult::LineReleased { released } => Ok(released),
            other => Err(unexpected_result!(OrderError, other)),
        }
    }

    #[instrument(skip(self))]
    pub async fn mark_inventory_applied(&self, id: String) -> Result<Order, OrderError> {
        self.updated(id, OrderAction::MarkInventoryApplied).await
    }

    #[instrument(skip(self))]
    pub async fn mark_notified(&self, id: String) -> Result<Order, OrderError> {
        self.updated(id, OrderAction::MarkNotified).await
    }

    #[instrument(skip(self))]
    pub async fn cancel(&self, id: String) -> Result<Order, OrderError> {
        self.updated(id, OrderAction::Cancel).await
    }

    #[instrument(skip(self))]
    pub async fn set_fulfillment(&self, id: String, status: OrderStatus) -> Result<Order, OrderError> {
        self.updated(id, OrderAction::SetFulfillment(status)).await
    }

    async fn updated(&self, id: String, action: OrderAction) -> Result<Order, OrderError> {
        debug!(?action, "Sending request");
        match self.inner.perform_action(id, action).await? {
            OrderActionResult::Updated(order) => Ok(order),
            other => Err(unexpected_result!(OrderError, other)),
        }
    }
}
