use chrono::Utc;

use crate::actor_framework::Entity;
use crate::domain::{Order, OrderCreate, OrderStatus, PaymentStatus, SettlementStage};
use super::actions::{OrderAction, OrderActionResult};
use super::error::OrderError;

impl Entity for Order {
    type Id = String;
    type CreateParams = OrderCreate;
    type Patch = (); // Amounts and snapshots are frozen; state moves through actions
    type Action = OrderAction;
    type ActionResult = OrderActionResult;
    type Error = OrderError;

    fn id(&self) -> &String {
        &self.order_id
    }

    /// Creates a new Order in `pending/pending`, stage `created`.
    ///
    /// # Errors
    /// Rejects orders without lines, zero-quantity lines and inconsistent amounts.
    fn from_create_params(id: String, params: OrderCreate) -> Result<Self, OrderError> {
        if params.lines.is_empty() {
            return Err(OrderError::ValidationError("order has no lines".to_string()));
        }
        if let Some(line) = params.lines.iter().find(|line| line.quantity == 0) {
            return Err(OrderError::ValidationError(format!(
                "line for {} has zero quantity",
                line.product_id
            )));
        }
        if !params.amounts.is_consistent() {
            return Err(OrderError::ValidationError(format!(
                "inconsistent amounts {:?}",
                params.amounts
            )));
        }

        let now = Utc::now();
        Ok(Self {
            order_id: id,
            customer_id: params.customer_id,
            lines: params.lines,
            shipping_address: params.shipping_address,
            billing_address: params.billing_address,
            amounts: params.amounts,
            status: OrderStatus::Pending,
            payment_status: PaymentStatus::Pending,
            payment_method: params.payment_method,
            payment_reference: None,
            promo_code: params.promo_code,
            stage: SettlementStage::Created,
            applied_lines: Default::default(),
            created_at: now,
            updated_at: now,
        })
    }

    fn on_update(&mut self, _patch: ()) -> Result<(), OrderError> {
        Err(OrderError::Immutable)
    }

    /// Orders are never deleted; cancellation is a state.
    fn on_delete(&self) -> Result<(), OrderError> {
        Err(OrderError::Immutable)
    }

    fn handle_action(&mut self, action: OrderAction) -> Result<OrderActionResult, OrderError> {
        match action {
            OrderAction::AttachPayment { reference } => self.attach_payment(reference),
            OrderAction::CommitPayment => self.commit_payment(),
            OrderAction::RecordPaymentStatus(status) => self.record_payment_status(status),
            OrderAction::MarkLineApplied(index) => self.mark_line_applied(index),
            OrderAction::ReleaseLine(index) => self.release_line(index),
            OrderAction::MarkInventoryApplied => self.mark_inventory_applied(),
            OrderAction::MarkNotified => self.mark_notified(),
            OrderAction::Cancel => self.cancel(),
            OrderAction::SetFulfillment(status) => self.set_fulfillment(status),
        }
    }
}

impl Order {
    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    fn invalid(&self, reason: impl Into<String>) -> OrderError {
        OrderError::InvalidTransition {
            stage: self.stage,
            reason: reason.into(),
        }
    }

    fn updated(&self) -> Result<OrderActionResult, OrderError> {
        Ok(OrderActionResult::Updated(self.clone()))
    }

    fn attach_payment(&mut self, reference: String) -> Result<OrderActionResult, OrderError> {
        match self.stage {
            SettlementStage::Created => {}
            SettlementStage::PaymentPending if self.payment_reference.as_deref() == Some(reference.as_str()) => {
                return self.updated();
            }
            _ => return Err(self.invalid("payment already attached")),
        }
        self.payment_reference = Some(reference);
        self.stage = SettlementStage::PaymentPending;
        self.touch();
        self.updated()
    }

    fn commit_payment(&mut self) -> Result<OrderActionResult, OrderError> {
        if self.payment_status == PaymentStatus::Succeeded {
            return Ok(OrderActionResult::AlreadySettled(self.clone()));
        }
        if self.status == OrderStatus::Cancelled {
            return Err(self.invalid("order was cancelled"));
        }
        self.payment_status = PaymentStatus::Succeeded;
        self.status = OrderStatus::Processing;
        self.stage = SettlementStage::PaymentConfirmed;
        self.touch();
        Ok(OrderActionResult::Committed(self.clone()))
    }

    fn record_payment_status(&mut self, status: PaymentStatus) -> Result<OrderActionResult, OrderError> {
        if self.is_paid() {
            return Err(self.invalid("payment already succeeded"));
        }
        if status == PaymentStatus::Succeeded {
            return Err(self.invalid("success is recorded by the commit step"));
        }
        self.payment_status = status;
        if status == PaymentStatus::Failed && self.stage != SettlementStage::Cancelled {
            self.stage = SettlementStage::Failed;
        }
        self.touch();
        self.updated()
    }

    fn mark_line_applied(&mut self, index: usize) -> Result<OrderActionResult, OrderError> {
        if !self.is_paid() {
            return Err(self.invalid("inventory is only applied after payment"));
        }
        if self.status == OrderStatus::Cancelled {
            return Err(self.invalid("order was cancelled"));
        }
        if index >= self.lines.len() {
            return Err(OrderError::ValidationError(format!("no line at index {index}")));
        }
        let newly_applied = self.applied_lines.insert(index);
        if newly_applied {
            self.touch();
        }
        Ok(OrderActionResult::LineApplied { newly_applied })
    }

    fn release_line(&mut self, index: usize) -> Result<OrderActionResult, OrderError> {
        if matches!(self.stage, SettlementStage::InventoryApplied | SettlementStage::Notified) {
            return Err(self.invalid("inventory already applied"));
        }
        let released = self.applied_lines.remove(&index);
        if released {
            self.touch();
        }
        Ok(OrderActionResult::LineReleased { released })
    }

    fn mark_inventory_applied(&mut self) -> Result<OrderActionResult, OrderError> {
        match self.stage {
            SettlementStage::InventoryApplied | SettlementStage::Notified => self.updated(),
            SettlementStage::PaymentConfirmed if self.all_lines_applied() => {
                self.stage = SettlementStage::InventoryApplied;
                self.touch();
                self.updated()
            }
            SettlementStage::PaymentConfirmed => Err(self.invalid("some lines are not applied yet")),
            _ => Err(self.invalid("payment not confirmed")),
        }
    }

    fn mark_notified(&mut self) -> Result<OrderActionResult, OrderError> {
        match self.stage {
            SettlementStage::Notified => self.updated(),
            SettlementStage::InventoryApplied => {
                self.stage = SettlementStage::Notified;
                self.touch();
                self.updated()
            }
            _ => Err(self.invalid("inventory not applied")),
        }
    }

    fn cancel(&mut self) -> Result<OrderActionResult, OrderError> {
        if self.status == OrderStatus::Cancelled {
            return self.updated();
        }
        if !self.stage.is_cancellable() || self.status.is_terminal() {
            return Err(self.invalid("order is past the cancellable stages"));
        }
        self.status = OrderStatus::Cancelled;
        self.stage = SettlementStage::Cancelled;
        self.touch();
        self.updated()
    }

    fn set_fulfillment(&mut self, status: OrderStatus) -> Result<OrderActionResult, OrderError> {
        if !self.is_paid() {
            return Err(self.invalid("fulfillment requires a paid order"));
        }
        if status == self.status {
            return self.updated();
        }
        let allowed = matches!(
            (self.status, status),
            (OrderStatus::Processing, OrderStatus::Shipped) | (OrderStatus::Shipped, OrderStatus::Delivered)
        );
        if !allowed {
            return Err(self.invalid(format!("cannot move from {} to {}", self.status, status)));
        }
        self.status = status;
        self.touch();
        self.updated()
    }
}
