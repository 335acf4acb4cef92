use crate::domain::{Order, OrderStatus, PaymentStatus};

/// State transitions on an order. Amounts and line snapshots are never touched.
#[derive(Debug, Clone)]
pub enum OrderAction {
    /// Records the provider reference once a payment handle exists.
    AttachPayment { reference: String },
    /// The settlement commit point: moves to `processing/succeeded` only if
    /// payment has not already succeeded.
    CommitPayment,
    /// Records a non-success provider status seen at confirmation.
    RecordPaymentStatus(PaymentStatus),
    /// Claims one line for its inventory decrement.
    MarkLineApplied(usize),
    /// Gives a claimed line back after its decrement failed, so a later
    /// repair run can claim it again.
    ReleaseLine(usize),
    MarkInventoryApplied,
    MarkNotified,
    Cancel,
    /// Fulfillment progress after payment (shipped, delivered).
    SetFulfillment(OrderStatus),
}

#[derive(Debug, Clone)]
pub enum OrderActionResult {
    /// `CommitPayment` performed the transition.
    Committed(Order),
    /// `CommitPayment` found the payment already succeeded; order unchanged.
    AlreadySettled(Order),
    Updated(Order),
    LineApplied { newly_applied: bool },
    LineReleased { released: bool },
}
