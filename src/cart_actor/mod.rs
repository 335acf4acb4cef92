//! Per-customer carts and the stock-aware merge used to fill them.

mod actions;
pub mod entity;
pub mod error;
pub mod reconcile;

pub use actions::*;
pub use error::*;
pub use reconcile::{reconcile, LineChange, ReconcileReport, RejectReason, Rejection, StockSnapshot};
