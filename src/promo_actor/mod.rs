//! Promo codes: discount computation and the redemption ledger.

mod actions;
pub mod engine;
pub mod entity;
pub mod error;

pub use actions::*;
pub use error::*;
