//! Catalog products and the inventory ledger embedded in them.

mod actions;
pub mod entity;
pub mod error;

pub use actions::*;
pub use error::*;
