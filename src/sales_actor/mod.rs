//! Append-only sales ledger used by reporting.

pub mod entity;
pub mod error;

pub use error::*;
