//! Typed clients over the resource actors, plus the settlement orchestrator.

#[macro_use]
mod macros;

mod cart_client;
mod order_client;
mod product_client;
mod promo_client;
mod sales_client;
mod settlement_client;

pub use cart_client::*;
pub use order_client::*;
pub use product_client::*;
pub use promo_client::*;
pub use sales_client::*;
pub use settlement_client::*;
