//! Store records shared by the actors and clients. Pure data, no actor concerns.

pub mod cart;
pub mod money;
pub mod order;
pub mod pricing;
pub mod product;
pub mod promo;
pub mod sale;

pub use cart::*;
pub use order::*;
pub use pricing::*;
pub use product::*;
pub use promo::*;
pub use sale::*;
