//! # Storefront settlement
//!
//! The checkout settlement pipeline of a storefront backend: turns a priced
//! cart into a paid order, applies stock decrements and sales-ledger writes
//! exactly once per order line, tolerates duplicate payment confirmations,
//! and sends customer notifications in the background.
//!
//! ## Layout
//!
//! - [`actor_framework`] - generic `ResourceActor<T>` / `ResourceClient<T>` over any [`actor_framework::Entity`]
//! - [`domain`] - store records: products, orders, carts, sales, promo codes
//! - `*_actor` modules - the `Entity` impl, actions and errors of each store
//! - [`clients`] - typed clients per store and the [`clients::SettlementClient`]
//! - [`payments`] - provider traits, the gateway adapter and sandbox providers
//! - [`notifications`] - notifier trait and the bounded background dispatcher
//! - [`app_system`] - configuration, tracing, errors and [`app_system::StorefrontSystem`]
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use storefront_settlement::app_system::{StorefrontConfig, StorefrontSystem};
//! use storefront_settlement::notifications::LogNotifier;
//! use storefront_settlement::payments::SandboxGateway;
//!
//! # async fn run() {
//! let system = StorefrontSystem::new(
//!     StorefrontConfig::from_env(),
//!     Arc::new(SandboxGateway::card()),
//!     Arc::new(SandboxGateway::wallet()),
//!     Arc::new(LogNotifier),
//! );
//! // system.settlement.begin_checkout(...), confirm_settlement(...)
//! system.shutdown().await.ok();
//! # }
//! ```

pub mod actor_framework;
pub mod app_system;
pub mod cart_actor;
pub mod clients;
pub mod domain;
pub mod notifications;
pub mod order_actor;
pub mod payments;
pub mod product_actor;
pub mod promo_actor;
pub mod sales_actor;

#[cfg(test)]
mod mock_framework;
#[cfg(test)]
mod integration_tests;
