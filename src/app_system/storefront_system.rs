use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{error, info};
use uuid::Uuid;

use crate::actor_framework::ResourceActor;
use crate::clients::{CartClient, OrderClient, ProductClient, PromoClient, SalesLedgerClient, SettlementClient};
use crate::domain::{Cart, Order, Product, PromoCode, Sale};
use crate::notifications::{NotificationDispatcher, Notifier};
use crate::payments::{AuthorizeCaptureGateway, IntentCaptureGateway, PaymentGatewayAdapter};
use super::config::StorefrontConfig;
use super::error::ShutdownError;

/// Order ids are never reused and carry no storage key.
fn next_order_id() -> String {
    format!("ORD-{}", Uuid::new_v4())
}

/// Starts every store actor and the notification dispatcher, and wires the
/// clients together.
///
/// Providers and the notifier are passed in so tests and the demo can use
/// sandboxes.
pub struct StorefrontSystem {
    pub products: ProductClient,
    pub orders: OrderClient,
    pub carts: CartClient,
    pub sales: SalesLedgerClient,
    pub promos: PromoClient,
    pub settlement: SettlementClient,
    handles: Vec<JoinHandle<()>>,
}

impl StorefrontSystem {
    pub fn new(
        config: StorefrontConfig,
        card: Arc<dyn AuthorizeCaptureGateway>,
        wallet: Arc<dyn IntentCaptureGateway>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let buffer = config.actor_buffer;

        // 1. Inventory ledger
        let product_id_counter = Arc::new(AtomicU64::new(1));
        let next_product_id = move || {
            let id = product_id_counter.fetch_add(1, Ordering::SeqCst);
            format!("product_{}", id)
        };
        let (product_actor, product_resource_client) = ResourceActor::<Product>::new(buffer, next_product_id);
        let products = ProductClient::new(product_resource_client);
        let product_handle = tokio::spawn(product_actor.run());

        // 2. Orders
        let (order_actor, order_resource_client) = ResourceActor::<Order>::new(buffer, next_order_id);
        let orders = OrderClient::new(order_resource_client);
        let order_handle = tokio::spawn(order_actor.run());

        // 3. Carts, sales and promos are keyed by the caller
        let caller_keyed = || Uuid::new_v4().to_string();
        let (cart_actor, cart_resource_client) = ResourceActor::<Cart>::new(buffer, caller_keyed);
        let carts = CartClient::new(cart_resource_client, products.clone());
        let cart_handle = tokio::spawn(cart_actor.run());

        let (sale_actor, sale_resource_client) = ResourceActor::<Sale>::new(buffer, caller_keyed);
        let sales = SalesLedgerClient::new(sale_resource_client);
        let sale_handle = tokio::spawn(sale_actor.run());

        let (promo_actor, promo_resource_client) = ResourceActor::<PromoCode>::new(buffer, caller_keyed);
        let promos = PromoClient::new(promo_resource_client);
        let promo_handle = tokio::spawn(promo_actor.run());

        // 4. Notifications run beside the stores and only talk to orders
        let (dispatcher, notifications) =
            NotificationDispatcher::new(config.notifications, notifier, orders.clone());
        let dispatcher_handle = tokio::spawn(dispatcher.run());

        // 5. Settlement ties everything together
        let gateway = PaymentGatewayAdapter::new(card, wallet, config.currency.clone());
        let settlement = SettlementClient::new(
            orders.clone(),
            products.clone(),
            carts.clone(),
            sales.clone(),
            promos.clone(),
            gateway,
            notifications,
            config.pricing,
        );

        info!(currency = %config.currency, buffer, "Storefront system started");
        Self {
            products,
            orders,
            carts,
            sales,
            promos,
            settlement,
            handles: vec![
                product_handle,
                order_handle,
                cart_handle,
                sale_handle,
                promo_handle,
                dispatcher_handle,
            ],
        }
    }

    /// Drops every client so the actors drain their mailboxes and stop, then
    /// waits for them. Pending notifications are delivered first.
    pub async fn shutdown(self) -> Result<(), ShutdownError> {
        info!("Shutting down system...");
        drop(self.settlement);
        drop(self.carts);
        drop(self.products);
        drop(self.orders);
        drop(self.sales);
        drop(self.promos);

        for handle in self.handles {
            if let Err(e) = handle.await {
                error!("Actor task failed: {:?}", e);
                return Err(e.into());
            }
        }

        info!("System shutdown complete.");
        Ok(())
    }
}
