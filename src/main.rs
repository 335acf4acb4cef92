use std::sync::Arc;

use rust_decimal_macros::dec;
use tracing::{error, info, Instrument};

use storefront_settlement::app_system::{setup_tracing, SettlementError, StorefrontConfig, StorefrontSystem};
use storefront_settlement::clients::{CheckoutDetails, SettlementOutcome};
use storefront_settlement::domain::{Address, CartSync, OrderStatus, PaymentMethod, ProductCreate, SyncEntry};
use storefront_settlement::notifications::LogNotifier;
use storefront_settlement::payments::SandboxGateway;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Setup tracing once for the entire application
    setup_tracing();

    let config = StorefrontConfig::from_env();
    info!(?config, "Starting storefront with sandbox payment providers");

    let card = Arc::new(SandboxGateway::card());
    let system = StorefrontSystem::new(
        config,
        card.clone(),
        Arc::new(SandboxGateway::wallet().auto_approving()),
        Arc::new(LogNotifier),
    );

    let lamp = system
        .products
        .create_product(ProductCreate::new("Desk Lamp", "lighting", dec!(24.50), 6).with_image("lamp.png"))
        .await?;
    let bulb = system
        .products
        .create_product(ProductCreate::new("LED Bulb", "lighting", dec!(3.25), 3))
        .await?;
    info!(%lamp, %bulb, "Catalog seeded");

    // An anonymous cart is merged into the customer's cart at login
    let customer = "customer_1".to_string();
    let span = tracing::info_span!("cart_sync", customer_id = %customer);
    let report = async {
        system
            .carts
            .sync_cart(
                customer.clone(),
                CartSync {
                    sync_id: "anon-7f3a".into(),
                    entries: vec![SyncEntry::new(lamp.clone(), 1), SyncEntry::new(bulb.clone(), 5)],
                },
            )
            .await
    }
    .instrument(span)
    .await?;
    for rejection in &report.rejected {
        info!(product_id = %rejection.product_id, units = rejection.quantity, reason = ?rejection.reason, "Sync adjusted");
    }

    let span = tracing::info_span!("checkout", customer_id = %customer);
    let result: Result<(), SettlementError> = async {
        let intent = system
            .settlement
            .checkout_from_cart(
                customer.clone(),
                CheckoutDetails {
                    shipping_address: Address::new("Sam Doe", "42 Elm St", "Portland", "97201", "US"),
                    billing_address: None,
                    payment_method: PaymentMethod::Card,
                    promo_code: None,
                },
            )
            .await?;
        let order_id = intent.order.order_id.clone();

        // The buyer completes card confirmation with the provider
        card.approve(&intent.payment.reference).await;

        let outcome = system
            .settlement
            .confirm_settlement(order_id.clone(), intent.payment.clone())
            .await?;
        info!(%order_id, paid = outcome.is_paid(), "First confirmation handled");

        // Providers retry webhooks; the repeat is harmless
        if let SettlementOutcome::AlreadySettled(_) = system
            .settlement
            .confirm_settlement(order_id.clone(), intent.payment)
            .await?
        {
            info!(%order_id, "Duplicate confirmation ignored");
        }

        system
            .settlement
            .update_fulfillment_status(order_id.clone(), OrderStatus::Shipped)
            .await?;
        Ok(())
    }
    .instrument(span)
    .await;

    if let Err(e) = result {
        error!(error = %e, "Checkout failed");
    }

    for month in system.sales.monthly_totals().await? {
        info!(year = month.year, month = month.month, units = month.units, revenue = %month.revenue, "Monthly sales");
    }
    info!(lamp_stock = system.products.check_stock(lamp).await?, "Inventory after settlement");

    // Shutdown system gracefully
    system.shutdown().await?;

    info!("Application completed successfully");
    Ok(())
}
