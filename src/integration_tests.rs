#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use chrono::Utc;
    use rust_decimal_macros::dec;

    use crate::app_system::{SettlementError, StorefrontConfig, StorefrontSystem};
    use crate::clients::{CheckoutDetails, CheckoutItem, CheckoutRequest, SettlementOutcome};
    use crate::domain::{
        Address, OrderStatus, PaymentMethod, PaymentStatus, ProductCreate, PromoCreate, SettlementStage,
    };
    use crate::mock_framework::RecordingNotifier;
    use crate::payments::{GatewayError, ProviderStatus, SandboxGateway};

    struct Harness {
        system: StorefrontSystem,
        card: Arc<SandboxGateway>,
        wallet: Arc<SandboxGateway>,
        notifier: Arc<RecordingNotifier>,
    }

    fn harness_with(notifier: RecordingNotifier, wallet: SandboxGateway) -> Harness {
        let card = Arc::new(SandboxGateway::card());
        let wallet = Arc::new(wallet);
        let notifier = Arc::new(notifier);
        let system = StorefrontSystem::new(
            StorefrontConfig::default(),
            card.clone(),
            wallet.clone(),
            notifier.clone(),
        );
        Harness {
            system,
            card,
            wallet,
            notifier,
        }
    }

    fn harness() -> Harness {
        harness_with(RecordingNotifier::default(), SandboxGateway::wallet())
    }

    fn details(method: PaymentMethod) -> CheckoutDetails {
        CheckoutDetails {
            shipping_address: Address::new("Grace Hopper", "7 Harbor St", "Arlington", "22201", "US"),
            billing_address: None,
            payment_method: method,
            promo_code: None,
        }
    }

    async fn product(h: &Harness, price: rust_decimal::Decimal, stock: u32) -> String {
        h.system
            .products
            .create_product(ProductCreate::new("Keyboard", "peripherals", price, stock))
            .await
            .unwrap()
    }

    async fn stock(h: &Harness, product_id: &str) -> u32 {
        h.system.products.check_stock(product_id.to_string()).await.unwrap()
    }

    async fn wait_for_stage(h: &Harness, order_id: &str, stage: SettlementStage) {
        for _ in 0..100 {
            let order = h.system.orders.require_order(order_id.to_string()).await.unwrap();
            if order.stage == stage {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("order {order_id} never reached {stage:?}");
    }

    #[tokio::test]
    async fn cart_checkout_settles_once() {
        let h = harness();
        let pid = product(&h, dec!(10), 10).await;
        h.system.carts.add_item("cust_1".into(), pid.clone(), 2).await.unwrap();

        let intent = h
            .system
            .settlement
            .checkout_from_cart("cust_1".into(), details(PaymentMethod::Card))
            .await
            .unwrap();
        assert_eq!(intent.order.status, OrderStatus::Pending);
        assert_eq!(intent.order.stage, SettlementStage::PaymentPending);
        assert_eq!(intent.order.amounts.total, dec!(27.59));
        let order_id = intent.order.order_id.clone();
        assert!(order_id.starts_with("ORD-"));

        h.card.approve(&intent.payment.reference).await;
        let outcome = h
            .system
            .settlement
            .confirm_settlement(order_id.clone(), intent.payment.clone())
            .await
            .unwrap();

        let order = match outcome {
            SettlementOutcome::Settled(order) => order,
            other => panic!("expected settlement, got {other:?}"),
        };
        assert_eq!(order.status, OrderStatus::Processing);
        assert_eq!(order.payment_status, PaymentStatus::Succeeded);
        assert_eq!(stock(&h, &pid).await, 8);
        assert_eq!(h.system.sales.sales_for_order(order_id.clone()).await.unwrap().len(), 1);
        assert!(h.system.carts.get_cart("cust_1".into()).await.unwrap().is_empty());

        wait_for_stage(&h, &order_id, SettlementStage::Notified).await;
        assert_eq!(h.notifier.confirmations().await, vec![order_id.clone()]);

        // A duplicate callback changes nothing and returns the same order.
        let before = h.system.orders.require_order(order_id.clone()).await.unwrap();
        let again = h
            .system
            .settlement
            .confirm_settlement(order_id.clone(), intent.payment)
            .await
            .unwrap();
        assert_eq!(again, SettlementOutcome::AlreadySettled(before));
        assert_eq!(stock(&h, &pid).await, 8);
        assert_eq!(h.system.sales.list_sales().await.unwrap().len(), 1);
        assert_eq!(h.card.capture_count().await, 1);
    }

    #[tokio::test]
    async fn concurrent_confirmations_apply_side_effects_once() {
        let h = harness();
        let pid = product(&h, dec!(4), 5).await;
        let intent = h
            .system
            .settlement
            .begin_checkout(CheckoutRequest {
                customer_id: None,
                items: vec![CheckoutItem::new(pid.clone(), 3)],
                details: details(PaymentMethod::Card),
            })
            .await
            .unwrap();
        h.card.approve(&intent.payment.reference).await;

        let settlement = &h.system.settlement;
        let order_id = intent.order.order_id.clone();
        let (a, b) = tokio::join!(
            settlement.confirm_settlement(order_id.clone(), intent.payment.clone()),
            settlement.confirm_settlement(order_id.clone(), intent.payment.clone()),
        );
        let outcomes = [a.unwrap(), b.unwrap()];
        let settled = outcomes
            .iter()
            .filter(|o| matches!(o, SettlementOutcome::Settled(_)))
            .count();

        assert_eq!(settled, 1);
        assert!(outcomes.iter().all(SettlementOutcome::is_paid));
        assert_eq!(stock(&h, &pid).await, 2);
        assert_eq!(h.system.sales.sales_for_order(order_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn declined_payment_leaves_everything_untouched() {
        let h = harness();
        let pid = product(&h, dec!(15), 4).await;
        h.system.carts.add_item("cust_2".into(), pid.clone(), 1).await.unwrap();
        let intent = h
            .system
            .settlement
            .checkout_from_cart("cust_2".into(), details(PaymentMethod::Card))
            .await
            .unwrap();

        h.card.decline(&intent.payment.reference).await;
        let outcome = h
            .system
            .settlement
            .confirm_settlement(intent.order.order_id.clone(), intent.payment)
            .await
            .unwrap();

        match outcome {
            SettlementOutcome::PaymentIncomplete { order, provider_status } => {
                assert_eq!(provider_status, ProviderStatus::Failed);
                assert_eq!(order.payment_status, PaymentStatus::Failed);
                assert_eq!(order.stage, SettlementStage::Failed);
            }
            other => panic!("expected incomplete payment, got {other:?}"),
        }
        assert_eq!(stock(&h, &pid).await, 4);
        assert_eq!(h.system.carts.get_cart("cust_2".into()).await.unwrap().total_quantity(), 1);
        assert!(h.system.sales.list_sales().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn pending_payment_can_be_confirmed_later() {
        let h = harness();
        let pid = product(&h, dec!(60), 2).await;
        let intent = h
            .system
            .settlement
            .begin_checkout(CheckoutRequest {
                customer_id: Some("cust_3".into()),
                items: vec![CheckoutItem::new(pid.clone(), 1)],
                details: details(PaymentMethod::Wallet),
            })
            .await
            .unwrap();
        let order_id = intent.order.order_id.clone();

        let early = h
            .system
            .settlement
            .confirm_settlement(order_id.clone(), intent.payment.clone())
            .await
            .unwrap();
        assert!(matches!(
            early,
            SettlementOutcome::PaymentIncomplete { provider_status: ProviderStatus::Pending, .. }
        ));

        h.wallet.approve(&intent.payment.reference).await;
        let late = h
            .system
            .settlement
            .confirm_settlement(order_id, intent.payment)
            .await
            .unwrap();
        assert!(matches!(late, SettlementOutcome::Settled(_)));
        assert_eq!(stock(&h, &pid).await, 1);
        assert_eq!(h.wallet.capture_count().await, 1);
    }

    #[tokio::test]
    async fn promo_discount_is_frozen_and_counted_after_payment() {
        let h = harness_with(RecordingNotifier::default(), SandboxGateway::wallet().auto_approving());
        let pid = product(&h, dec!(50), 10).await;
        let now = Utc::now();
        h.system
            .promos
            .create_promo(
                "save20".into(),
                PromoCreate::percentage(dec!(20), now - chrono::Duration::hours(1), now + chrono::Duration::days(1))
                    .with_max_discount(dec!(15)),
            )
            .await
            .unwrap();

        let mut checkout = details(PaymentMethod::Wallet);
        checkout.promo_code = Some("Save20".into());
        let intent = h
            .system
            .settlement
            .begin_checkout(CheckoutRequest {
                customer_id: Some("cust_4".into()),
                items: vec![CheckoutItem::new(pid, 2)],
                details: checkout,
            })
            .await
            .unwrap();

        let amounts = intent.order.amounts;
        assert_eq!(amounts.subtotal, dec!(100));
        assert_eq!(amounts.discount, dec!(15));
        assert_eq!(amounts.shipping, dec!(0));
        assert_eq!(amounts.total, dec!(91.80));
        assert_eq!(intent.order.promo_code.as_deref(), Some("SAVE20"));

        let promo = h.system.promos.get_promo("SAVE20".into()).await.unwrap().unwrap();
        assert_eq!(promo.used_count, 0);

        h.system
            .settlement
            .confirm_settlement(intent.order.order_id.clone(), intent.payment)
            .await
            .unwrap();
        let promo = h.system.promos.get_promo("SAVE20".into()).await.unwrap().unwrap();
        assert_eq!(promo.used_count, 1);
        assert_eq!(promo.usages[0].customer_id.as_deref(), Some("cust_4"));
        assert_eq!(promo.usages[0].order_amount, dec!(91.80));
    }

    #[tokio::test]
    async fn checkout_rejects_what_it_cannot_fulfil() {
        let h = harness();
        let pid = product(&h, dec!(10), 1).await;

        let err = h
            .system
            .settlement
            .begin_checkout(CheckoutRequest {
                customer_id: None,
                items: vec![CheckoutItem::new(pid.clone(), 2)],
                details: details(PaymentMethod::Card),
            })
            .await
            .unwrap_err();
        assert_eq!(
            err,
            SettlementError::StockConflict {
                product_id: pid.clone(),
                requested: 2,
                available: 1,
            }
        );

        let err = h
            .system
            .settlement
            .begin_checkout(CheckoutRequest {
                customer_id: None,
                items: vec![CheckoutItem::new("product_999", 1)],
                details: details(PaymentMethod::Card),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, SettlementError::NotFound { entity: "product", .. }));

        let err = h
            .system
            .settlement
            .checkout_from_cart("nobody".into(), details(PaymentMethod::Card))
            .await
            .unwrap_err();
        assert!(matches!(err, SettlementError::Validation(_)));
        assert!(h.system.orders.list_orders().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn gateway_outage_cancels_the_new_order() {
        let h = harness();
        let pid = product(&h, dec!(10), 3).await;
        h.card.set_unavailable(true).await;

        let err = h
            .system
            .settlement
            .begin_checkout(CheckoutRequest {
                customer_id: None,
                items: vec![CheckoutItem::new(pid.clone(), 1)],
                details: details(PaymentMethod::Card),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, SettlementError::Gateway(GatewayError::GatewayUnavailable(_))));

        let orders = h.system.orders.list_orders().await.unwrap();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].status, OrderStatus::Cancelled);
        assert_eq!(stock(&h, &pid).await, 3);
    }

    #[tokio::test]
    async fn confirm_guards_its_inputs() {
        let h = harness();
        let err = h
            .system
            .settlement
            .confirm_settlement(
                "ORD-missing".into(),
                crate::payments::PaymentHandle {
                    method: PaymentMethod::Card,
                    reference: "pi_x".into(),
                    client_secret: None,
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err, SettlementError::NotFound { entity: "order", id: "ORD-missing".into() });

        let pid = product(&h, dec!(10), 3).await;
        let intent = h
            .system
            .settlement
            .begin_checkout(CheckoutRequest {
                customer_id: None,
                items: vec![CheckoutItem::new(pid, 1)],
                details: details(PaymentMethod::Card),
            })
            .await
            .unwrap();
        let order_id = intent.order.order_id.clone();

        let mut foreign = intent.payment.clone();
        foreign.reference = "pi_someone_else".into();
        assert!(matches!(
            h.system.settlement.confirm_settlement(order_id.clone(), foreign).await,
            Err(SettlementError::Validation(_))
        ));

        h.system.settlement.cancel_order(order_id.clone()).await.unwrap();
        h.card.approve(&intent.payment.reference).await;
        assert!(matches!(
            h.system.settlement.confirm_settlement(order_id, intent.payment).await,
            Err(SettlementError::Validation(_))
        ));
        assert_eq!(h.card.capture_count().await, 0);
    }

    #[tokio::test]
    async fn fulfillment_updates_notify_and_reapply_is_a_no_op() {
        let h = harness_with(RecordingNotifier::default(), SandboxGateway::wallet().auto_approving());
        let pid = product(&h, dec!(8), 6).await;
        let intent = h
            .system
            .settlement
            .begin_checkout(CheckoutRequest {
                customer_id: Some("cust_5".into()),
                items: vec![CheckoutItem::new(pid.clone(), 2)],
                details: details(PaymentMethod::Wallet),
            })
            .await
            .unwrap();
        let order_id = intent.order.order_id.clone();

        assert!(matches!(
            h.system
                .settlement
                .update_fulfillment_status(order_id.clone(), OrderStatus::Shipped)
                .await,
            Err(SettlementError::Validation(_))
        ));

        h.system
            .settlement
            .confirm_settlement(order_id.clone(), intent.payment)
            .await
            .unwrap();
        wait_for_stage(&h, &order_id, SettlementStage::Notified).await;

        let order = h.system.settlement.reapply_side_effects(order_id.clone()).await.unwrap();
        assert_eq!(order.stage, SettlementStage::Notified);
        assert_eq!(stock(&h, &pid).await, 4);
        assert_eq!(h.system.sales.list_sales().await.unwrap().len(), 1);

        let shipped = h
            .system
            .settlement
            .update_fulfillment_status(order_id.clone(), OrderStatus::Shipped)
            .await
            .unwrap();
        assert_eq!(shipped.status, OrderStatus::Shipped);
        assert!(h.system.settlement.cancel_order(order_id.clone()).await.is_err());

        let delivered = h
            .system
            .settlement
            .update_fulfillment_status(order_id.clone(), OrderStatus::Delivered)
            .await
            .unwrap();
        assert_eq!(delivered.status, OrderStatus::Delivered);

        for _ in 0..100 {
            if h.notifier.status_updates().await.len() == 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        let updates = h.notifier.status_updates().await;
        assert_eq!(updates.len(), 2);
        assert!(updates.contains(&(order_id.clone(), OrderStatus::Shipped)));
        assert!(updates.contains(&(order_id, OrderStatus::Delivered)));
    }

    #[tokio::test]
    async fn notifier_failure_does_not_fail_settlement() {
        let h = harness_with(RecordingNotifier::failing(), SandboxGateway::wallet().auto_approving());
        let pid = product(&h, dec!(12), 2).await;
        let intent = h
            .system
            .settlement
            .begin_checkout(CheckoutRequest {
                customer_id: None,
                items: vec![CheckoutItem::new(pid, 1)],
                details: details(PaymentMethod::Wallet),
            })
            .await
            .unwrap();
        let order_id = intent.order.order_id.clone();

        let outcome = h
            .system
            .settlement
            .confirm_settlement(order_id.clone(), intent.payment)
            .await
            .unwrap();
        assert!(matches!(outcome, SettlementOutcome::Settled(_)));

        let order = h.system.orders.require_order(order_id).await.unwrap();
        h.system.shutdown().await.unwrap();
        assert_eq!(order.payment_status, PaymentStatus::Succeeded);
        assert_ne!(order.stage, SettlementStage::Notified);
    }

    #[tokio::test]
    async fn monthly_totals_reflect_settled_orders() {
        let h = harness_with(RecordingNotifier::default(), SandboxGateway::wallet().auto_approving());
        let a = product(&h, dec!(3), 10).await;
        let b = product(&h, dec!(7), 10).await;
        let intent = h
            .system
            .settlement
            .begin_checkout(CheckoutRequest {
                customer_id: None,
                items: vec![CheckoutItem::new(a, 2), CheckoutItem::new(b, 1)],
                details: details(PaymentMethod::Wallet),
            })
            .await
            .unwrap();
        h.system
            .settlement
            .confirm_settlement(intent.order.order_id.clone(), intent.payment)
            .await
            .unwrap();

        let totals = h.system.sales.monthly_totals().await.unwrap();
        assert_eq!(totals.len(), 1);
        assert_eq!(totals[0].units, 3);
        assert_eq!(totals[0].revenue, dec!(13));
    }

    #[tokio::test]
    async fn stock_shortfall_after_payment_is_retried_by_reapply() {
        let h = harness_with(RecordingNotifier::default(), SandboxGateway::wallet().auto_approving());
        let pid = product(&h, dec!(10), 5).await;
        let intent = h
            .system
            .settlement
            .begin_checkout(CheckoutRequest {
                customer_id: None,
                items: vec![CheckoutItem::new(pid.clone(), 3)],
                details: details(PaymentMethod::Wallet),
            })
            .await
            .unwrap();
        let order_id = intent.order.order_id.clone();
        h.system.products.decrement_stock(pid.clone(), 4).await.unwrap();

        let outcome = h
            .system
            .settlement
            .confirm_settlement(order_id.clone(), intent.payment)
            .await
            .unwrap();
        assert!(outcome.is_paid());
        assert_eq!(outcome.order().stage, SettlementStage::PaymentConfirmed);
        assert!(outcome.order().applied_lines.is_empty());
        assert_eq!(stock(&h, &pid).await, 1);
        assert!(h.system.sales.list_sales().await.unwrap().is_empty());

        h.system.products.increment_stock(pid.clone(), 10).await.unwrap();
        let repaired = h.system.settlement.reapply_side_effects(order_id.clone()).await.unwrap();
        assert_eq!(repaired.stage, SettlementStage::InventoryApplied);
        assert_eq!(stock(&h, &pid).await, 8);
        assert_eq!(h.system.sales.sales_for_order(order_id.clone()).await.unwrap().len(), 1);

        wait_for_stage(&h, &order_id, SettlementStage::Notified).await;
        assert_eq!(h.notifier.confirmations().await, vec![order_id.clone()]);

        h.system.settlement.reapply_side_effects(order_id.clone()).await.unwrap();
        assert_eq!(stock(&h, &pid).await, 8);
    }

    #[tokio::test]
    async fn cancelled_paid_order_is_never_reapplied() {
        let h = harness();
        let pid = product(&h, dec!(10), 5).await;
        let intent = h
            .system
            .settlement
            .begin_checkout(CheckoutRequest {
                customer_id: None,
                items: vec![CheckoutItem::new(pid.clone(), 2)],
                details: details(PaymentMethod::Card),
            })
            .await
            .unwrap();
        let order_id = intent.order.order_id.clone();

        h.system.orders.commit_payment(order_id.clone()).await.unwrap();
        let cancelled = h.system.settlement.cancel_order(order_id.clone()).await.unwrap();
        assert_eq!(cancelled.status, OrderStatus::Cancelled);
        assert_eq!(cancelled.stage, SettlementStage::Cancelled);

        assert!(matches!(
            h.system.settlement.reapply_side_effects(order_id).await,
            Err(SettlementError::Validation(_))
        ));
        assert_eq!(stock(&h, &pid).await, 5);
        assert!(h.system.sales.list_sales().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn fully_discounted_order_settles_without_the_gateway() {
        let h = harness();
        h.card.set_unavailable(true).await;
        let pid = product(&h, dec!(60), 3).await;
        let now = Utc::now();
        h.system
            .promos
            .create_promo(
                "freebie".into(),
                PromoCreate::fixed(dec!(60), now - chrono::Duration::hours(1), now + chrono::Duration::days(1)),
            )
            .await
            .unwrap();

        let mut checkout = details(PaymentMethod::Card);
        checkout.promo_code = Some("FREEBIE".into());
        let intent = h
            .system
            .settlement
            .begin_checkout(CheckoutRequest {
                customer_id: Some("cust_9".into()),
                items: vec![CheckoutItem::new(pid.clone(), 1)],
                details: checkout,
            })
            .await
            .unwrap();
        assert_eq!(intent.order.amounts.total, dec!(0));
        assert!(intent.payment.is_no_charge());

        let outcome = h
            .system
            .settlement
            .confirm_settlement(intent.order.order_id.clone(), intent.payment)
            .await
            .unwrap();
        assert!(matches!(outcome, SettlementOutcome::Settled(_)));
        assert_eq!(stock(&h, &pid).await, 2);
        assert_eq!(h.card.capture_count().await, 0);
    }
}
