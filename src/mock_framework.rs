//! # Mock Framework
//!
//! Utilities for testing clients in isolation.
//!
//! Use [`create_mock_client`] to get a client and a receiver.
//! Then use helpers like [`expect_get`] or [`expect_action`] to assert behavior
//! and answer in place of the actor.

use std::time::Duration;

use rust_decimal_macros::dec;
use tokio::sync::{mpsc, Mutex};
use async_trait::async_trait;

use crate::actor_framework::{Entity, ResourceClient, ResourceRequest, Response};
use crate::domain::{Address, AmountBreakdown, Order, OrderCreate, OrderLine, OrderStatus, PaymentMethod};
use crate::notifications::{Notifier, NotifyError};

/// Creates a mock client and a receiver for asserting requests.
///
/// The client sends to a channel the test controls, so the test plays the
/// actor: it inspects each request and decides the reply.
pub fn create_mock_client<T: Entity>(buffer_size: usize) -> (ResourceClient<T>, mpsc::Receiver<ResourceRequest<T>>) {
    let (sender, receiver) = mpsc::channel(buffer_size);
    (ResourceClient::new(sender), receiver)
}

/// Helper to verify that the next message is a Get request
pub async fn expect_get<T: Entity>(
    receiver: &mut mpsc::Receiver<ResourceRequest<T>>,
) -> Option<(T::Id, Response<T, Option<T>>)> {
    match receiver.recv().await {
        Some(ResourceRequest::Get { id, respond_to }) => Some((id, respond_to)),
        _ => None,
    }
}

/// Helper to verify that the next message is an Action request
pub async fn expect_action<T: Entity>(
    receiver: &mut mpsc::Receiver<ResourceRequest<T>>,
) -> Option<(T::Id, T::Action, Response<T, T::ActionResult>)> {
    match receiver.recv().await {
        Some(ResourceRequest::Action { id, action, respond_to }) => Some((id, action, respond_to)),
        _ => None,
    }
}

/// A guest card order for `order_id` with one line of two units at 10.00.
pub fn test_order(order_id: &str) -> Order {
    let address = Address::new("Ada Lovelace", "12 Analytical Way", "London", "N1 9GU", "GB");
    let params = OrderCreate {
        customer_id: None,
        lines: vec![OrderLine {
            product_id: "product_1".into(),
            name: "Difference Engine".into(),
            unit_price: dec!(10),
            quantity: 2,
            image: None,
        }],
        shipping_address: address.clone(),
        billing_address: address,
        amounts: AmountBreakdown::new(dec!(20), dec!(5.99), dec!(1.60), dec!(0)),
        payment_method: PaymentMethod::Card,
        promo_code: None,
    };
    match Order::from_create_params(order_id.to_string(), params) {
        Ok(order) => order,
        Err(e) => panic!("test order rejected: {e}"),
    }
}

/// Notifier that remembers what it was asked to send.
#[derive(Default)]
pub struct RecordingNotifier {
    confirmations: Mutex<Vec<String>>,
    updates: Mutex<Vec<(String, OrderStatus)>>,
    delay: Option<Duration>,
    failing: bool,
}

impl RecordingNotifier {
    /// Sleeps for `delay` before recording each message.
    pub fn stalled(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    /// Fails every send.
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub async fn confirmations(&self) -> Vec<String> {
        self.confirmations.lock().await.clone()
    }

    pub async fn status_updates(&self) -> Vec<(String, OrderStatus)> {
        self.updates.lock().await.clone()
    }

    async fn gate(&self) -> Result<(), NotifyError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing {
            return Err(NotifyError::Delivery("mail server down".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_order_confirmation(&self, order: &Order) -> Result<(), NotifyError> {
        self.gate().await?;
        self.confirmations.lock().await.push(order.order_id.clone());
        Ok(())
    }

    async fn send_status_update(&self, order: &Order, status: OrderStatus) -> Result<(), NotifyError> {
        self.gate().await?;
        self.updates.lock().await.push((order.order_id.clone(), status));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Cart;

    #[tokio::test]
    async fn test_mock_client() {
        let (client, mut receiver) = create_mock_client::<Cart>(10);

        let get_task = tokio::spawn(async move { client.get("cust_1".to_string()).await });

        let (id, responder) = expect_get(&mut receiver).await.expect("Expected Get request");
        assert_eq!(id, "cust_1");
        responder.send(Ok(Some(Cart::new("cust_1")))).unwrap();

        let cart = get_task.await.unwrap().unwrap().unwrap();
        assert!(cart.is_empty());
    }
}
