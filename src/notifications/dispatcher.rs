use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, instrument, warn};

use crate::clients::OrderClient;
use crate::domain::{Order, OrderStatus};
use super::{Notifier, NotifyError};

#[derive(Debug, Clone)]
pub enum NotificationJob {
    /// Sent once per settled order; on success the order moves to `notified`.
    OrderConfirmation(Order),
    StatusUpdate { order: Order, status: OrderStatus },
}

impl NotificationJob {
    fn order_id(&self) -> &str {
        match self {
            NotificationJob::OrderConfirmation(order) => &order.order_id,
            NotificationJob::StatusUpdate { order, .. } => &order.order_id,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DispatcherConfig {
    pub queue_size: usize,
    pub concurrency: usize,
    pub timeout: Duration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            queue_size: 64,
            concurrency: 4,
            timeout: Duration::from_secs(30),
        }
    }
}

/// Submits jobs without waiting for delivery.
#[derive(Clone)]
pub struct DispatcherHandle {
    sender: mpsc::Sender<NotificationJob>,
}

impl DispatcherHandle {
    pub fn new(sender: mpsc::Sender<NotificationJob>) -> Self {
        Self { sender }
    }

    /// Never blocks: a full queue drops the job and reports it.
    pub fn submit(&self, job: NotificationJob) -> Result<(), NotifyError> {
        self.sender.try_send(job).map_err(|e| match e {
            TrySendError::Full(job) => {
                warn!(order_id = %job.order_id(), "Notification queue full, dropping job");
                NotifyError::QueueFull
            }
            TrySendError::Closed(_) => NotifyError::Closed,
        })
    }
}

/// Background executor for [`NotificationJob`]s.
///
/// Bounded queue, bounded concurrency and a per-job timeout. Failures are
/// logged and otherwise ignored. Stops once every handle is dropped and the
/// jobs in flight have finished.
pub struct NotificationDispatcher {
    receiver: mpsc::Receiver<NotificationJob>,
    notifier: Arc<dyn Notifier>,
    orders: OrderClient,
    semaphore: Arc<Semaphore>,
    timeout: Duration,
}

impl NotificationDispatcher {
    pub fn new(
        config: DispatcherConfig,
        notifier: Arc<dyn Notifier>,
        orders: OrderClient,
    ) -> (Self, DispatcherHandle) {
        let (sender, receiver) = mpsc::channel(config.queue_size.max(1));
        let dispatcher = Self {
            receiver,
            notifier,
            orders,
            semaphore: Arc::new(Semaphore::new(config.concurrency.max(1))),
            timeout: config.timeout,
        };
        (dispatcher, DispatcherHandle::new(sender))
    }

    #[instrument(name = "notification_dispatcher", skip(self))]
    pub async fn run(mut self) {
        debug!("Dispatcher starting");
        let mut in_flight = JoinSet::new();
        loop {
            tokio::select! {
                job = self.receiver.recv() => {
                    let Some(job) = job else { break };
                    let Ok(permit) = self.semaphore.clone().acquire_owned().await else { break };
                    let notifier = self.notifier.clone();
                    let orders = self.orders.clone();
                    let timeout = self.timeout;
                    in_flight.spawn(async move {
                        deliver(job, notifier, orders, timeout).await;
                        drop(permit);
                    });
                }
                Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                    if let Err(e) = joined {
                        warn!(error = %e, "Notification task panicked");
                    }
                }
            }
        }
        while let Some(joined) = in_flight.join_next().await {
            if let Err(e) = joined {
                warn!(error = %e, "Notification task panicked");
            }
        }
        debug!("Dispatcher stopped");
    }
}

#[instrument(skip_all, fields(order_id = %job.order_id()))]
async fn deliver(job: NotificationJob, notifier: Arc<dyn Notifier>, orders: OrderClient, timeout: Duration) {
    let sent = match &job {
        NotificationJob::OrderConfirmation(order) => {
            tokio::time::timeout(timeout, notifier.send_order_confirmation(order)).await
        }
        NotificationJob::StatusUpdate { order, status } => {
            tokio::time::timeout(timeout, notifier.send_status_update(order, *status)).await
        }
    };
    let result = sent.unwrap_or_else(|_| Err(NotifyError::TimedOut(timeout.as_millis())));

    match (result, job) {
        (Ok(()), NotificationJob::OrderConfirmation(order)) => {
            if let Err(e) = orders.mark_notified(order.order_id.clone()).await {
                warn!(error = %e, "Confirmation sent but order not marked notified");
            } else {
                info!("Order confirmation delivered");
            }
        }
        (Ok(()), NotificationJob::StatusUpdate { status, .. }) => {
            debug!(%status, "Status update delivered");
        }
        (Err(e), _) => warn!(error = %e, "Notification failed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock_framework::{create_mock_client, expect_action, test_order, RecordingNotifier};
    use crate::order_actor::{OrderAction, OrderActionResult};

    #[tokio::test]
    async fn confirmation_marks_order_notified() {
        let (inner, mut order_rx) = create_mock_client::<Order>(4);
        let notifier = Arc::new(RecordingNotifier::default());
        let (dispatcher, handle) =
            NotificationDispatcher::new(DispatcherConfig::default(), notifier.clone(), OrderClient::new(inner));
        let task = tokio::spawn(dispatcher.run());

        let order = test_order("ORD-1");
        handle.submit(NotificationJob::OrderConfirmation(order.clone())).unwrap();

        let (id, action, respond_to) = expect_action(&mut order_rx).await.expect("Expected MarkNotified");
        assert_eq!(id, "ORD-1");
        assert!(matches!(action, OrderAction::MarkNotified));
        respond_to.send(Ok(OrderActionResult::Updated(order))).unwrap();

        drop(handle);
        task.await.unwrap();
        assert_eq!(notifier.confirmations().await, vec!["ORD-1".to_string()]);
    }

    #[tokio::test]
    async fn slow_notifier_times_out_without_marking() {
        let (inner, mut order_rx) = create_mock_client::<Order>(4);
        let notifier = Arc::new(RecordingNotifier::stalled(Duration::from_secs(5)));
        let config = DispatcherConfig {
            timeout: Duration::from_millis(20),
            ..DispatcherConfig::default()
        };
        let (dispatcher, handle) = NotificationDispatcher::new(config, notifier.clone(), OrderClient::new(inner));
        let task = tokio::spawn(dispatcher.run());

        handle.submit(NotificationJob::OrderConfirmation(test_order("ORD-2"))).unwrap();
        drop(handle);
        task.await.unwrap();

        assert!(order_rx.try_recv().is_err());
        assert!(notifier.confirmations().await.is_empty());
    }

    #[tokio::test]
    async fn full_queue_rejects_instead_of_blocking() {
        let (sender, _receiver) = mpsc::channel(1);
        let handle = DispatcherHandle::new(sender);
        handle.submit(NotificationJob::OrderConfirmation(test_order("ORD-3"))).unwrap();
        assert_eq!(
            handle.submit(NotificationJob::OrderConfirmation(test_order("ORD-4"))),
            Err(NotifyError::QueueFull)
        );
    }
}
