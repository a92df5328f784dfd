//! Post-commit side effects
//!
//! Tracking sync and operations alerts never block or fail the operation that
//! triggered them. Services enqueue after their transaction commits; a single
//! background worker drains the queue and logs failures.

use std::sync::Arc;

use shared::models::{FulfillmentOrder, OrderStatus};
use tokio::sync::mpsc;

use crate::channels::{AlertChannel, TrackingSync};

/// Queue capacity; effects beyond this are dropped with a warning
const QUEUE_CAPACITY: usize = 1024;

#[derive(Debug, Clone)]
pub enum SideEffect {
    TrackingUpsert {
        order_number: String,
        fulfillment: Box<FulfillmentOrder>,
    },
    TrackingOrderStatus {
        order_number: String,
        status: OrderStatus,
    },
    Alert {
        message: String,
    },
}

impl SideEffect {
    fn kind(&self) -> &'static str {
        match self {
            Self::TrackingUpsert { .. } => "tracking_upsert",
            Self::TrackingOrderStatus { .. } => "tracking_order_status",
            Self::Alert { .. } => "alert",
        }
    }
}

/// Sending half of the side-effect queue
#[derive(Clone)]
pub struct SideEffectQueue {
    tx: mpsc::Sender<SideEffect>,
}

impl SideEffectQueue {
    /// Create the queue and the receiver to hand to [`SideEffectWorker::run`]
    pub fn new() -> (Self, mpsc::Receiver<SideEffect>) {
        let (tx, rx) = mpsc::channel(QUEUE_CAPACITY);
        (Self { tx }, rx)
    }

    /// Enqueue without waiting
    pub fn push(&self, effect: SideEffect) {
        let kind = effect.kind();
        if let Err(e) = self.tx.try_send(effect) {
            tracing::warn!(kind, error = %e, "Side effect dropped");
        }
    }

    pub fn tracking_upsert(&self, order_number: &str, fo: &FulfillmentOrder) {
        self.push(SideEffect::TrackingUpsert {
            order_number: order_number.to_string(),
            fulfillment: Box::new(fo.clone()),
        });
    }

    pub fn tracking_order_status(&self, order_number: &str, status: OrderStatus) {
        self.push(SideEffect::TrackingOrderStatus {
            order_number: order_number.to_string(),
            status,
        });
    }

    pub fn alert(&self, message: impl Into<String>) {
        self.push(SideEffect::Alert {
            message: message.into(),
        });
    }
}

pub struct SideEffectWorker {
    tracking: Arc<dyn TrackingSync>,
    alerts: Arc<dyn AlertChannel>,
}

impl SideEffectWorker {
    pub fn new(tracking: Arc<dyn TrackingSync>, alerts: Arc<dyn AlertChannel>) -> Self {
        Self { tracking, alerts }
    }

    /// Run until every queue sender is dropped
    pub async fn run(self, mut rx: mpsc::Receiver<SideEffect>) {
        tracing::info!("Side effect worker started");

        while let Some(effect) = rx.recv().await {
            self.apply(effect).await;
        }

        tracing::info!("Side effect queue closed, worker stopping");
    }

    pub(crate) async fn apply(&self, effect: SideEffect) {
        let kind = effect.kind();
        let result = match &effect {
            SideEffect::TrackingUpsert {
                order_number,
                fulfillment,
            } => self.tracking.upsert_fulfillment(order_number, fulfillment).await,
            SideEffect::TrackingOrderStatus {
                order_number,
                status,
            } => self.tracking.update_order_status(order_number, *status).await,
            SideEffect::Alert { message } => self.alerts.send(message).await,
        };

        match result {
            Ok(()) => tracing::debug!(kind, "Side effect applied"),
            Err(e) => tracing::warn!(kind, error = %e, "Side effect failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{RecordingAlerts, RecordingTracking};

    #[tokio::test]
    async fn worker_drains_queue_in_order() {
        let tracking = Arc::new(RecordingTracking::default());
        let alerts = Arc::new(RecordingAlerts::default());
        let (queue, rx) = SideEffectQueue::new();

        queue.tracking_order_status("SO-1", OrderStatus::Shipped);
        queue.alert("first");
        queue.alert("second");
        drop(queue);

        SideEffectWorker::new(tracking.clone(), alerts.clone())
            .run(rx)
            .await;

        assert_eq!(alerts.messages(), vec!["first".to_string(), "second".to_string()]);
        assert_eq!(
            tracking.order_statuses(),
            vec![("SO-1".to_string(), OrderStatus::Shipped)]
        );
    }

    #[tokio::test]
    async fn running_worker_finishes_backlog_after_last_sender_drops() {
        let tracking = Arc::new(RecordingTracking::default());
        let alerts = Arc::new(RecordingAlerts::default());
        let (queue, rx) = SideEffectQueue::new();
        let handle = tokio::spawn(SideEffectWorker::new(tracking, alerts.clone()).run(rx));

        let clone = queue.clone();
        for i in 0..50 {
            clone.alert(format!("backlog {i}"));
        }
        drop(clone);
        drop(queue);

        tokio::time::timeout(std::time::Duration::from_secs(5), handle)
            .await
            .expect("worker stops once senders are gone")
            .unwrap();
        let messages = alerts.messages();
        assert_eq!(messages.len(), 50);
        assert_eq!(messages.last().map(String::as_str), Some("backlog 49"));
    }

    #[tokio::test]
    async fn failing_channel_does_not_stop_worker() {
        let tracking = Arc::new(RecordingTracking::failing());
        let alerts = Arc::new(RecordingAlerts::default());
        let (queue, rx) = SideEffectQueue::new();

        queue.tracking_order_status("SO-1", OrderStatus::Delivered);
        queue.alert("after failure");
        drop(queue);

        SideEffectWorker::new(tracking, alerts.clone()).run(rx).await;
        assert_eq!(alerts.messages(), vec!["after failure".to_string()]);
    }
}
