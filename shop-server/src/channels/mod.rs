//! Outbound channels
//!
//! Every external collaborator sits behind a trait object built once at
//! startup, so services and tests never construct HTTP clients themselves.

pub mod alert;
pub mod producer;
pub mod stripe;
pub mod tracking;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use shared::models::{FulfillmentOrder, OrderItem, OrderStatus, Producer};
use thiserror::Error;

use crate::config::Config;

pub use alert::{LogAlertChannel, WebhookAlertChannel};
pub use producer::HttpProducerNotifier;
pub use stripe::{GatewayError, StripeGateway};
pub use tracking::{HttpTrackingSync, NoopTrackingSync};

/// Failure of a fire-and-forget or notification channel
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Remote returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Channel not configured: {0}")]
    NotConfigured(String),
}

impl ChannelError {
    /// Check a response status, keeping a short body excerpt on failure
    pub(crate) async fn check(resp: reqwest::Response) -> Result<reqwest::Response, Self> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let mut body = resp.text().await.unwrap_or_default();
        body.truncate(500);
        Err(Self::Status {
            status: status.as_u16(),
            body,
        })
    }
}

/// What a producer needs to fulfill its part of an order
#[derive(Debug, Clone, serde::Serialize)]
pub struct ProducerNotice {
    pub fulfillment_order_id: i64,
    pub order_number: String,
    pub customer_email: Option<String>,
    #[serde(skip)]
    pub producer: Producer,
    pub items: Vec<OrderItem>,
}

#[async_trait]
pub trait ProducerNotifier: Send + Sync {
    async fn notify(&self, notice: &ProducerNotice) -> Result<(), ChannelError>;
}

#[async_trait]
pub trait TrackingSync: Send + Sync {
    async fn upsert_fulfillment(&self, order_number: &str, fo: &FulfillmentOrder) -> Result<(), ChannelError>;

    async fn update_order_status(&self, order_number: &str, status: OrderStatus) -> Result<(), ChannelError>;
}

#[async_trait]
pub trait AlertChannel: Send + Sync {
    async fn send(&self, message: &str) -> Result<(), ChannelError>;
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Exact processing fee charged for a payment, in cents
    async fn fee_for(&self, payment_ref: &str) -> Result<i64, GatewayError>;
}

/// Channel set shared by every service
#[derive(Clone)]
pub struct Channels {
    pub notifier: Arc<dyn ProducerNotifier>,
    pub tracking: Arc<dyn TrackingSync>,
    pub alerts: Arc<dyn AlertChannel>,
    pub gateway: Arc<dyn PaymentGateway>,
}

impl Channels {
    /// Production channels; tracking and alerts fall back to no-op/log-only
    /// when their URLs are unset
    pub fn from_config(config: &Config) -> Result<Self, ChannelError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.outbound_timeout_secs))
            .build()?;

        let tracking: Arc<dyn TrackingSync> = match &config.tracking_url {
            Some(url) => Arc::new(HttpTrackingSync::new(client.clone(), url.clone())),
            None => Arc::new(NoopTrackingSync),
        };
        let alerts: Arc<dyn AlertChannel> = match &config.alert_webhook_url {
            Some(url) => Arc::new(WebhookAlertChannel::new(client.clone(), url.clone())),
            None => Arc::new(LogAlertChannel),
        };

        Ok(Self {
            notifier: Arc::new(HttpProducerNotifier::new(client.clone())),
            tracking,
            alerts,
            gateway: Arc::new(StripeGateway::new(client, config.stripe_secret_key.clone())),
        })
    }
}
