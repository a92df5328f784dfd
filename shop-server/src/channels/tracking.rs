//! Tracking dashboard sync

use async_trait::async_trait;
use shared::models::{FulfillmentOrder, OrderStatus};

use super::{ChannelError, TrackingSync};

pub struct HttpTrackingSync {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTrackingSync {
    pub fn new(client: reqwest::Client, base_url: String) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl TrackingSync for HttpTrackingSync {
    async fn upsert_fulfillment(&self, order_number: &str, fo: &FulfillmentOrder) -> Result<(), ChannelError> {
        let body = serde_json::json!({
            "order_number": order_number,
            "fulfillment_order_id": fo.id,
            "producer_id": fo.producer_id,
            "status": fo.status,
            "tracking_number": fo.tracking_number,
            "tracking_url": fo.tracking_url,
            "updated_at": fo.updated_at,
        });
        let resp = self
            .client
            .put(format!("{}/fulfillments/{}", self.base_url, fo.id))
            .json(&body)
            .send()
            .await?;
        ChannelError::check(resp).await?;
        Ok(())
    }

    async fn update_order_status(&self, order_number: &str, status: OrderStatus) -> Result<(), ChannelError> {
        let resp = self
            .client
            .put(format!("{}/orders/{}/status", self.base_url, order_number))
            .json(&serde_json::json!({ "status": status }))
            .send()
            .await?;
        ChannelError::check(resp).await?;
        Ok(())
    }
}

/// Used when no tracking dashboard is configured
pub struct NoopTrackingSync;

#[async_trait]
impl TrackingSync for NoopTrackingSync {
    async fn upsert_fulfillment(&self, _order_number: &str, _fo: &FulfillmentOrder) -> Result<(), ChannelError> {
        Ok(())
    }

    async fn update_order_status(&self, _order_number: &str, _status: OrderStatus) -> Result<(), ChannelError> {
        Ok(())
    }
}
