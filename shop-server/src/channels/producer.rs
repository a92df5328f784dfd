//! Producer notification over HTTP

use async_trait::async_trait;

use super::{ChannelError, ProducerNotice, ProducerNotifier};

/// POSTs the notice as JSON to the producer's `notify_url`
pub struct HttpProducerNotifier {
    client: reqwest::Client,
}

impl HttpProducerNotifier {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ProducerNotifier for HttpProducerNotifier {
    async fn notify(&self, notice: &ProducerNotice) -> Result<(), ChannelError> {
        let url = notice.producer.notify_url.as_deref().ok_or_else(|| {
            ChannelError::NotConfigured(format!("producer {} has no notify_url", notice.producer.code))
        })?;

        let resp = self.client.post(url).json(notice).send().await?;
        ChannelError::check(resp).await?;

        tracing::debug!(
            fulfillment_order_id = notice.fulfillment_order_id,
            producer = %notice.producer.code,
            "Producer notified"
        );
        Ok(())
    }
}
