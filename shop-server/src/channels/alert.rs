//! Operations alerts

use async_trait::async_trait;

use super::{AlertChannel, ChannelError};

/// Slack-compatible incoming webhook (`{"text": ...}`)
pub struct WebhookAlertChannel {
    client: reqwest::Client,
    url: String,
}

impl WebhookAlertChannel {
    pub fn new(client: reqwest::Client, url: String) -> Self {
        Self { client, url }
    }
}

#[async_trait]
impl AlertChannel for WebhookAlertChannel {
    async fn send(&self, message: &str) -> Result<(), ChannelError> {
        let resp = self
            .client
            .post(&self.url)
            .json(&serde_json::json!({ "text": message }))
            .send()
            .await?;
        ChannelError::check(resp).await?;
        Ok(())
    }
}

/// Writes alerts to the log only
pub struct LogAlertChannel;

#[async_trait]
impl AlertChannel for LogAlertChannel {
    async fn send(&self, message: &str) -> Result<(), ChannelError> {
        tracing::warn!(alert = %message, "Operations alert (no alert webhook configured)");
        Ok(())
    }
}
