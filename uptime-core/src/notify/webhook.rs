use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use super::{AlertEvent, ChannelError, WebhookSender};

const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(10);

/// POSTs the alert as JSON to an arbitrary URL.
pub struct HttpWebhookSender {
    client: Client,
}

impl HttpWebhookSender {
    pub fn new() -> Result<Self, ChannelError> {
        let client = Client::builder().timeout(WEBHOOK_TIMEOUT).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl WebhookSender for HttpWebhookSender {
    async fn send_webhook(&self, url: &str, event: &AlertEvent) -> Result<(), ChannelError> {
        let response = self
            .client
            .post(url)
            .json(&event.webhook_payload())
            .send()
            .await?;
        let status = response.status();

        if !status.is_success() {
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            return Err(ChannelError::SendFailed(format!(
                "Webhook returned non-success status: {}. Body: {}",
                status, error_body
            )));
        }

        Ok(())
    }
}
