use async_trait::async_trait;

use super::{BookingEvent, NotificationProvider};

/// Posts booking events as JSON to an operator-configured endpoint, e.g. a
/// chat webhook watched by the front desk.
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
        }
    }
}

#[async_trait]
impl NotificationProvider for WebhookNotifier {
    async fn notify(&self, event: &BookingEvent) -> anyhow::Result<()> {
        let response = self
            .client
            .post(&self.url)
            .json(event)
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("webhook request failed: {e}"))?;

        if !response.status().is_success() {
            return Err(anyhow::anyhow!(
                "webhook returned status {}",
                response.status()
            ));
        }
        Ok(())
    }
}
