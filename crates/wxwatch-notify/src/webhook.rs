use anyhow::{anyhow, Result};
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use wxwatch_core::Notifier;

/// POSTs alerts as JSON to an HTTP endpoint
pub struct WebhookNotifier {
    client: Client,
    url: String,
}

#[derive(Serialize)]
struct WebhookPayload<'a> {
    recipient: &'a str,
    subject: &'a str,
    text: &'a str,
}

impl WebhookNotifier {
    pub fn new(url: String, timeout: Duration) -> Result<Self> {
        if url.is_empty() {
            return Err(anyhow!("invalid webhook configuration: empty url"));
        }
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, url })
    }
}

#[async_trait::async_trait]
impl Notifier for WebhookNotifier {
    fn name(&self) -> &str {
        "webhook"
    }

    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<()> {
        let resp = self
            .client
            .post(&self.url)
            .json(&WebhookPayload {
                recipient,
                subject,
                text: body,
            })
            .send()
            .await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(anyhow!("webhook delivery failed: {} {}", status, text));
        }
        Ok(())
    }
}
