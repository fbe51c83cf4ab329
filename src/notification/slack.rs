use anyhow::Context;
use serde::Serialize;

use crate::models::application::VendorApplication;

/// Posts review-queue events to a Slack incoming webhook. With no webhook
/// configured every call is a no-op, so callers never need to branch.
#[derive(Clone)]
pub struct SlackNotifier {
    client: reqwest::Client,
    webhook_url: Option<String>,
}

impl SlackNotifier {
    pub fn new(webhook_url: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            webhook_url,
        }
    }

    /// A new application landed in the review queue.
    pub async fn notify_submission(
        &self,
        application: &VendorApplication,
    ) -> anyhow::Result<()> {
        let text = format!(
            "📥 *New {} application*\n\nApplication: `{}`\nBusiness: {}\nSubmitted: {}",
            application.service_type,
            application.id,
            application.business_name.as_deref().unwrap_or("(unnamed)"),
            application.submitted_at,
        );
        self.post(text).await
    }

    /// An application was approved or rejected.
    pub async fn notify_decision(
        &self,
        application: &VendorApplication,
    ) -> anyhow::Result<()> {
        let text = format!(
            "📋 *Application {}*\n\nApplication: `{}`\nType: {}\nBusiness: {}{}",
            application.status,
            application.id,
            application.service_type,
            application.business_name.as_deref().unwrap_or("(unnamed)"),
            application
                .admin_notes
                .as_deref()
                .map(|n| format!("\nNotes: {n}"))
                .unwrap_or_default(),
        );
        self.post(text).await
    }

    async fn post(&self, text: String) -> anyhow::Result<()> {
        let url = match &self.webhook_url {
            Some(u) => u,
            None => {
                tracing::debug!("No Slack webhook URL configured, skipping notification");
                return Ok(());
            }
        };

        let resp = self
            .client
            .post(url)
            .json(&SlackMessage { text })
            .send()
            .await
            .context("failed to send slack notification")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("slack returned error: status={}, body={}", status, body);
        }

        Ok(())
    }
}

#[derive(Serialize)]
struct SlackMessage {
    text: String,
}
