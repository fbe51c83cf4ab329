use anyhow::Result;
use hmac::{Hmac, Mac};
use serde::Serialize;
use sha2::Sha256;
use std::time::Duration;
use tracing::{info, warn};

use crate::models::application::VendorApplication;

// ── Webhook Event Types ───────────────────────────────────────

/// A structured event payload sent to webhook endpoints whenever an
/// application changes state.
#[derive(Debug, Clone, Serialize)]
pub struct WebhookEvent {
    /// "application_submitted" | "application_approved" |
    /// "application_rejected".
    pub event_type: String,
    /// ISO-8601 timestamp of when the event occurred.
    pub timestamp: String,
    /// The application this event concerns.
    pub application_id: String,
    /// The applicant behind it.
    pub applicant_id: String,
    /// Category tag of the application ("driver", "property_owner", …).
    pub service_type: String,
    /// Event-specific details (business name, notes, profile id, …).
    pub details: serde_json::Value,
}

impl WebhookEvent {
    pub fn application_submitted(application: &VendorApplication) -> Self {
        Self {
            event_type: "application_submitted".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            application_id: application.id.to_string(),
            applicant_id: application.applicant_id.to_string(),
            service_type: application.service_type.clone(),
            details: serde_json::json!({
                "business_name": application.business_name,
            }),
        }
    }

    pub fn application_approved(
        application: &VendorApplication,
        profile_id: uuid::Uuid,
    ) -> Self {
        Self {
            event_type: "application_approved".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            application_id: application.id.to_string(),
            applicant_id: application.applicant_id.to_string(),
            service_type: application.service_type.clone(),
            details: serde_json::json!({
                "profile_id": profile_id.to_string(),
                "business_name": application.business_name,
            }),
        }
    }

    pub fn application_rejected(application: &VendorApplication, notes: &str) -> Self {
        Self {
            event_type: "application_rejected".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            application_id: application.id.to_string(),
            applicant_id: application.applicant_id.to_string(),
            service_type: application.service_type.clone(),
            details: serde_json::json!({ "notes": notes }),
        }
    }
}

// ── HMAC Signing ─────────────────────────────────────────────

/// Compute HMAC-SHA256 of `payload` using `secret`.
/// Returns "sha256=<lowercase hex digest>".
fn hmac_sha256_hex(secret: &str, payload: &[u8]) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .expect("HMAC can take key of any size");
    mac.update(payload);
    let bytes = mac.finalize().into_bytes();
    format!("sha256={}", hex::encode(bytes))
}

// ── Webhook Notifier ──────────────────────────────────────────

/// Dispatches webhook events to the configured URLs.
///
/// Delivery is signed (X-Vendora-Signature) when a secret is configured and
/// retried with back-off (1s, then 5s, then 25s). Only webhook delivery
/// retries; record-store writes never do.
#[derive(Clone)]
pub struct WebhookNotifier {
    client: reqwest::Client,
}

impl WebhookNotifier {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(10))
                .user_agent("Vendora-Webhook/1.0")
                .build()
                .expect("failed to build webhook HTTP client"),
        }
    }

    /// Send one event to one URL, signing when `signing_secret` is `Some`,
    /// retrying up to 3 times. Returns `Ok(())` if any attempt succeeded.
    pub async fn send(
        &self,
        url: &str,
        event: &WebhookEvent,
        signing_secret: Option<&str>,
    ) -> Result<()> {
        let payload = serde_json::to_vec(event)
            .map_err(|e| anyhow::anyhow!("webhook serialize error: {}", e))?;
        let delivery_id = uuid::Uuid::new_v4().to_string();
        let timestamp = chrono::Utc::now().timestamp().to_string();
        let signature = signing_secret.map(|s| hmac_sha256_hex(s, &payload));

        let backoff_secs: &[u64] = &[0, 1, 5, 25];

        for (attempt, &delay) in backoff_secs.iter().enumerate() {
            if delay > 0 {
                tracing::debug!(
                    url,
                    attempt,
                    delay_secs = delay,
                    event_type = %event.event_type,
                    "retrying webhook delivery"
                );
                tokio::time::sleep(Duration::from_secs(delay)).await;
            }

            let mut req = self
                .client
                .post(url)
                .header("content-type", "application/json")
                .header("x-vendora-delivery-id", &delivery_id)
                .header("x-vendora-timestamp", &timestamp)
                .header("x-vendora-event", &event.event_type);

            if let Some(ref sig) = signature {
                req = req.header("x-vendora-signature", sig.as_str());
            }

            match req.body(payload.clone()).send().await {
                Ok(resp) if resp.status().is_success() => {
                    info!(
                        url,
                        event_type = %event.event_type,
                        delivery_id = %delivery_id,
                        attempt,
                        "webhook delivered"
                    );
                    return Ok(());
                }
                Ok(resp) => {
                    warn!(
                        url,
                        event_type = %event.event_type,
                        delivery_id = %delivery_id,
                        attempt,
                        status = %resp.status(),
                        "webhook delivery failed (non-2xx), will retry"
                    );
                }
                Err(e) => {
                    warn!(
                        url,
                        event_type = %event.event_type,
                        delivery_id = %delivery_id,
                        attempt,
                        error = %e,
                        "webhook request error, will retry"
                    );
                }
            }
        }

        Err(anyhow::anyhow!(
            "webhook delivery failed after retries: {}",
            url
        ))
    }

    /// Dispatch an event to all configured URLs, fire-and-forget. Each URL is
    /// attempted independently; a failing endpoint does not block the others
    /// or the request path that raised the event.
    pub fn dispatch(&self, urls: &[String], signing_secret: Option<String>, event: WebhookEvent) {
        if urls.is_empty() {
            return;
        }

        let notifier = self.clone();
        let urls = urls.to_vec();

        tokio::spawn(async move {
            for url in &urls {
                if let Err(e) = notifier.send(url, &event, signing_secret.as_deref()).await {
                    warn!(url, error = %e, "webhook dispatch ultimately failed");
                }
            }
        });
    }
}

impl Default for WebhookNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::application::ApplicationStatus;
    use chrono::Utc;
    use uuid::Uuid;

    fn sample_application() -> VendorApplication {
        VendorApplication {
            id: Uuid::new_v4(),
            applicant_id: Uuid::new_v4(),
            service_type: "driver".into(),
            status: ApplicationStatus::Pending,
            business_name: Some("Swift Rides".into()),
            business_description: None,
            contact_email: None,
            contact_phone: None,
            business_address: None,
            admin_notes: None,
            submitted_at: Utc::now(),
            reviewed_at: None,
        }
    }

    #[test]
    fn submitted_event_fields() {
        let app = sample_application();
        let event = WebhookEvent::application_submitted(&app);
        assert_eq!(event.event_type, "application_submitted");
        assert_eq!(event.application_id, app.id.to_string());
        assert_eq!(event.service_type, "driver");
        assert_eq!(event.details["business_name"], "Swift Rides");
    }

    #[test]
    fn approved_event_carries_profile_id() {
        let app = sample_application();
        let profile_id = Uuid::new_v4();
        let event = WebhookEvent::application_approved(&app, profile_id);
        assert_eq!(event.event_type, "application_approved");
        assert_eq!(event.details["profile_id"], profile_id.to_string());
    }

    #[test]
    fn rejected_event_carries_notes() {
        let app = sample_application();
        let event = WebhookEvent::application_rejected(&app, "Missing license documents");
        assert_eq!(event.event_type, "application_rejected");
        assert_eq!(event.details["notes"], "Missing license documents");
    }

    #[test]
    fn event_serializes_to_json() {
        let event = WebhookEvent::application_submitted(&sample_application());
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("application_submitted"));
        assert!(json.contains("timestamp"));
    }

    #[test]
    fn hmac_signature_deterministic() {
        let sig1 = hmac_sha256_hex("secret123", b"payload");
        let sig2 = hmac_sha256_hex("secret123", b"payload");
        assert_eq!(sig1, sig2);
        assert!(sig1.starts_with("sha256="));
    }

    #[test]
    fn hmac_signature_depends_on_secret() {
        let sig1 = hmac_sha256_hex("secret1", b"payload");
        let sig2 = hmac_sha256_hex("secret2", b"payload");
        assert_ne!(sig1, sig2);
    }
}
