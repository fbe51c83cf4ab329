//! Tests for the outbound notification path: webhook event construction and
//! actual delivery against a mock HTTP endpoint.

use chrono::Utc;
use uuid::Uuid;
use wiremock::matchers::{header, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use vendora::models::application::{ApplicationStatus, VendorApplication};
use vendora::notification::slack::SlackNotifier;
use vendora::notification::webhook::{WebhookEvent, WebhookNotifier};

fn sample_application() -> VendorApplication {
    VendorApplication {
        id: Uuid::new_v4(),
        applicant_id: Uuid::new_v4(),
        service_type: "service_provider".into(),
        status: ApplicationStatus::Pending,
        business_name: Some("Brightside Cleaning".into()),
        business_description: Some("Residential cleaning".into()),
        contact_email: Some("hello@brightside.example".into()),
        contact_phone: None,
        business_address: None,
        admin_notes: None,
        submitted_at: Utc::now(),
        reviewed_at: None,
    }
}

#[tokio::test]
async fn signed_webhook_delivery_carries_signature_headers() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/hooks/onboarding"))
        .and(header("x-vendora-event", "application_submitted"))
        .and(header_exists("x-vendora-signature"))
        .and(header_exists("x-vendora-delivery-id"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let notifier = WebhookNotifier::new();
    let event = WebhookEvent::application_submitted(&sample_application());
    notifier
        .send(
            &format!("{}/hooks/onboarding", server.uri()),
            &event,
            Some("shared-secret"),
        )
        .await
        .expect("delivery should succeed against the mock endpoint");
}

#[tokio::test]
async fn unsigned_webhook_delivery_omits_signature() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/hooks/onboarding"))
        .and(header("x-vendora-event", "application_rejected"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let notifier = WebhookNotifier::new();
    let event =
        WebhookEvent::application_rejected(&sample_application(), "Missing license documents");
    notifier
        .send(&format!("{}/hooks/onboarding", server.uri()), &event, None)
        .await
        .expect("unsigned delivery should succeed");

    // The mock's expectations verify on drop; the signature header simply
    // was not required here.
}

#[tokio::test]
async fn approved_event_payload_reaches_the_endpoint() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(header("x-vendora-event", "application_approved"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let app = sample_application();
    let profile_id = Uuid::new_v4();
    let event = WebhookEvent::application_approved(&app, profile_id);
    assert_eq!(event.details["profile_id"], profile_id.to_string());

    let notifier = WebhookNotifier::new();
    notifier
        .send(&server.uri(), &event, None)
        .await
        .expect("delivery should succeed");
}

#[tokio::test]
async fn slack_notifier_without_webhook_is_a_noop() {
    let notifier = SlackNotifier::new(None);
    // Must not attempt any network call — succeeds instantly.
    notifier
        .notify_submission(&sample_application())
        .await
        .expect("unconfigured notifier is a no-op");
    notifier
        .notify_decision(&sample_application())
        .await
        .expect("unconfigured notifier is a no-op");
}
