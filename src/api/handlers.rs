use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::cache::keys;
use crate::errors::AppError;
use crate::models::application::{ApplicationStatus, NewApplication, VendorApplication};
use crate::models::notification::Notification;
use crate::models::provider::{ProviderProfile, VerificationStatus};
use crate::notification::webhook::WebhookEvent;
use crate::store::ApplicationStore;
use crate::AppState;

// ── Request / Response DTOs ──────────────────────────────────

#[derive(Deserialize)]
pub struct ApplicationListParams {
    /// "pending" (default) | "approved" | "rejected" | "all".
    pub status: Option<String>,
}

#[derive(Deserialize)]
pub struct DecisionRequest {
    pub decision: String, // "approve" | "reject"
    pub notes: Option<String>,
}

#[derive(Serialize)]
pub struct DecisionResponse {
    pub id: Uuid,
    pub status: ApplicationStatus,
    pub profile_id: Option<Uuid>,
}

#[derive(Deserialize)]
pub struct ProviderListParams {
    pub include_inactive: Option<bool>,
}

#[derive(Deserialize)]
pub struct SetActiveRequest {
    pub is_active: bool,
}

#[derive(Deserialize)]
pub struct SetVerificationRequest {
    pub status: String, // "approved" | "pending" | "rejected"
}

#[derive(Serialize)]
pub struct UpdateResponse {
    pub id: Uuid,
    pub updated: bool,
}

#[derive(Deserialize)]
pub struct NotificationListParams {
    pub limit: Option<i64>,
}

#[derive(Serialize)]
pub struct UnreadResponse {
    pub unread: i64,
}

// ── Application Handlers ─────────────────────────────────────

/// GET /api/v1/applications — the review queue.
///
/// Reads through the query cache; the decision handler invalidates the keys
/// it touches so a fresh listing follows every mutation.
pub async fn list_applications(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ApplicationListParams>,
) -> Result<Json<Vec<VendorApplication>>, AppError> {
    let filter = parse_status_filter(params.status.as_deref())?;

    let key = keys::applications(filter);
    if let Some(rows) = state.cache.get::<Vec<VendorApplication>>(&key).await {
        return Ok(Json(rows));
    }

    let rows = state.db.list_applications(filter).await?;
    if let Err(e) = state
        .cache
        .set(&key, &rows, state.config.cache_ttl_secs)
        .await
    {
        tracing::debug!(key = %key, error = %e, "failed to populate query cache");
    }
    Ok(Json(rows))
}

/// POST /api/v1/applications — applicant submission.
pub async fn submit_application(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<NewApplication>,
) -> Result<(StatusCode, Json<VendorApplication>), AppError> {
    let application = state.db.insert_application(&payload).await?;
    tracing::info!(
        application = %application.id,
        service_type = %application.service_type,
        "application submitted"
    );

    state
        .cache
        .invalidate(&keys::applications(Some(ApplicationStatus::Pending)))
        .await;
    state.cache.invalidate(&keys::applications(None)).await;

    if let Err(e) = state.notifier.notify_submission(&application).await {
        tracing::warn!("slack notification failed: {}", e);
    }
    state.webhook.dispatch(
        &state.config.webhook_urls,
        state.config.webhook_signing_secret.clone(),
        WebhookEvent::application_submitted(&application),
    );

    Ok((StatusCode::CREATED, Json(application)))
}

/// GET /api/v1/applications/:id
pub async fn get_application(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<VendorApplication>, AppError> {
    let application = state
        .db
        .fetch_application(id)
        .await?
        .ok_or(AppError::ApplicationNotFound)?;
    Ok(Json(application))
}

/// POST /api/v1/applications/:id/decision — approve or reject.
///
/// The workflow enforces the pending precondition; this handler only parses
/// the decision, then invalidates caches and fans out notifications on
/// success.
pub async fn decide_application(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<DecisionRequest>,
) -> Result<Json<DecisionResponse>, AppError> {
    match payload.decision.to_lowercase().as_str() {
        "approve" | "approved" => {
            let outcome = state.workflow.approve(id).await?;

            invalidate_application_caches(&state, ApplicationStatus::Approved).await;
            state.cache.invalidate(keys::PROVIDERS_ACTIVE).await;
            state.cache.invalidate(keys::PROVIDERS_ALL).await;

            record_decision_notification(&state, &outcome.application).await;
            if let Err(e) = state.notifier.notify_decision(&outcome.application).await {
                tracing::warn!("slack notification failed: {}", e);
            }
            state.webhook.dispatch(
                &state.config.webhook_urls,
                state.config.webhook_signing_secret.clone(),
                WebhookEvent::application_approved(&outcome.application, outcome.profile.id),
            );

            Ok(Json(DecisionResponse {
                id,
                status: outcome.application.status,
                profile_id: Some(outcome.profile.id),
            }))
        }
        "reject" | "rejected" => {
            let notes = payload.notes.as_deref().unwrap_or("");
            let application = state.workflow.reject(id, notes).await?;

            invalidate_application_caches(&state, ApplicationStatus::Rejected).await;

            record_decision_notification(&state, &application).await;
            if let Err(e) = state.notifier.notify_decision(&application).await {
                tracing::warn!("slack notification failed: {}", e);
            }
            state.webhook.dispatch(
                &state.config.webhook_urls,
                state.config.webhook_signing_secret.clone(),
                WebhookEvent::application_rejected(&application, notes),
            );

            Ok(Json(DecisionResponse {
                id,
                status: application.status,
                profile_id: None,
            }))
        }
        other => Err(AppError::InvalidDecision(other.to_string())),
    }
}

// ── Provider Handlers ────────────────────────────────────────

/// GET /api/v1/providers — live provider directory.
pub async fn list_providers(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ProviderListParams>,
) -> Result<Json<Vec<ProviderProfile>>, AppError> {
    let active_only = !params.include_inactive.unwrap_or(false);
    let key = if active_only {
        keys::PROVIDERS_ACTIVE
    } else {
        keys::PROVIDERS_ALL
    };

    if let Some(rows) = state.cache.get::<Vec<ProviderProfile>>(key).await {
        return Ok(Json(rows));
    }

    let rows = state.db.list_profiles(active_only).await?;
    if let Err(e) = state
        .cache
        .set(key, &rows, state.config.cache_ttl_secs)
        .await
    {
        tracing::debug!(key, error = %e, "failed to populate query cache");
    }
    Ok(Json(rows))
}

/// POST /api/v1/providers/:id/active — temporary (de)activation. Does not
/// touch the originating application.
pub async fn set_provider_active(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SetActiveRequest>,
) -> Result<Json<UpdateResponse>, AppError> {
    let updated = state.db.set_profile_active(id, payload.is_active).await?;
    if !updated {
        return Err(AppError::ProfileNotFound);
    }

    state.cache.invalidate(keys::PROVIDERS_ACTIVE).await;
    state.cache.invalidate(keys::PROVIDERS_ALL).await;

    Ok(Json(UpdateResponse { id, updated }))
}

/// POST /api/v1/providers/:id/verification — re-verify or suspend a live
/// profile.
pub async fn set_provider_verification(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SetVerificationRequest>,
) -> Result<Json<UpdateResponse>, AppError> {
    let status: VerificationStatus = payload
        .status
        .parse()
        .map_err(AppError::InvalidStatusFilter)?;

    let updated = state.db.set_profile_verification(id, status).await?;
    if !updated {
        return Err(AppError::ProfileNotFound);
    }

    state.cache.invalidate(keys::PROVIDERS_ACTIVE).await;
    state.cache.invalidate(keys::PROVIDERS_ALL).await;

    Ok(Json(UpdateResponse { id, updated }))
}

// ── Notification Handlers ────────────────────────────────────

/// GET /api/v1/notifications — the admin feed, newest first.
pub async fn list_notifications(
    State(state): State<Arc<AppState>>,
    Query(params): Query<NotificationListParams>,
) -> Result<Json<Vec<Notification>>, AppError> {
    let limit = params.limit.unwrap_or(50).clamp(1, 200);
    let rows = state.db.list_notifications(limit).await?;
    Ok(Json(rows))
}

/// GET /api/v1/notifications/unread
pub async fn count_unread_notifications(
    State(state): State<Arc<AppState>>,
) -> Result<Json<UnreadResponse>, AppError> {
    let unread = state.db.count_unread_notifications().await?;
    Ok(Json(UnreadResponse { unread }))
}

/// POST /api/v1/notifications/:id/read
pub async fn mark_notification_read(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<UpdateResponse>, AppError> {
    let updated = state.db.mark_notification_read(id).await?;
    Ok(Json(UpdateResponse { id, updated }))
}

/// POST /api/v1/notifications/read-all
pub async fn mark_all_notifications_read(
    State(state): State<Arc<AppState>>,
) -> Result<StatusCode, AppError> {
    state.db.mark_all_notifications_read().await?;
    Ok(StatusCode::NO_CONTENT)
}

// ── Helpers ──────────────────────────────────────────────────

fn parse_status_filter(raw: Option<&str>) -> Result<Option<ApplicationStatus>, AppError> {
    match raw {
        // The review queue is the default view.
        None => Ok(Some(ApplicationStatus::Pending)),
        Some("all") => Ok(None),
        Some(s) => s
            .parse()
            .map(Some)
            .map_err(AppError::InvalidStatusFilter),
    }
}

async fn invalidate_application_caches(state: &AppState, decided: ApplicationStatus) {
    state
        .cache
        .invalidate(&keys::applications(Some(ApplicationStatus::Pending)))
        .await;
    state
        .cache
        .invalidate(&keys::applications(Some(decided)))
        .await;
    state.cache.invalidate(&keys::applications(None)).await;
}

async fn record_decision_notification(state: &AppState, application: &VendorApplication) {
    let kind = match application.status {
        ApplicationStatus::Approved => "application_approved",
        ApplicationStatus::Rejected => "application_rejected",
        ApplicationStatus::Pending => return,
    };
    let title = format!(
        "{} application {}",
        application.service_type, application.status
    );

    if let Err(e) = state
        .db
        .create_notification(
            kind,
            &title,
            application.admin_notes.as_deref(),
            Some(json!({ "application_id": application.id })),
        )
        .await
    {
        tracing::warn!("failed to record decision notification: {}", e);
    }
}
