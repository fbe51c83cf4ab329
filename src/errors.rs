use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::models::application::ApplicationStatus;
use crate::store::StoreError;
use crate::workflow::approval::ApprovalError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("application not found")]
    ApplicationNotFound,

    #[error("application already {status}")]
    AlreadyDecided { status: ApplicationStatus },

    #[error("invalid decision: {0}")]
    InvalidDecision(String),

    #[error("rejection requires reviewer notes")]
    NotesRequired,

    #[error("invalid status filter: {0}")]
    InvalidStatusFilter(String),

    #[error("provider profile not found")]
    ProfileNotFound,

    #[error("record store error: {0}")]
    Store(#[from] StoreError),

    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<ApprovalError> for AppError {
    fn from(err: ApprovalError) -> Self {
        match err {
            ApprovalError::NotFound => AppError::ApplicationNotFound,
            ApprovalError::AlreadyDecided(status) => AppError::AlreadyDecided { status },
            ApprovalError::NotesRequired => AppError::NotesRequired,
            ApprovalError::Store(e) => AppError::Store(e),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_type, code, msg) = match &self {
            AppError::ApplicationNotFound => (
                StatusCode::NOT_FOUND,
                "not_found",
                "application_not_found",
                "application not found".to_string(),
            ),
            AppError::AlreadyDecided { status } => (
                StatusCode::CONFLICT,
                "conflict",
                "application_already_decided",
                format!("application is already {}", status),
            ),
            AppError::InvalidDecision(d) => (
                StatusCode::BAD_REQUEST,
                "invalid_request_error",
                "invalid_decision",
                format!("invalid decision '{}': expected 'approve' or 'reject'", d),
            ),
            AppError::NotesRequired => (
                StatusCode::BAD_REQUEST,
                "invalid_request_error",
                "notes_required",
                "rejection requires reviewer notes".to_string(),
            ),
            AppError::InvalidStatusFilter(s) => (
                StatusCode::BAD_REQUEST,
                "invalid_request_error",
                "invalid_status_filter",
                format!("invalid status filter: {}", s),
            ),
            AppError::ProfileNotFound => (
                StatusCode::NOT_FOUND,
                "not_found",
                "profile_not_found",
                "provider profile not found".to_string(),
            ),
            AppError::Store(e) => {
                tracing::error!("Record store error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "internal_server_error",
                    "internal server error".to_string(),
                )
            }
            AppError::Redis(e) => {
                tracing::error!("Redis error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "internal_server_error",
                    "internal server error".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "internal_server_error",
                    "internal server error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "message": msg,
                "type": error_type,
                "code": code,
            }
        }));

        (status, body).into_response()
    }
}
