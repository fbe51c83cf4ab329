pub mod postgres;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::application::VendorApplication;
use crate::models::provider::ProviderProfile;

/// Any failure coming back from the record store. Nothing here is retried
/// automatically; callers surface the error and the admin re-triggers.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("record store unavailable: {0}")]
    Unavailable(String),
}

/// The slice of the record store the approval workflow depends on.
///
/// The workflow talks to storage only through this trait, so its transition
/// rules can be exercised against an in-memory double with injected
/// failures.
#[async_trait]
pub trait ApplicationStore: Send + Sync {
    async fn fetch_application(
        &self,
        id: Uuid,
    ) -> Result<Option<VendorApplication>, StoreError>;

    /// Create the provider profile and mark the application approved as one
    /// atomic operation. Returns `None` when the application was no longer
    /// pending at write time; in that case nothing is persisted.
    async fn record_approval(
        &self,
        application: &VendorApplication,
    ) -> Result<Option<(VendorApplication, ProviderProfile)>, StoreError>;

    /// Mark the application rejected with the reviewer's notes. Returns the
    /// updated row, or `None` when the application was no longer pending.
    async fn record_rejection(
        &self,
        id: Uuid,
        notes: &str,
    ) -> Result<Option<VendorApplication>, StoreError>;
}
