use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Verification state of a live provider profile.
///
/// Set to `Approved` when the profile is created by the approval workflow;
/// admins may later flip it (e.g. suspension) without touching the
/// originating application.
#[derive(Debug, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
pub enum VerificationStatus {
    Approved,
    Pending,
    Rejected,
}

impl std::str::FromStr for VerificationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "approved" => Ok(VerificationStatus::Approved),
            "pending" => Ok(VerificationStatus::Pending),
            "rejected" => Ok(VerificationStatus::Rejected),
            other => Err(format!("unknown verification status: {other}")),
        }
    }
}

/// A row from `service_provider_profiles`: a live, approved provider.
///
/// Created exclusively by the approval workflow. Business and contact fields
/// are copied from the application at creation time and not kept in sync
/// afterward. `is_active` supports temporary deactivation independently of
/// `verification_status`.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ProviderProfile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub provider_type: String,
    pub verification_status: VerificationStatus,
    pub is_active: bool,
    pub business_name: Option<String>,
    pub business_description: Option<String>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub business_address: Option<String>,
    pub created_at: DateTime<Utc>,
}
