use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle of a vendor application.
///
/// `Pending` is the only state the approval workflow will act on;
/// `Approved` and `Rejected` are terminal.
#[derive(Debug, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
pub enum ApplicationStatus {
    Pending,
    Approved,
    Rejected,
}

impl std::fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::Approved => "approved",
            ApplicationStatus::Rejected => "rejected",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for ApplicationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pending" => Ok(ApplicationStatus::Pending),
            "approved" => Ok(ApplicationStatus::Approved),
            "rejected" => Ok(ApplicationStatus::Rejected),
            other => Err(format!("unknown application status: {other}")),
        }
    }
}

/// A row from `vendor_applications`: one applicant submission.
///
/// `admin_notes` is populated only on rejection, `reviewed_at` only on
/// transition out of `pending`.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct VendorApplication {
    pub id: Uuid,
    pub applicant_id: Uuid,
    pub service_type: String,
    pub status: ApplicationStatus,
    pub business_name: Option<String>,
    pub business_description: Option<String>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub business_address: Option<String>,
    pub admin_notes: Option<String>,
    pub submitted_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
}

/// DTO for a new application submission.
#[derive(Debug, Clone, Deserialize)]
pub struct NewApplication {
    pub applicant_id: Uuid,
    /// Open-ended category tag, e.g. "driver", "property_owner",
    /// "service_provider". Deliberately not an enum.
    pub service_type: String,
    pub business_name: Option<String>,
    pub business_description: Option<String>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub business_address: Option<String>,
}
