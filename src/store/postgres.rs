use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::{ApplicationStore, StoreError};
use crate::models::application::{ApplicationStatus, NewApplication, VendorApplication};
use crate::models::notification::Notification;
use crate::models::provider::{ProviderProfile, VerificationStatus};

const APPLICATION_COLUMNS: &str = "id, applicant_id, service_type, status, business_name, \
     business_description, contact_email, contact_phone, business_address, \
     admin_notes, submitted_at, reviewed_at";

const PROFILE_COLUMNS: &str = "id, user_id, provider_type, verification_status, is_active, \
     business_name, business_description, contact_email, contact_phone, \
     business_address, created_at";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPool::connect(database_url).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run pending migrations from the migrations/ directory.
    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    // -- Application Operations --

    pub async fn insert_application(
        &self,
        submission: &NewApplication,
    ) -> Result<VendorApplication, StoreError> {
        let row = sqlx::query_as::<_, VendorApplication>(&format!(
            r#"INSERT INTO vendor_applications
                   (applicant_id, service_type, business_name, business_description,
                    contact_email, contact_phone, business_address)
               VALUES ($1, $2, $3, $4, $5, $6, $7)
               RETURNING {APPLICATION_COLUMNS}"#
        ))
        .bind(submission.applicant_id)
        .bind(&submission.service_type)
        .bind(&submission.business_name)
        .bind(&submission.business_description)
        .bind(&submission.contact_email)
        .bind(&submission.contact_phone)
        .bind(&submission.business_address)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    /// Review queue listing: oldest submissions first.
    pub async fn list_applications(
        &self,
        status: Option<ApplicationStatus>,
    ) -> Result<Vec<VendorApplication>, StoreError> {
        let rows = match status {
            Some(status) => {
                sqlx::query_as::<_, VendorApplication>(&format!(
                    "SELECT {APPLICATION_COLUMNS} FROM vendor_applications \
                     WHERE status = $1 ORDER BY submitted_at ASC"
                ))
                .bind(status)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, VendorApplication>(&format!(
                    "SELECT {APPLICATION_COLUMNS} FROM vendor_applications \
                     ORDER BY submitted_at ASC"
                ))
                .fetch_all(&self.pool)
                .await?
            }
        };
        Ok(rows)
    }

    // -- Provider Profile Operations --

    pub async fn list_profiles(
        &self,
        active_only: bool,
    ) -> Result<Vec<ProviderProfile>, StoreError> {
        let rows = if active_only {
            sqlx::query_as::<_, ProviderProfile>(&format!(
                "SELECT {PROFILE_COLUMNS} FROM service_provider_profiles \
                 WHERE is_active = TRUE ORDER BY created_at DESC"
            ))
            .fetch_all(&self.pool)
            .await?
        } else {
            sqlx::query_as::<_, ProviderProfile>(&format!(
                "SELECT {PROFILE_COLUMNS} FROM service_provider_profiles \
                 ORDER BY created_at DESC"
            ))
            .fetch_all(&self.pool)
            .await?
        };
        Ok(rows)
    }

    pub async fn set_profile_active(
        &self,
        id: Uuid,
        is_active: bool,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE service_provider_profiles SET is_active = $2 WHERE id = $1",
        )
        .bind(id)
        .bind(is_active)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn set_profile_verification(
        &self,
        id: Uuid,
        status: VerificationStatus,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE service_provider_profiles SET verification_status = $2 WHERE id = $1",
        )
        .bind(id)
        .bind(status)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    // -- Notification Operations --

    pub async fn create_notification(
        &self,
        kind: &str,
        title: &str,
        body: Option<&str>,
        metadata: Option<serde_json::Value>,
    ) -> Result<Uuid, StoreError> {
        let id = sqlx::query_scalar::<_, Uuid>(
            r#"INSERT INTO notifications (kind, title, body, metadata)
               VALUES ($1, $2, $3, $4)
               RETURNING id"#,
        )
        .bind(kind)
        .bind(title)
        .bind(body)
        .bind(metadata)
        .fetch_one(&self.pool)
        .await?;
        Ok(id)
    }

    pub async fn list_notifications(
        &self,
        limit: i64,
    ) -> Result<Vec<Notification>, StoreError> {
        let rows = sqlx::query_as::<_, Notification>(
            r#"SELECT id, kind, title, body, metadata, is_read, created_at
               FROM notifications
               ORDER BY created_at DESC
               LIMIT $1"#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn count_unread_notifications(&self) -> Result<i64, StoreError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM notifications WHERE is_read = FALSE",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    pub async fn mark_notification_read(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("UPDATE notifications SET is_read = TRUE WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn mark_all_notifications_read(&self) -> Result<bool, StoreError> {
        let result =
            sqlx::query("UPDATE notifications SET is_read = TRUE WHERE is_read = FALSE")
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    // -- Consistency Audit Queries --

    /// Approved applications with no matching live profile. The transactional
    /// approve path cannot produce these; a non-zero count means something
    /// wrote to the registries out of band.
    pub async fn count_approved_without_profile(&self) -> Result<i64, StoreError> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"SELECT COUNT(*)
               FROM vendor_applications a
               LEFT JOIN service_provider_profiles p
                 ON p.user_id = a.applicant_id AND p.provider_type = a.service_type
               WHERE a.status = 'approved' AND p.id IS NULL"#,
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    pub async fn count_stale_pending(&self, older_than_days: i64) -> Result<i64, StoreError> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"SELECT COUNT(*) FROM vendor_applications
               WHERE status = 'pending'
                 AND submitted_at < NOW() - ($1 * INTERVAL '1 day')"#,
        )
        .bind(older_than_days)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }
}

#[async_trait]
impl ApplicationStore for PgStore {
    async fn fetch_application(
        &self,
        id: Uuid,
    ) -> Result<Option<VendorApplication>, StoreError> {
        let row = sqlx::query_as::<_, VendorApplication>(&format!(
            "SELECT {APPLICATION_COLUMNS} FROM vendor_applications WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn record_approval(
        &self,
        application: &VendorApplication,
    ) -> Result<Option<(VendorApplication, ProviderProfile)>, StoreError> {
        let mut tx = self.pool.begin().await?;

        let profile = sqlx::query_as::<_, ProviderProfile>(&format!(
            r#"INSERT INTO service_provider_profiles
                   (user_id, provider_type, verification_status, is_active,
                    business_name, business_description, contact_email,
                    contact_phone, business_address)
               VALUES ($1, $2, 'approved', TRUE, $3, $4, $5, $6, $7)
               RETURNING {PROFILE_COLUMNS}"#
        ))
        .bind(application.applicant_id)
        .bind(&application.service_type)
        .bind(&application.business_name)
        .bind(&application.business_description)
        .bind(&application.contact_email)
        .bind(&application.contact_phone)
        .bind(&application.business_address)
        .fetch_one(&mut *tx)
        .await?;

        // The pending guard is what serializes two admins deciding the same
        // application: exactly one UPDATE lands, the loser's transaction rolls
        // back and takes its profile insert with it.
        let updated = sqlx::query_as::<_, VendorApplication>(&format!(
            r#"UPDATE vendor_applications
               SET status = 'approved', reviewed_at = NOW()
               WHERE id = $1 AND status = 'pending'
               RETURNING {APPLICATION_COLUMNS}"#
        ))
        .bind(application.id)
        .fetch_optional(&mut *tx)
        .await?;

        match updated {
            Some(updated) => {
                tx.commit().await?;
                Ok(Some((updated, profile)))
            }
            None => {
                tx.rollback().await?;
                Ok(None)
            }
        }
    }

    async fn record_rejection(
        &self,
        id: Uuid,
        notes: &str,
    ) -> Result<Option<VendorApplication>, StoreError> {
        let row = sqlx::query_as::<_, VendorApplication>(&format!(
            r#"UPDATE vendor_applications
               SET status = 'rejected', admin_notes = $2, reviewed_at = NOW()
               WHERE id = $1 AND status = 'pending'
               RETURNING {APPLICATION_COLUMNS}"#
        ))
        .bind(id)
        .bind(notes)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }
}
