//! Application approval workflow.
//!
//! Moves a vendor application out of `pending`:
//!
//! 1. `approve` materializes a live provider profile and marks the
//!    application approved — both writes inside one store transaction, so a
//!    profile without an approved application (or the reverse) is
//!    unreachable.
//! 2. `reject` records the reviewer's notes and marks the application
//!    rejected — a single write.
//!
//! Preconditions are enforced here, not in whatever surface calls us: an
//! application that is not `pending` is refused with a typed error no matter
//! which button a dashboard happened to render.

use thiserror::Error;
use uuid::Uuid;

use crate::models::application::{ApplicationStatus, VendorApplication};
use crate::models::provider::ProviderProfile;
use crate::store::{ApplicationStore, StoreError};

#[derive(Debug, Error)]
pub enum ApprovalError {
    #[error("application not found")]
    NotFound,

    /// The application is already in a terminal state. Terminal states have
    /// no outgoing transitions; re-approval after rejection is intentionally
    /// not supported.
    #[error("application already {0}")]
    AlreadyDecided(ApplicationStatus),

    #[error("rejection requires reviewer notes")]
    NotesRequired,

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// What a successful approval produced.
#[derive(Debug)]
pub struct ApprovalOutcome {
    pub application: VendorApplication,
    pub profile: ProviderProfile,
}

/// Drives application decisions. Holds the store it writes through; cache
/// invalidation and notifications are the caller's concern.
#[derive(Clone)]
pub struct ApprovalWorkflow<S> {
    store: S,
}

impl<S: ApplicationStore> ApprovalWorkflow<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// `pending -> approved`, creating the provider profile as a side
    /// effect.
    pub async fn approve(&self, id: Uuid) -> Result<ApprovalOutcome, ApprovalError> {
        let application = self
            .store
            .fetch_application(id)
            .await?
            .ok_or(ApprovalError::NotFound)?;

        if application.status != ApplicationStatus::Pending {
            return Err(ApprovalError::AlreadyDecided(application.status));
        }

        match self.store.record_approval(&application).await? {
            Some((application, profile)) => {
                tracing::info!(
                    application = %application.id,
                    applicant = %application.applicant_id,
                    provider = %profile.id,
                    provider_type = %profile.provider_type,
                    "application approved"
                );
                Ok(ApprovalOutcome {
                    application,
                    profile,
                })
            }
            // Another reviewer decided between our read and the write. The
            // store rolled everything back; report what actually won.
            None => Err(self.lost_decision_race(id).await?),
        }
    }

    /// `pending -> rejected`. Reviewer notes are mandatory.
    pub async fn reject(
        &self,
        id: Uuid,
        notes: &str,
    ) -> Result<VendorApplication, ApprovalError> {
        if notes.trim().is_empty() {
            return Err(ApprovalError::NotesRequired);
        }

        let application = self
            .store
            .fetch_application(id)
            .await?
            .ok_or(ApprovalError::NotFound)?;

        if application.status != ApplicationStatus::Pending {
            return Err(ApprovalError::AlreadyDecided(application.status));
        }

        match self.store.record_rejection(id, notes).await? {
            Some(updated) => {
                tracing::info!(
                    application = %updated.id,
                    applicant = %updated.applicant_id,
                    "application rejected"
                );
                Ok(updated)
            }
            None => Err(self.lost_decision_race(id).await?),
        }
    }

    /// The guarded write matched zero rows: re-read to name the state that
    /// beat us.
    async fn lost_decision_race(&self, id: Uuid) -> Result<ApprovalError, StoreError> {
        let status = self
            .store
            .fetch_application(id)
            .await?
            .map(|a| a.status);
        Ok(match status {
            Some(status) => ApprovalError::AlreadyDecided(status),
            None => ApprovalError::NotFound,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use chrono::Utc;

    use super::*;
    use crate::models::application::NewApplication;
    use crate::models::provider::VerificationStatus;

    /// In-memory double of the record store, with switches to inject the
    /// failures a live database would produce.
    #[derive(Default)]
    struct MemoryStore {
        applications: Mutex<HashMap<Uuid, VendorApplication>>,
        profiles: Mutex<Vec<ProviderProfile>>,
        fail_profile_insert: AtomicBool,
        fail_rejection: AtomicBool,
        /// When set, flips the application to this status just before the
        /// guarded write runs — simulates a second reviewer winning the race.
        decide_behind_the_back: Mutex<Option<ApplicationStatus>>,
    }

    impl MemoryStore {
        fn seed(&self, submission: NewApplication) -> Uuid {
            let id = Uuid::new_v4();
            let application = VendorApplication {
                id,
                applicant_id: submission.applicant_id,
                service_type: submission.service_type,
                status: ApplicationStatus::Pending,
                business_name: submission.business_name,
                business_description: submission.business_description,
                contact_email: submission.contact_email,
                contact_phone: submission.contact_phone,
                business_address: submission.business_address,
                admin_notes: None,
                submitted_at: Utc::now(),
                reviewed_at: None,
            };
            self.applications.lock().unwrap().insert(id, application);
            id
        }

        fn application(&self, id: Uuid) -> VendorApplication {
            self.applications.lock().unwrap()[&id].clone()
        }

        fn profiles_for(&self, user_id: Uuid) -> Vec<ProviderProfile> {
            self.profiles
                .lock()
                .unwrap()
                .iter()
                .filter(|p| p.user_id == user_id)
                .cloned()
                .collect()
        }

        fn apply_sabotage(&self, id: Uuid) {
            if let Some(status) = self.decide_behind_the_back.lock().unwrap().take() {
                let mut apps = self.applications.lock().unwrap();
                if let Some(app) = apps.get_mut(&id) {
                    app.status = status;
                    app.reviewed_at = Some(Utc::now());
                }
            }
        }
    }

    #[async_trait]
    impl ApplicationStore for Arc<MemoryStore> {
        async fn fetch_application(
            &self,
            id: Uuid,
        ) -> Result<Option<VendorApplication>, StoreError> {
            Ok(self.applications.lock().unwrap().get(&id).cloned())
        }

        async fn record_approval(
            &self,
            application: &VendorApplication,
        ) -> Result<Option<(VendorApplication, ProviderProfile)>, StoreError> {
            if self.fail_profile_insert.load(Ordering::SeqCst) {
                return Err(StoreError::Unavailable("injected insert failure".into()));
            }
            self.apply_sabotage(application.id);

            // Single lock region = the transaction: either both registries
            // change or neither does.
            let mut apps = self.applications.lock().unwrap();
            let current = match apps.get_mut(&application.id) {
                Some(a) if a.status == ApplicationStatus::Pending => a,
                _ => return Ok(None),
            };

            current.status = ApplicationStatus::Approved;
            current.reviewed_at = Some(Utc::now());

            let profile = ProviderProfile {
                id: Uuid::new_v4(),
                user_id: application.applicant_id,
                provider_type: application.service_type.clone(),
                verification_status: VerificationStatus::Approved,
                is_active: true,
                business_name: application.business_name.clone(),
                business_description: application.business_description.clone(),
                contact_email: application.contact_email.clone(),
                contact_phone: application.contact_phone.clone(),
                business_address: application.business_address.clone(),
                created_at: Utc::now(),
            };
            let updated = current.clone();
            drop(apps);

            self.profiles.lock().unwrap().push(profile.clone());
            Ok(Some((updated, profile)))
        }

        async fn record_rejection(
            &self,
            id: Uuid,
            notes: &str,
        ) -> Result<Option<VendorApplication>, StoreError> {
            if self.fail_rejection.load(Ordering::SeqCst) {
                return Err(StoreError::Unavailable("injected write failure".into()));
            }
            self.apply_sabotage(id);

            let mut apps = self.applications.lock().unwrap();
            let current = match apps.get_mut(&id) {
                Some(a) if a.status == ApplicationStatus::Pending => a,
                _ => return Ok(None),
            };
            current.status = ApplicationStatus::Rejected;
            current.admin_notes = Some(notes.to_string());
            current.reviewed_at = Some(Utc::now());
            Ok(Some(current.clone()))
        }
    }

    fn driver_submission() -> NewApplication {
        NewApplication {
            applicant_id: Uuid::new_v4(),
            service_type: "driver".into(),
            business_name: Some("Swift Rides".into()),
            business_description: Some("Airport transfers".into()),
            contact_email: Some("dispatch@swiftrides.example".into()),
            contact_phone: Some("+15550100".into()),
            business_address: Some("12 Depot Rd".into()),
        }
    }

    #[tokio::test]
    async fn approve_creates_profile_and_marks_approved() {
        let store = Arc::new(MemoryStore::default());
        let id = store.seed(driver_submission());
        let applicant = store.application(id).applicant_id;

        let workflow = ApprovalWorkflow::new(store.clone());
        let outcome = workflow.approve(id).await.unwrap();

        assert_eq!(outcome.application.status, ApplicationStatus::Approved);
        assert!(outcome.application.reviewed_at.is_some());
        assert_eq!(outcome.profile.user_id, applicant);
        assert_eq!(outcome.profile.provider_type, "driver");
        assert_eq!(
            outcome.profile.verification_status,
            VerificationStatus::Approved
        );
        assert!(outcome.profile.is_active);
        assert_eq!(outcome.profile.business_name.as_deref(), Some("Swift Rides"));

        let stored = store.application(id);
        assert_eq!(stored.status, ApplicationStatus::Approved);
        assert_eq!(store.profiles_for(applicant).len(), 1);
    }

    #[tokio::test]
    async fn reject_records_notes_and_creates_no_profile() {
        let store = Arc::new(MemoryStore::default());
        let id = store.seed(driver_submission());
        let applicant = store.application(id).applicant_id;

        let workflow = ApprovalWorkflow::new(store.clone());
        let updated = workflow
            .reject(id, "Missing license documents")
            .await
            .unwrap();

        assert_eq!(updated.status, ApplicationStatus::Rejected);
        assert_eq!(
            updated.admin_notes.as_deref(),
            Some("Missing license documents")
        );
        assert!(updated.reviewed_at.is_some());
        assert!(store.profiles_for(applicant).is_empty());
    }

    #[tokio::test]
    async fn rejection_requires_notes() {
        let store = Arc::new(MemoryStore::default());
        let id = store.seed(driver_submission());

        let workflow = ApprovalWorkflow::new(store.clone());
        let err = workflow.reject(id, "   ").await.unwrap_err();
        assert!(matches!(err, ApprovalError::NotesRequired));

        // Nothing was written.
        assert_eq!(store.application(id).status, ApplicationStatus::Pending);
    }

    #[tokio::test]
    async fn second_approval_is_refused() {
        let store = Arc::new(MemoryStore::default());
        let id = store.seed(driver_submission());
        let applicant = store.application(id).applicant_id;

        let workflow = ApprovalWorkflow::new(store.clone());
        workflow.approve(id).await.unwrap();

        let err = workflow.approve(id).await.unwrap_err();
        assert!(matches!(
            err,
            ApprovalError::AlreadyDecided(ApplicationStatus::Approved)
        ));
        // Still exactly one profile.
        assert_eq!(store.profiles_for(applicant).len(), 1);
    }

    #[tokio::test]
    async fn terminal_states_have_no_outgoing_transitions() {
        let store = Arc::new(MemoryStore::default());
        let workflow = ApprovalWorkflow::new(store.clone());

        let rejected = store.seed(driver_submission());
        workflow.reject(rejected, "incomplete").await.unwrap();
        let err = workflow.approve(rejected).await.unwrap_err();
        assert!(matches!(
            err,
            ApprovalError::AlreadyDecided(ApplicationStatus::Rejected)
        ));

        let approved = store.seed(driver_submission());
        workflow.approve(approved).await.unwrap();
        let err = workflow.reject(approved, "changed my mind").await.unwrap_err();
        assert!(matches!(
            err,
            ApprovalError::AlreadyDecided(ApplicationStatus::Approved)
        ));
    }

    #[tokio::test]
    async fn failed_profile_insert_leaves_application_pending() {
        let store = Arc::new(MemoryStore::default());
        let id = store.seed(driver_submission());
        let applicant = store.application(id).applicant_id;
        store.fail_profile_insert.store(true, Ordering::SeqCst);

        let workflow = ApprovalWorkflow::new(store.clone());
        let err = workflow.approve(id).await.unwrap_err();
        assert!(matches!(err, ApprovalError::Store(_)));

        assert_eq!(store.application(id).status, ApplicationStatus::Pending);
        assert!(store.application(id).reviewed_at.is_none());
        assert!(store.profiles_for(applicant).is_empty());

        // The admin re-triggers once the store is healthy again.
        store.fail_profile_insert.store(false, Ordering::SeqCst);
        workflow.approve(id).await.unwrap();
        assert_eq!(store.application(id).status, ApplicationStatus::Approved);
    }

    #[tokio::test]
    async fn failed_rejection_leaves_application_pending() {
        let store = Arc::new(MemoryStore::default());
        let id = store.seed(driver_submission());
        store.fail_rejection.store(true, Ordering::SeqCst);

        let workflow = ApprovalWorkflow::new(store.clone());
        let err = workflow.reject(id, "bad paperwork").await.unwrap_err();
        assert!(matches!(err, ApprovalError::Store(_)));

        let stored = store.application(id);
        assert_eq!(stored.status, ApplicationStatus::Pending);
        assert!(stored.admin_notes.is_none());
    }

    #[tokio::test]
    async fn lost_race_reports_the_winning_decision() {
        let store = Arc::new(MemoryStore::default());
        let id = store.seed(driver_submission());
        let applicant = store.application(id).applicant_id;

        // Another reviewer rejects between our precondition read and the
        // guarded write.
        *store.decide_behind_the_back.lock().unwrap() =
            Some(ApplicationStatus::Rejected);

        let workflow = ApprovalWorkflow::new(store.clone());
        let err = workflow.approve(id).await.unwrap_err();
        assert!(matches!(
            err,
            ApprovalError::AlreadyDecided(ApplicationStatus::Rejected)
        ));
        // The losing approval left no profile behind.
        assert!(store.profiles_for(applicant).is_empty());
    }

    #[tokio::test]
    async fn unknown_application_is_not_found() {
        let store = Arc::new(MemoryStore::default());
        let workflow = ApprovalWorkflow::new(store.clone());

        let err = workflow.approve(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, ApprovalError::NotFound));

        let err = workflow.reject(Uuid::new_v4(), "notes").await.unwrap_err();
        assert!(matches!(err, ApprovalError::NotFound));
    }

    /// Approved implies a matching profile, across a mixed run that includes
    /// injected failures and lost races.
    #[tokio::test]
    async fn approved_applications_always_have_profiles() {
        let store = Arc::new(MemoryStore::default());
        let workflow = ApprovalWorkflow::new(store.clone());

        let mut ids = Vec::new();
        for i in 0..12 {
            let mut submission = driver_submission();
            submission.service_type = if i % 2 == 0 {
                "driver".into()
            } else {
                "property_owner".into()
            };
            ids.push(store.seed(submission));
        }

        for (i, &id) in ids.iter().enumerate() {
            match i % 4 {
                0 => {
                    let _ = workflow.approve(id).await;
                }
                1 => {
                    let _ = workflow.reject(id, "incomplete submission").await;
                }
                2 => {
                    store.fail_profile_insert.store(true, Ordering::SeqCst);
                    assert!(workflow.approve(id).await.is_err());
                    store.fail_profile_insert.store(false, Ordering::SeqCst);
                }
                _ => {
                    *store.decide_behind_the_back.lock().unwrap() =
                        Some(ApplicationStatus::Rejected);
                    assert!(workflow.approve(id).await.is_err());
                }
            }
        }

        for &id in &ids {
            let app = store.application(id);
            let profiles = store
                .profiles_for(app.applicant_id)
                .into_iter()
                .filter(|p| p.provider_type == app.service_type)
                .count();
            match app.status {
                ApplicationStatus::Approved => {
                    assert_eq!(profiles, 1, "approved application must have a profile")
                }
                _ => assert_eq!(profiles, 0, "undecided/rejected must have none"),
            }
        }
    }
}
