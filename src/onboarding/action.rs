//! Onboarding actions: role selection, profile completion, and KYC.

use std::sync::Arc;

use tracing::{debug, info};

use crate::error::OnboardingError;
use crate::profile::routing::{self, PROFILE_COMPLETION_PATH};
use crate::profile::{Profile, ProfileDetails, ProfilePatch, Role, Subrole};
use crate::store::Database;

/// A validated role/subrole pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleSelection {
    pub role: Role,
    pub subrole: Subrole,
}

impl RoleSelection {
    /// Parse raw form input. Employees are always receivers and employers
    /// always senders, whatever was submitted; everyone else must pick.
    pub fn parse(raw_role: &str, raw_subrole: Option<&str>) -> Result<Self, OnboardingError> {
        let role: Role = raw_role
            .parse()
            .map_err(|_| OnboardingError::InvalidRole(raw_role.to_string()))?;

        let subrole = match role.forced_subrole() {
            Some(forced) => forced,
            None => {
                let raw = raw_subrole.unwrap_or_default();
                raw.parse()
                    .map_err(|_| OnboardingError::InvalidSubrole(raw.to_string()))?
            }
        };

        Ok(Self { role, subrole })
    }

    /// Only freelancer receivers go through the completion + KYC step.
    pub fn requires_kyc(&self) -> bool {
        routing::is_gated(Some(self.role), Some(self.subrole))
    }

    /// The patch written on submission. Completion flags start false only
    /// for the gated combination.
    pub fn to_patch(&self) -> ProfilePatch {
        let done = !self.requires_kyc();
        ProfilePatch {
            role: Some(self.role),
            subrole: Some(self.subrole),
            profile_completed: Some(done),
            kyc_verified: Some(done),
            ..Default::default()
        }
    }

    /// Where the user goes right after submitting.
    pub fn next_path(&self) -> &'static str {
        if self.requires_kyc() {
            PROFILE_COMPLETION_PATH
        } else {
            routing::resolve_dashboard_path(Some(self.role), Some(self.subrole))
        }
    }
}

/// Runs onboarding mutations against the profile store.
pub struct OnboardingService {
    db: Arc<dyn Database>,
}

impl OnboardingService {
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }

    /// Validate and persist a role/subrole choice, returning the next path.
    ///
    /// Resubmitting the same selection writes the same state again; the
    /// last write wins.
    pub async fn submit_role_selection(
        &self,
        user_id: Option<&str>,
        raw_role: &str,
        raw_subrole: Option<&str>,
    ) -> Result<&'static str, OnboardingError> {
        let user_id = user_id.ok_or(OnboardingError::NotAuthenticated)?;
        let selection = RoleSelection::parse(raw_role, raw_subrole)?;

        self.db
            .upsert_profile(user_id, &selection.to_patch())
            .await?;

        info!(
            user_id = %user_id,
            role = %selection.role,
            subrole = %selection.subrole,
            requires_kyc = selection.requires_kyc(),
            "Role selected"
        );
        Ok(selection.next_path())
    }

    /// Record profile details and mark the profile completed.
    pub async fn complete_profile(
        &self,
        user_id: Option<&str>,
        details: &ProfileDetails,
    ) -> Result<&'static str, OnboardingError> {
        let user_id = user_id.ok_or(OnboardingError::NotAuthenticated)?;
        let full_name = details.full_name.trim();
        let country = details.country.trim();
        if full_name.is_empty() {
            return Err(OnboardingError::InvalidDetails("full name is required".into()));
        }
        if country.is_empty() {
            return Err(OnboardingError::InvalidDetails("country is required".into()));
        }

        self.require_role(user_id).await?;

        let profile = self
            .db
            .upsert_profile(
                user_id,
                &ProfilePatch {
                    profile_completed: Some(true),
                    full_name: Some(full_name.to_string()),
                    country: Some(country.to_string()),
                    ..Default::default()
                },
            )
            .await?;

        debug!(user_id = %user_id, "Profile details saved");
        Ok(routing::landing_path(&profile))
    }

    /// Mark KYC as verified. The profile must already be completed.
    pub async fn verify_kyc(&self, user_id: Option<&str>) -> Result<&'static str, OnboardingError> {
        let user_id = user_id.ok_or(OnboardingError::NotAuthenticated)?;
        let profile = self.require_role(user_id).await?;
        if !profile.profile_completed {
            return Err(OnboardingError::ProfileIncomplete);
        }

        let profile = self
            .db
            .upsert_profile(
                user_id,
                &ProfilePatch {
                    kyc_verified: Some(true),
                    ..Default::default()
                },
            )
            .await?;

        info!(user_id = %user_id, "KYC marked verified");
        Ok(routing::landing_path(&profile))
    }

    async fn require_role(&self, user_id: &str) -> Result<Profile, OnboardingError> {
        let profile = self
            .db
            .get_profile(user_id)
            .await?
            .ok_or_else(|| OnboardingError::ProfileNotFound(user_id.to_string()))?;
        if profile.role.is_none() {
            return Err(OnboardingError::RoleNotSelected);
        }
        Ok(profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::LibSqlBackend;

    async fn setup() -> (OnboardingService, Arc<dyn Database>, String) {
        let db: Arc<dyn Database> = Arc::new(LibSqlBackend::new_memory().await.unwrap());
        let user = db.create_user("ada@example.com").await.unwrap();
        (OnboardingService::new(Arc::clone(&db)), db, user.id)
    }

    async fn profile(db: &Arc<dyn Database>, id: &str) -> Profile {
        db.get_profile(id).await.unwrap().unwrap()
    }

    // ── Validation ──────────────────────────────────────────────────

    #[test]
    fn parse_rejects_bad_roles() {
        for raw in ["", "  ", "admin", "freelancers"] {
            let err = RoleSelection::parse(raw, Some("sender")).unwrap_err();
            assert!(matches!(err, OnboardingError::InvalidRole(_)), "{raw:?}");
        }
    }

    #[test]
    fn parse_requires_subrole_for_selectable_roles() {
        for role in ["freelancer", "contractor", "dao"] {
            for raw in [None, Some(""), Some("payer"), Some(" sender "), Some("receiver ")] {
                let err = RoleSelection::parse(role, raw).unwrap_err();
                assert!(
                    matches!(err, OnboardingError::InvalidSubrole(_)),
                    "{role} {raw:?}"
                );
            }
        }
    }

    #[test]
    fn parse_forces_employee_and_employer_subroles() {
        for raw in [None, Some("sender"), Some("receiver"), Some("garbage")] {
            let employee = RoleSelection::parse("Employee", raw).unwrap();
            assert_eq!(employee.subrole, Subrole::Receiver);
            let employer = RoleSelection::parse("EMPLOYER", raw).unwrap();
            assert_eq!(employer.subrole, Subrole::Sender);
        }
    }

    #[test]
    fn parse_is_case_insensitive() {
        let sel = RoleSelection::parse("DaO", Some("SENDER")).unwrap();
        assert_eq!(sel.role, Role::Dao);
        assert_eq!(sel.subrole, Subrole::Sender);
        assert_eq!(sel.next_path(), "/dashboard/dao/admin");
    }

    // ── Submission ──────────────────────────────────────────────────

    #[tokio::test]
    async fn freelancer_receiver_is_gated() {
        let (svc, db, id) = setup().await;
        let next = svc
            .submit_role_selection(Some(&id), "freelancer", Some("receiver"))
            .await
            .unwrap();
        assert_eq!(next, PROFILE_COMPLETION_PATH);

        let p = profile(&db, &id).await;
        assert_eq!(p.role, Some(Role::Freelancer));
        assert_eq!(p.subrole, Some(Subrole::Receiver));
        assert!(!p.profile_completed);
        assert!(!p.kyc_verified);
    }

    #[tokio::test]
    async fn freelancer_sender_goes_straight_to_dashboard() {
        let (svc, db, id) = setup().await;
        let next = svc
            .submit_role_selection(Some(&id), "freelancer", Some("sender"))
            .await
            .unwrap();
        assert_eq!(next, "/dashboard/freelancer/sender");

        let p = profile(&db, &id).await;
        assert!(p.profile_completed);
        assert!(p.kyc_verified);
    }

    #[tokio::test]
    async fn employee_and_employer_persist_forced_subrole() {
        let (svc, db, id) = setup().await;
        let next = svc
            .submit_role_selection(Some(&id), "employee", Some("sender"))
            .await
            .unwrap();
        assert_eq!(next, "/dashboard/employee/receiver");
        assert_eq!(profile(&db, &id).await.subrole, Some(Subrole::Receiver));

        let next = svc
            .submit_role_selection(Some(&id), "employer", None)
            .await
            .unwrap();
        assert_eq!(next, "/dashboard/employer/sender");
        assert_eq!(profile(&db, &id).await.subrole, Some(Subrole::Sender));
    }

    #[tokio::test]
    async fn resubmission_is_idempotent() {
        let (svc, db, id) = setup().await;
        svc.submit_role_selection(Some(&id), "contractor", Some("receiver"))
            .await
            .unwrap();
        let once = profile(&db, &id).await;
        svc.submit_role_selection(Some(&id), "contractor", Some("receiver"))
            .await
            .unwrap();
        let twice = profile(&db, &id).await;

        assert_eq!(once.role, twice.role);
        assert_eq!(once.subrole, twice.subrole);
        assert_eq!(once.profile_completed, twice.profile_completed);
        assert_eq!(once.kyc_verified, twice.kyc_verified);
    }

    #[tokio::test]
    async fn anonymous_submission_is_rejected_without_writing() {
        let (svc, db, id) = setup().await;
        let err = svc
            .submit_role_selection(None, "dao", Some("sender"))
            .await
            .unwrap_err();
        assert!(matches!(err, OnboardingError::NotAuthenticated));
        assert!(profile(&db, &id).await.role.is_none());
    }

    #[tokio::test]
    async fn invalid_submission_leaves_profile_untouched() {
        let (svc, db, id) = setup().await;
        let err = svc
            .submit_role_selection(Some(&id), "contractor", Some("both"))
            .await
            .unwrap_err();
        assert!(matches!(err, OnboardingError::InvalidSubrole(ref s) if s == "both"));
        assert!(profile(&db, &id).await.role.is_none());
    }

    #[tokio::test]
    async fn missing_profile_is_profile_not_found() {
        let (svc, _db, _id) = setup().await;
        let err = svc
            .submit_role_selection(Some("ghost"), "dao", Some("receiver"))
            .await
            .unwrap_err();
        assert!(matches!(err, OnboardingError::ProfileNotFound(ref id) if id == "ghost"));
    }

    // ── Completion + KYC ────────────────────────────────────────────

    fn details(name: &str, country: &str) -> ProfileDetails {
        ProfileDetails {
            full_name: name.into(),
            country: country.into(),
        }
    }

    #[tokio::test]
    async fn completion_then_kyc_reaches_dashboard() {
        let (svc, db, id) = setup().await;
        svc.submit_role_selection(Some(&id), "freelancer", Some("receiver"))
            .await
            .unwrap();

        let next = svc
            .complete_profile(Some(&id), &details(" Ada Lovelace ", "GB"))
            .await
            .unwrap();
        assert_eq!(next, PROFILE_COMPLETION_PATH, "KYC still pending");
        let p = profile(&db, &id).await;
        assert!(p.profile_completed);
        assert!(!p.kyc_verified);
        assert_eq!(p.full_name.as_deref(), Some("Ada Lovelace"));

        let next = svc.verify_kyc(Some(&id)).await.unwrap();
        assert_eq!(next, "/dashboard/freelancer/receiver");
        assert!(profile(&db, &id).await.kyc_verified);
    }

    #[tokio::test]
    async fn kyc_before_details_is_rejected() {
        let (svc, _db, id) = setup().await;
        svc.submit_role_selection(Some(&id), "freelancer", Some("receiver"))
            .await
            .unwrap();
        let err = svc.verify_kyc(Some(&id)).await.unwrap_err();
        assert!(matches!(err, OnboardingError::ProfileIncomplete));
    }

    #[tokio::test]
    async fn completion_requires_role_and_details() {
        let (svc, _db, id) = setup().await;
        let err = svc
            .complete_profile(Some(&id), &details("Ada", "GB"))
            .await
            .unwrap_err();
        assert!(matches!(err, OnboardingError::RoleNotSelected));

        svc.submit_role_selection(Some(&id), "freelancer", Some("receiver"))
            .await
            .unwrap();
        let err = svc
            .complete_profile(Some(&id), &details("", "GB"))
            .await
            .unwrap_err();
        assert!(matches!(err, OnboardingError::InvalidDetails(_)));
        let err = svc
            .complete_profile(Some(&id), &details("Ada", "  "))
            .await
            .unwrap_err();
        assert!(matches!(err, OnboardingError::InvalidDetails(_)));
    }

    #[tokio::test]
    async fn completion_for_ungated_role_lands_on_dashboard() {
        let (svc, _db, id) = setup().await;
        svc.submit_role_selection(Some(&id), "dao", Some("receiver"))
            .await
            .unwrap();
        let next = svc
            .complete_profile(Some(&id), &details("Ada", "GB"))
            .await
            .unwrap();
        assert_eq!(next, "/dashboard/dao/contributor");
    }

    #[tokio::test]
    async fn verify_kyc_anonymous_and_roleless() {
        let (svc, _db, id) = setup().await;
        assert!(matches!(
            svc.verify_kyc(None).await.unwrap_err(),
            OnboardingError::NotAuthenticated
        ));
        assert!(matches!(
            svc.verify_kyc(Some(&id)).await.unwrap_err(),
            OnboardingError::RoleNotSelected
        ));
    }
}
