//! Role/subrole → dashboard routing and the completion gate.
//!
//! Every entry point (login, onboarding actions, the route guard) goes
//! through these functions so the mapping cannot drift between them.

use super::model::{Profile, Role, Subrole};

pub const LOGIN_PATH: &str = "/login";
pub const DASHBOARD_ROOT: &str = "/dashboard";
pub const ONBOARDING_ROOT: &str = "/onboarding";
pub const ROLE_SELECTION_PATH: &str = "/onboarding/role-selection";
pub const PROFILE_COMPLETION_PATH: &str = "/onboarding/complete-profile";
pub const KYC_PATH: &str = "/onboarding/complete-profile/kyc";

/// A concrete dashboard a fully onboarded user can land on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dashboard {
    FreelancerSender,
    FreelancerReceiver,
    ContractorSender,
    ContractorReceiver,
    EmployeeReceiver,
    EmployerSender,
    DaoAdmin,
    DaoContributor,
}

impl Dashboard {
    pub const ALL: [Dashboard; 8] = [
        Dashboard::FreelancerSender,
        Dashboard::FreelancerReceiver,
        Dashboard::ContractorSender,
        Dashboard::ContractorReceiver,
        Dashboard::EmployeeReceiver,
        Dashboard::EmployerSender,
        Dashboard::DaoAdmin,
        Dashboard::DaoContributor,
    ];

    /// Pick the dashboard for a role. An unset subrole falls to the
    /// receiver-side view.
    pub fn for_role(role: Role, subrole: Option<Subrole>) -> Self {
        let sender = subrole == Some(Subrole::Sender);
        match role {
            Role::Freelancer if sender => Self::FreelancerSender,
            Role::Freelancer => Self::FreelancerReceiver,
            Role::Contractor if sender => Self::ContractorSender,
            Role::Contractor => Self::ContractorReceiver,
            Role::Employee => Self::EmployeeReceiver,
            Role::Employer => Self::EmployerSender,
            Role::Dao if sender => Self::DaoAdmin,
            Role::Dao => Self::DaoContributor,
        }
    }

    pub fn path(&self) -> &'static str {
        match self {
            Self::FreelancerSender => "/dashboard/freelancer/sender",
            Self::FreelancerReceiver => "/dashboard/freelancer/receiver",
            Self::ContractorSender => "/dashboard/contractor/sender",
            Self::ContractorReceiver => "/dashboard/contractor/receiver",
            Self::EmployeeReceiver => "/dashboard/employee/receiver",
            Self::EmployerSender => "/dashboard/employer/sender",
            Self::DaoAdmin => "/dashboard/dao/admin",
            Self::DaoContributor => "/dashboard/dao/contributor",
        }
    }

    /// Reverse lookup from the `{role}/{view}` path segments.
    pub fn from_segments(role: &str, view: &str) -> Option<Self> {
        let path = format!("{DASHBOARD_ROOT}/{role}/{view}");
        Self::ALL.into_iter().find(|d| d.path() == path)
    }

    pub fn role(&self) -> Role {
        match self {
            Self::FreelancerSender | Self::FreelancerReceiver => Role::Freelancer,
            Self::ContractorSender | Self::ContractorReceiver => Role::Contractor,
            Self::EmployeeReceiver => Role::Employee,
            Self::EmployerSender => Role::Employer,
            Self::DaoAdmin | Self::DaoContributor => Role::Dao,
        }
    }

    pub fn subrole(&self) -> Subrole {
        match self {
            Self::FreelancerSender
            | Self::ContractorSender
            | Self::EmployerSender
            | Self::DaoAdmin => Subrole::Sender,
            _ => Subrole::Receiver,
        }
    }
}

/// Canonical dashboard path for a role/subrole pair. Without a role the
/// generic `/dashboard` landing is returned.
pub fn resolve_dashboard_path(role: Option<Role>, subrole: Option<Subrole>) -> &'static str {
    match role {
        Some(role) => Dashboard::for_role(role, subrole).path(),
        None => DASHBOARD_ROOT,
    }
}

/// Whether `role`/`subrole` is the combination that must pass KYC.
pub fn is_gated(role: Option<Role>, subrole: Option<Subrole>) -> bool {
    role == Some(Role::Freelancer) && subrole == Some(Subrole::Receiver)
}

/// True iff the profile is freelancer/receiver and is missing either the
/// profile details or KYC.
pub fn requires_completion(profile: &Profile) -> bool {
    is_gated(profile.role, profile.subrole) && (!profile.profile_completed || !profile.kyc_verified)
}

/// Where a signed-in user belongs right now.
pub fn landing_path(profile: &Profile) -> &'static str {
    if profile.role.is_none() {
        ROLE_SELECTION_PATH
    } else if requires_completion(profile) {
        PROFILE_COMPLETION_PATH
    } else {
        resolve_dashboard_path(profile.role, profile.subrole)
    }
}

pub fn is_onboarding_path(path: &str) -> bool {
    is_under(path, ONBOARDING_ROOT)
}

/// Login URL that returns the user to `next` afterwards.
pub fn login_redirect(next: &str) -> String {
    format!("{LOGIN_PATH}?next={}", urlencoding::encode(next))
}

/// Role-selection URL that brings the submitted values back to the form
/// once the user is signed in.
pub fn role_selection_resume(raw_role: &str, raw_subrole: Option<&str>) -> String {
    let mut target = format!("{ROLE_SELECTION_PATH}?role={}", urlencoding::encode(raw_role));
    if let Some(sub) = raw_subrole.filter(|s| !s.is_empty()) {
        target.push_str("&subrole=");
        target.push_str(&urlencoding::encode(sub));
    }
    target
}

/// Only same-site paths are accepted as post-login targets. Control
/// characters are refused since they cannot appear in a `Location` header.
pub fn is_local_path(target: &str) -> bool {
    target.starts_with('/')
        && !target.starts_with("//")
        && !target.contains('\\')
        && !target.chars().any(|c| c.is_ascii_control())
}

/// `path` equals `root` or is nested below it.
pub fn is_under(path: &str, root: &str) -> bool {
    path == root
        || path
            .strip_prefix(root)
            .is_some_and(|rest| rest.starts_with('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_full_table() {
        use Role::*;
        use Subrole::*;
        let table = [
            (Freelancer, Sender, "/dashboard/freelancer/sender"),
            (Freelancer, Receiver, "/dashboard/freelancer/receiver"),
            (Contractor, Sender, "/dashboard/contractor/sender"),
            (Contractor, Receiver, "/dashboard/contractor/receiver"),
            (Employee, Sender, "/dashboard/employee/receiver"),
            (Employee, Receiver, "/dashboard/employee/receiver"),
            (Employer, Sender, "/dashboard/employer/sender"),
            (Employer, Receiver, "/dashboard/employer/sender"),
            (Dao, Sender, "/dashboard/dao/admin"),
            (Dao, Receiver, "/dashboard/dao/contributor"),
        ];
        for (role, sub, path) in table {
            assert_eq!(
                resolve_dashboard_path(Some(role), Some(sub)),
                path,
                "{role}/{sub}"
            );
        }
    }

    #[test]
    fn unset_subrole_falls_to_receiver_side() {
        assert_eq!(
            resolve_dashboard_path(Some(Role::Freelancer), None),
            "/dashboard/freelancer/receiver"
        );
        assert_eq!(
            resolve_dashboard_path(Some(Role::Contractor), None),
            "/dashboard/contractor/receiver"
        );
        assert_eq!(
            resolve_dashboard_path(Some(Role::Dao), None),
            "/dashboard/dao/contributor"
        );
        assert_eq!(
            resolve_dashboard_path(Some(Role::Employer), None),
            "/dashboard/employer/sender"
        );
    }

    #[test]
    fn unrecognized_role_lands_on_generic_dashboard() {
        assert_eq!(resolve_dashboard_path(None, Some(Subrole::Sender)), "/dashboard");
    }

    #[test]
    fn dashboard_segments_round_trip() {
        for d in Dashboard::ALL {
            let rest = d.path().strip_prefix("/dashboard/").unwrap();
            let (role, view) = rest.split_once('/').unwrap();
            assert_eq!(Dashboard::from_segments(role, view), Some(d));
            assert_eq!(Dashboard::for_role(d.role(), Some(d.subrole())), d);
        }
        assert_eq!(Dashboard::from_segments("dao", "sender"), None);
        assert_eq!(Dashboard::from_segments("employee", "sender"), None);
    }

    fn profile(role: Role, sub: Subrole, completed: bool, kyc: bool) -> Profile {
        Profile {
            role: Some(role),
            subrole: Some(sub),
            profile_completed: completed,
            kyc_verified: kyc,
            ..Profile::empty("u1")
        }
    }

    #[test]
    fn completion_only_gates_freelancer_receiver() {
        let flags = [(false, false), (false, true), (true, false), (true, true)];
        for role in Role::ALL {
            for sub in Subrole::ALL {
                for (completed, kyc) in flags {
                    let p = profile(role, sub, completed, kyc);
                    let expected =
                        role == Role::Freelancer && sub == Subrole::Receiver && !(completed && kyc);
                    assert_eq!(
                        requires_completion(&p),
                        expected,
                        "{role}/{sub} completed={completed} kyc={kyc}"
                    );
                }
            }
        }
    }

    #[test]
    fn landing_path_states() {
        assert_eq!(landing_path(&Profile::empty("u1")), ROLE_SELECTION_PATH);
        assert_eq!(
            landing_path(&profile(Role::Freelancer, Subrole::Receiver, true, false)),
            PROFILE_COMPLETION_PATH
        );
        assert_eq!(
            landing_path(&profile(Role::Freelancer, Subrole::Receiver, true, true)),
            "/dashboard/freelancer/receiver"
        );
        assert_eq!(
            landing_path(&profile(Role::Dao, Subrole::Sender, false, false)),
            "/dashboard/dao/admin"
        );
    }

    #[test]
    fn path_prefix_matching() {
        assert!(is_onboarding_path("/onboarding"));
        assert!(is_onboarding_path("/onboarding/role-selection"));
        assert!(!is_onboarding_path("/onboardingx"));
        assert!(is_onboarding_path(KYC_PATH));
        assert!(is_under("/dashboard/dao/admin", "/dashboard"));
        assert!(!is_under("/dashboards", "/dashboard"));
    }

    #[test]
    fn login_redirect_encodes_resume_target() {
        assert_eq!(
            login_redirect("/dashboard/freelancer/receiver"),
            "/login?next=%2Fdashboard%2Ffreelancer%2Freceiver"
        );
        let resume = role_selection_resume("freelancer", Some("receiver"));
        assert_eq!(
            resume,
            "/onboarding/role-selection?role=freelancer&subrole=receiver"
        );
        assert_eq!(
            role_selection_resume("employee", None),
            "/onboarding/role-selection?role=employee"
        );
        assert!(login_redirect(&resume).starts_with("/login?next=%2Fonboarding"));
    }

    #[test]
    fn local_path_check() {
        assert!(is_local_path("/dashboard"));
        assert!(!is_local_path("//evil.example"));
        assert!(!is_local_path("https://evil.example"));
        assert!(!is_local_path("/\\evil.example"));
        assert!(!is_local_path(""));
        assert!(!is_local_path("/wallet\nX"));
        assert!(!is_local_path("/wallet\r\nSet-Cookie: x=1"));
        assert!(!is_local_path("/wallet\tX"));
        assert!(is_local_path("/onboarding/role-selection?role=dao&subrole=sender"));
    }
}
