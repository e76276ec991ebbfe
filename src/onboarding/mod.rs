//! Onboarding: role selection, then profile completion and KYC for the
//! gated combination.
//!
//! New accounts start with no role. Submitting a role/subrole either sends
//! the user straight to their dashboard or, for freelancer receivers, on to
//! the completion screen until both the profile and KYC flags are set.

pub mod action;
pub mod routes;

pub use action::{OnboardingService, RoleSelection};
pub use routes::{RoleSelectionForm, onboarding_routes};
