//! Profiles, roles, and the role-routing resolver.

pub mod model;
pub mod routing;

pub use model::{Profile, ProfileDetails, ProfilePatch, Role, Subrole, User};
pub use routing::{Dashboard, landing_path, requires_completion, resolve_dashboard_path};
