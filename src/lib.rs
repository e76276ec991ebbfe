//! paydash: onboarding and role-routing backend for the payments dashboards.

pub mod auth;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod guard;
pub mod onboarding;
pub mod profile;
pub mod server;
pub mod session;
pub mod store;
