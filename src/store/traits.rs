//! `Database` trait: single async interface for accounts, profiles, and
//! sessions.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::DatabaseError;
use crate::profile::{Profile, ProfilePatch, User};

/// Backend-agnostic persistence for the onboarding flow.
#[async_trait]
pub trait Database: Send + Sync {
    /// Run all pending schema migrations.
    async fn run_migrations(&self) -> Result<(), DatabaseError>;

    // ── Users ───────────────────────────────────────────────────────

    /// Create a user together with its empty profile. Fails with
    /// `Constraint` if the email is already registered.
    async fn create_user(&self, email: &str) -> Result<User, DatabaseError>;

    async fn get_user(&self, user_id: &str) -> Result<Option<User>, DatabaseError>;

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError>;

    // ── Profiles ────────────────────────────────────────────────────

    async fn get_profile(&self, user_id: &str) -> Result<Option<Profile>, DatabaseError>;

    /// Merge `patch` onto the stored profile in one write and return the
    /// result. Fails with `NotFound { entity: "profile" }` if the user has
    /// no profile row.
    async fn upsert_profile(
        &self,
        user_id: &str,
        patch: &ProfilePatch,
    ) -> Result<Profile, DatabaseError>;

    // ── Sessions ────────────────────────────────────────────────────

    /// Store a session token for `user_id`, valid until `expires_at`.
    async fn create_session(
        &self,
        token: &str,
        user_id: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), DatabaseError>;

    /// Resolve a token to its user id. Expired tokens resolve to `None`.
    async fn session_user(&self, token: &str) -> Result<Option<String>, DatabaseError>;

    /// Delete a session. Returns whether a row was removed.
    async fn delete_session(&self, token: &str) -> Result<bool, DatabaseError>;

    /// Remove expired sessions. Returns the number deleted.
    async fn prune_sessions(&self) -> Result<usize, DatabaseError>;
}
