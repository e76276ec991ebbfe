//! libSQL backend: async `Database` trait implementation.
//!
//! Supports local file and in-memory databases. The in-memory form is the
//! default for the server; nothing outlives the process unless a path is
//! configured.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use libsql::{Connection, Database as LibSqlDatabase, params};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::DatabaseError;
use crate::profile::{Profile, ProfilePatch, Role, Subrole, User};
use crate::store::migrations;
use crate::store::traits::Database;

/// libSQL database backend.
///
/// Stores a single connection that is reused for all operations.
/// `libsql::Connection` is `Send + Sync` and safe for concurrent async use.
pub struct LibSqlBackend {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlBackend {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Pool(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to open libSQL database: {e}")))?;

        let backend = Self::from_database(db)?;
        backend.run_migrations().await?;
        info!(path = %path.display(), "Database opened");
        Ok(backend)
    }

    /// Create an in-memory database.
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                DatabaseError::Pool(format!("Failed to create in-memory database: {e}"))
            })?;

        let backend = Self::from_database(db)?;
        backend.run_migrations().await?;
        Ok(backend)
    }

    fn from_database(db: LibSqlDatabase) -> Result<Self, DatabaseError> {
        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;
        Ok(Self {
            db: Arc::new(db),
            conn,
        })
    }

    fn conn(&self) -> &Connection {
        &self.conn
    }
}

// ── Helper functions ────────────────────────────────────────────────

/// Canonical timestamp format. Fixed-width UTC so string comparison in
/// SQL orders correctly.
fn fmt_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Parse an RFC 3339 or SQLite datetime string into DateTime<Utc>.
fn parse_datetime(s: &str) -> DateTime<Utc> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return dt.with_timezone(&Utc);
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return ndt.and_utc();
    }
    DateTime::<Utc>::MIN_UTC
}

fn opt_text(s: Option<&str>) -> libsql::Value {
    match s {
        Some(v) => libsql::Value::Text(v.to_string()),
        None => libsql::Value::Null,
    }
}

fn opt_bool(b: Option<bool>) -> libsql::Value {
    match b {
        Some(v) => libsql::Value::Integer(v as i64),
        None => libsql::Value::Null,
    }
}

const USER_COLUMNS: &str = "id, email, created_at";

const PROFILE_COLUMNS: &str =
    "user_id, role, subrole, profile_completed, kyc_verified, full_name, country, updated_at";

/// Column order matches USER_COLUMNS.
fn row_to_user(row: &libsql::Row) -> Result<User, libsql::Error> {
    let created: String = row.get(2)?;
    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        created_at: parse_datetime(&created),
    })
}

/// Column order matches PROFILE_COLUMNS. NULL or unknown role strings
/// read back as unset.
fn row_to_profile(row: &libsql::Row) -> Result<Profile, libsql::Error> {
    let role: Option<String> = row.get::<String>(1).ok();
    let subrole: Option<String> = row.get::<String>(2).ok();
    let completed: i64 = row.get(3)?;
    let kyc: i64 = row.get(4)?;
    let updated: String = row.get(7)?;
    Ok(Profile {
        user_id: row.get(0)?,
        role: role.and_then(|r| r.parse::<Role>().ok()),
        subrole: subrole.and_then(|s| s.parse::<Subrole>().ok()),
        profile_completed: completed != 0,
        kyc_verified: kyc != 0,
        full_name: row.get::<String>(5).ok(),
        country: row.get::<String>(6).ok(),
        updated_at: parse_datetime(&updated),
    })
}

fn is_unique_violation(e: &libsql::Error) -> bool {
    e.to_string().contains("UNIQUE constraint failed")
}

// ── Trait implementation ────────────────────────────────────────────

#[async_trait]
impl Database for LibSqlBackend {
    async fn run_migrations(&self) -> Result<(), DatabaseError> {
        migrations::run_migrations(self.conn()).await
    }

    // ── Users ───────────────────────────────────────────────────────

    async fn create_user(&self, email: &str) -> Result<User, DatabaseError> {
        let user = User {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            created_at: Utc::now(),
        };

        // The insert trigger creates the empty profile in the same statement.
        self.conn()
            .execute(
                "INSERT INTO users (id, email, created_at) VALUES (?1, ?2, ?3)",
                params![
                    user.id.as_str(),
                    user.email.as_str(),
                    fmt_datetime(&user.created_at)
                ],
            )
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    DatabaseError::Constraint(format!("email already registered: {email}"))
                } else {
                    DatabaseError::Query(format!("create_user: {e}"))
                }
            })?;

        debug!(user_id = %user.id, "User created");
        Ok(user)
    }

    async fn get_user(&self, user_id: &str) -> Result<Option<User>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
                params![user_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get_user: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => row_to_user(&row)
                .map(Some)
                .map_err(|e| DatabaseError::Query(format!("get_user row parse: {e}"))),
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("get_user: {e}"))),
        }
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"),
                params![email],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get_user_by_email: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => row_to_user(&row)
                .map(Some)
                .map_err(|e| DatabaseError::Query(format!("get_user_by_email row parse: {e}"))),
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("get_user_by_email: {e}"))),
        }
    }

    // ── Profiles ────────────────────────────────────────────────────

    async fn get_profile(&self, user_id: &str) -> Result<Option<Profile>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE user_id = ?1"),
                params![user_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get_profile: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => row_to_profile(&row)
                .map(Some)
                .map_err(|e| DatabaseError::Query(format!("get_profile row parse: {e}"))),
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("get_profile: {e}"))),
        }
    }

    async fn upsert_profile(
        &self,
        user_id: &str,
        patch: &ProfilePatch,
    ) -> Result<Profile, DatabaseError> {
        let now = fmt_datetime(&Utc::now());

        // One statement, so the patch lands whole or not at all.
        let changed = self
            .conn()
            .execute(
                "UPDATE profiles SET
                    role = COALESCE(?2, role),
                    subrole = COALESCE(?3, subrole),
                    profile_completed = COALESCE(?4, profile_completed),
                    kyc_verified = COALESCE(?5, kyc_verified),
                    full_name = COALESCE(?6, full_name),
                    country = COALESCE(?7, country),
                    updated_at = ?8
                 WHERE user_id = ?1",
                params![
                    user_id,
                    opt_text(patch.role.as_ref().map(Role::as_str)),
                    opt_text(patch.subrole.as_ref().map(Subrole::as_str)),
                    opt_bool(patch.profile_completed),
                    opt_bool(patch.kyc_verified),
                    opt_text(patch.full_name.as_deref()),
                    opt_text(patch.country.as_deref()),
                    now,
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("upsert_profile: {e}")))?;

        if changed == 0 {
            return Err(DatabaseError::NotFound {
                entity: "profile".into(),
                id: user_id.into(),
            });
        }

        debug!(user_id = %user_id, patch = ?patch, "Profile updated");

        self.get_profile(user_id)
            .await?
            .ok_or_else(|| DatabaseError::NotFound {
                entity: "profile".into(),
                id: user_id.into(),
            })
    }

    // ── Sessions ────────────────────────────────────────────────────

    async fn create_session(
        &self,
        token: &str,
        user_id: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), DatabaseError> {
        self.conn()
            .execute(
                "INSERT INTO sessions (token, user_id, created_at, expires_at) VALUES (?1, ?2, ?3, ?4)",
                params![
                    token,
                    user_id,
                    fmt_datetime(&Utc::now()),
                    fmt_datetime(&expires_at)
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("create_session: {e}")))?;
        Ok(())
    }

    async fn session_user(&self, token: &str) -> Result<Option<String>, DatabaseError> {
        let now = fmt_datetime(&Utc::now());
        let mut rows = self
            .conn()
            .query(
                "SELECT user_id FROM sessions WHERE token = ?1 AND expires_at > ?2",
                params![token, now],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("session_user: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => row
                .get::<String>(0)
                .map(Some)
                .map_err(|e| DatabaseError::Query(format!("session_user row parse: {e}"))),
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("session_user: {e}"))),
        }
    }

    async fn delete_session(&self, token: &str) -> Result<bool, DatabaseError> {
        let count = self
            .conn()
            .execute("DELETE FROM sessions WHERE token = ?1", params![token])
            .await
            .map_err(|e| DatabaseError::Query(format!("delete_session: {e}")))?;
        Ok(count > 0)
    }

    async fn prune_sessions(&self) -> Result<usize, DatabaseError> {
        let now = fmt_datetime(&Utc::now());
        let count = self
            .conn()
            .execute("DELETE FROM sessions WHERE expires_at <= ?1", params![now])
            .await
            .map_err(|e| DatabaseError::Query(format!("prune_sessions: {e}")))?;
        if count > 0 {
            info!(count, "Pruned expired sessions");
        }
        Ok(count as usize)
    }
}
