//! Cookie-backed sessions.
//!
//! The session token lives in a cookie and maps to a user id through the
//! `sessions` table. Nothing about the session is kept in process memory.

use std::sync::Arc;

use async_trait::async_trait;
use axum::http::header::COOKIE;
use axum::http::{HeaderMap, HeaderValue};
use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

use crate::config::SessionConfig;
use crate::error::DatabaseError;
use crate::store::Database;

/// Maps an incoming request to the signed-in user, if any.
#[async_trait]
pub trait SessionResolver: Send + Sync {
    async fn current_user_id(&self, headers: &HeaderMap) -> Result<Option<String>, DatabaseError>;
}

/// Session tokens carried in an HTTP cookie and stored in the database.
pub struct CookieSessions {
    db: Arc<dyn Database>,
    config: SessionConfig,
}

impl CookieSessions {
    pub fn new(db: Arc<dyn Database>, config: SessionConfig) -> Self {
        Self { db, config }
    }

    /// Start a session for `user_id`. Returns the `Set-Cookie` value.
    pub async fn start(&self, user_id: &str) -> Result<HeaderValue, DatabaseError> {
        let token = Uuid::new_v4().simple().to_string();
        let ttl = chrono::Duration::from_std(self.config.ttl)
            .unwrap_or_else(|_| chrono::Duration::hours(24));
        self.db
            .create_session(&token, user_id, Utc::now() + ttl)
            .await?;
        debug!(user_id = %user_id, "Session started");
        Ok(self.set_cookie(&token, self.config.ttl.as_secs()))
    }

    /// End the session named in `headers`, if any. Returns the `Set-Cookie`
    /// value that clears it on the client.
    pub async fn end(&self, headers: &HeaderMap) -> Result<HeaderValue, DatabaseError> {
        if let Some(token) = read_cookie(headers, &self.config.cookie_name) {
            self.db.delete_session(&token).await?;
        }
        Ok(self.set_cookie("", 0))
    }

    fn set_cookie(&self, token: &str, max_age: u64) -> HeaderValue {
        let mut cookie = format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
            self.config.cookie_name, token, max_age
        );
        if self.config.secure {
            cookie.push_str("; Secure");
        }
        // Name is validated in config and the token is hex, so this is
        // always a visible-ASCII header.
        HeaderValue::from_str(&cookie).unwrap_or_else(|_| HeaderValue::from_static(""))
    }
}

#[async_trait]
impl SessionResolver for CookieSessions {
    async fn current_user_id(&self, headers: &HeaderMap) -> Result<Option<String>, DatabaseError> {
        match read_cookie(headers, &self.config.cookie_name) {
            Some(token) if !token.is_empty() => self.db.session_user(&token).await,
            _ => Ok(None),
        }
    }
}

/// Find cookie `name` across all `Cookie` headers.
pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v.trim().to_string())
}
