//! Configuration types.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;

/// Default protected path prefixes. Requests under these go through the
/// onboarding gate.
pub const DEFAULT_PROTECTED_PREFIXES: &[&str] =
    &["/dashboard", "/wallet", "/onboarding", "/settings", "/api/profile"];

/// Server configuration, built from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Address the HTTP server binds to.
    pub bind: SocketAddr,
    /// libSQL file path. `None` keeps everything in memory.
    pub db_path: Option<PathBuf>,
    /// Session cookie settings.
    pub session: SessionConfig,
    /// Path prefixes that require a session.
    pub protected_prefixes: Vec<String>,
}

/// Session cookie configuration.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub cookie_name: String,
    /// How long a login stays valid.
    pub ttl: Duration,
    /// Mark the cookie `Secure` (HTTPS only).
    pub secure: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: "paydash_session".to_string(),
            ttl: Duration::from_secs(24 * 3600), // 1 day
            secure: false,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 3000)),
            db_path: None,
            session: SessionConfig::default(),
            protected_prefixes: DEFAULT_PROTECTED_PREFIXES
                .iter()
                .map(|p| p.to_string())
                .collect(),
        }
    }
}

impl AppConfig {
    /// Build config from `PAYDASH_*` environment variables. Unset variables
    /// fall back to defaults; malformed ones are an error.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(bind) = lookup("PAYDASH_BIND") {
            config.bind = bind.parse().map_err(|e| ConfigError::InvalidValue {
                key: "PAYDASH_BIND".into(),
                message: format!("{e}"),
            })?;
        }

        config.db_path = lookup("PAYDASH_DB_PATH")
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from);

        if let Some(name) = lookup("PAYDASH_SESSION_COOKIE") {
            let name = name.trim().to_string();
            if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
                return Err(ConfigError::InvalidValue {
                    key: "PAYDASH_SESSION_COOKIE".into(),
                    message: format!("not a valid cookie name: {name:?}"),
                });
            }
            config.session.cookie_name = name;
        }

        if let Some(hours) = lookup("PAYDASH_SESSION_TTL_HOURS") {
            let hours: u64 = hours.trim().parse().map_err(|e| ConfigError::InvalidValue {
                key: "PAYDASH_SESSION_TTL_HOURS".into(),
                message: format!("{e}"),
            })?;
            if hours == 0 {
                return Err(ConfigError::InvalidValue {
                    key: "PAYDASH_SESSION_TTL_HOURS".into(),
                    message: "must be at least 1".into(),
                });
            }
            config.session.ttl = Duration::from_secs(hours * 3600);
        }

        if let Some(secure) = lookup("PAYDASH_SECURE_COOKIES") {
            config.session.secure = parse_bool(&secure).ok_or_else(|| ConfigError::InvalidValue {
                key: "PAYDASH_SECURE_COOKIES".into(),
                message: format!("expected true/false, got {secure:?}"),
            })?;
        }

        if let Some(prefixes) = lookup("PAYDASH_PROTECTED_PREFIXES") {
            let parsed: Vec<String> = prefixes
                .split(',')
                .map(|s| s.trim().trim_end_matches('/').to_string())
                .filter(|s| s.starts_with('/') && s.len() > 1)
                .collect();
            if !parsed.is_empty() {
                config.protected_prefixes = parsed;
            }
        }

        Ok(config)
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
