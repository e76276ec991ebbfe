//! Application state and router assembly.

use std::sync::Arc;

use axum::http::{HeaderMap, StatusCode};
use axum::middleware::from_fn_with_state;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::auth::auth_routes;
use crate::config::AppConfig;
use crate::dashboard::dashboard_routes;
use crate::error::DatabaseError;
use crate::guard::{GuardContext, GuardPolicy, route_guard};
use crate::onboarding::{OnboardingService, onboarding_routes};
use crate::profile::Profile;
use crate::session::{CookieSessions, SessionResolver};
use crate::store::Database;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn Database>,
    pub sessions: Arc<CookieSessions>,
    pub onboarding: Arc<OnboardingService>,
}

impl AppState {
    pub fn new(db: Arc<dyn Database>, config: &AppConfig) -> Self {
        Self {
            sessions: Arc::new(CookieSessions::new(
                Arc::clone(&db),
                config.session.clone(),
            )),
            onboarding: Arc::new(OnboardingService::new(Arc::clone(&db))),
            db,
        }
    }

    /// The signed-in user's id, if any.
    pub async fn current_user(&self, headers: &HeaderMap) -> Result<Option<String>, DatabaseError> {
        self.sessions.current_user_id(headers).await
    }

    /// The signed-in user's profile. Every user gets a profile when the
    /// account is created, so a session without one is reported as `NotFound`.
    pub async fn current_profile(
        &self,
        headers: &HeaderMap,
    ) -> Result<Option<Profile>, DatabaseError> {
        let Some(user_id) = self.current_user(headers).await? else {
            return Ok(None);
        };
        match self.db.get_profile(&user_id).await? {
            Some(profile) => Ok(Some(profile)),
            None => Err(DatabaseError::NotFound {
                entity: "profile".into(),
                id: user_id,
            }),
        }
    }
}

/// Log `err` and return a generic 500.
pub fn internal_error(context: &str, err: impl std::fmt::Display) -> Response {
    error!(context, error = %err, "Request failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({"error": "Internal server error"})),
    )
        .into_response()
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "paydash"
    }))
}

/// Build the full router: public, auth, onboarding, and dashboard routes
/// behind the onboarding guard.
pub fn app(state: AppState, config: &AppConfig) -> Router {
    let guard = GuardContext {
        sessions: Arc::clone(&state.sessions) as Arc<dyn SessionResolver>,
        db: Arc::clone(&state.db),
        policy: Arc::new(GuardPolicy::new(config.protected_prefixes.clone())),
    };

    Router::new()
        .route("/health", get(health))
        .merge(auth_routes())
        .merge(onboarding_routes())
        .merge(dashboard_routes())
        .with_state(state)
        .layer(from_fn_with_state(guard, route_guard))
        .layer(TraceLayer::new_for_http())
}
