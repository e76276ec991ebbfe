//! Dashboard endpoints: landing redirect, per-role dashboards, wallet, and
//! the profile API.

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::{Json, Router};

use crate::error::DatabaseError;
use crate::profile::routing::{DASHBOARD_ROOT, login_redirect};
use crate::profile::{Dashboard, Profile, landing_path, resolve_dashboard_path};
use crate::server::{AppState, internal_error};

/// Human title for a dashboard view.
pub fn dashboard_title(dashboard: Dashboard) -> &'static str {
    match dashboard {
        Dashboard::FreelancerSender => "Freelancer payouts",
        Dashboard::FreelancerReceiver => "Freelancer earnings",
        Dashboard::ContractorSender => "Contractor payments",
        Dashboard::ContractorReceiver => "Contractor invoices",
        Dashboard::EmployeeReceiver => "Payroll",
        Dashboard::EmployerSender => "Team payroll",
        Dashboard::DaoAdmin => "DAO treasury",
        Dashboard::DaoContributor => "DAO contributions",
    }
}

/// Load the caller's profile or produce the response to send instead.
async fn require_profile(
    state: &AppState,
    headers: &HeaderMap,
    here: &str,
) -> Result<Profile, Response> {
    match state.current_profile(headers).await {
        Ok(Some(profile)) => Ok(profile),
        Ok(None) => Err(Redirect::to(&login_redirect(here)).into_response()),
        Err(e) => Err(internal_error("dashboard profile", e)),
    }
}

/// GET /dashboard
///
/// Sends the user to wherever they belong: role selection, completion, or
/// their own dashboard.
async fn landing(State(state): State<AppState>, headers: HeaderMap) -> Response {
    match require_profile(&state, &headers, DASHBOARD_ROOT).await {
        Ok(profile) => Redirect::to(landing_path(&profile)).into_response(),
        Err(resp) => resp,
    }
}

/// GET /dashboard/{role}/{view}
async fn dashboard_view(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((role, view)): Path<(String, String)>,
) -> Response {
    let Some(dashboard) = Dashboard::from_segments(&role, &view) else {
        return (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({"error": "No such dashboard"})),
        )
            .into_response();
    };

    let profile = match require_profile(&state, &headers, dashboard.path()).await {
        Ok(profile) => profile,
        Err(resp) => return resp,
    };

    Json(serde_json::json!({
        "dashboard": dashboard.path(),
        "title": dashboard_title(dashboard),
        "role": dashboard.role(),
        "subrole": dashboard.subrole(),
        "home": resolve_dashboard_path(profile.role, profile.subrole),
        "is_home": resolve_dashboard_path(profile.role, profile.subrole) == dashboard.path(),
    }))
    .into_response()
}

/// GET /wallet
async fn wallet(State(state): State<AppState>, headers: HeaderMap) -> Response {
    match require_profile(&state, &headers, "/wallet").await {
        Ok(profile) => Json(serde_json::json!({
            "user_id": profile.user_id,
            "role": profile.role,
            "subrole": profile.subrole,
            "balances": [],
        }))
        .into_response(),
        Err(resp) => resp,
    }
}

/// GET /api/profile
async fn profile_api(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let profile = match state.current_profile(&headers).await {
        Ok(Some(profile)) => profile,
        Ok(None) => {
            return (
                StatusCode::UNAUTHORIZED,
                Json(serde_json::json!({"error": "Not authenticated"})),
            )
                .into_response();
        }
        Err(e) => return internal_error("profile api", e),
    };

    let user = match state.db.get_user(&profile.user_id).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            return internal_error(
                "profile api",
                DatabaseError::NotFound {
                    entity: "user".into(),
                    id: profile.user_id,
                },
            );
        }
        Err(e) => return internal_error("profile api", e),
    };

    Json(serde_json::json!({
        "email": user.email,
        "profile": profile,
        "landing": landing_path(&profile),
    }))
    .into_response()
}

/// Build the dashboard routes.
pub fn dashboard_routes() -> Router<AppState> {
    Router::new()
        .route(DASHBOARD_ROOT, get(landing))
        .route("/dashboard/{role}/{view}", get(dashboard_view))
        .route("/wallet", get(wallet))
        .route("/api/profile", get(profile_api))
}
