//! HTTP surface for role selection and profile completion.

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use serde::Deserialize;
use tracing::warn;

use crate::error::OnboardingError;
use crate::profile::routing::{
    KYC_PATH, PROFILE_COMPLETION_PATH, ROLE_SELECTION_PATH, login_redirect, role_selection_resume,
};
use crate::profile::{ProfileDetails, Role, Subrole};
use crate::server::{AppState, internal_error};

/// Role-selection form fields. Also read from the query string to prefill
/// the form after login.
#[derive(Debug, Default, Deserialize)]
pub struct RoleSelectionForm {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub subrole: Option<String>,
}

/// Map an onboarding failure to a response. `resume` is where an anonymous
/// caller should land after logging in; `input` is echoed back on
/// validation errors so the form can be corrected.
fn onboarding_error_response(
    err: OnboardingError,
    resume: &str,
    input: serde_json::Value,
) -> Response {
    match err {
        OnboardingError::NotAuthenticated => Redirect::to(&login_redirect(resume)).into_response(),
        ref e if e.is_validation() => {
            let mut body = serde_json::json!({ "error": e.to_string() });
            if let (Some(obj), serde_json::Value::Object(fields)) = (body.as_object_mut(), input) {
                obj.extend(fields);
            }
            (StatusCode::UNPROCESSABLE_ENTITY, Json(body)).into_response()
        }
        other => internal_error("onboarding", other),
    }
}

async fn submit(state: &AppState, headers: &HeaderMap, form: &RoleSelectionForm) -> Response {
    let role = form.role.as_deref().unwrap_or_default();
    let subrole = form.subrole.as_deref();

    let user_id = match state.current_user(headers).await {
        Ok(id) => id,
        Err(e) => return internal_error("role selection session", e),
    };

    match state
        .onboarding
        .submit_role_selection(user_id.as_deref(), role, subrole)
        .await
    {
        Ok(next) => Redirect::to(next).into_response(),
        Err(e) => {
            if e.is_validation() {
                warn!(role = %role, subrole = ?subrole, error = %e, "Rejected role selection");
            }
            onboarding_error_response(
                e,
                &role_selection_resume(role, subrole),
                serde_json::json!({ "role": role, "subrole": subrole }),
            )
        }
    }
}

/// GET /onboarding/role-selection
///
/// Returns the form state. `role`/`subrole` query parameters, as carried by
/// the post-login resume target, only prefill the form; saving is always a
/// POST.
async fn role_selection_page(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<RoleSelectionForm>,
) -> Response {
    let profile = match state.current_profile(&headers).await {
        Ok(Some(profile)) => profile,
        Ok(None) => return Redirect::to(&login_redirect(ROLE_SELECTION_PATH)).into_response(),
        Err(e) => return internal_error("role selection page", e),
    };

    let roles: Vec<serde_json::Value> = Role::ALL
        .iter()
        .map(|role| {
            let subroles: Vec<&str> = match role.forced_subrole() {
                Some(forced) => vec![forced.as_str()],
                None => Subrole::ALL.iter().map(Subrole::as_str).collect(),
            };
            serde_json::json!({
                "role": role,
                "subroles": subroles,
                "subrole_selectable": role.forced_subrole().is_none(),
            })
        })
        .collect();

    Json(serde_json::json!({
        "page": "role_selection",
        "roles": roles,
        "current": { "role": profile.role, "subrole": profile.subrole },
        "prefill": { "role": query.role, "subrole": query.subrole },
    }))
    .into_response()
}

/// POST /onboarding/role-selection
async fn role_selection_submit(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<RoleSelectionForm>,
) -> Response {
    submit(&state, &headers, &form).await
}

/// GET /onboarding/complete-profile
async fn completion_page(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let profile = match state.current_profile(&headers).await {
        Ok(Some(profile)) => profile,
        Ok(None) => {
            return Redirect::to(&login_redirect(PROFILE_COMPLETION_PATH)).into_response();
        }
        Err(e) => return internal_error("completion page", e),
    };

    let step = if !profile.profile_completed {
        "details"
    } else if !profile.kyc_verified {
        "kyc"
    } else {
        "done"
    };

    Json(serde_json::json!({
        "page": "complete_profile",
        "step": step,
        "profile": profile,
    }))
    .into_response()
}

/// POST /onboarding/complete-profile
async fn completion_submit(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(details): Form<ProfileDetails>,
) -> Response {
    let user_id = match state.current_user(&headers).await {
        Ok(id) => id,
        Err(e) => return internal_error("completion session", e),
    };

    match state
        .onboarding
        .complete_profile(user_id.as_deref(), &details)
        .await
    {
        Ok(next) => Redirect::to(next).into_response(),
        Err(e) => onboarding_error_response(
            e,
            PROFILE_COMPLETION_PATH,
            serde_json::json!({
                "full_name": details.full_name,
                "country": details.country,
            }),
        ),
    }
}

/// POST /onboarding/complete-profile/kyc
async fn kyc_submit(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let user_id = match state.current_user(&headers).await {
        Ok(id) => id,
        Err(e) => return internal_error("kyc session", e),
    };

    match state.onboarding.verify_kyc(user_id.as_deref()).await {
        Ok(next) => Redirect::to(next).into_response(),
        Err(e) => onboarding_error_response(e, PROFILE_COMPLETION_PATH, serde_json::json!({})),
    }
}

/// Build the onboarding routes.
pub fn onboarding_routes() -> Router<AppState> {
    Router::new()
        .route(
            ROLE_SELECTION_PATH,
            get(role_selection_page).post(role_selection_submit),
        )
        .route(
            PROFILE_COMPLETION_PATH,
            get(completion_page).post(completion_submit),
        )
        .route(KYC_PATH, post(kyc_submit))
}
