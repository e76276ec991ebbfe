//! Mock accounts: sign-up, login, and logout without credentials.
//!
//! An email address is all it takes to get a session. Account creation
//! also creates the user's empty profile.

use axum::extract::{Query, State};
use axum::http::header::SET_COOKIE;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use serde::Deserialize;
use tracing::info;

use crate::error::{AuthError, DatabaseError};
use crate::profile::User;
use crate::profile::routing::{LOGIN_PATH, ROLE_SELECTION_PATH, is_local_path, landing_path};
use crate::server::{AppState, internal_error};

#[derive(Debug, Deserialize)]
pub struct AuthForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub next: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LoginQuery {
    next: Option<String>,
}

/// Trim and lowercase an email; reject anything without a local part and
/// a domain.
pub fn normalize_email(raw: &str) -> Result<String, AuthError> {
    let email = raw.trim().to_ascii_lowercase();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') && !domain.contains('@') => {
            Ok(email)
        }
        _ => Err(AuthError::InvalidEmail(raw.to_string())),
    }
}

/// The `next` value if it is a safe local path.
fn safe_next(next: Option<&str>) -> Option<&str> {
    next.filter(|n| is_local_path(n))
}

async fn create_account(state: &AppState, raw_email: &str) -> Result<User, AuthError> {
    let email = normalize_email(raw_email)?;
    match state.db.create_user(&email).await {
        Ok(user) => Ok(user),
        Err(DatabaseError::Constraint(_)) => Err(AuthError::EmailTaken(email)),
        Err(e) => Err(e.into()),
    }
}

async fn find_account(state: &AppState, raw_email: &str) -> Result<User, AuthError> {
    let email = normalize_email(raw_email)?;
    state
        .db
        .get_user_by_email(&email)
        .await?
        .ok_or(AuthError::UnknownAccount(email))
}

fn auth_error_response(err: AuthError, form: &AuthForm) -> Response {
    let status = match err {
        AuthError::InvalidEmail(_) => StatusCode::UNPROCESSABLE_ENTITY,
        AuthError::EmailTaken(_) => StatusCode::CONFLICT,
        AuthError::UnknownAccount(_) => StatusCode::UNAUTHORIZED,
        AuthError::Database(e) => return internal_error("auth", e),
    };
    (
        status,
        Json(serde_json::json!({
            "error": err.to_string(),
            "email": form.email,
            "next": form.next,
        })),
    )
        .into_response()
}

/// Start a session and redirect to `to`.
async fn sign_in(state: &AppState, user: &User, to: &str) -> Response {
    match state.sessions.start(&user.id).await {
        Ok(cookie) => ([(SET_COOKIE, cookie)], Redirect::to(to)).into_response(),
        Err(e) => internal_error("session start", e),
    }
}

/// GET /login
///
/// Signed-in users never get here; the guard bounces them to their landing.
async fn login_page(Query(query): Query<LoginQuery>) -> impl IntoResponse {
    Json(serde_json::json!({
        "page": "login",
        "next": safe_next(query.next.as_deref()),
    }))
}

/// POST /signup
async fn signup(State(state): State<AppState>, Form(form): Form<AuthForm>) -> Response {
    let user = match create_account(&state, &form.email).await {
        Ok(user) => user,
        Err(e) => return auth_error_response(e, &form),
    };
    info!(user_id = %user.id, "Account created");

    let to = safe_next(form.next.as_deref()).unwrap_or(ROLE_SELECTION_PATH);
    sign_in(&state, &user, to).await
}

/// POST /login
async fn login(State(state): State<AppState>, Form(form): Form<AuthForm>) -> Response {
    let user = match find_account(&state, &form.email).await {
        Ok(user) => user,
        Err(e) => return auth_error_response(e, &form),
    };

    let landing = match state.db.get_profile(&user.id).await {
        Ok(Some(profile)) => landing_path(&profile),
        Ok(None) => {
            return internal_error(
                "login",
                DatabaseError::NotFound {
                    entity: "profile".into(),
                    id: user.id,
                },
            );
        }
        Err(e) => return internal_error("login", e),
    };

    info!(user_id = %user.id, "Logged in");
    let to = safe_next(form.next.as_deref()).unwrap_or(landing);
    sign_in(&state, &user, to).await
}

/// POST /logout
async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    match state.sessions.end(&headers).await {
        Ok(cookie) => ([(SET_COOKIE, cookie)], Redirect::to("/")).into_response(),
        Err(e) => internal_error("logout", e),
    }
}

/// Build the account routes.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route(LOGIN_PATH, get(login_page).post(login))
        .route("/signup", post(signup))
        .route("/logout", post(logout))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_normalization() {
        assert_eq!(normalize_email("  Ada@Example.COM ").unwrap(), "ada@example.com");
        for bad in ["", "ada", "@example.com", "ada@", "ada@example", "a@b@c.d"] {
            assert!(
                matches!(normalize_email(bad), Err(AuthError::InvalidEmail(_))),
                "{bad:?}"
            );
        }
    }

    #[test]
    fn next_must_be_local() {
        assert_eq!(safe_next(Some("/wallet")), Some("/wallet"));
        assert_eq!(safe_next(Some("//evil.example")), None);
        assert_eq!(safe_next(Some("https://evil.example")), None);
        assert_eq!(safe_next(Some("/wallet\nX")), None);
        assert_eq!(safe_next(None), None);
    }
}
