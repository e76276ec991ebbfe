//! Route guard: redirects anonymous and half-onboarded users.
//!
//! `evaluate` is the pure decision over (state, path). `route_guard` is the
//! axum middleware that looks the state up and applies the decision. Lookup
//! failures let the request through and are logged.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::{HeaderMap, Method};
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use tracing::{debug, error};

use crate::error::DatabaseError;
use crate::profile::routing::{
    self, LOGIN_PATH, PROFILE_COMPLETION_PATH, ROLE_SELECTION_PATH, is_onboarding_path,
};
use crate::profile::{Profile, requires_completion, resolve_dashboard_path};
use crate::session::SessionResolver;
use crate::store::Database;

/// Where a request's user stands in onboarding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardState {
    Unauthenticated,
    NeedsRoleSelection,
    NeedsProfileCompletion,
    /// Fully onboarded; carries the resolved dashboard path.
    Onboarded { dashboard: &'static str },
}

impl GuardState {
    pub fn from_profile(profile: &Profile) -> Self {
        if profile.role.is_none() {
            Self::NeedsRoleSelection
        } else if requires_completion(profile) {
            Self::NeedsProfileCompletion
        } else {
            Self::Onboarded {
                dashboard: resolve_dashboard_path(profile.role, profile.subrole),
            }
        }
    }

    /// Where this user should be sent from the login page.
    pub fn landing(&self) -> Option<&'static str> {
        match *self {
            Self::Unauthenticated => None,
            Self::NeedsRoleSelection => Some(ROLE_SELECTION_PATH),
            Self::NeedsProfileCompletion => Some(PROFILE_COMPLETION_PATH),
            Self::Onboarded { dashboard } => Some(dashboard),
        }
    }
}

/// Outcome of a guard evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    Redirect(String),
}

/// Which paths the guard enforces.
#[derive(Debug, Clone)]
pub struct GuardPolicy {
    protected_prefixes: Vec<String>,
}

impl GuardPolicy {
    pub fn new(protected_prefixes: Vec<String>) -> Self {
        Self { protected_prefixes }
    }

    pub fn is_protected(&self, path: &str) -> bool {
        self.protected_prefixes
            .iter()
            .any(|prefix| routing::is_under(path, prefix))
    }

    /// Whether evaluating `path` needs the caller's state at all.
    pub fn applies_to(&self, path: &str) -> bool {
        path == LOGIN_PATH || self.is_protected(path)
    }

    /// Decide what to do with a request for `path`. `target` is the full
    /// path-and-query used as the post-login resume target.
    pub fn evaluate(&self, state: GuardState, path: &str, target: &str) -> GuardDecision {
        if let GuardState::Unauthenticated = state {
            return if self.is_protected(path) {
                GuardDecision::Redirect(routing::login_redirect(target))
            } else {
                GuardDecision::Allow
            };
        }

        if path == LOGIN_PATH {
            return match state.landing() {
                Some(landing) => GuardDecision::Redirect(landing.to_string()),
                None => GuardDecision::Allow,
            };
        }

        if !self.is_protected(path) {
            return GuardDecision::Allow;
        }

        match state {
            GuardState::NeedsRoleSelection if !is_onboarding_path(path) => {
                GuardDecision::Redirect(ROLE_SELECTION_PATH.to_string())
            }
            // The completion screens live under /onboarding, so one check
            // covers both exemptions.
            GuardState::NeedsProfileCompletion if !is_onboarding_path(path) => {
                GuardDecision::Redirect(PROFILE_COMPLETION_PATH.to_string())
            }
            _ => GuardDecision::Allow,
        }
    }
}

/// Everything the middleware needs to look up a request's state.
#[derive(Clone)]
pub struct GuardContext {
    pub sessions: Arc<dyn SessionResolver>,
    pub db: Arc<dyn Database>,
    pub policy: Arc<GuardPolicy>,
}

impl GuardContext {
    /// Resolve the caller's onboarding state from the request headers.
    pub async fn lookup(&self, headers: &HeaderMap) -> Result<GuardState, DatabaseError> {
        let Some(user_id) = self.sessions.current_user_id(headers).await? else {
            return Ok(GuardState::Unauthenticated);
        };
        let profile = self
            .db
            .get_profile(&user_id)
            .await?
            .ok_or_else(|| DatabaseError::NotFound {
                entity: "profile".into(),
                id: user_id.clone(),
            })?;
        Ok(GuardState::from_profile(&profile))
    }
}

fn is_navigation(method: &Method) -> bool {
    *method == Method::GET || *method == Method::HEAD
}

/// axum middleware enforcing the onboarding gate.
pub async fn route_guard(State(ctx): State<GuardContext>, req: Request, next: Next) -> Response {
    let path = req.uri().path().to_string();
    if !ctx.policy.applies_to(&path) {
        return next.run(req).await;
    }

    let target = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| path.clone());

    let state = match ctx.lookup(req.headers()).await {
        Ok(state) => state,
        Err(e) => {
            error!(path = %path, error = %e, "Route guard lookup failed, allowing request");
            return next.run(req).await;
        }
    };

    // Form posts from anonymous callers, and login posts from anyone, reach
    // their handler. Anonymous posts are rejected there with the submitted
    // fields kept in the resume target.
    if !is_navigation(req.method()) && (state == GuardState::Unauthenticated || path == LOGIN_PATH)
    {
        return next.run(req).await;
    }

    match ctx.policy.evaluate(state, &path, &target) {
        GuardDecision::Allow => next.run(req).await,
        GuardDecision::Redirect(to) => {
            debug!(path = %path, state = ?state, redirect = %to, "Route guard redirect");
            Redirect::temporary(&to).into_response()
        }
    }
}
