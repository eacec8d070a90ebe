//! Route guard: the single place where a request is checked before any handler runs.
//!
//! Every protected route is wrapped in [`guard`] middleware parameterized by a
//! [`RouteGuard`]. Per request the guard moves from [`Unchecked`] to
//! [`Checked`] and then either lets the request through or terminates it:
//!
//! - page routes answer a denial with `307 Temporary Redirect`;
//! - API routes answer any denial with `401 {"error": "Unauthorized"}`.
//!
//! Failing to resolve the session is not a denial. It is returned as a
//! server error (the failure page for pages, a 500 JSON body for the API).
//!
//! The resolved session is cached in the request extensions, so stacking
//! guards (an authenticated section with an admin-only sub-route) costs one
//! store read while every layer still evaluates its own requirement.

use axum::{
    Json,
    extract::{FromRequestParts, OriginalUri, Request, State},
    http::{HeaderMap, StatusCode, request::Parts},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use serde_json::json;
use tracing::{debug, info, instrument};

use crate::{
    AppState,
    auth::{
        identity::Session,
        policy::{Decision, PagePolicy, RedirectTarget, Requirement},
    },
    errors::{Error, PageError},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteKind {
    Page,
    Api,
}

/// How a route is protected.
#[derive(Clone)]
pub struct RouteGuard {
    pub app: AppState,
    pub kind: RouteKind,
    pub policy: PagePolicy,
}

impl RouteGuard {
    pub fn page(app: &AppState, policy: PagePolicy) -> Self {
        Self {
            app: app.clone(),
            kind: RouteKind::Page,
            policy,
        }
    }

    /// API routes only need the requirement; their denials are never redirects
    pub fn api(app: &AppState, requirement: Requirement) -> Self {
        Self {
            app: app.clone(),
            kind: RouteKind::Api,
            policy: PagePolicy {
                requirement,
                ..PagePolicy::public()
            },
        }
    }
}

/// Why a guarded request did not reach its handler.
#[derive(Debug)]
pub enum GuardRejection {
    Redirect(String),
    Unauthorized,
    PageFailure(PageError),
    ApiFailure(Error),
}

impl IntoResponse for GuardRejection {
    fn into_response(self) -> Response {
        match self {
            GuardRejection::Redirect(target) => Redirect::temporary(&target).into_response(),
            GuardRejection::Unauthorized => (StatusCode::UNAUTHORIZED, Json(json!({ "error": "Unauthorized" }))).into_response(),
            GuardRejection::PageFailure(e) => e.into_response(),
            GuardRejection::ApiFailure(e) => e.into_response(),
        }
    }
}

impl GuardRejection {
    fn failure(app: &AppState, kind: RouteKind, error: Error) -> Self {
        match kind {
            RouteKind::Page => GuardRejection::PageFailure(PageError::new(error, &app.config.support_email)),
            RouteKind::Api => GuardRejection::ApiFailure(error),
        }
    }
}

/// Session resolved by the first guard of a request
#[derive(Debug, Clone)]
pub struct ResolvedSession(pub Option<Session>);

/// A request that has not been evaluated yet.
pub struct Unchecked<'a> {
    app: &'a AppState,
    kind: RouteKind,
    policy: &'a PagePolicy,
    requested_path: String,
}

/// A request with a decision attached.
#[derive(Debug)]
pub struct Checked {
    pub kind: RouteKind,
    pub session: Option<Session>,
    pub decision: Decision,
}

impl<'a> Unchecked<'a> {
    pub fn new(app: &'a AppState, kind: RouteKind, policy: &'a PagePolicy, requested_path: impl Into<String>) -> Self {
        Self {
            app,
            kind,
            policy,
            requested_path: requested_path.into(),
        }
    }

    /// Resolve the session (unless an outer guard already did) and evaluate the policy.
    pub async fn check(self, headers: &HeaderMap, resolved: Option<ResolvedSession>) -> Result<Checked, GuardRejection> {
        let session = match resolved {
            Some(ResolvedSession(session)) => session,
            None => self
                .app
                .identity
                .get_session(headers)
                .await
                .map_err(|e| GuardRejection::failure(self.app, self.kind, e))?,
        };

        let decision = self.app.policy.evaluate_page(session.as_ref(), self.policy, &self.requested_path);
        Ok(Checked {
            kind: self.kind,
            session,
            decision,
        })
    }
}

impl Checked {
    /// Terminate denied requests; hand the session on for allowed ones.
    pub fn enforce(self) -> Result<Option<Session>, GuardRejection> {
        match self.decision {
            Decision::Allow => Ok(self.session),
            Decision::Deny { reason, redirect } => {
                info!(?reason, kind = ?self.kind, "Request denied");
                match (self.kind, redirect) {
                    (RouteKind::Page, Some(target)) => Err(GuardRejection::Redirect(target)),
                    _ => Err(GuardRejection::Unauthorized),
                }
            }
        }
    }
}

fn requested_path(request: &Request) -> String {
    // Nested routers see a stripped URI; the original one is what the user asked for
    let uri = request
        .extensions()
        .get::<OriginalUri>()
        .map(|OriginalUri(uri)| uri)
        .unwrap_or_else(|| request.uri());
    uri.path_and_query().map(|pq| pq.as_str().to_string()).unwrap_or_else(|| uri.path().to_string())
}

/// Guard middleware, installed with `from_fn_with_state(RouteGuard::..., guard)`.
#[instrument(skip_all, fields(path = %request.uri().path(), requirement = ?route.policy.requirement))]
pub async fn guard(State(route): State<RouteGuard>, mut request: Request, next: Next) -> Response {
    let path = requested_path(&request);
    let resolved = request.extensions().get::<ResolvedSession>().cloned();

    let checked = match Unchecked::new(&route.app, route.kind, &route.policy, path)
        .check(request.headers(), resolved)
        .await
    {
        Ok(checked) => checked,
        Err(rejection) => return rejection.into_response(),
    };

    match checked.enforce() {
        Ok(session) => {
            debug!(authenticated = session.is_some(), "Request allowed");
            request.extensions_mut().insert(ResolvedSession(session));
            next.run(request).await
        }
        Err(rejection) => rejection.into_response(),
    }
}

/// Apply an ownership requirement once the owner of a resource is known.
pub fn authorize_owner(
    app: &AppState,
    kind: RouteKind,
    session: &Session,
    owner: &str,
    on_forbidden: RedirectTarget,
    requested_path: &str,
) -> Result<(), GuardRejection> {
    let policy = PagePolicy {
        requirement: Requirement::OwnerOrAdmin(owner.to_string()),
        ..PagePolicy::authenticated()
    }
    .on_forbidden(on_forbidden);

    Checked {
        kind,
        session: Some(session.clone()),
        decision: app.policy.evaluate_page(Some(session), &policy, requested_path),
    }
    .enforce()
    .map(|_| ())
}

/// The session of a request that passed an authenticating guard.
#[derive(Debug, Clone)]
pub struct CurrentSession(pub Session);

impl<S: Send + Sync> FromRequestParts<S> for CurrentSession {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match parts.extensions.get::<ResolvedSession>() {
            Some(ResolvedSession(Some(session))) => Ok(CurrentSession(session.clone())),
            _ => Err(Error::Unauthenticated { message: None }),
        }
    }
}

/// The session of a request behind a public guard, if the visitor is logged in.
#[derive(Debug, Clone)]
pub struct MaybeSession(pub Option<Session>);

impl<S: Send + Sync> FromRequestParts<S> for MaybeSession {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeSession(
            parts.extensions.get::<ResolvedSession>().and_then(|ResolvedSession(s)| s.clone()),
        ))
    }
}
