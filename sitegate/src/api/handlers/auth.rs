//! Sign-in and sign-out.
//!
//! These are plain form posts answered with `303 See Other`, so the browser
//! always lands on a page with a `GET`.

use axum::{
    Form,
    extract::{Query, State},
    http::header,
    response::{AppendHeaders, IntoResponse, Redirect, Response},
};
use minijinja::context;
use tracing::{info, instrument};

use crate::{
    AppState,
    api::models::auth::{LoginForm, LoginQuery},
    auth::{guard::MaybeSession, session},
    errors::PageError,
    types::abbrev_id,
};

/// Only same-site absolute paths may be used as a post-login destination.
///
/// Browsers drop tabs and newlines while parsing a URL, so a path carrying
/// whitespace or control characters is refused outright rather than inspected.
pub fn sanitize_callback(raw: Option<&str>, home: &str) -> String {
    match raw {
        Some(path)
            if path.starts_with('/')
                && !path.starts_with("//")
                && !path.starts_with("/\\")
                && !path.chars().any(|c| c.is_control() || c.is_whitespace()) =>
        {
            path.to_string()
        }
        _ => home.to_string(),
    }
}

#[instrument(skip_all)]
pub async fn login_page(
    State(state): State<AppState>,
    MaybeSession(session): MaybeSession,
    Query(query): Query<LoginQuery>,
) -> Result<Response, PageError> {
    let callback_url = sanitize_callback(query.callback_url.as_deref(), state.policy.home_path());

    state
        .templates
        .render(
            "login.html",
            context! {
                title => "Sign in",
                session => session,
                callback_url => callback_url,
                error => query.error,
            },
        )
        .map(IntoResponse::into_response)
        .map_err(|e| PageError::new(e, &state.config.support_email))
}

#[instrument(skip_all, fields(email = %form.email))]
pub async fn login(State(state): State<AppState>, Form(form): Form<LoginForm>) -> Result<Response, PageError> {
    let callback_url = sanitize_callback(form.callback_url.as_deref(), state.policy.home_path());

    let user = state
        .identity
        .authenticate(&form.email, &form.password)
        .await
        .map_err(|e| PageError::new(e, &state.config.support_email))?;

    let Some(user) = user else {
        info!("Rejected sign-in attempt");
        let target = format!(
            "{}?error=CredentialsSignin&callbackUrl={}",
            state.policy.login_path(),
            urlencoding::encode(&callback_url)
        );
        return Ok(Redirect::to(&target).into_response());
    };

    let token = state
        .identity
        .issue_token(&user)
        .map_err(|e| PageError::new(e, &state.config.support_email))?;
    info!(user_id = %abbrev_id(&user.id), "User signed in");

    let cookie = session::session_cookie(&token, &state.config);
    Ok((AppendHeaders([(header::SET_COOKIE, cookie)]), Redirect::to(&callback_url)).into_response())
}

#[instrument(skip_all)]
pub async fn logout(State(state): State<AppState>) -> Response {
    let cookie = session::clear_session_cookie(&state.config);
    (AppendHeaders([(header::SET_COOKIE, cookie)]), Redirect::to(state.policy.home_path())).into_response()
}
