use axum::Json;

use crate::auth::{guard::MaybeSession, identity::Session};

/// Get the current session
#[utoipa::path(
    get,
    path = "/session",
    tag = "session",
    summary = "Get current session",
    responses(
        (status = 200, description = "The current session, or null when signed out", body = Session),
        (status = 500, description = "Internal server error")
    ),
    security(
        (),
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_session(MaybeSession(session): MaybeSession) -> Json<Option<Session>> {
    Json(session)
}
