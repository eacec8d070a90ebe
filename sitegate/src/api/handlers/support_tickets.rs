use axum::{
    Json,
    extract::{OriginalUri, Path, State},
    http::StatusCode,
};

use crate::{
    AppState,
    api::models::support_tickets::{TicketCreate, TicketResponse},
    auth::{
        guard::{CurrentSession, GuardRejection, RouteKind, authorize_owner},
        policy::RedirectTarget,
    },
    db::models::support_tickets::TicketCreateDBRequest,
    errors::{Error, Result},
    types::TicketId,
};

/// List support tickets visible to the caller
#[utoipa::path(
    get,
    path = "/support/tickets",
    tag = "support",
    summary = "List support tickets",
    description = "Admins receive every ticket; other users only their own.",
    responses(
        (status = 200, description = "List of tickets", body = Vec<TicketResponse>),
        (status = 401, description = "Unauthorized", body = crate::api::models::ErrorBody),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_tickets(State(state): State<AppState>, CurrentSession(session): CurrentSession) -> Result<Json<Vec<TicketResponse>>> {
    let owner = (!session.is_admin()).then_some(session.user.id.as_str());
    let tickets = state.tickets.list_tickets(owner).await?;
    Ok(Json(tickets.into_iter().map(TicketResponse::from).collect()))
}

/// Open a support ticket
#[utoipa::path(
    post,
    path = "/support/tickets",
    tag = "support",
    summary = "Create support ticket",
    request_body = TicketCreate,
    responses(
        (status = 201, description = "Ticket created", body = TicketResponse),
        (status = 400, description = "Invalid request", body = crate::api::models::ErrorBody),
        (status = 401, description = "Unauthorized", body = crate::api::models::ErrorBody),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn create_ticket(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Json(create): Json<TicketCreate>,
) -> Result<(StatusCode, Json<TicketResponse>)> {
    if create.subject.trim().is_empty() || create.body.trim().is_empty() {
        return Err(Error::BadRequest {
            message: "Subject and body are required".to_string(),
        });
    }

    let request = TicketCreateDBRequest {
        user_id: session.user.id,
        subject: create.subject.trim().to_string(),
        body: create.body,
    };
    let ticket = state.tickets.create_ticket(&request).await?;
    Ok((StatusCode::CREATED, Json(TicketResponse::from(ticket))))
}

/// Get a single support ticket
#[utoipa::path(
    get,
    path = "/support/tickets/{ticket_id}",
    tag = "support",
    summary = "Get support ticket",
    responses(
        (status = 200, description = "Ticket details", body = TicketResponse),
        (status = 401, description = "Unauthorized, or the ticket is missing or belongs to someone else", body = crate::api::models::ErrorBody),
        (status = 404, description = "Ticket not found (admins only)", body = crate::api::models::ErrorBody),
        (status = 500, description = "Internal server error")
    ),
    params(
        ("ticket_id" = uuid::Uuid, Path, description = "Ticket ID")
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_ticket(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    OriginalUri(uri): OriginalUri,
    Path(ticket_id): Path<TicketId>,
) -> std::result::Result<Json<TicketResponse>, GuardRejection> {
    let ticket = state
        .tickets
        .get_ticket(ticket_id)
        .await
        .map_err(|e| GuardRejection::ApiFailure(e.into()))?;

    // Only admins may learn that an id does not exist; everyone else gets the
    // same answer as for a ticket they do not own
    let Some(ticket) = ticket else {
        return Err(if session.is_admin() {
            GuardRejection::ApiFailure(Error::NotFound {
                resource: "Ticket".to_string(),
                id: ticket_id.to_string(),
            })
        } else {
            GuardRejection::Unauthorized
        });
    };

    // API denials never redirect, so the forbidden target is irrelevant here
    authorize_owner(&state, RouteKind::Api, &session, &ticket.user_id, RedirectTarget::Home, uri.path())?;

    Ok(Json(TicketResponse::from(ticket)))
}
