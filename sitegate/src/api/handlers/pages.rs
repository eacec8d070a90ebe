//! Server-rendered pages.
//!
//! Access to each page is settled by the guard layer it is mounted behind;
//! the handlers here only load data and render. The ticket page is the
//! exception: it applies the ownership rule after loading the ticket.

use axum::{
    extract::{OriginalUri, Path, State},
    response::{IntoResponse, Redirect, Response},
};
use minijinja::{Value, context};
use tracing::{debug, instrument};

use crate::{
    AppState,
    api::models::{projects::ProjectResponse, support_tickets::TicketResponse},
    auth::{
        guard::{CurrentSession, MaybeSession, RouteKind, authorize_owner},
        policy::RedirectTarget,
    },
    errors::{Error, PageError},
    types::{ProjectId, TicketId},
};

const SUPPORT_PATH: &str = "/support";
const PROJECTS_PATH: &str = "/admin/projects";

fn page_error(state: &AppState, error: impl Into<Error>) -> PageError {
    PageError::new(error, &state.config.support_email)
}

fn render(state: &AppState, name: &str, ctx: Value) -> Result<Response, PageError> {
    state
        .templates
        .render(name, ctx)
        .map(IntoResponse::into_response)
        .map_err(|e| page_error(state, e))
}

pub async fn home(State(state): State<AppState>, MaybeSession(session): MaybeSession) -> Result<Response, PageError> {
    render(&state, "home.html", context! { title => "Home", session => session })
}

pub async fn account(State(state): State<AppState>, CurrentSession(session): CurrentSession) -> Result<Response, PageError> {
    render(&state, "account.html", context! { title => "Account", session => session })
}

pub async fn community_new(State(state): State<AppState>, CurrentSession(session): CurrentSession) -> Result<Response, PageError> {
    render(&state, "community_new.html", context! { title => "New post", session => session })
}

/// Admins see every ticket, everyone else only their own.
#[instrument(skip_all)]
pub async fn support(State(state): State<AppState>, CurrentSession(session): CurrentSession) -> Result<Response, PageError> {
    let owner = (!session.is_admin()).then_some(session.user.id.as_str());
    let tickets: Vec<TicketResponse> = state
        .tickets
        .list_tickets(owner)
        .await
        .map_err(|e| page_error(&state, e))?
        .into_iter()
        .map(Into::into)
        .collect();

    render(&state, "support.html", context! { title => "Support", session => session, tickets => tickets })
}

#[instrument(skip_all)]
pub async fn ticket(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    OriginalUri(uri): OriginalUri,
    Path(ticket_id): Path<String>,
) -> Result<Response, PageError> {
    let Ok(id) = ticket_id.parse::<TicketId>() else {
        return Ok(Redirect::temporary(SUPPORT_PATH).into_response());
    };

    let Some(ticket) = state.tickets.get_ticket(id).await.map_err(|e| page_error(&state, e))? else {
        debug!("Ticket not found");
        return Ok(Redirect::temporary(SUPPORT_PATH).into_response());
    };

    if let Err(rejection) = authorize_owner(
        &state,
        RouteKind::Page,
        &session,
        &ticket.user_id,
        RedirectTarget::Path(SUPPORT_PATH.to_string()),
        uri.path(),
    ) {
        return Ok(rejection.into_response());
    }

    let ticket = TicketResponse::from(ticket);
    render(
        &state,
        "ticket.html",
        context! { title => ticket.subject.clone(), session => session, ticket => ticket },
    )
}

pub async fn admin(State(state): State<AppState>, CurrentSession(session): CurrentSession) -> Result<Response, PageError> {
    let project_count = state.projects.list_projects().await.map_err(|e| page_error(&state, e))?.len();
    render(
        &state,
        "admin.html",
        context! { title => "Administration", session => session, project_count => project_count },
    )
}

pub async fn projects(State(state): State<AppState>, CurrentSession(session): CurrentSession) -> Result<Response, PageError> {
    let projects: Vec<ProjectResponse> = state
        .projects
        .list_projects()
        .await
        .map_err(|e| page_error(&state, e))?
        .into_iter()
        .map(Into::into)
        .collect();

    render(&state, "projects.html", context! { title => "Projects", session => session, projects => projects })
}

pub async fn project(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Path(project_id): Path<String>,
) -> Result<Response, PageError> {
    let Ok(id) = project_id.parse::<ProjectId>() else {
        return Ok(Redirect::temporary(PROJECTS_PATH).into_response());
    };

    match state.projects.get_project(id).await.map_err(|e| page_error(&state, e))? {
        Some(project) => {
            let project = ProjectResponse::from(project);
            render(
                &state,
                "project.html",
                context! { title => project.title.clone(), session => session, project => project },
            )
        }
        None => Ok(Redirect::temporary(PROJECTS_PATH).into_response()),
    }
}

pub async fn cms(State(state): State<AppState>, CurrentSession(session): CurrentSession) -> Result<Response, PageError> {
    render(&state, "cms.html", context! { title => "Content", session => session })
}
