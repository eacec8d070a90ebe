use axum::{Json, extract::State, http::StatusCode};

use crate::{
    AppState,
    api::models::projects::{ProjectCreate, ProjectResponse},
    auth::guard::CurrentSession,
    db::models::projects::ProjectCreateDBRequest,
    errors::{Error, Result},
};

/// List CMS projects
#[utoipa::path(
    get,
    path = "/admin/projects",
    tag = "projects",
    summary = "List projects",
    responses(
        (status = 200, description = "List of projects", body = Vec<ProjectResponse>),
        (status = 401, description = "Unauthorized", body = crate::api::models::ErrorBody),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_projects(State(state): State<AppState>) -> Result<Json<Vec<ProjectResponse>>> {
    let projects = state.projects.list_projects().await?;
    Ok(Json(projects.into_iter().map(ProjectResponse::from).collect()))
}

/// Create a CMS project
#[utoipa::path(
    post,
    path = "/admin/projects",
    tag = "projects",
    summary = "Create project",
    request_body = ProjectCreate,
    responses(
        (status = 201, description = "Project created", body = ProjectResponse),
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
pub async fn create_project(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Json(create): Json<ProjectCreate>,
) -> Result<(StatusCode, Json<ProjectResponse>)> {
    let title = create.title.trim();
    if title.is_empty() {
        return Err(Error::BadRequest {
            message: "Project title must not be empty".to_string(),
        });
    }

    let request = ProjectCreateDBRequest {
        title: title.to_string(),
        summary: create.summary,
        created_by: session.user.id,
    };
    let project = state.projects.create_project(&request).await?;
    Ok((StatusCode::CREATED, Json(ProjectResponse::from(project))))
}
