//! Database repository for CMS projects.

use crate::db::{
    errors::Result,
    models::projects::{ProjectCreateDBRequest, ProjectDBResponse},
};
use crate::types::ProjectId;
use sqlx::PgConnection;
use tracing::instrument;
use uuid::Uuid;

pub struct Projects<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Projects<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self, request), fields(title = %request.title), err)]
    pub async fn create(&mut self, request: &ProjectCreateDBRequest) -> Result<ProjectDBResponse> {
        let project = sqlx::query_as::<_, ProjectDBResponse>(
            "INSERT INTO projects (id, title, summary, created_by)
             VALUES ($1, $2, $3, $4)
             RETURNING id, title, summary, created_by, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(&request.title)
        .bind(&request.summary)
        .bind(&request.created_by)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(project)
    }

    #[instrument(skip(self), err)]
    pub async fn get_by_id(&mut self, id: ProjectId) -> Result<Option<ProjectDBResponse>> {
        let project = sqlx::query_as::<_, ProjectDBResponse>(
            "SELECT id, title, summary, created_by, created_at FROM projects WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(project)
    }

    #[instrument(skip(self), err)]
    pub async fn list(&mut self) -> Result<Vec<ProjectDBResponse>> {
        let projects = sqlx::query_as::<_, ProjectDBResponse>(
            "SELECT id, title, summary, created_by, created_at FROM projects ORDER BY created_at DESC",
        )
        .fetch_all(&mut *self.db)
        .await?;

        Ok(projects)
    }
}
