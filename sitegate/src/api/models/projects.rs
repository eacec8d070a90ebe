use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    db::models::projects::ProjectDBResponse,
    types::{ProjectId, UserId},
};

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ProjectCreate {
    pub title: String,
    pub summary: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProjectResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: ProjectId,
    pub title: String,
    pub summary: Option<String>,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
}

impl From<ProjectDBResponse> for ProjectResponse {
    fn from(db: ProjectDBResponse) -> Self {
        Self {
            id: db.id,
            title: db.title,
            summary: db.summary,
            created_by: db.created_by,
            created_at: db.created_at,
        }
    }
}
