//! Database models for CMS projects.

use crate::types::{ProjectId, UserId};
use chrono::{DateTime, Utc};
use sqlx::FromRow;

#[derive(Debug, Clone)]
pub struct ProjectCreateDBRequest {
    pub title: String,
    pub summary: Option<String>,
    pub created_by: UserId,
}

#[derive(Debug, Clone, FromRow)]
pub struct ProjectDBResponse {
    pub id: ProjectId,
    pub title: String,
    pub summary: Option<String>,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
}
