//! API request/response models.

pub mod auth;
pub mod projects;
pub mod support_tickets;

use serde::Serialize;
use utoipa::ToSchema;

/// Body of every JSON error response
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
}
