use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    db::models::support_tickets::TicketDBResponse,
    types::{TicketId, UserId},
};

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct TicketCreate {
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TicketResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: TicketId,
    /// Owner of the ticket
    pub user_id: UserId,
    pub subject: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

impl From<TicketDBResponse> for TicketResponse {
    fn from(db: TicketDBResponse) -> Self {
        Self {
            id: db.id,
            user_id: db.user_id,
            subject: db.subject,
            body: db.body,
            created_at: db.created_at,
        }
    }
}
