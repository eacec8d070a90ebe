//! Database models for support tickets.

use crate::types::{TicketId, UserId};
use chrono::{DateTime, Utc};
use sqlx::FromRow;

#[derive(Debug, Clone)]
pub struct TicketCreateDBRequest {
    pub user_id: UserId,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Clone, FromRow)]
pub struct TicketDBResponse {
    pub id: TicketId,
    /// Owner of the ticket
    pub user_id: UserId,
    pub subject: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}
