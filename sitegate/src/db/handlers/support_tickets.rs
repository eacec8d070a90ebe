//! Database repository for support tickets.

use crate::db::{
    errors::Result,
    models::support_tickets::{TicketCreateDBRequest, TicketDBResponse},
};
use crate::types::{TicketId, abbrev_id};
use sqlx::PgConnection;
use tracing::instrument;
use uuid::Uuid;

pub struct SupportTickets<'c> {
    db: &'c mut PgConnection,
}

impl<'c> SupportTickets<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self, request), fields(user_id = %abbrev_id(&request.user_id)), err)]
    pub async fn create(&mut self, request: &TicketCreateDBRequest) -> Result<TicketDBResponse> {
        let ticket = sqlx::query_as::<_, TicketDBResponse>(
            "INSERT INTO support_tickets (id, user_id, subject, body)
             VALUES ($1, $2, $3, $4)
             RETURNING id, user_id, subject, body, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(&request.user_id)
        .bind(&request.subject)
        .bind(&request.body)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(ticket)
    }

    #[instrument(skip(self), err)]
    pub async fn get_by_id(&mut self, id: TicketId) -> Result<Option<TicketDBResponse>> {
        let ticket = sqlx::query_as::<_, TicketDBResponse>(
            "SELECT id, user_id, subject, body, created_at FROM support_tickets WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(ticket)
    }

    /// List tickets, optionally restricted to a single owner
    #[instrument(skip(self), err)]
    pub async fn list(&mut self, owner: Option<&str>) -> Result<Vec<TicketDBResponse>> {
        let tickets = sqlx::query_as::<_, TicketDBResponse>(
            "SELECT id, user_id, subject, body, created_at FROM support_tickets
             WHERE ($1::TEXT IS NULL OR user_id = $1)
             ORDER BY created_at DESC",
        )
        .bind(owner)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(tickets)
    }
}
