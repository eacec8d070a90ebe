//! Storage seams injected into the application state.
//!
//! Handlers and the identity provider never touch a pool directly: they hold an
//! `Arc<dyn ...Store>` built once at startup. [`PgStore`] is the production
//! implementation; tests swap in an in-memory one.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::db::{
    errors::Result,
    handlers::{Projects, SupportTickets, Users},
    models::{
        projects::{ProjectCreateDBRequest, ProjectDBResponse},
        support_tickets::{TicketCreateDBRequest, TicketDBResponse},
        users::UserDBResponse,
    },
};
use crate::types::{ProjectId, TicketId};

/// Persisted user records backing the identity provider.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_user_by_id(&self, id: &str) -> Result<Option<UserDBResponse>>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserDBResponse>>;
}

#[async_trait]
pub trait ProjectStore: Send + Sync {
    async fn list_projects(&self) -> Result<Vec<ProjectDBResponse>>;
    async fn get_project(&self, id: ProjectId) -> Result<Option<ProjectDBResponse>>;
    async fn create_project(&self, request: &ProjectCreateDBRequest) -> Result<ProjectDBResponse>;
}

#[async_trait]
pub trait TicketStore: Send + Sync {
    /// `owner = None` lists every ticket
    async fn list_tickets(&self, owner: Option<&str>) -> Result<Vec<TicketDBResponse>>;
    async fn get_ticket(&self, id: TicketId) -> Result<Option<TicketDBResponse>>;
    async fn create_ticket(&self, request: &TicketCreateDBRequest) -> Result<TicketDBResponse>;
}

/// Postgres-backed implementation of every store.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn find_user_by_id(&self, id: &str) -> Result<Option<UserDBResponse>> {
        let mut conn = self.pool.acquire().await?;
        Users::new(&mut conn).get_by_id(id).await
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserDBResponse>> {
        let mut conn = self.pool.acquire().await?;
        Users::new(&mut conn).get_user_by_email(email).await
    }
}

#[async_trait]
impl ProjectStore for PgStore {
    async fn list_projects(&self) -> Result<Vec<ProjectDBResponse>> {
        let mut conn = self.pool.acquire().await?;
        Projects::new(&mut conn).list().await
    }

    async fn get_project(&self, id: ProjectId) -> Result<Option<ProjectDBResponse>> {
        let mut conn = self.pool.acquire().await?;
        Projects::new(&mut conn).get_by_id(id).await
    }

    async fn create_project(&self, request: &ProjectCreateDBRequest) -> Result<ProjectDBResponse> {
        let mut conn = self.pool.acquire().await?;
        Projects::new(&mut conn).create(request).await
    }
}

#[async_trait]
impl TicketStore for PgStore {
    async fn list_tickets(&self, owner: Option<&str>) -> Result<Vec<TicketDBResponse>> {
        let mut conn = self.pool.acquire().await?;
        SupportTickets::new(&mut conn).list(owner).await
    }

    async fn get_ticket(&self, id: TicketId) -> Result<Option<TicketDBResponse>> {
        let mut conn = self.pool.acquire().await?;
        SupportTickets::new(&mut conn).get_by_id(id).await
    }

    async fn create_ticket(&self, request: &TicketCreateDBRequest) -> Result<TicketDBResponse> {
        let mut conn = self.pool.acquire().await?;
        SupportTickets::new(&mut conn).create(request).await
    }
}
