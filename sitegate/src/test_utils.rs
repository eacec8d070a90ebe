//! Test utilities (available with the `test-utils` feature).
//!
//! [`MemoryStore`] stands in for Postgres so guard and route tests run without
//! a database. It counts user lookups and can simulate an outage.

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};

use async_trait::async_trait;
use axum::http::{HeaderMap, HeaderValue, header};
use chrono::Utc;
use uuid::Uuid;

use crate::{
    AppState,
    auth::{
        identity::IdentityProvider,
        password::{self, Argon2Params},
        policy::Policy,
        session,
    },
    config::Config,
    db::{
        ProjectStore, TicketStore, UserStore,
        errors::{DbError, Result},
        models::{
            projects::{ProjectCreateDBRequest, ProjectDBResponse},
            support_tickets::{TicketCreateDBRequest, TicketDBResponse},
            users::UserDBResponse,
        },
    },
    templates::Templates,
    types::{ProjectId, Role, TicketId},
};

#[derive(Default)]
struct Tables {
    users: Vec<UserDBResponse>,
    projects: Vec<ProjectDBResponse>,
    tickets: Vec<TicketDBResponse>,
}

/// In-memory implementation of every store.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
    user_lookups: Arc<AtomicUsize>,
    unavailable: Arc<AtomicBool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_user(&self, email: &str, role: Role, password: Option<&str>) -> UserDBResponse {
        let fast = Argon2Params {
            memory_kib: 1024,
            iterations: 1,
            parallelism: 1,
        };
        let now = Utc::now();
        let user = UserDBResponse {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            name: None,
            role,
            password_hash: password.map(|p| password::hash_string_with_params(p, Some(fast)).expect("hash password")),
            created_at: now,
            updated_at: now,
        };
        self.tables.lock().unwrap().users.push(user.clone());
        user
    }

    pub fn set_role(&self, user_id: &str, role: Role) {
        let mut tables = self.tables.lock().unwrap();
        if let Some(user) = tables.users.iter_mut().find(|u| u.id == user_id) {
            user.role = role;
        }
    }

    pub fn add_project(&self, title: &str, created_by: &str) -> ProjectDBResponse {
        let project = ProjectDBResponse {
            id: Uuid::new_v4(),
            title: title.to_string(),
            summary: None,
            created_by: created_by.to_string(),
            created_at: Utc::now(),
        };
        self.tables.lock().unwrap().projects.push(project.clone());
        project
    }

    pub fn add_ticket(&self, owner: &str, subject: &str) -> TicketDBResponse {
        let ticket = TicketDBResponse {
            id: Uuid::new_v4(),
            user_id: owner.to_string(),
            subject: subject.to_string(),
            body: format!("{subject} (details)"),
            created_at: Utc::now(),
        };
        self.tables.lock().unwrap().tickets.push(ticket.clone());
        ticket
    }

    /// Make every subsequent store call fail as if the database were down
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of user lookups performed so far
    pub fn user_lookups(&self) -> usize {
        self.user_lookups.load(Ordering::SeqCst)
    }

    fn available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(DbError::Unavailable("connection refused".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_user_by_id(&self, id: &str) -> Result<Option<UserDBResponse>> {
        self.user_lookups.fetch_add(1, Ordering::SeqCst);
        self.available()?;
        Ok(self.tables.lock().unwrap().users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserDBResponse>> {
        self.user_lookups.fetch_add(1, Ordering::SeqCst);
        self.available()?;
        let tables = self.tables.lock().unwrap();
        Ok(tables.users.iter().find(|u| u.email.eq_ignore_ascii_case(email)).cloned())
    }
}

#[async_trait]
impl ProjectStore for MemoryStore {
    async fn list_projects(&self) -> Result<Vec<ProjectDBResponse>> {
        self.available()?;
        Ok(self.tables.lock().unwrap().projects.clone())
    }

    async fn get_project(&self, id: ProjectId) -> Result<Option<ProjectDBResponse>> {
        self.available()?;
        Ok(self.tables.lock().unwrap().projects.iter().find(|p| p.id == id).cloned())
    }

    async fn create_project(&self, request: &ProjectCreateDBRequest) -> Result<ProjectDBResponse> {
        self.available()?;
        let project = ProjectDBResponse {
            id: Uuid::new_v4(),
            title: request.title.clone(),
            summary: request.summary.clone(),
            created_by: request.created_by.clone(),
            created_at: Utc::now(),
        };
        self.tables.lock().unwrap().projects.push(project.clone());
        Ok(project)
    }
}

#[async_trait]
impl TicketStore for MemoryStore {
    async fn list_tickets(&self, owner: Option<&str>) -> Result<Vec<TicketDBResponse>> {
        self.available()?;
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .tickets
            .iter()
            .filter(|t| owner.is_none_or(|owner| t.user_id == owner))
            .cloned()
            .collect())
    }

    async fn get_ticket(&self, id: TicketId) -> Result<Option<TicketDBResponse>> {
        self.available()?;
        Ok(self.tables.lock().unwrap().tickets.iter().find(|t| t.id == id).cloned())
    }

    async fn create_ticket(&self, request: &TicketCreateDBRequest) -> Result<TicketDBResponse> {
        self.available()?;
        let ticket = TicketDBResponse {
            id: Uuid::new_v4(),
            user_id: request.user_id.clone(),
            subject: request.subject.clone(),
            body: request.body.clone(),
            created_at: Utc::now(),
        };
        self.tables.lock().unwrap().tickets.push(ticket.clone());
        Ok(ticket)
    }
}

pub fn create_test_config() -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        secret_key: Some("test-secret-key-for-testing-only".to_string()),
        support_email: "support@sitegate.test".to_string(),
        ..Default::default()
    }
}

/// Application state wired to an in-memory store
pub fn create_test_state(store: &MemoryStore) -> AppState {
    let config = create_test_config();
    let store = Arc::new(store.clone());

    AppState::builder()
        .identity(IdentityProvider::new(store.clone(), &config))
        .policy(Policy::from_config(&config.auth))
        .projects(store.clone())
        .tickets(store)
        .templates(Templates::new().expect("templates compile"))
        .config(config)
        .build()
}

/// `name=value` for a cookie header carrying a valid session for `user_id`
pub fn session_cookie_header(user_id: &str, config: &Config) -> String {
    let token = session::create_session_token(user_id, config).expect("create session token");
    format!("{}={}", config.auth.session.cookie_name, token)
}

pub fn session_headers(user_id: &str, config: &Config) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::COOKIE,
        HeaderValue::from_str(&session_cookie_header(user_id, config)).expect("valid cookie header"),
    );
    headers
}
