//! # sitegate: role-gated access control for a small community site
//!
//! `sitegate` serves a storefront-style site with member pages, a support desk,
//! an admin area and a CMS, and decides for every request whether the visitor
//! may see it.
//!
//! ## Access control
//!
//! Three pieces cooperate:
//!
//! - The **session resolver** ([`auth::identity`]) turns a session credential
//!   into the current user and their *current* role, read from the user store
//!   on every request. A missing or invalid credential is simply "no session";
//!   an unreachable store is a hard failure.
//! - The **policy evaluator** ([`auth::policy`]) is a pure function of the
//!   session and a [`auth::policy::Requirement`] (`Public`, `Authenticated`,
//!   `AdminOnly`, `OwnerOrAdmin`).
//! - The **route guard** ([`auth::guard`]) runs before every handler. Page
//!   routes turn a denial into a `307` redirect (to the login page for
//!   anonymous visitors, to a neutral page for signed-in visitors lacking the
//!   role); API routes turn any denial into `401 {"error":"Unauthorized"}`.
//!
//! Sections nest: the admin area sits behind an admin guard, and a stricter
//! inner guard is always evaluated even when an outer one already allowed the
//! request.
//!
//! ## Quick Start
//!
//! ```no_run
//! use clap::Parser;
//! use sitegate::{Application, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let args = sitegate::config::Args::parse();
//!     let config = Config::load(&args)?;
//!     sitegate::telemetry::init_telemetry(config.enable_otel_export)?;
//!
//!     let app = Application::new(config).await?;
//!     app.serve(async {
//!         let _ = tokio::signal::ctrl_c().await;
//!     })
//!     .await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Database Setup
//!
//! Migrations run automatically on startup; they can also be applied by hand:
//!
//! ```no_run
//! # use sqlx::PgPool;
//! # async fn example(pool: PgPool) -> Result<(), sqlx::migrate::MigrateError> {
//! sitegate::migrator().run(&pool).await?;
//! # Ok(())
//! # }
//! ```
pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
mod openapi;
pub mod telemetry;
pub mod templates;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
pub mod types;

use std::sync::Arc;

use anyhow::Context;
use axum::{
    Json, Router,
    middleware::from_fn_with_state,
    routing::{get, post},
};
use bon::Builder;
use sqlx::{PgPool, postgres::PgPoolOptions};
use tokio::net::TcpListener;
use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::{Level, debug, info, instrument};
use utoipa::OpenApi;

pub use config::Config;

use crate::{
    api::handlers::{auth as auth_handlers, pages, projects, session as session_handlers, support_tickets},
    auth::{
        guard::{RouteGuard, guard},
        identity::IdentityProvider,
        password,
        policy::{PagePolicy, Policy, Requirement},
    },
    db::{PgStore, ProjectStore, TicketStore, handlers::Users, models::users::UserCreateDBRequest},
    openapi::ApiDoc,
    templates::Templates,
    types::{Role, UserId},
};

/// Shared state handed to every handler and guard.
#[derive(Clone, Builder)]
pub struct AppState {
    pub config: Config,
    pub identity: IdentityProvider,
    pub policy: Policy,
    pub projects: Arc<dyn ProjectStore>,
    pub tickets: Arc<dyn TicketStore>,
    pub templates: Templates,
}

/// Get the database migrator
pub fn migrator() -> sqlx::migrate::Migrator {
    sqlx::migrate!("./migrations")
}

/// Create the initial admin user if it doesn't exist.
///
/// Idempotent: an existing account keeps its id and role, but gets its
/// password reset when one is configured.
#[instrument(skip(password, db))]
pub async fn create_initial_admin_user(email: &str, password: Option<&str>, db: &PgPool) -> anyhow::Result<UserId> {
    let password_hash = match password {
        Some(pwd) => Some(password::hash_string(pwd).context("Failed to hash admin password")?),
        None => None,
    };

    let mut tx = db.begin().await?;
    let mut users = Users::new(&mut tx);

    if let Some(existing) = users.get_user_by_email(email).await? {
        if let Some(hash) = password_hash {
            users.set_password_hash(&existing.id, &hash).await?;
        }
        tx.commit().await?;
        debug!("Initial admin user already exists");
        return Ok(existing.id);
    }

    let created = users
        .create(&UserCreateDBRequest {
            email: email.to_string(),
            name: None,
            role: Role::Admin,
            password_hash,
        })
        .await?;

    tx.commit().await?;
    info!("Created initial admin user");
    Ok(created.id)
}

/// Build the full route table.
///
/// Every route is mounted behind exactly the guard for its section:
///
/// | Section | Requirement | Denied page request goes to |
/// |---|---|---|
/// | `/`, `/auth/login` | public | - |
/// | `/account`, `/community/new`, `/support/*` | signed in | login, with callback |
/// | `/admin/*` | admin | `/` for anyone |
/// | `/cms` | admin | login without callback, or `/` |
/// | `/api/admin/*` | admin | `401` |
/// | `/api/support/*` | signed in (plus ticket ownership) | `401` |
pub fn build_router(state: &AppState) -> Router {
    let page_guard = |policy: PagePolicy| from_fn_with_state(RouteGuard::page(state, policy), guard);
    let api_guard = |requirement: Requirement| from_fn_with_state(RouteGuard::api(state, requirement), guard);

    let public_pages = Router::new()
        .route("/", get(pages::home))
        .route("/auth/login", get(auth_handlers::login_page).post(auth_handlers::login))
        .route_layer(page_guard(PagePolicy::public()));

    let member_pages = Router::new()
        .route("/account", get(pages::account))
        .route("/community/new", get(pages::community_new))
        .route("/support", get(pages::support))
        .route("/support/{ticket_id}", get(pages::ticket))
        .route_layer(page_guard(PagePolicy::authenticated()));

    let admin_pages = Router::new()
        .route("/", get(pages::admin))
        .route("/projects", get(pages::projects))
        .route("/projects/{project_id}", get(pages::project))
        .route_layer(page_guard(PagePolicy::admin_layout()));

    let cms_pages = Router::new()
        .route("/cms", get(pages::cms))
        .route_layer(page_guard(PagePolicy::admin_only()));

    let admin_api = Router::new()
        .route("/projects", get(projects::list_projects).post(projects::create_project))
        .route_layer(api_guard(Requirement::AdminOnly));

    let support_api = Router::new()
        .route(
            "/tickets",
            get(support_tickets::list_tickets).post(support_tickets::create_ticket),
        )
        .route("/tickets/{ticket_id}", get(support_tickets::get_ticket))
        .route_layer(api_guard(Requirement::Authenticated));

    let api = Router::new()
        .route("/session", get(session_handlers::get_session))
        .route_layer(api_guard(Requirement::Public))
        .nest("/admin", admin_api)
        .nest("/support", support_api)
        .route("/openapi.json", get(|| async { Json(ApiDoc::openapi()) }));

    Router::new()
        .merge(public_pages)
        .merge(member_pages)
        .merge(cms_pages)
        .nest("/admin", admin_pages)
        .nest("/api", api)
        .route("/auth/logout", post(auth_handlers::logout))
        .route("/healthz", get(|| async { "OK" }))
        .with_state(state.clone())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
}

/// Connect to Postgres, run migrations and seed the initial admin.
async fn setup_database(config: &Config) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect(&config.database.url)
        .await
        .context("Failed to connect to database")?;

    migrator().run(&pool).await.context("Failed to run migrations")?;
    create_initial_admin_user(&config.admin_email, config.admin_password.as_deref(), &pool).await?;

    Ok(pool)
}

/// A configured, ready-to-serve instance.
///
/// 1. **Create**: [`Application::new`] connects to the database, runs migrations and seeds the admin
/// 2. **Serve**: [`Application::serve`] binds the listener and handles requests until shutdown
pub struct Application {
    router: Router,
    config: Config,
    pool: PgPool,
}

impl Application {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        debug!("Starting sitegate with configuration: {:#?}", config);

        let pool = setup_database(&config).await?;
        let store = Arc::new(PgStore::new(pool.clone()));

        let state = AppState::builder()
            .identity(IdentityProvider::new(store.clone(), &config))
            .policy(Policy::from_config(&config.auth))
            .projects(store.clone())
            .tickets(store)
            .templates(Templates::new()?)
            .config(config.clone())
            .build();

        let router = build_router(&state);

        Ok(Self { router, config, pool })
    }

    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!("sitegate listening on http://{}", bind_addr);

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("Closing database connections...");
        self.pool.close().await;

        info!("Shutting down telemetry...");
        telemetry::shutdown_telemetry();

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        api::models::{projects::ProjectResponse, support_tickets::TicketResponse},
        test_utils::{MemoryStore, create_test_state, session_cookie_header},
    };
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use serde_json::json;

    fn server(store: &MemoryStore) -> (TestServer, AppState) {
        let state = create_test_state(store);
        (TestServer::new(build_router(&state)).unwrap(), state)
    }

    fn cookie(user_id: &str, state: &AppState) -> String {
        session_cookie_header(user_id, &state.config)
    }

    #[test_log::test(tokio::test)]
    async fn test_anonymous_admin_page_goes_home_not_to_login() {
        let store = MemoryStore::new();
        let (server, _) = server(&store);

        let response = server.get("/admin/projects").await;
        response.assert_status(StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(response.header("location"), "/");
    }

    #[tokio::test]
    async fn test_member_pages_send_anonymous_visitors_to_login() {
        let store = MemoryStore::new();
        let (server, _) = server(&store);

        for (path, location) in [
            ("/account", "/auth/login?callbackUrl=%2Faccount"),
            ("/community/new", "/auth/login?callbackUrl=%2Fcommunity%2Fnew"),
            ("/support", "/auth/login?callbackUrl=%2Fsupport"),
            ("/cms", "/auth/login"),
        ] {
            let response = server.get(path).await;
            response.assert_status(StatusCode::TEMPORARY_REDIRECT);
            assert_eq!(response.header("location"), location, "{path}");
        }
    }

    #[tokio::test]
    async fn test_user_is_kept_out_of_admin_sections() {
        let store = MemoryStore::new();
        let user = store.add_user("user@example.com", Role::User, None);
        let (server, state) = server(&store);

        for path in ["/admin", "/admin/projects", "/cms"] {
            let response = server.get(path).add_header("cookie", cookie(&user.id, &state)).await;
            response.assert_status(StatusCode::TEMPORARY_REDIRECT);
            assert_eq!(response.header("location"), "/", "{path}");
        }

        let response = server
            .get("/api/admin/projects")
            .add_header("cookie", cookie(&user.id, &state))
            .await;
        response.assert_status_unauthorized();
        response.assert_json(&json!({ "error": "Unauthorized" }));
    }

    #[tokio::test]
    async fn test_admin_reaches_admin_routes() {
        let store = MemoryStore::new();
        let admin = store.add_user("admin@example.com", Role::Admin, None);
        store.add_project("Spring catalogue", &admin.id);
        let (server, state) = server(&store);

        let response = server.get("/admin/projects").add_header("cookie", cookie(&admin.id, &state)).await;
        response.assert_status_ok();
        assert!(response.text().contains("Spring catalogue"));

        let response = server
            .get("/api/admin/projects")
            .add_header("cookie", cookie(&admin.id, &state))
            .await;
        response.assert_status_ok();
        let projects: Vec<ProjectResponse> = response.json();
        assert_eq!(projects.len(), 1);

        let response = server
            .post("/api/admin/projects")
            .add_header("cookie", cookie(&admin.id, &state))
            .json(&json!({ "title": "Autumn", "summary": null }))
            .await;
        response.assert_status(StatusCode::CREATED);
        let created: ProjectResponse = response.json();
        assert_eq!(created.created_by, admin.id);
    }

    #[tokio::test]
    async fn test_demoted_admin_loses_access_on_next_request() {
        let store = MemoryStore::new();
        let admin = store.add_user("admin@example.com", Role::Admin, None);
        let (server, state) = server(&store);
        let session = cookie(&admin.id, &state);

        server.get("/cms").add_header("cookie", session.clone()).await.assert_status_ok();

        store.set_role(&admin.id, Role::User);
        let response = server.get("/cms").add_header("cookie", session).await;
        response.assert_status(StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(response.header("location"), "/");
    }

    #[tokio::test]
    async fn test_ticket_page_requires_owner_or_admin() {
        let store = MemoryStore::new();
        let owner = store.add_user("owner@example.com", Role::User, None);
        let other = store.add_user("other@example.com", Role::User, None);
        let admin = store.add_user("admin@example.com", Role::Admin, None);
        let ticket = store.add_ticket(&owner.id, "Broken checkout");
        let (server, state) = server(&store);
        let path = format!("/support/{}", ticket.id);

        let response = server.get(&path).add_header("cookie", cookie(&owner.id, &state)).await;
        response.assert_status_ok();
        assert!(response.text().contains("Broken checkout"));

        let response = server.get(&path).add_header("cookie", cookie(&admin.id, &state)).await;
        response.assert_status_ok();

        let response = server.get(&path).add_header("cookie", cookie(&other.id, &state)).await;
        response.assert_status(StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(response.header("location"), "/support");

        let response = server.get(&path).await;
        response.assert_status(StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(
            response.header("location"),
            format!("/auth/login?callbackUrl=%2Fsupport%2F{}", ticket.id)
        );
    }

    #[tokio::test]
    async fn test_ticket_api_ownership() {
        let store = MemoryStore::new();
        let owner = store.add_user("owner@example.com", Role::User, None);
        let other = store.add_user("other@example.com", Role::User, None);
        let ticket = store.add_ticket(&owner.id, "Refund");
        store.add_ticket(&other.id, "Shipping");
        let (server, state) = server(&store);
        let path = format!("/api/support/tickets/{}", ticket.id);

        let response = server.get(&path).add_header("cookie", cookie(&owner.id, &state)).await;
        response.assert_status_ok();
        let fetched: TicketResponse = response.json();
        assert_eq!(fetched.subject, "Refund");

        let response = server.get(&path).add_header("cookie", cookie(&other.id, &state)).await;
        response.assert_status_unauthorized();
        response.assert_json(&json!({ "error": "Unauthorized" }));

        // A missing id looks exactly like someone else's ticket to non-admins
        let missing = format!("/api/support/tickets/{}", uuid::Uuid::new_v4());
        let response = server.get(&missing).add_header("cookie", cookie(&owner.id, &state)).await;
        response.assert_status_unauthorized();
        response.assert_json(&json!({ "error": "Unauthorized" }));

        let admin = store.add_user("admin@example.com", Role::Admin, None);
        let response = server.get(&missing).add_header("cookie", cookie(&admin.id, &state)).await;
        response.assert_status_not_found();

        // Non-admins only list their own tickets
        let response = server
            .get("/api/support/tickets")
            .add_header("cookie", cookie(&owner.id, &state))
            .await;
        let tickets: Vec<TicketResponse> = response.json();
        assert_eq!(tickets.len(), 1);
        assert_eq!(tickets[0].user_id, owner.id);
    }

    #[tokio::test]
    async fn test_create_ticket_belongs_to_caller() {
        let store = MemoryStore::new();
        let user = store.add_user("user@example.com", Role::User, None);
        let (server, state) = server(&store);

        let response = server
            .post("/api/support/tickets")
            .add_header("cookie", cookie(&user.id, &state))
            .json(&json!({ "subject": "Help", "body": "My order is late" }))
            .await;
        response.assert_status(StatusCode::CREATED);
        let ticket: TicketResponse = response.json();
        assert_eq!(ticket.user_id, user.id);

        let response = server
            .post("/api/support/tickets")
            .json(&json!({ "subject": "Help", "body": "anonymous" }))
            .await;
        response.assert_status_unauthorized();
    }

    #[tokio::test]
    async fn test_session_endpoint() {
        let store = MemoryStore::new();
        let user = store.add_user("user@example.com", Role::User, None);
        let (server, state) = server(&store);

        let response = server.get("/api/session").await;
        response.assert_status_ok();
        response.assert_json(&json!(null));

        let response = server.get("/api/session").add_header("cookie", cookie(&user.id, &state)).await;
        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        assert_eq!(body["user"]["role"], "USER");
        assert_eq!(body["user"]["email"], "user@example.com");
    }

    #[tokio::test]
    async fn test_login_flow_returns_to_callback() {
        let store = MemoryStore::new();
        store.add_user("user@example.com", Role::User, Some("correct horse"));
        let (server, state) = server(&store);

        let response = server
            .post("/auth/login")
            .form(&[("email", "user@example.com"), ("password", "correct horse"), ("callbackUrl", "/support")])
            .await;
        response.assert_status(StatusCode::SEE_OTHER);
        assert_eq!(response.header("location"), "/support");

        let set_cookie = response.header("set-cookie");
        let set_cookie = set_cookie.to_str().unwrap();
        assert!(set_cookie.starts_with(&format!("{}=", state.config.auth.session.cookie_name)));
        assert!(set_cookie.contains("HttpOnly"));

        // The issued cookie opens the member area
        let session = set_cookie.split(';').next().unwrap().to_string();
        server.get("/support").add_header("cookie", session).await.assert_status_ok();
    }

    #[tokio::test]
    async fn test_failed_login_goes_back_to_login_page() {
        let store = MemoryStore::new();
        store.add_user("user@example.com", Role::User, Some("correct horse"));
        let (server, _) = server(&store);

        let response = server
            .post("/auth/login")
            .form(&[("email", "user@example.com"), ("password", "wrong"), ("callbackUrl", "https://evil.example")])
            .await;
        response.assert_status(StatusCode::SEE_OTHER);
        assert_eq!(response.header("location"), "/auth/login?error=CredentialsSignin&callbackUrl=%2F");
        assert!(response.headers().get("set-cookie").is_none());

        let response = server.get("/auth/login").add_query_param("error", "CredentialsSignin").await;
        response.assert_status_ok();
        assert!(response.text().contains("Invalid email or password"));
    }

    #[tokio::test]
    async fn test_login_ignores_callbacks_with_whitespace() {
        let store = MemoryStore::new();
        store.add_user("user@example.com", Role::User, Some("correct horse"));
        let (server, _) = server(&store);

        for callback in ["/\t/evil.example", "/x\r\nSet-Cookie: a=b"] {
            let response = server
                .post("/auth/login")
                .form(&[("email", "user@example.com"), ("password", "correct horse"), ("callbackUrl", callback)])
                .await;
            response.assert_status(StatusCode::SEE_OTHER);
            assert_eq!(response.header("location"), "/", "{callback:?}");
        }
    }

    #[tokio::test]
    async fn test_logout_clears_cookie() {
        let store = MemoryStore::new();
        let (server, _) = server(&store);

        let response = server.post("/auth/logout").await;
        response.assert_status(StatusCode::SEE_OTHER);
        assert_eq!(response.header("location"), "/");
        assert!(response.header("set-cookie").to_str().unwrap().contains("Max-Age=0"));
    }

    #[tokio::test]
    async fn test_store_outage_renders_failure_page() {
        let store = MemoryStore::new();
        let user = store.add_user("user@example.com", Role::User, None);
        let (server, state) = server(&store);
        store.set_unavailable(true);

        let response = server.get("/account").add_header("cookie", cookie(&user.id, &state)).await;
        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        assert!(response.text().contains("support@sitegate.test"));
        assert!(response.headers().get("location").is_none());

        // Anonymous visitors never touch the store, so public pages keep working
        server.get("/").await.assert_status_ok();
    }

    #[tokio::test]
    async fn test_public_routes() {
        let store = MemoryStore::new();
        let (server, _) = server(&store);

        server.get("/").await.assert_status_ok();
        server.get("/healthz").await.assert_text("OK");

        let response = server.get("/auth/login").add_query_param("callbackUrl", "/support").await;
        response.assert_status_ok();
        // Auto-escaping encodes the slash
        assert!(response.text().contains(r#"value="&#x2f;support""#));

        let doc: serde_json::Value = server.get("/api/openapi.json").await.json();
        assert!(doc["paths"]["/support/tickets"].is_object());
    }
}
