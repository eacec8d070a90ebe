//! Authentication and role-gated access control.
//!
//! A request flows through three pieces:
//!
//! ```text
//! request ─▶ IdentityProvider::get_session ─▶ Option<Session>
//!                                               │
//!                        Policy::evaluate_page ◀┘ (route's requirement)
//!                                               │
//!                             guard middleware ◀┘ Allow ─▶ handler
//!                                                 Deny  ─▶ redirect (pages) / 401 (API)
//! ```
//!
//! # Modules
//!
//! - [`session`]: signed session tokens and cookie handling
//! - [`identity`]: session resolution against the user store, login checks
//! - [`policy`]: requirements, decisions and per-route redirect targets
//! - [`guard`]: the middleware and extractors handlers use
//! - [`password`]: Argon2 password hashing
//!
//! # Usage in Handlers
//!
//! ```ignore
//! use sitegate::auth::{guard::{guard, CurrentSession, RouteGuard}, policy::PagePolicy};
//!
//! async fn account(CurrentSession(session): CurrentSession) -> String {
//!     format!("Hello, {}!", session.user.email)
//! }
//!
//! let router = Router::new()
//!     .route("/account", get(account))
//!     .route_layer(from_fn_with_state(RouteGuard::page(&state, PagePolicy::authenticated()), guard));
//! ```

pub mod guard;
pub mod identity;
pub mod password;
pub mod policy;
pub mod session;
