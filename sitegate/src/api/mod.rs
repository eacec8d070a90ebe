//! HTTP surface of the site.
//!
//! - **[`handlers`]**: Axum handlers for the page routes, the login flow and the JSON API
//! - **[`models`]**: Request/response data structures
//!
//! Handlers never check access themselves. Every route is mounted behind a
//! [`crate::auth::guard`] layer in [`crate::build_router`]; the only access
//! decision made inside a handler is the ownership check for a single ticket,
//! because the owner is only known once the ticket has been loaded.

pub mod handlers;
pub mod models;
