//! Database layer for data persistence and access.
//!
//! ```text
//! ┌─────────────┐
//! │   Stores    │  (db::store - trait objects held by AppState)
//! └──────┬──────┘
//!        ↓
//! ┌─────────────┐
//! │ Repositories│  (db::handlers - queries over one connection)
//! └──────┬──────┘
//!        ↓
//! ┌─────────────┐
//! │  PostgreSQL │
//! └─────────────┘
//! ```

pub mod errors;
pub mod handlers;
pub mod models;
pub mod store;

pub use store::{PgStore, ProjectStore, TicketStore, UserStore};
