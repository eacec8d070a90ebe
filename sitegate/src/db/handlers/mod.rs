//! Repositories over a single Postgres connection.

pub mod projects;
pub mod support_tickets;
pub mod users;

pub use projects::Projects;
pub use support_tickets::SupportTickets;
pub use users::Users;
