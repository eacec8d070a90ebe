//! Database record structures matching table schemas.

pub mod projects;
pub mod support_tickets;
pub mod users;
