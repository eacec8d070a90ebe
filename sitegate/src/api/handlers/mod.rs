//! Route handlers.
//!
//! - [`auth`]: Sign-in page, credential login and logout
//! - [`pages`]: Server-rendered HTML pages
//! - [`projects`]: Admin project API
//! - [`session`]: Current session as JSON
//! - [`support_tickets`]: Support ticket API

pub mod auth;
pub mod pages;
pub mod projects;
pub mod session;
pub mod support_tickets;
