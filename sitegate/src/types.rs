//! Common type definitions.
//!
//! - [`UserId`]: opaque user identifier issued by the identity store
//! - [`ProjectId`] / [`TicketId`]: identifiers for CMS projects and support tickets
//! - [`Role`]: the closed set of platform roles

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use utoipa::ToSchema;
use uuid::Uuid;

// Type aliases for IDs
pub type UserId = String;
pub type ProjectId = Uuid;
pub type TicketId = Uuid;

/// Platform role of a user.
///
/// Stored as the Postgres enum `user_role` and serialized as `ADMIN` / `USER`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "user_role", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Admin,
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::User => "USER",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role '{0}'")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ADMIN" => Ok(Role::Admin),
            "USER" => Ok(Role::User),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

/// Abbreviate an identifier to its first 8 characters for more readable logs
pub fn abbrev_id(id: &str) -> String {
    id.chars().take(8).collect()
}
