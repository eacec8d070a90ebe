use crate::db::errors::DbError;
use axum::{
    Json,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum Error {
    /// Authentication required but not provided, or credentials rejected
    #[error("Not authenticated")]
    Unauthenticated { message: Option<String> },

    /// Invalid request data or business rule violation
    #[error("{message}")]
    BadRequest { message: String },

    /// Requested resource not found
    #[error("{resource} with ID {id} not found")]
    NotFound { resource: String, id: String },

    /// The identity store could not be reached while resolving a session.
    /// Fatal for the request; never treated as an authorization denial.
    #[error("Identity provider unavailable: {reason}")]
    IdentityProviderUnavailable { reason: String },

    /// Generic internal service error
    #[error("Failed to {operation}")]
    Internal { operation: String },

    /// Database operation error
    #[error(transparent)]
    Database(#[from] DbError),

    /// Unexpected error with full context chain
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    pub fn identity_unavailable(err: impl std::fmt::Display) -> Self {
        Error::IdentityProviderUnavailable { reason: err.to_string() }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Unauthenticated { .. } => StatusCode::UNAUTHORIZED,
            Error::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Error::NotFound { .. } => StatusCode::NOT_FOUND,
            Error::IdentityProviderUnavailable { .. } | Error::Internal { .. } | Error::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::Database(db_err) => match db_err {
                DbError::NotFound => StatusCode::NOT_FOUND,
                DbError::UniqueViolation { .. } => StatusCode::CONFLICT,
                DbError::Unavailable(_) | DbError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    /// Returns a user-safe error message, without leaking internal implementation details
    pub fn user_message(&self) -> String {
        match self {
            Error::Unauthenticated { message } => message.clone().unwrap_or_else(|| "Unauthorized".to_string()),
            Error::BadRequest { message } => message.clone(),
            Error::NotFound { resource, id } => format!("{resource} with ID {id} not found"),
            Error::Database(DbError::NotFound) => "Resource not found".to_string(),
            Error::Database(DbError::UniqueViolation { table, .. }) => match table.as_deref() {
                Some("users") => "An account with this email address already exists".to_string(),
                _ => "Resource already exists".to_string(),
            },
            Error::IdentityProviderUnavailable { .. } | Error::Internal { .. } | Error::Database(_) | Error::Other(_) => {
                "Internal server error".to_string()
            }
        }
    }

    fn log(&self) {
        // Different log levels based on severity
        match self {
            Error::IdentityProviderUnavailable { .. } => {
                tracing::error!("Session resolution failed: {:#}", self);
            }
            Error::Database(DbError::Unavailable(_) | DbError::Other(_)) | Error::Internal { .. } | Error::Other(_) => {
                tracing::error!("Internal service error: {:#}", self);
            }
            Error::Database(_) => {
                tracing::warn!("Database constraint error: {}", self);
            }
            Error::Unauthenticated { .. } => {
                tracing::info!("Authentication error: {}", self);
            }
            Error::BadRequest { .. } | Error::NotFound { .. } => {
                tracing::debug!("Client error: {}", self);
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        self.log();
        let body = json!({ "error": self.user_message() });
        (self.status_code(), Json(body)).into_response()
    }
}

/// Error surfaced from an HTML route.
///
/// Server-side failures render the generic failure page with a support
/// contact instead of the JSON body used by the API.
#[derive(Debug)]
pub struct PageError {
    pub error: Error,
    pub support_email: String,
}

impl PageError {
    pub fn new(error: impl Into<Error>, support_email: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            support_email: support_email.into(),
        }
    }
}

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        self.error.log();
        let status = self.error.status_code();
        let body = crate::templates::render_failure_page(status, &self.error.user_message(), &self.support_email);
        (status, Html(body)).into_response()
    }
}

/// Convert from String errors (e.g., from external functions)
impl From<String> for Error {
    fn from(msg: String) -> Self {
        Error::Internal { operation: msg }
    }
}

/// Type alias for service operation results
pub type Result<T> = std::result::Result<T, Error>;
