//! Session resolution against the persisted user store.
//!
//! [`IdentityProvider::get_session`] turns request headers into an optional
//! [`Session`]. A missing, malformed or expired credential, or one naming a
//! user that no longer exists, is an ordinary `Ok(None)`. Only a failure to
//! reach the store is an error, and that error is
//! [`Error::IdentityProviderUnavailable`]: callers must let it bubble up as a
//! server failure rather than read it as "not logged in".

use std::sync::Arc;

use axum::http::HeaderMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, trace};
use utoipa::ToSchema;

use crate::{
    auth::{password, session},
    config::Config,
    db::{UserStore, models::users::UserDBResponse},
    errors::{Error, Result},
    types::{Role, UserId, abbrev_id},
};

/// The authenticated principal for one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SessionUser {
    pub id: UserId,
    pub role: Role,
    pub email: String,
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Session {
    pub user: SessionUser,
}

impl Session {
    pub fn is_admin(&self) -> bool {
        self.user.role == Role::Admin
    }
}

impl From<UserDBResponse> for SessionUser {
    fn from(user: UserDBResponse) -> Self {
        Self {
            id: user.id,
            role: user.role,
            email: user.email,
            name: user.name,
        }
    }
}

/// Resolves sessions and checks login credentials.
///
/// Built once at startup and shared through `AppState`.
#[derive(Clone)]
pub struct IdentityProvider {
    users: Arc<dyn UserStore>,
    config: Config,
}

impl IdentityProvider {
    pub fn new(users: Arc<dyn UserStore>, config: &Config) -> Self {
        Self {
            users,
            config: config.clone(),
        }
    }

    /// Resolve the session for a request, if any.
    #[instrument(skip_all)]
    pub async fn get_session(&self, headers: &HeaderMap) -> Result<Option<Session>> {
        let Some(token) = session::extract_credential(headers, &self.config.auth.session.cookie_name) else {
            trace!("No session credential present");
            return Ok(None);
        };

        let claims = match session::verify_session_token(&token, &self.config) {
            Ok(claims) => claims,
            Err(Error::Unauthenticated { .. }) => {
                // Expired or tampered tokens are expected, not failures
                debug!("Ignoring invalid session token");
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        let user = self.users.find_user_by_id(&claims.sub).await.map_err(Error::identity_unavailable)?;

        match user {
            Some(user) => {
                trace!(user_id = %abbrev_id(&user.id), role = %user.role, "Resolved session");
                Ok(Some(Session { user: user.into() }))
            }
            None => {
                debug!(user_id = %abbrev_id(&claims.sub), "Session token refers to unknown user");
                Ok(None)
            }
        }
    }

    /// Check an email/password pair. `Ok(None)` means the credentials were rejected.
    #[instrument(skip(self, password))]
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<Option<SessionUser>> {
        let Some(user) = self.users.find_user_by_email(email).await.map_err(Error::identity_unavailable)? else {
            return Ok(None);
        };

        let Some(hash) = user.password_hash.clone() else {
            return Ok(None);
        };

        // Verify password on a blocking thread to avoid blocking async runtime
        let password = password.to_string();
        let is_valid = tokio::task::spawn_blocking(move || password::verify_string(&password, &hash))
            .await
            .map_err(|e| Error::Internal {
                operation: format!("spawn password verification task: {e}"),
            })??;

        Ok(is_valid.then(|| user.into()))
    }

    /// Issue a session credential for a freshly authenticated user
    pub fn issue_token(&self, user: &SessionUser) -> Result<String> {
        session::create_session_token(&user.id, &self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{MemoryStore, create_test_config, session_headers};
    use axum::http::{HeaderValue, header};

    #[tokio::test]
    async fn test_no_credential_is_not_an_error() {
        let store = MemoryStore::new();
        let identity = IdentityProvider::new(Arc::new(store.clone()), &create_test_config());

        let session = identity.get_session(&HeaderMap::new()).await.unwrap();
        assert!(session.is_none());
        // Nothing to look up without a credential
        assert_eq!(store.user_lookups(), 0);
    }

    #[tokio::test]
    async fn test_valid_token_resolves_current_role() {
        let config = create_test_config();
        let store = MemoryStore::new();
        let user = store.add_user("ada@example.com", Role::User, None);
        let identity = IdentityProvider::new(Arc::new(store.clone()), &config);

        let headers = session_headers(&user.id, &config);
        let session = identity.get_session(&headers).await.unwrap().unwrap();
        assert_eq!(session.user.id, user.id);
        assert_eq!(session.user.role, Role::User);
        assert!(!session.is_admin());

        // Role changes in the store take effect on the very next request
        store.set_role(&user.id, Role::Admin);
        let session = identity.get_session(&headers).await.unwrap().unwrap();
        assert!(session.is_admin());
        assert_eq!(store.user_lookups(), 2);
    }

    #[tokio::test]
    async fn test_garbage_token_is_absent_session() {
        let store = MemoryStore::new();
        let identity = IdentityProvider::new(Arc::new(store.clone()), &create_test_config());

        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("sitegate_session=not-a-jwt"));

        assert!(identity.get_session(&headers).await.unwrap().is_none());
        assert_eq!(store.user_lookups(), 0);
    }

    #[tokio::test]
    async fn test_deleted_user_is_absent_session() {
        let config = create_test_config();
        let store = MemoryStore::new();
        let identity = IdentityProvider::new(Arc::new(store.clone()), &config);

        let headers = session_headers("no-such-user", &config);
        assert!(identity.get_session(&headers).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_store_outage_is_an_error_not_a_missing_session() {
        let config = create_test_config();
        let store = MemoryStore::new();
        let user = store.add_user("ada@example.com", Role::Admin, None);
        store.set_unavailable(true);
        let identity = IdentityProvider::new(Arc::new(store), &config);

        let err = identity.get_session(&session_headers(&user.id, &config)).await.unwrap_err();
        assert!(matches!(err, Error::IdentityProviderUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_authenticate() {
        let store = MemoryStore::new();
        store.add_user("ada@example.com", Role::User, Some("correct horse"));
        store.add_user("sso@example.com", Role::User, None);
        let identity = IdentityProvider::new(Arc::new(store), &create_test_config());

        let user = identity.authenticate("ada@example.com", "correct horse").await.unwrap();
        assert_eq!(user.unwrap().email, "ada@example.com");

        assert!(identity.authenticate("ada@example.com", "wrong").await.unwrap().is_none());
        assert!(identity.authenticate("nobody@example.com", "x").await.unwrap().is_none());
        // Accounts without a password cannot log in with one
        assert!(identity.authenticate("sso@example.com", "").await.unwrap().is_none());
    }
}
