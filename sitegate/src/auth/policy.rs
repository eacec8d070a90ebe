//! Access policy evaluation.
//!
//! Evaluation is a pure function of `(session, requirement)`: the same pair
//! always produces the same [`Decision`]. Page routes additionally pick where
//! each kind of denial is sent through a [`PagePolicy`], since the site does
//! not treat every protected page alike:
//!
//! | route family            | anonymous                         | wrong role / not owner |
//! |-------------------------|-----------------------------------|------------------------|
//! | authenticated pages     | `/auth/login?callbackUrl=<path>`  | `/`                    |
//! | admin layout (`/admin`) | `/`                               | `/`                    |
//! | CMS                     | `/auth/login`                     | `/`                    |
//!
//! Denials are always silent redirects to a neutral page; nothing tells a
//! visitor whether a resource exists or which role it needs.

use serde::Serialize;

use crate::{
    auth::identity::Session,
    config::AuthConfig,
    types::{Role, UserId},
};

/// The access level a route declares it needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Requirement {
    Public,
    Authenticated,
    AdminOnly,
    /// The caller must be this user, or an admin
    OwnerOrAdmin(UserId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DenyReason {
    Unauthenticated,
    InsufficientRole,
    NotOwner,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny { reason: DenyReason, redirect: Option<String> },
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }
}

/// Core rule table. No I/O, no redirect policy.
pub fn check(session: Option<&Session>, requirement: &Requirement) -> Result<(), DenyReason> {
    match (requirement, session) {
        (Requirement::Public, _) => Ok(()),
        (_, None) => Err(DenyReason::Unauthenticated),
        (Requirement::Authenticated, Some(_)) => Ok(()),
        (Requirement::AdminOnly, Some(session)) => match session.user.role {
            Role::Admin => Ok(()),
            Role::User => Err(DenyReason::InsufficientRole),
        },
        (Requirement::OwnerOrAdmin(owner), Some(session)) => {
            if session.user.id == *owner || session.is_admin() {
                Ok(())
            } else {
                Err(DenyReason::NotOwner)
            }
        }
    }
}

/// Where a denied page request is sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedirectTarget {
    /// The bare login page
    Login,
    /// The login page with `callbackUrl` set to the requested path
    LoginWithCallback,
    /// The configured home page
    Home,
    Path(String),
}

/// Requirement plus per-route redirect targets for a page route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PagePolicy {
    pub requirement: Requirement,
    pub on_unauthenticated: RedirectTarget,
    pub on_forbidden: RedirectTarget,
}

impl PagePolicy {
    pub fn public() -> Self {
        Self {
            requirement: Requirement::Public,
            on_unauthenticated: RedirectTarget::LoginWithCallback,
            on_forbidden: RedirectTarget::Home,
        }
    }

    /// Any logged-in user; anonymous visitors go to login and come back afterwards
    pub fn authenticated() -> Self {
        Self {
            requirement: Requirement::Authenticated,
            ..Self::public()
        }
    }

    /// Admin section layout: everyone who is not an admin lands on the home page
    pub fn admin_layout() -> Self {
        Self {
            requirement: Requirement::AdminOnly,
            on_unauthenticated: RedirectTarget::Home,
            on_forbidden: RedirectTarget::Home,
        }
    }

    /// Standalone admin pages: anonymous visitors see the login page (without a
    /// callback), logged-in non-admins land on the home page
    pub fn admin_only() -> Self {
        Self {
            requirement: Requirement::AdminOnly,
            on_unauthenticated: RedirectTarget::Login,
            on_forbidden: RedirectTarget::Home,
        }
    }

    pub fn on_forbidden(mut self, target: RedirectTarget) -> Self {
        self.on_forbidden = target;
        self
    }
}

/// Build `<login>?callbackUrl=<url-encoded path>`
pub fn login_redirect(login_path: &str, requested_path: &str) -> String {
    let separator = if login_path.contains('?') { '&' } else { '?' };
    format!("{login_path}{separator}callbackUrl={}", urlencoding::encode(requested_path))
}

/// Evaluates requirements and turns denials into redirect targets.
#[derive(Debug, Clone)]
pub struct Policy {
    login_path: String,
    home_path: String,
}

impl Policy {
    pub fn new(login_path: impl Into<String>, home_path: impl Into<String>) -> Self {
        Self {
            login_path: login_path.into(),
            home_path: home_path.into(),
        }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(&config.login_path, &config.home_path)
    }

    pub fn login_path(&self) -> &str {
        &self.login_path
    }

    pub fn home_path(&self) -> &str {
        &self.home_path
    }

    /// Evaluate with the default redirects: login with callback for anonymous
    /// callers, home for everything else.
    pub fn evaluate(&self, session: Option<&Session>, requirement: &Requirement, requested_path: &str) -> Decision {
        let policy = PagePolicy {
            requirement: requirement.clone(),
            ..PagePolicy::public()
        };
        self.evaluate_page(session, &policy, requested_path)
    }

    pub fn evaluate_page(&self, session: Option<&Session>, policy: &PagePolicy, requested_path: &str) -> Decision {
        match check(session, &policy.requirement) {
            Ok(()) => Decision::Allow,
            Err(reason) => {
                let target = match reason {
                    DenyReason::Unauthenticated => &policy.on_unauthenticated,
                    DenyReason::InsufficientRole | DenyReason::NotOwner => &policy.on_forbidden,
                };
                Decision::Deny {
                    reason,
                    redirect: Some(self.resolve(target, requested_path)),
                }
            }
        }
    }

    pub fn resolve(&self, target: &RedirectTarget, requested_path: &str) -> String {
        match target {
            RedirectTarget::Login => self.login_path.clone(),
            RedirectTarget::LoginWithCallback => login_redirect(&self.login_path, requested_path),
            RedirectTarget::Home => self.home_path.clone(),
            RedirectTarget::Path(path) => path.clone(),
        }
    }
}

impl Default for Policy {
    fn default() -> Self {
        Self::from_config(&AuthConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::identity::SessionUser;

    fn session(id: &str, role: Role) -> Session {
        Session {
            user: SessionUser {
                id: id.to_string(),
                role,
                email: format!("{id}@example.com"),
                name: None,
            },
        }
    }

    #[test]
    fn test_rule_table() {
        let admin = session("admin", Role::Admin);
        let user = session("user", Role::User);
        let owner = Requirement::OwnerOrAdmin("user".to_string());
        let someone_else = Requirement::OwnerOrAdmin("other".to_string());

        let cases = [
            (None, Requirement::Public, Ok(())),
            (None, Requirement::Authenticated, Err(DenyReason::Unauthenticated)),
            (None, Requirement::AdminOnly, Err(DenyReason::Unauthenticated)),
            (None, owner.clone(), Err(DenyReason::Unauthenticated)),
            (Some(&user), Requirement::Public, Ok(())),
            (Some(&user), Requirement::Authenticated, Ok(())),
            (Some(&user), Requirement::AdminOnly, Err(DenyReason::InsufficientRole)),
            (Some(&user), owner.clone(), Ok(())),
            (Some(&user), someone_else.clone(), Err(DenyReason::NotOwner)),
            (Some(&admin), Requirement::Authenticated, Ok(())),
            (Some(&admin), Requirement::AdminOnly, Ok(())),
            (Some(&admin), someone_else.clone(), Ok(())),
        ];

        for (session, requirement, expected) in cases {
            assert_eq!(check(session, &requirement), expected, "{session:?} / {requirement:?}");
        }
    }

    #[test]
    fn test_default_redirects() {
        let policy = Policy::default();
        let user = session("user", Role::User);

        assert_eq!(
            policy.evaluate(None, &Requirement::Authenticated, "/orders"),
            Decision::Deny {
                reason: DenyReason::Unauthenticated,
                redirect: Some("/auth/login?callbackUrl=%2Forders".to_string()),
            }
        );
        assert_eq!(
            policy.evaluate(Some(&user), &Requirement::AdminOnly, "/cms"),
            Decision::Deny {
                reason: DenyReason::InsufficientRole,
                redirect: Some("/".to_string()),
            }
        );
        assert_eq!(
            policy.evaluate(Some(&user), &Requirement::OwnerOrAdmin("other".into()), "/support/1"),
            Decision::Deny {
                reason: DenyReason::NotOwner,
                redirect: Some("/".to_string()),
            }
        );
        assert!(policy.evaluate(Some(&user), &Requirement::Authenticated, "/orders").is_allowed());
    }

    #[test]
    fn test_admin_routes_keep_their_asymmetric_redirects() {
        let policy = Policy::default();
        let user = session("user", Role::User);

        // CMS-style admin page: anonymous -> login, wrong role -> home
        let cms = PagePolicy::admin_only();
        assert_eq!(
            policy.evaluate_page(None, &cms, "/cms"),
            Decision::Deny {
                reason: DenyReason::Unauthenticated,
                redirect: Some("/auth/login".to_string()),
            }
        );
        assert_eq!(
            policy.evaluate_page(Some(&user), &cms, "/cms"),
            Decision::Deny {
                reason: DenyReason::InsufficientRole,
                redirect: Some("/".to_string()),
            }
        );

        // Admin layout: anonymous visitors go home as well
        let layout = PagePolicy::admin_layout();
        assert_eq!(
            policy.evaluate_page(None, &layout, "/admin/projects"),
            Decision::Deny {
                reason: DenyReason::Unauthenticated,
                redirect: Some("/".to_string()),
            }
        );
    }

    #[test]
    fn test_custom_forbidden_target() {
        let policy = Policy::default();
        let user = session("user", Role::User);
        let ticket = PagePolicy {
            requirement: Requirement::OwnerOrAdmin("other".into()),
            ..PagePolicy::authenticated()
        }
        .on_forbidden(RedirectTarget::Path("/support".into()));

        assert_eq!(
            policy.evaluate_page(Some(&user), &ticket, "/support/abc"),
            Decision::Deny {
                reason: DenyReason::NotOwner,
                redirect: Some("/support".to_string()),
            }
        );
    }

    #[test]
    fn test_evaluation_is_idempotent() {
        let policy = Policy::default();
        let admin = session("admin", Role::Admin);
        let user = session("user", Role::User);
        let requirements = [
            Requirement::Public,
            Requirement::Authenticated,
            Requirement::AdminOnly,
            Requirement::OwnerOrAdmin("user".into()),
        ];

        for session in [None, Some(&user), Some(&admin)] {
            for requirement in &requirements {
                let first = policy.evaluate(session, requirement, "/x?y=1");
                let second = policy.evaluate(session, requirement, "/x?y=1");
                assert_eq!(first, second);
            }
        }
    }

    #[test]
    fn test_login_redirect_encodes_path_and_query() {
        assert_eq!(
            login_redirect("/auth/login", "/shop/orders?page=2&sort=desc"),
            "/auth/login?callbackUrl=%2Fshop%2Forders%3Fpage%3D2%26sort%3Ddesc"
        );
        assert_eq!(login_redirect("/auth/login?lang=en", "/a"), "/auth/login?lang=en&callbackUrl=%2Fa");
    }
}
