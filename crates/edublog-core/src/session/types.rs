//! Session types

use serde::{Deserialize, Serialize};

use crate::user::{Role, UserRecord};
use crate::{Error, Result};

/// Lifecycle state of the client session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum SessionStatus {
    /// Startup is still discarding the previous session
    #[default]
    Initializing,
    Unauthenticated,
    /// A login exchange is in flight
    Authenticating,
    Authenticated,
}

/// In-memory view of the current principal
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    /// Bearer token for authorized requests
    pub token: Option<String>,
    /// Authenticated user
    pub user: Option<UserRecord>,
    pub status: SessionStatus,
}

impl Session {
    /// Both credentials present and the status agrees.
    ///
    /// Always computed from the three fields; never cache the result.
    pub fn is_authenticated(&self) -> bool {
        self.token.is_some() && self.user.is_some() && self.status == SessionStatus::Authenticated
    }

    /// `Authenticated` is only ever paired with a token and a user
    pub fn is_consistent(&self) -> bool {
        self.status != SessionStatus::Authenticated || (self.token.is_some() && self.user.is_some())
    }

    pub fn role(&self) -> Option<Role> {
        self.authenticated_user().map(UserRecord::role)
    }

    /// The user, but only when the session is fully authenticated
    pub fn authenticated_user(&self) -> Option<&UserRecord> {
        if self.is_authenticated() {
            self.user.as_ref()
        } else {
            None
        }
    }

    /// Bearer token of a fully authenticated session
    pub fn bearer_token(&self) -> Result<&str> {
        if !self.is_authenticated() {
            return Err(Error::Unauthenticated);
        }
        self.token.as_deref().ok_or(Error::Unauthenticated)
    }

    /// Check the role of the current user before a gated operation.
    ///
    /// Screens and API calls verify this themselves even when the entry
    /// point that led there was already hidden.
    pub fn require_role(&self, roles: &[Role]) -> Result<&UserRecord> {
        let user = self.authenticated_user().ok_or(Error::Unauthenticated)?;
        if user.has_role(roles) {
            Ok(user)
        } else {
            Err(Error::Forbidden(format!(
                "role {} is not allowed here",
                user.role()
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::user::RoleProfile;

    fn student() -> UserRecord {
        UserRecord {
            id: "3".to_string(),
            email: "s@x.com".to_string(),
            name: "Ana".to_string(),
            profile: RoleProfile::Student {
                class: Some("9A".to_string()),
                guardians: vec!["Maria".to_string()],
            },
            school: None,
            age: Some(14),
            profile_image: None,
            is_active: true,
            last_login: None,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn test_default_session_is_initializing() {
        let session = Session::default();
        assert_eq!(session.status, SessionStatus::Initializing);
        assert!(!session.is_authenticated());
        assert!(session.is_consistent());
    }

    #[test]
    fn test_torn_states_are_not_authenticated() {
        let token_only = Session {
            token: Some("abc".to_string()),
            user: None,
            status: SessionStatus::Authenticated,
        };
        assert!(!token_only.is_authenticated());
        assert!(!token_only.is_consistent());
        assert!(matches!(token_only.bearer_token(), Err(Error::Unauthenticated)));

        let stale_status = Session {
            token: Some("abc".to_string()),
            user: Some(student()),
            status: SessionStatus::Unauthenticated,
        };
        assert!(!stale_status.is_authenticated());
        assert!(stale_status.role().is_none());
    }

    #[test]
    fn test_require_role() {
        let session = Session {
            token: Some("abc".to_string()),
            user: Some(student()),
            status: SessionStatus::Authenticated,
        };
        assert_eq!(session.bearer_token().unwrap(), "abc");
        assert!(session.require_role(&[Role::Student]).is_ok());
        assert!(matches!(
            session.require_role(&[Role::Admin]),
            Err(Error::Forbidden(_))
        ));
        assert!(matches!(
            Session::default().require_role(&[Role::Admin]),
            Err(Error::Unauthenticated)
        ));
    }
}
