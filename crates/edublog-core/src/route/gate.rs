//! Route gate: allow, defer, or redirect a navigation request

use crate::route::{Route, RouteGroup};
use crate::session::{Session, SessionStatus};

/// Why a navigation request was redirected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RedirectReason {
    /// Protected route without a session
    Unauthenticated,
    /// Login screen while already signed in
    AlreadyAuthenticated,
    /// Signed in, but the role may not open this screen
    InsufficientRole,
}

/// Outcome of evaluating a route against the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Session still initializing: show the splash placeholder, do not navigate
    Defer,
    Allow,
    Redirect { to: Route, reason: RedirectReason },
}

impl Decision {
    fn redirect(to: Route, reason: RedirectReason) -> Self {
        Decision::Redirect { to, reason }
    }

    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }
}

/// Decide whether `route` is reachable in `session`.
///
/// Uses the full `is_authenticated` conjunction, so a torn session
/// (status says authenticated, a field is missing) is treated as signed out.
pub fn evaluate(session: &Session, route: &Route) -> Decision {
    if session.status == SessionStatus::Initializing {
        return Decision::Defer;
    }

    let authenticated = session.is_authenticated();

    match (route.group(), authenticated) {
        (RouteGroup::Other, _) => Decision::Allow,
        (RouteGroup::Public, false) => Decision::Allow,
        (RouteGroup::Public, true) => {
            Decision::redirect(Route::Home, RedirectReason::AlreadyAuthenticated)
        }
        (RouteGroup::Protected, false) => {
            Decision::redirect(Route::Login, RedirectReason::Unauthenticated)
        }
        (RouteGroup::Protected, true) => match route.required_roles() {
            Some(roles) if session.require_role(roles).is_err() => {
                Decision::redirect(Route::Home, RedirectReason::InsufficientRole)
            }
            _ => Decision::Allow,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::user::{RoleProfile, UserRecord};

    fn user(profile: RoleProfile) -> UserRecord {
        UserRecord {
            id: "1".to_string(),
            email: "u@x.com".to_string(),
            name: "U".to_string(),
            profile,
            school: None,
            age: None,
            profile_image: None,
            is_active: true,
            last_login: None,
            created_at: None,
            updated_at: None,
        }
    }

    fn signed_in(profile: RoleProfile) -> Session {
        Session {
            token: Some("abc".to_string()),
            user: Some(user(profile)),
            status: SessionStatus::Authenticated,
        }
    }

    fn with_status(status: SessionStatus) -> Session {
        Session {
            status,
            ..Session::default()
        }
    }

    fn professor() -> RoleProfile {
        RoleProfile::Professor { subjects: vec![] }
    }

    #[test]
    fn test_initializing_always_defers() {
        let session = with_status(SessionStatus::Initializing);
        for route in [Route::Login, Route::Home, Route::Modal, Route::CreatePost] {
            assert_eq!(evaluate(&session, &route), Decision::Defer);
        }
    }

    #[test]
    fn test_decision_table() {
        let login = Route::Login;
        let protected = Route::PostDetail("42".to_string());
        let other = Route::NotFound("/nowhere".to_string());

        for status in [SessionStatus::Unauthenticated, SessionStatus::Authenticating] {
            let session = with_status(status);
            assert_eq!(
                evaluate(&session, &protected),
                Decision::Redirect {
                    to: Route::Login,
                    reason: RedirectReason::Unauthenticated
                }
            );
            assert_eq!(evaluate(&session, &login), Decision::Allow);
            assert_eq!(evaluate(&session, &other), Decision::Allow);
        }

        let session = signed_in(professor());
        assert_eq!(
            evaluate(&session, &login),
            Decision::Redirect {
                to: Route::Home,
                reason: RedirectReason::AlreadyAuthenticated
            }
        );
        assert_eq!(evaluate(&session, &protected), Decision::Allow);
        assert_eq!(evaluate(&session, &other), Decision::Allow);
    }

    #[test]
    fn test_torn_session_is_treated_as_signed_out() {
        let mut session = signed_in(professor());
        session.user = None;
        assert_eq!(
            evaluate(&session, &Route::Home),
            Decision::Redirect {
                to: Route::Login,
                reason: RedirectReason::Unauthenticated
            }
        );
        assert!(evaluate(&session, &Route::Login).is_allowed());
    }

    #[test]
    fn test_student_cannot_reach_user_management() {
        let session = signed_in(RoleProfile::Student {
            class: Some("9A".to_string()),
            guardians: vec!["Maria".to_string()],
        });
        assert!(session.is_authenticated());

        for route in [
            Route::ManageUsers,
            Route::AddUser,
            Route::EditUser("2".to_string()),
            Route::UserDetails("2".to_string()),
            Route::CreatePost,
        ] {
            assert_eq!(
                evaluate(&session, &route),
                Decision::Redirect {
                    to: Route::Home,
                    reason: RedirectReason::InsufficientRole
                },
                "{route}"
            );
        }
        assert!(evaluate(&session, &Route::Home).is_allowed());
        assert!(evaluate(&session, &Route::MyProfile).is_allowed());
    }

    #[test]
    fn test_role_gated_screens() {
        let professor = signed_in(professor());
        assert!(evaluate(&professor, &Route::CreatePost).is_allowed());
        assert!(evaluate(&professor, &Route::EditPost("1".into())).is_allowed());
        assert!(!evaluate(&professor, &Route::ManageUsers).is_allowed());

        let admin = signed_in(RoleProfile::Admin);
        for route in [Route::CreatePost, Route::ManageUsers, Route::AddUser] {
            assert!(evaluate(&admin, &route).is_allowed());
        }
    }
}
