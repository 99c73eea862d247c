//! Reactive navigation state
//!
//! Keeps the current route and re-runs the gate on every session
//! transition, so signing out on a protected screen lands on login even
//! though nobody navigated.

use tokio::sync::watch;
use tracing::debug;

use crate::route::{Decision, Route, RouteTable, evaluate};
use crate::session::Session;

/// Current position in the navigation graph
pub struct Navigator {
    session: watch::Receiver<Session>,
    /// `None` while the splash placeholder is shown
    current: Option<Route>,
    /// Requested while deferred; retried once the session settles
    pending: Option<Route>,
    /// Name of the route table the current route belongs to
    graph: &'static str,
}

impl Navigator {
    pub fn new(session: watch::Receiver<Session>) -> Self {
        Self {
            session,
            current: None,
            pending: None,
            graph: "",
        }
    }

    pub fn current(&self) -> Option<&Route> {
        self.current.as_ref()
    }

    /// Key of the active navigation graph
    pub fn graph(&self) -> &'static str {
        self.graph
    }

    /// Request a path; redirects are followed immediately
    pub fn navigate(&mut self, path: &str) -> Decision {
        let route = Route::parse(path);
        let session = self.session.borrow_and_update().clone();
        self.resolve(&session, route)
    }

    /// Wait for the next session transition and re-evaluate.
    ///
    /// Returns `None` once the session manager is gone.
    pub async fn next_change(&mut self) -> Option<Decision> {
        self.session.changed().await.ok()?;
        Some(self.reevaluate())
    }

    /// Re-evaluate if the session changed since the last look
    pub fn sync(&mut self) -> Option<Decision> {
        match self.session.has_changed() {
            Ok(true) => Some(self.reevaluate()),
            _ => None,
        }
    }

    fn reevaluate(&mut self) -> Decision {
        let session = self.session.borrow_and_update().clone();
        let table = RouteTable::for_session(&session);

        // a different table means a freshly mounted graph starting at its landing route
        let remounted = table.name() != self.graph;
        let target = match self.pending.take() {
            Some(route) => route,
            None if remounted => table.landing(),
            None => self.current.clone().unwrap_or_else(|| table.landing()),
        };

        self.resolve(&session, target)
    }

    fn resolve(&mut self, session: &Session, route: Route) -> Decision {
        let decision = evaluate(session, &route);

        match &decision {
            Decision::Defer => {
                debug!("Deferring navigation to {} until the session settles", route);
                self.current = None;
                self.pending = Some(route);
            }
            Decision::Allow => {
                self.current = Some(route);
            }
            Decision::Redirect { to, reason } => {
                debug!("Redirecting {} -> {} ({:?})", route, to, reason);
                self.current = Some(to.clone());
            }
        }

        self.graph = RouteTable::for_session(session).name();
        decision
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::route::RedirectReason;
    use crate::session::SessionStatus;
    use crate::user::{RoleProfile, UserRecord};

    fn professor_session() -> Session {
        Session {
            token: Some("abc".to_string()),
            user: Some(UserRecord {
                id: "1".to_string(),
                email: "p@x.com".to_string(),
                name: "Paulo".to_string(),
                profile: RoleProfile::Professor { subjects: vec![] },
                school: None,
                age: None,
                profile_image: None,
                is_active: true,
                last_login: None,
                created_at: None,
                updated_at: None,
            }),
            status: SessionStatus::Authenticated,
        }
    }

    fn signed_out() -> Session {
        Session {
            status: SessionStatus::Unauthenticated,
            ..Session::default()
        }
    }

    #[tokio::test]
    async fn test_deep_link_waits_for_splash_then_redirects() {
        let (tx, rx) = watch::channel(Session::default());
        let mut navigator = Navigator::new(rx);

        assert_eq!(navigator.navigate("/posts/42"), Decision::Defer);
        assert!(navigator.current().is_none());

        tx.send_replace(signed_out());
        let decision = navigator.next_change().await.unwrap();
        assert_eq!(
            decision,
            Decision::Redirect {
                to: Route::Login,
                reason: RedirectReason::Unauthenticated
            }
        );
        assert_eq!(navigator.current(), Some(&Route::Login));
        assert_eq!(navigator.graph(), "not-authenticated");
    }

    #[tokio::test]
    async fn test_login_swaps_graph_to_home() {
        let (tx, rx) = watch::channel(signed_out());
        let mut navigator = Navigator::new(rx);
        assert!(navigator.navigate("/login").is_allowed());

        tx.send_replace(professor_session());
        navigator.next_change().await.unwrap();
        assert_eq!(navigator.current(), Some(&Route::Home));
        assert_eq!(navigator.graph(), "authenticated");
    }

    #[tokio::test]
    async fn test_logout_on_protected_screen_lands_on_login() {
        let (tx, rx) = watch::channel(professor_session());
        let mut navigator = Navigator::new(rx);
        assert!(navigator.navigate("/posts/42").is_allowed());

        tx.send_replace(signed_out());
        navigator.next_change().await.unwrap();
        assert_eq!(navigator.current(), Some(&Route::Login));

        // re-requesting the old screen is still refused
        assert_eq!(
            navigator.navigate("/posts/42"),
            Decision::Redirect {
                to: Route::Login,
                reason: RedirectReason::Unauthenticated
            }
        );
    }

    #[tokio::test]
    async fn test_login_screen_redirects_when_signed_in() {
        let (_tx, rx) = watch::channel(professor_session());
        let mut navigator = Navigator::new(rx);
        assert_eq!(
            navigator.navigate("/login"),
            Decision::Redirect {
                to: Route::Home,
                reason: RedirectReason::AlreadyAuthenticated
            }
        );
        assert_eq!(navigator.current(), Some(&Route::Home));
    }

    #[tokio::test]
    async fn test_sync_only_fires_on_change() {
        let (tx, rx) = watch::channel(signed_out());
        let mut navigator = Navigator::new(rx);
        navigator.navigate("/login");
        assert!(navigator.sync().is_none());

        tx.send_replace(professor_session());
        assert!(navigator.sync().is_some());
        assert_eq!(navigator.current(), Some(&Route::Home));
        assert!(navigator.sync().is_none());
    }

    #[tokio::test]
    async fn test_closed_session_ends_stream() {
        let (tx, rx) = watch::channel(signed_out());
        let mut navigator = Navigator::new(rx);
        drop(tx);
        assert!(navigator.next_change().await.is_none());
    }
}
