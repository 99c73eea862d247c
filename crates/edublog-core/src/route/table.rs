//! Static route tables, one per authentication state
//!
//! Protected screens are not registered at all while signed out, and the
//! login screen is not registered while signed in.

use crate::route::{Route, RouteKind};
use crate::session::Session;

/// Set of routes registered for one authentication state
#[derive(Debug, PartialEq, Eq)]
pub struct RouteTable {
    name: &'static str,
    landing: RouteKind,
    routes: &'static [RouteKind],
}

pub static UNAUTHENTICATED_ROUTES: RouteTable = RouteTable {
    name: "not-authenticated",
    landing: RouteKind::Login,
    routes: &[RouteKind::Login, RouteKind::Modal],
};

pub static AUTHENTICATED_ROUTES: RouteTable = RouteTable {
    name: "authenticated",
    landing: RouteKind::Home,
    routes: &[
        RouteKind::Home,
        RouteKind::ManageUsers,
        RouteKind::MyProfile,
        RouteKind::PostDetail,
        RouteKind::UserProfile,
        RouteKind::CreatePost,
        RouteKind::EditPost,
        RouteKind::AddUser,
        RouteKind::EditUser,
        RouteKind::UserDetails,
        RouteKind::Modal,
    ],
};

impl RouteTable {
    /// Table for the given session, keyed on the full authentication predicate
    pub fn for_session(session: &Session) -> &'static RouteTable {
        if session.is_authenticated() {
            &AUTHENTICATED_ROUTES
        } else {
            &UNAUTHENTICATED_ROUTES
        }
    }

    /// Key of the navigation graph; changes whenever the graph is swapped
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Where a fresh graph starts
    pub fn landing(&self) -> Route {
        match self.landing {
            RouteKind::Home => Route::Home,
            _ => Route::Login,
        }
    }

    pub fn kinds(&self) -> &'static [RouteKind] {
        self.routes
    }

    /// Whether the route is registered. Unknown paths never are.
    pub fn contains(&self, route: &Route) -> bool {
        route.kind().is_some_and(|kind| self.routes.contains(&kind))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::route::RouteGroup;
    use crate::session::SessionStatus;
    use crate::user::{RoleProfile, UserRecord};

    #[test]
    fn test_tables_partition_groups() {
        for kind in RouteKind::ALL {
            let in_auth = AUTHENTICATED_ROUTES.kinds().contains(&kind);
            let in_unauth = UNAUTHENTICATED_ROUTES.kinds().contains(&kind);
            match kind.group() {
                RouteGroup::Public => assert!(!in_auth && in_unauth, "{kind:?}"),
                RouteGroup::Protected => assert!(in_auth && !in_unauth, "{kind:?}"),
                RouteGroup::Other => assert!(in_auth && in_unauth, "{kind:?}"),
            }
        }
    }

    #[test]
    fn test_table_selection() {
        let mut session = Session {
            token: Some("abc".to_string()),
            user: Some(UserRecord {
                id: "1".to_string(),
                email: "a@x.com".to_string(),
                name: "A".to_string(),
                profile: RoleProfile::Admin,
                school: None,
                age: None,
                profile_image: None,
                is_active: true,
                last_login: None,
                created_at: None,
                updated_at: None,
            }),
            status: SessionStatus::Authenticated,
        };
        let table = RouteTable::for_session(&session);
        assert_eq!(table.name(), "authenticated");
        assert_eq!(table.landing(), Route::Home);
        assert!(table.contains(&Route::PostDetail("1".into())));
        assert!(!table.contains(&Route::Login));

        session.token = None;
        let table = RouteTable::for_session(&session);
        assert_eq!(table.name(), "not-authenticated");
        assert_eq!(table.landing(), Route::Login);
        assert!(!table.contains(&Route::PostDetail("1".into())));
        assert!(!table.contains(&Route::NotFound("/x".into())));
    }
}
