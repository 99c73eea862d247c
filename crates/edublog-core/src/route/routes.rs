//! Navigable destinations of the client

use crate::user::Role;

/// Access group of a route
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteGroup {
    /// Reachable only without a session (the login screen)
    Public,
    /// Requires an authenticated session
    Protected,
    /// Reachable in any settled state
    Other,
}

/// Route identity without parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteKind {
    Login,
    Home,
    ManageUsers,
    MyProfile,
    PostDetail,
    UserProfile,
    CreatePost,
    EditPost,
    AddUser,
    EditUser,
    UserDetails,
    Modal,
}

const AUTHORS: &[Role] = &[Role::Professor, Role::Admin];
const ADMINS: &[Role] = &[Role::Admin];

impl RouteKind {
    pub const ALL: [RouteKind; 12] = [
        RouteKind::Login,
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
    ];

    pub fn group(self) -> RouteGroup {
        match self {
            RouteKind::Login => RouteGroup::Public,
            RouteKind::Modal => RouteGroup::Other,
            _ => RouteGroup::Protected,
        }
    }

    /// Roles allowed on this screen; `None` means any authenticated user
    pub fn required_roles(self) -> Option<&'static [Role]> {
        match self {
            RouteKind::CreatePost | RouteKind::EditPost => Some(AUTHORS),
            RouteKind::ManageUsers
            | RouteKind::AddUser
            | RouteKind::EditUser
            | RouteKind::UserDetails => Some(ADMINS),
            _ => None,
        }
    }

    /// Screen title
    pub fn title(self) -> &'static str {
        match self {
            RouteKind::Login => "Login",
            RouteKind::Home => "Home",
            RouteKind::ManageUsers => "Users",
            RouteKind::MyProfile => "My Profile",
            RouteKind::PostDetail => "Post Details",
            RouteKind::UserProfile => "User Profile",
            RouteKind::CreatePost => "Create Post",
            RouteKind::EditPost => "Edit Post",
            RouteKind::AddUser => "Add User",
            RouteKind::EditUser => "Edit User",
            RouteKind::UserDetails => "User Details",
            RouteKind::Modal => "Modal",
        }
    }
}

/// A concrete destination, parameters included
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Route {
    Login,
    Home,
    ManageUsers,
    MyProfile,
    PostDetail(String),
    UserProfile(String),
    CreatePost,
    EditPost(String),
    AddUser,
    EditUser(String),
    UserDetails(String),
    Modal,
    /// Unknown path, kept verbatim for the not-found screen
    NotFound(String),
}

impl Route {
    /// Parse a navigation path such as `/posts/42`
    pub fn parse(path: &str) -> Route {
        let trimmed = path.trim().trim_matches('/');
        let segments: Vec<&str> = trimmed.split('/').filter(|s| !s.is_empty()).collect();

        match segments.as_slice() {
            [] | ["(tabs)"] => Route::Home,
            ["login"] => Route::Login,
            ["two"] => Route::ManageUsers,
            ["profile"] => Route::MyProfile,
            ["profile", id] => Route::UserProfile(id.to_string()),
            ["posts", id] => Route::PostDetail(id.to_string()),
            ["create-post"] => Route::CreatePost,
            ["edit-post", id] => Route::EditPost(id.to_string()),
            ["add-user"] => Route::AddUser,
            ["edit-user", id] => Route::EditUser(id.to_string()),
            ["user-details", id] => Route::UserDetails(id.to_string()),
            ["modal"] => Route::Modal,
            _ => Route::NotFound(format!("/{}", trimmed)),
        }
    }

    pub fn path(&self) -> String {
        match self {
            Route::Login => "/login".to_string(),
            Route::Home => "/".to_string(),
            Route::ManageUsers => "/two".to_string(),
            Route::MyProfile => "/profile".to_string(),
            Route::PostDetail(id) => format!("/posts/{}", id),
            Route::UserProfile(id) => format!("/profile/{}", id),
            Route::CreatePost => "/create-post".to_string(),
            Route::EditPost(id) => format!("/edit-post/{}", id),
            Route::AddUser => "/add-user".to_string(),
            Route::EditUser(id) => format!("/edit-user/{}", id),
            Route::UserDetails(id) => format!("/user-details/{}", id),
            Route::Modal => "/modal".to_string(),
            Route::NotFound(path) => path.clone(),
        }
    }

    /// `None` for unknown paths
    pub fn kind(&self) -> Option<RouteKind> {
        Some(match self {
            Route::Login => RouteKind::Login,
            Route::Home => RouteKind::Home,
            Route::ManageUsers => RouteKind::ManageUsers,
            Route::MyProfile => RouteKind::MyProfile,
            Route::PostDetail(_) => RouteKind::PostDetail,
            Route::UserProfile(_) => RouteKind::UserProfile,
            Route::CreatePost => RouteKind::CreatePost,
            Route::EditPost(_) => RouteKind::EditPost,
            Route::AddUser => RouteKind::AddUser,
            Route::EditUser(_) => RouteKind::EditUser,
            Route::UserDetails(_) => RouteKind::UserDetails,
            Route::Modal => RouteKind::Modal,
            Route::NotFound(_) => return None,
        })
    }

    pub fn group(&self) -> RouteGroup {
        self.kind().map_or(RouteGroup::Other, RouteKind::group)
    }

    pub fn required_roles(&self) -> Option<&'static [Role]> {
        self.kind().and_then(RouteKind::required_roles)
    }
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_path_agree() {
        let paths = [
            "/",
            "/login",
            "/two",
            "/profile",
            "/profile/7",
            "/posts/42",
            "/create-post",
            "/edit-post/42",
            "/add-user",
            "/edit-user/7",
            "/user-details/7",
            "/modal",
        ];
        for path in paths {
            assert_eq!(Route::parse(path).path(), path);
        }
    }

    #[test]
    fn test_parse_tolerates_slashes() {
        assert_eq!(Route::parse(""), Route::Home);
        assert_eq!(Route::parse("(tabs)"), Route::Home);
        assert_eq!(Route::parse("posts/42/"), Route::PostDetail("42".to_string()));
        assert_eq!(
            Route::parse("/posts"),
            Route::NotFound("/posts".to_string())
        );
    }

    #[test]
    fn test_groups_and_roles() {
        assert_eq!(Route::Login.group(), RouteGroup::Public);
        assert_eq!(Route::Home.group(), RouteGroup::Protected);
        assert_eq!(Route::Modal.group(), RouteGroup::Other);
        assert_eq!(Route::NotFound("/x".into()).group(), RouteGroup::Other);

        assert_eq!(Route::CreatePost.required_roles(), Some(AUTHORS));
        assert_eq!(Route::UserDetails("1".into()).required_roles(), Some(ADMINS));
        assert!(Route::PostDetail("1".into()).required_roles().is_none());
    }
}
