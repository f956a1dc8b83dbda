//! Routes and the session gates in front of them.

use std::fmt;

use crate::auth::AuthState;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Home,
    Login,
    Register,
    MyBlogs,
    CreateBlog,
    Explore,
    Blog(String),
    EditBlog(String),
}

/// Who may see a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Open,
    /// Only without a session, e.g. registration.
    NoAuth,
    Auth,
}

impl Route {
    pub fn path(&self) -> String {
        match self {
            Route::Home => "/".into(),
            Route::Login => "/login".into(),
            Route::Register => "/register".into(),
            Route::MyBlogs => "/myBlogs".into(),
            Route::CreateBlog => "/createBlog".into(),
            Route::Explore => "/explore".into(),
            Route::Blog(id) => format!("/blog/{id}"),
            Route::EditBlog(id) => format!("/editBlog/{id}"),
        }
    }

    pub fn parse(path: &str) -> Option<Self> {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let trimmed = path.trim_end_matches('/');
        let route = match trimmed {
            "" => Route::Home,
            "/login" => Route::Login,
            "/register" => Route::Register,
            "/myBlogs" => Route::MyBlogs,
            "/createBlog" => Route::CreateBlog,
            "/explore" => Route::Explore,
            other => {
                let (prefix, id) = other.rsplit_once('/')?;
                if id.is_empty() {
                    return None;
                }
                match prefix {
                    "/blog" => Route::Blog(id.to_string()),
                    "/editBlog" => Route::EditBlog(id.to_string()),
                    _ => return None,
                }
            }
        };
        Some(route)
    }

    pub fn access(&self) -> Access {
        match self {
            Route::Home | Route::Login => Access::Open,
            Route::Register => Access::NoAuth,
            Route::MyBlogs
            | Route::CreateBlog
            | Route::Explore
            | Route::Blog(_)
            | Route::EditBlog(_) => Access::Auth,
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

/// Result of passing a gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Guarded<V> {
    Render(V),
    Redirect(Route),
}

impl<V> Guarded<V> {
    pub fn rendered(self) -> Option<V> {
        match self {
            Guarded::Render(view) => Some(view),
            Guarded::Redirect(_) => None,
        }
    }
}

/// Build the view only with a session, else send the user to log in.
pub fn require_auth<V>(state: &AuthState, view: impl FnOnce() -> V) -> Guarded<V> {
    if state.is_authenticated() {
        Guarded::Render(view())
    } else {
        Guarded::Redirect(Route::Login)
    }
}

/// Build the view only without a session, else send the user home.
pub fn require_no_auth<V>(state: &AuthState, view: impl FnOnce() -> V) -> Guarded<V> {
    if state.is_authenticated() {
        Guarded::Redirect(Route::Home)
    } else {
        Guarded::Render(view())
    }
}

/// Where `route` redirects for `state`, if anywhere.
pub fn redirect_for(route: &Route, state: &AuthState) -> Option<Route> {
    let gate = match route.access() {
        Access::Open => return None,
        Access::NoAuth => require_no_auth(state, || ()),
        Access::Auth => require_auth(state, || ()),
    };
    match gate {
        Guarded::Render(()) => None,
        Guarded::Redirect(to) => Some(to),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quire_common::User;

    fn signed_in() -> AuthState {
        AuthState {
            user: Some(User {
                id: "u1".into(),
                name: "A".into(),
                email: "a@b.com".into(),
                verified: None,
            }),
        }
    }

    #[test]
    fn test_route_paths_parse_back() {
        let routes = [
            Route::Home,
            Route::Login,
            Route::Register,
            Route::MyBlogs,
            Route::CreateBlog,
            Route::Explore,
            Route::Blog("b1".into()),
            Route::EditBlog("b1".into()),
        ];
        for route in routes {
            assert_eq!(Route::parse(&route.path()), Some(route));
        }
        assert_eq!(Route::parse("/explore/?q=x"), Some(Route::Explore));
        assert_eq!(Route::parse("/blog/"), None);
        assert_eq!(Route::parse("/nowhere"), None);
    }

    #[test]
    fn test_require_auth() {
        let anon = AuthState::default();
        assert_eq!(require_auth(&anon, || "view"), Guarded::Redirect(Route::Login));
        assert_eq!(require_auth(&signed_in(), || "view"), Guarded::Render("view"));
    }

    #[test]
    fn test_require_no_auth() {
        let anon = AuthState::default();
        assert_eq!(require_no_auth(&anon, || 1), Guarded::Render(1));
        assert_eq!(require_no_auth(&signed_in(), || 1), Guarded::Redirect(Route::Home));
    }

    #[test]
    fn test_route_table() {
        let anon = AuthState::default();
        let user = signed_in();
        assert_eq!(redirect_for(&Route::Home, &anon), None);
        assert_eq!(redirect_for(&Route::Login, &user), None);
        assert_eq!(redirect_for(&Route::Register, &user), Some(Route::Home));
        assert_eq!(redirect_for(&Route::Register, &anon), None);
        for route in [
            Route::MyBlogs,
            Route::CreateBlog,
            Route::Explore,
            Route::Blog("x".into()),
            Route::EditBlog("x".into()),
        ] {
            assert_eq!(redirect_for(&route, &anon), Some(Route::Login));
            assert_eq!(redirect_for(&route, &user), None);
        }
    }
}
