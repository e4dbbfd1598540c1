//! Route table and navigation guard.
//!
//! The guard runs before every route transition and decides, from the
//! target's `requires_auth` flag and the current authentication state,
//! whether to let the navigation through or redirect it:
//! - protected route, not authenticated: redirect to login with `?redirect=<requested path>`
//! - login route, authenticated: redirect to the home route
//! - anything else: allow

pub mod error;
pub mod routes;

use std::collections::BTreeMap;
use std::fmt;

use tracing::debug;
use url::form_urlencoded;

use crate::auth::{Clock, SessionStore};
use crate::storage::SessionStorage;

pub use error::GuardError;
pub use routes::{ResolvedRoute, RouteRecord, RouteTable, RouteTarget};

/// Query parameter carrying the originally requested location to the login route.
pub const REDIRECT_QUERY_KEY: &str = "redirect";

/// Redirects followed by `navigate` before giving up.
const MAX_REDIRECTS: usize = 10;

/// Where to send a navigation instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    pub path: String,
    pub query: BTreeMap<String, String>,
}

impl Redirect {
    pub fn to(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            query: BTreeMap::new(),
        }
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    /// Path with the query URL-encoded, ready to resolve again.
    pub fn location(&self) -> String {
        if self.query.is_empty() {
            return self.path.clone();
        }
        let query = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(&self.query)
            .finish();
        format!("{}?{}", self.path, query)
    }
}

impl fmt::Display for Redirect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.location())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    Redirect(Redirect),
}

/// The guard rule, as a pure function of the target and the auth state.
pub fn decide(target: &RouteTarget, authenticated: bool, routes: &RouteTable) -> GuardDecision {
    if target.requires_auth && !authenticated {
        return GuardDecision::Redirect(
            Redirect::to(routes.login().path.clone())
                .with_query(REDIRECT_QUERY_KEY, target.full_path.clone()),
        );
    }

    if target.is_named(&routes.login().name) && authenticated {
        return GuardDecision::Redirect(Redirect::to(routes.home().path.clone()));
    }

    GuardDecision::Allow
}

/// A completed navigation: the route finally entered and the redirects on the way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigation {
    pub target: RouteTarget,
    pub redirects: Vec<String>,
}

impl Navigation {
    pub fn was_redirected(&self) -> bool {
        !self.redirects.is_empty()
    }
}

/// Guard bound to a session store and a route table.
pub struct NavigationGuard<'a, S, C> {
    store: &'a SessionStore<S, C>,
    routes: &'a RouteTable,
}

impl<'a, S: SessionStorage, C: Clock> NavigationGuard<'a, S, C> {
    pub fn new(store: &'a SessionStore<S, C>, routes: &'a RouteTable) -> Self {
        Self { store, routes }
    }

    pub fn routes(&self) -> &RouteTable {
        self.routes
    }

    /// Hook run before each transition. Checks authentication exactly once,
    /// so an expired session is evicted on every navigation attempt.
    pub fn before_each(&self, target: &RouteTarget) -> GuardDecision {
        let authenticated = self.store.is_authenticated();
        let decision = decide(target, authenticated, self.routes);
        debug!(to = %target.full_path, authenticated, ?decision, "Navigation guard");
        decision
    }

    /// Resolve `location` through the table and the guard, following
    /// redirects until a route is entered.
    pub fn navigate(&self, location: &str) -> Result<Navigation, GuardError> {
        let mut current = location.to_string();
        let mut redirects = Vec::new();

        loop {
            if redirects.len() > MAX_REDIRECTS {
                return Err(GuardError::TooManyRedirects(location.to_string()));
            }

            let next = match self.routes.resolve(&current)? {
                ResolvedRoute::Redirect(next) => next,
                ResolvedRoute::Matched(target) => match self.before_each(&target) {
                    GuardDecision::Allow => return Ok(Navigation { target, redirects }),
                    GuardDecision::Redirect(redirect) => redirect.location(),
                },
            };

            redirects.push(next.clone());
            current = next;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{FixedClock, Session};
    use crate::storage::MemoryStorage;

    const NOW: i64 = 1_700_000_000_000;

    fn target(routes: &RouteTable, location: &str) -> RouteTarget {
        match routes.resolve(location).unwrap() {
            ResolvedRoute::Matched(target) => target,
            ResolvedRoute::Redirect(to) => panic!("unexpected redirect to {}", to),
        }
    }

    fn store() -> SessionStore<MemoryStorage, FixedClock> {
        SessionStore::with_clock(MemoryStorage::new(), FixedClock(NOW))
    }

    #[test]
    fn test_protected_route_redirects_to_login_with_requested_path() {
        let routes = RouteTable::standard();
        let decision = decide(&target(&routes, "/dashboard"), false, &routes);
        assert_eq!(
            decision,
            GuardDecision::Redirect(Redirect::to("/").with_query("redirect", "/dashboard"))
        );
    }

    #[test]
    fn test_login_route_redirects_to_dashboard_when_authenticated() {
        let routes = RouteTable::standard();
        let decision = decide(&target(&routes, "/"), true, &routes);
        assert_eq!(decision, GuardDecision::Redirect(Redirect::to("/dashboard")));
    }

    #[test]
    fn test_public_routes_are_allowed_in_any_state() {
        let routes = RouteTable::standard().route(RouteRecord::new("about", "/about"));
        let about = target(&routes, "/about");
        assert_eq!(decide(&about, true, &routes), GuardDecision::Allow);
        assert_eq!(decide(&about, false, &routes), GuardDecision::Allow);
    }

    #[test]
    fn test_login_route_allowed_when_logged_out_and_protected_route_when_logged_in() {
        let routes = RouteTable::standard();
        assert_eq!(decide(&target(&routes, "/"), false, &routes), GuardDecision::Allow);
        assert_eq!(decide(&target(&routes, "/dashboard"), true, &routes), GuardDecision::Allow);
    }

    #[test]
    fn test_redirect_location_is_url_encoded() {
        let redirect = Redirect::to("/").with_query("redirect", "/dashboard?tab=2");
        assert_eq!(redirect.location(), "/?redirect=%2Fdashboard%3Ftab%3D2");
        assert_eq!(Redirect::to("/dashboard").to_string(), "/dashboard");
    }

    #[test]
    fn test_navigate_logged_out_lands_on_login_with_redirect_query() {
        let store = store();
        let routes = RouteTable::standard();
        let guard = NavigationGuard::new(&store, &routes);

        let nav = guard.navigate("/dashboard?tab=2").unwrap();
        assert!(nav.target.is_named("login"));
        assert_eq!(
            nav.target.query.get(REDIRECT_QUERY_KEY).map(String::as_str),
            Some("/dashboard?tab=2")
        );
        assert_eq!(nav.redirects, vec!["/?redirect=%2Fdashboard%3Ftab%3D2".to_string()]);
    }

    #[test]
    fn test_navigate_logged_in_skips_login() {
        let store = store();
        store.save(&Session::with_token("abc"), true).unwrap();
        let routes = RouteTable::standard();
        let guard = NavigationGuard::new(&store, &routes);

        let nav = guard.navigate("/").unwrap();
        assert!(nav.target.is_named("dashboard"));
        assert!(nav.was_redirected());
    }

    #[test]
    fn test_navigate_unknown_path_goes_through_catch_all() {
        let store = store();
        let routes = RouteTable::standard();
        let guard = NavigationGuard::new(&store, &routes);

        let nav = guard.navigate("/nowhere").unwrap();
        assert!(nav.target.is_named("login"));
        assert_eq!(nav.redirects, vec!["/".to_string()]);
    }

    #[test]
    fn test_navigation_evicts_expired_session() {
        let store = store();
        let mut session = Session::with_token("abc");
        session.expires_at = Some(NOW - 1);
        store.save(&session, true).unwrap();
        let routes = RouteTable::standard();
        let guard = NavigationGuard::new(&store, &routes);

        let nav = guard.navigate("/about-nothing").unwrap();
        assert!(nav.target.is_named("login"));
        assert_eq!(store.load(), None);
    }

    #[test]
    fn test_redirect_loop_is_reported() {
        let store = store();
        let routes = RouteTable::new(
            RouteRecord::new("login", "/login").requires_auth(),
            RouteRecord::new("home", "/"),
        );
        let guard = NavigationGuard::new(&store, &routes);

        assert_eq!(
            guard.navigate("/login"),
            Err(GuardError::TooManyRedirects("/login".to_string()))
        );
    }
}
