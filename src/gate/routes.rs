//! Static route classification.

use once_cell::sync::Lazy;
use regex::Regex;

/// Paths reachable without credentials (exact match).
pub const PUBLIC_ROUTES: &[&str] = &[
    "/",
    "/login",
    "/signup",
    "/forgot-password",
    "/reset-password",
    "/verify-email",
];

/// Path prefixes reachable without credentials.
pub const PUBLIC_PREFIXES: &[&str] = &["/api/auth"];

/// First-time setup paths, including their sub-paths.
pub const ONBOARDING_ROUTES: &[&str] = &["/create-organization", "/choose-plan", "/invite-team"];

/// Public paths that a signed-in user is bounced away from.
pub const AUTH_PAGES: &[&str] = &["/login", "/signup"];

const API_PREFIX: &str = "/api/";

// Static assets, image optimization, favicon and image files never reach the gate.
const ASSET_PATTERN: &str =
    r"^/(?:_next/static|_next/image|static/|favicon\.ico)|\.(?:svg|png|jpg|jpeg|gif|webp)$";

static ASSETS: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(ASSET_PATTERN).ok());

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RouteClass {
    Public,
    Onboarding,
    Protected,
}

#[derive(Clone, Debug)]
pub struct RouteTable {
    public: Vec<String>,
    public_prefixes: Vec<String>,
    onboarding: Vec<String>,
}

impl Default for RouteTable {
    fn default() -> Self {
        Self {
            public: to_owned(PUBLIC_ROUTES),
            public_prefixes: to_owned(PUBLIC_PREFIXES),
            onboarding: to_owned(ONBOARDING_ROUTES),
        }
    }
}

impl RouteTable {
    #[must_use]
    pub fn with_public_routes(mut self, routes: &[&str]) -> Self {
        self.public = to_owned(routes);
        self
    }

    #[must_use]
    pub fn with_public_prefixes(mut self, prefixes: &[&str]) -> Self {
        self.public_prefixes = to_owned(prefixes);
        self
    }

    #[must_use]
    pub fn with_onboarding_routes(mut self, routes: &[&str]) -> Self {
        self.onboarding = to_owned(routes);
        self
    }

    /// Map a request path to exactly one route class. Public wins over onboarding.
    #[must_use]
    pub fn classify(&self, path: &str) -> RouteClass {
        if self.is_public(path) {
            RouteClass::Public
        } else if self.is_onboarding(path) {
            RouteClass::Onboarding
        } else {
            RouteClass::Protected
        }
    }

    fn is_public(&self, path: &str) -> bool {
        self.public.iter().any(|route| route == path)
            || self
                .public_prefixes
                .iter()
                .any(|prefix| path.starts_with(prefix.as_str()))
    }

    fn is_onboarding(&self, path: &str) -> bool {
        self.onboarding.iter().any(|route| {
            path.strip_prefix(route.as_str())
                .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
        })
    }
}

/// API paths get status-driven handling instead of page redirects.
#[must_use]
pub fn is_api_route(path: &str) -> bool {
    path.starts_with(API_PREFIX)
}

#[must_use]
pub fn is_auth_page(path: &str) -> bool {
    AUTH_PAGES.contains(&path)
}

/// Paths outside the gate's routing surface.
#[must_use]
pub fn is_excluded(path: &str) -> bool {
    ASSETS.as_ref().is_some_and(|re| re.is_match(path))
}

fn to_owned(routes: &[&str]) -> Vec<String> {
    routes.iter().map(|route| (*route).to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn asset_pattern_compiles() {
        assert!(ASSETS.is_some());
    }

    #[test]
    fn classify_public_exact_and_prefix() {
        let table = RouteTable::default();
        for path in PUBLIC_ROUTES {
            assert_eq!(table.classify(path), RouteClass::Public, "{path}");
        }
        assert_eq!(table.classify("/api/auth/login"), RouteClass::Public);
        assert_eq!(table.classify("/api/auth"), RouteClass::Public);
        // exact match only for the list
        assert_eq!(table.classify("/login/extra"), RouteClass::Protected);
    }

    #[test]
    fn classify_onboarding() {
        let table = RouteTable::default();
        assert_eq!(
            table.classify("/create-organization"),
            RouteClass::Onboarding
        );
        assert_eq!(table.classify("/choose-plan/pro"), RouteClass::Onboarding);
        assert_eq!(table.classify("/invite-team"), RouteClass::Onboarding);
        assert_eq!(
            table.classify("/create-organization/step-2"),
            RouteClass::Onboarding
        );
    }

    #[test]
    fn onboarding_matches_whole_segments() {
        let table = RouteTable::default();
        assert_eq!(table.classify("/invite-teammates"), RouteClass::Protected);
        assert_eq!(
            table.classify("/create-organizations"),
            RouteClass::Protected
        );
        assert_eq!(table.classify("/choose-planner"), RouteClass::Protected);
    }

    #[test]
    fn classify_protected() {
        let table = RouteTable::default();
        assert_eq!(table.classify("/dashboard"), RouteClass::Protected);
        assert_eq!(table.classify("/api/projects"), RouteClass::Protected);
        assert_eq!(table.classify("/settings/billing"), RouteClass::Protected);
    }

    #[test]
    fn custom_tables() {
        let table = RouteTable::default()
            .with_public_routes(&["/pricing"])
            .with_public_prefixes(&["/docs"])
            .with_onboarding_routes(&["/welcome"]);
        assert_eq!(table.classify("/pricing"), RouteClass::Public);
        assert_eq!(table.classify("/docs/intro"), RouteClass::Public);
        assert_eq!(table.classify("/welcome"), RouteClass::Onboarding);
        assert_eq!(table.classify("/login"), RouteClass::Protected);
    }

    #[test]
    fn api_routes() {
        assert!(is_api_route("/api/projects"));
        assert!(is_api_route("/api/auth/refresh"));
        assert!(!is_api_route("/api"));
        assert!(!is_api_route("/dashboard"));
    }

    #[test]
    fn auth_pages() {
        assert!(is_auth_page("/login"));
        assert!(is_auth_page("/signup"));
        assert!(!is_auth_page("/"));
        assert!(!is_auth_page("/forgot-password"));
    }

    #[test]
    fn excluded_assets() {
        assert!(is_excluded("/_next/static/chunks/main.js"));
        assert!(is_excluded("/_next/image"));
        assert!(is_excluded("/static/app.css"));
        assert!(is_excluded("/favicon.ico"));
        assert!(is_excluded("/images/logo.svg"));
        assert!(is_excluded("/avatar.jpeg"));
        assert!(is_excluded("/banner.webp"));
    }

    #[test]
    fn gated_paths_not_excluded() {
        assert!(!is_excluded("/"));
        assert!(!is_excluded("/dashboard"));
        assert!(!is_excluded("/api/projects"));
        assert!(!is_excluded("/docs/png-guide"));
        assert!(!is_excluded("/statistics"));
    }
}
