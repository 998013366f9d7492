use super::routes::RouteTable;
use std::time::Duration;

/// Everything the gate needs to know about its environment.
#[derive(Clone, Debug)]
pub struct GateConfig {
    identity_url: String,
    production: bool,
    identity_timeout: Option<Duration>,
    routes: RouteTable,
}

impl GateConfig {
    /// `identity_url` is the identity service base URL, without a trailing slash.
    #[must_use]
    pub fn new(identity_url: impl Into<String>) -> Self {
        let identity_url: String = identity_url.into();
        Self {
            identity_url: identity_url.trim_end_matches('/').to_string(),
            production: false,
            identity_timeout: None,
            routes: RouteTable::default(),
        }
    }

    #[must_use]
    pub fn with_production(mut self, production: bool) -> Self {
        self.production = production;
        self
    }

    #[must_use]
    pub fn with_identity_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.identity_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_routes(mut self, routes: RouteTable) -> Self {
        self.routes = routes;
        self
    }

    #[must_use]
    pub fn identity_url(&self) -> &str {
        &self.identity_url
    }

    #[must_use]
    pub fn production(&self) -> bool {
        self.production
    }

    #[must_use]
    pub fn identity_timeout(&self) -> Option<Duration> {
        self.identity_timeout
    }

    #[must_use]
    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// Cookies only carry `Secure` in production.
    pub(crate) fn cookie_secure(&self) -> bool {
        self.production
    }
}
