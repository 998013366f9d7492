//! The request gate.
//!
//! Flow Overview: classify the path, then either let public traffic through,
//! try a silent refresh for requests without an access token, or verify the
//! access token and route the user by organization membership.
//!
//! Refresh problems fail closed (login redirect). Verify and organization
//! lookups that cannot reach the identity service fail open: the request
//! continues untouched and the destination enforces access itself.

pub mod config;
pub mod cookies;
pub mod decision;
pub mod routes;

pub use self::config::GateConfig;
pub use self::cookies::{CookieOp, CookieOps, Credentials};
pub use self::decision::Decision;
pub use self::routes::{RouteClass, RouteTable};

use self::{
    decision::{CREATE_ORGANIZATION, DASHBOARD},
    routes::{is_api_route, is_auth_page, is_excluded},
};
use crate::identity::{IdentityClient, UpstreamError};
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use secrecy::SecretString;
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Clone, Debug)]
pub struct Gate {
    config: GateConfig,
    identity: IdentityClient,
}

impl Gate {
    /// # Errors
    /// Returns an error if the identity service client cannot be built.
    pub fn new(config: GateConfig) -> Result<Self, reqwest::Error> {
        let identity = IdentityClient::new(&config)?;
        Ok(Self { config, identity })
    }

    #[must_use]
    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    /// Decide what happens to a request for `path` carrying `credentials`.
    pub async fn decide(&self, path: &str, credentials: &Credentials) -> Decision {
        let class = self.config.routes().classify(path);

        if class == RouteClass::Public {
            if credentials.access_token.is_some() && is_auth_page(path) {
                return Decision::redirect(DASHBOARD);
            }
            return Decision::pass();
        }

        let Some(access_token) = &credentials.access_token else {
            return self
                .refresh_or_login(path, credentials.refresh_token.as_ref())
                .await;
        };

        match self
            .gate_verified(path, class, access_token, credentials)
            .await
        {
            Ok(decision) => decision,
            Err(err) => {
                warn!(path, "identity service unavailable, deferring to destination: {err}");
                Decision::pass()
            }
        }
    }

    async fn refresh_or_login(&self, path: &str, refresh_token: Option<&SecretString>) -> Decision {
        // API callers get their 401 from the API itself after the redirect.
        let Some(refresh_token) = refresh_token.filter(|_| !is_api_route(path)) else {
            return Decision::to_login(path);
        };

        match self.identity.refresh(refresh_token).await {
            Ok(tokens) => {
                let mut cookies = CookieOps::new();
                cookies.set_access_token(&tokens.access_token);
                if let Some(rotated) = &tokens.refresh_token {
                    cookies.set_refresh_token(rotated);
                }
                Decision::pass_with(cookies)
            }
            Err(err) if err.is_transport() => {
                warn!(path, "token refresh failed: {err}");
                Decision::to_login(path)
            }
            Err(err) => {
                debug!(path, "token refresh rejected: {err}");
                Decision::to_login(path)
            }
        }
    }

    /// Only transport failures escape as `Err`; rejections become decisions.
    async fn gate_verified(
        &self,
        path: &str,
        class: RouteClass,
        access_token: &SecretString,
        credentials: &Credentials,
    ) -> Result<Decision, UpstreamError> {
        match self.identity.verify(access_token).await {
            Ok(()) => {}
            Err(err) if err.is_transport() => return Err(err),
            Err(err) => {
                debug!(path, "access token rejected: {err}");
                return Ok(Decision::to_login(path).clearing_tokens());
            }
        }

        let organizations = match self.identity.organizations(access_token).await {
            Ok(organizations) => organizations,
            Err(err) if err.is_transport() => return Err(err),
            Err(err) => {
                // TODO: decide whether a failed membership lookup should block protected pages
                debug!(path, "organization lookup failed: {err}");
                return Ok(Decision::pass());
            }
        };

        if class == RouteClass::Onboarding {
            if organizations.is_empty() {
                return Ok(Decision::pass());
            }
            return Ok(Decision::redirect(DASHBOARD));
        }

        let Some(first) = organizations.first() else {
            if is_api_route(path) {
                return Ok(Decision::pass());
            }
            return Ok(Decision::redirect(CREATE_ORGANIZATION));
        };

        let current = credentials.current_org_id.as_deref().unwrap_or(&first.id);
        let mut cookies = CookieOps::new();
        cookies.set_current_org(current);

        Ok(Decision::pass_with(cookies))
    }
}

/// Axum middleware running the gate in front of the wrapped service.
///
/// Use with `axum::middleware::from_fn_with_state(Arc<Gate>, middleware)`.
pub async fn middleware(
    State(gate): State<Arc<Gate>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    if is_excluded(&path) {
        return next.run(request).await;
    }

    let credentials = Credentials::from_jar(&jar);
    let decision = gate.decide(&path, &credentials).await;
    debug!(path = %path, ?decision, "gate decision");

    let secure = gate.config.cookie_secure();
    match decision {
        Decision::Pass { mut cookies } => {
            if let Err(err) = cookies.apply_to_request(request.headers_mut()) {
                warn!(path = %path, "could not forward updated cookies: {err}");
            }
            let response = next.run(request).await;
            // The destination has the last word on cookies it sets itself.
            cookies.defer_to(response.headers());
            (cookies.apply(jar, secure), response).into_response()
        }
        Decision::Redirect { location, cookies } => {
            (cookies.apply(jar, secure), Redirect::temporary(&location)).into_response()
        }
    }
}
