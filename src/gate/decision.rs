use super::cookies::CookieOps;
use url::form_urlencoded;

pub const DASHBOARD: &str = "/dashboard";
pub const LOGIN: &str = "/login";
pub const CREATE_ORGANIZATION: &str = "/create-organization";

/// Outcome of gating one request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Decision {
    /// Continue to the destination, applying `cookies` on the way.
    Pass { cookies: CookieOps },
    /// Send the browser elsewhere, applying `cookies` to the redirect.
    Redirect { location: String, cookies: CookieOps },
}

impl Decision {
    #[must_use]
    pub fn pass() -> Self {
        Self::Pass {
            cookies: CookieOps::new(),
        }
    }

    #[must_use]
    pub fn pass_with(cookies: CookieOps) -> Self {
        Self::Pass { cookies }
    }

    #[must_use]
    pub fn redirect(location: impl Into<String>) -> Self {
        Self::Redirect {
            location: location.into(),
            cookies: CookieOps::new(),
        }
    }

    /// Redirect to the login page, remembering where the user was headed.
    #[must_use]
    pub fn to_login(path: &str) -> Self {
        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair("redirect", path)
            .finish();
        Self::redirect(format!("{LOGIN}?{query}"))
    }

    /// Expire both session tokens as part of this decision.
    #[must_use]
    pub fn clearing_tokens(mut self) -> Self {
        match &mut self {
            Self::Pass { cookies } | Self::Redirect { cookies, .. } => cookies.clear_tokens(),
        }
        self
    }

    #[must_use]
    pub fn cookies(&self) -> &CookieOps {
        match self {
            Self::Pass { cookies } | Self::Redirect { cookies, .. } => cookies,
        }
    }

    #[must_use]
    pub fn location(&self) -> Option<&str> {
        match self {
            Self::Pass { .. } => None,
            Self::Redirect { location, .. } => Some(location),
        }
    }

    #[must_use]
    pub fn is_pass(&self) -> bool {
        matches!(self, Self::Pass { .. })
    }
}
