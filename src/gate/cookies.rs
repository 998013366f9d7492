//! Credential cookies and the mutations the gate applies to them.
//!
//! Decisions never touch a jar directly: they collect [`CookieOp`]s which are
//! rendered once, with one set of attributes, when the response is built.

use axum::http::{
    header::{InvalidHeaderValue, COOKIE, SET_COOKIE},
    HeaderMap, HeaderValue,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use secrecy::{ExposeSecret, SecretString};
use std::fmt;

pub const ACCESS_TOKEN_COOKIE: &str = "access_token";
pub const REFRESH_TOKEN_COOKIE: &str = "refresh_token";
pub const CURRENT_ORG_COOKIE: &str = "current_org_id";

/// 15 minutes
pub const ACCESS_TOKEN_MAX_AGE: i64 = 15 * 60;
/// 7 days
pub const REFRESH_TOKEN_MAX_AGE: i64 = 7 * 24 * 60 * 60;
/// 7 days
pub const CURRENT_ORG_MAX_AGE: i64 = 7 * 24 * 60 * 60;

/// Credential cookies presented with a request. Empty values count as absent.
#[derive(Debug, Default)]
pub struct Credentials {
    pub access_token: Option<SecretString>,
    pub refresh_token: Option<SecretString>,
    pub current_org_id: Option<String>,
}

impl Credentials {
    #[must_use]
    pub fn from_jar(jar: &CookieJar) -> Self {
        Self {
            access_token: non_empty(jar, ACCESS_TOKEN_COOKIE).map(SecretString::from),
            refresh_token: non_empty(jar, REFRESH_TOKEN_COOKIE).map(SecretString::from),
            current_org_id: non_empty(jar, CURRENT_ORG_COOKIE),
        }
    }
}

fn non_empty(jar: &CookieJar, name: &str) -> Option<String> {
    jar.get(name)
        .map(|cookie| cookie.value().to_string())
        .filter(|value| !value.is_empty())
}

#[derive(Clone, PartialEq, Eq)]
pub enum CookieOp {
    Set {
        name: &'static str,
        value: String,
        max_age: i64,
    },
    Delete {
        name: &'static str,
    },
}

impl CookieOp {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Set { name, .. } | Self::Delete { name } => name,
        }
    }
}

// Token values must never reach the logs.
impl fmt::Debug for CookieOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Set { name, max_age, .. } => f
                .debug_struct("Set")
                .field("name", name)
                .field("value", &"[REDACTED]")
                .field("max_age", max_age)
                .finish(),
            Self::Delete { name } => f.debug_struct("Delete").field("name", name).finish(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CookieOps(Vec<CookieOp>);

impl CookieOps {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_access_token(&mut self, token: &SecretString) {
        self.set(
            ACCESS_TOKEN_COOKIE,
            token.expose_secret().to_string(),
            ACCESS_TOKEN_MAX_AGE,
        );
    }

    pub fn set_refresh_token(&mut self, token: &SecretString) {
        self.set(
            REFRESH_TOKEN_COOKIE,
            token.expose_secret().to_string(),
            REFRESH_TOKEN_MAX_AGE,
        );
    }

    pub fn set_current_org(&mut self, org_id: &str) {
        self.set(CURRENT_ORG_COOKIE, org_id.to_string(), CURRENT_ORG_MAX_AGE);
    }

    /// Drop both session tokens.
    pub fn clear_tokens(&mut self) {
        self.0.push(CookieOp::Delete {
            name: ACCESS_TOKEN_COOKIE,
        });
        self.0.push(CookieOp::Delete {
            name: REFRESH_TOKEN_COOKIE,
        });
    }

    fn set(&mut self, name: &'static str, value: String, max_age: i64) {
        self.0.push(CookieOp::Set {
            name,
            value,
            max_age,
        });
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CookieOp> {
        self.0.iter()
    }

    /// Render every operation as a `Set-Cookie` on the response jar.
    #[must_use]
    pub fn apply(&self, mut jar: CookieJar, secure: bool) -> CookieJar {
        for op in &self.0 {
            jar = jar.add(build_cookie(op, secure));
        }
        jar
    }

    /// Drop operations on cookies the destination's response already sets.
    pub fn defer_to(&mut self, response_headers: &HeaderMap) {
        let upstream: Vec<String> = response_headers
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .filter_map(|value| Cookie::parse(value).ok())
            .map(|cookie| cookie.name().to_string())
            .collect();

        if !upstream.is_empty() {
            self.0
                .retain(|op| !upstream.iter().any(|name| name == op.name()));
        }
    }

    /// Rewrite the inbound `Cookie` header so the destination handler sees the
    /// same credentials the browser will hold after this response.
    ///
    /// Only the pairs named by an operation are touched; every other cookie is
    /// forwarded exactly as the browser sent it. The header is left alone when
    /// no operation changes what was sent.
    ///
    /// # Errors
    /// Returns an error if a cookie value cannot be encoded as a header value.
    pub fn apply_to_request(&self, headers: &mut HeaderMap) -> Result<(), InvalidHeaderValue> {
        let original: Vec<String> = headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(';'))
            .map(str::trim)
            .filter(|pair| !pair.is_empty())
            .map(ToString::to_string)
            .collect();

        let mut pairs = original.clone();
        for op in &self.0 {
            match op {
                CookieOp::Set { name, value, .. } => {
                    // Same encoding the browser echoes back from our Set-Cookie.
                    let pair = Cookie::new(*name, value.clone()).encoded().to_string();
                    match pairs.iter().position(|existing| pair_name(existing) == *name) {
                        Some(index) => {
                            pairs[index] = pair;
                            let mut seen = 0;
                            pairs.retain(|existing| {
                                if pair_name(existing) != *name {
                                    return true;
                                }
                                seen += 1;
                                seen == 1
                            });
                        }
                        None => pairs.push(pair),
                    }
                }
                CookieOp::Delete { name } => {
                    pairs.retain(|existing| pair_name(existing) != *name);
                }
            }
        }

        if pairs == original {
            return Ok(());
        }

        headers.remove(COOKIE);
        if !pairs.is_empty() {
            headers.insert(COOKIE, HeaderValue::from_str(&pairs.join("; "))?);
        }

        Ok(())
    }
}

fn pair_name(pair: &str) -> &str {
    pair.split_once('=').map_or(pair, |(name, _)| name).trim()
}

fn build_cookie(op: &CookieOp, secure: bool) -> Cookie<'static> {
    let (name, value, max_age) = match op {
        CookieOp::Set {
            name,
            value,
            max_age,
        } => (*name, value.clone(), *max_age),
        CookieOp::Delete { name } => (*name, String::new(), 0),
    };

    let mut cookie = Cookie::build((name, value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(time::Duration::seconds(max_age))
        .build();

    if matches!(op, CookieOp::Delete { .. }) {
        cookie.make_removal();
    }

    cookie
}
