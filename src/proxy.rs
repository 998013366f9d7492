//! Forwarding of admitted requests to the upstream web application.

use crate::APP_USER_AGENT;
use anyhow::{Context, Result};
use axum::{
    body::Body,
    extract::{Request, State},
    http::{
        header::{self, HeaderName},
        HeaderMap, HeaderValue, StatusCode,
    },
    response::{IntoResponse, Response},
};
use http_body_util::{BodyExt, LengthLimitError, Limited};
use reqwest::{redirect::Policy, Client};
use std::sync::Arc;
use tracing::{error, instrument, warn};
use url::Url;

/// Largest request body buffered for forwarding (16 MiB).
const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

const X_FORWARDED_HOST: HeaderName = HeaderName::from_static("x-forwarded-host");

// Connection-scoped headers never cross the proxy.
const HOP_BY_HOP: [HeaderName; 9] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
    header::CONTENT_LENGTH,
];

#[derive(Clone, Debug)]
pub struct Upstream {
    client: Client,
    base_url: String,
}

impl Upstream {
    /// # Errors
    /// Returns an error if `base_url` is not an absolute http(s) URL or the client cannot be built.
    pub fn new(base_url: &str) -> Result<Self> {
        let parsed =
            Url::parse(base_url).with_context(|| format!("Invalid upstream URL: {base_url}"))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            anyhow::bail!("Upstream URL must use http or https: {base_url}");
        }

        // Redirects belong to the browser, not to the proxy.
        let client = Client::builder()
            .user_agent(APP_USER_AGENT)
            .redirect(Policy::none())
            .build()
            .context("Failed to build upstream HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[instrument(skip_all, fields(method = %request.method(), path = %request.uri().path()))]
    async fn send(&self, request: Request) -> Result<Response> {
        let (parts, body) = request.into_parts();

        let path_and_query = parts
            .uri
            .path_and_query()
            .map_or("/", |path_and_query| path_and_query.as_str());
        let url = format!("{}{path_and_query}", self.base_url);

        let mut headers = parts.headers;
        if let Some(host) = headers.remove(header::HOST) {
            headers.insert(X_FORWARDED_HOST, host);
        }
        strip_hop_by_hop(&mut headers);

        let body = match Limited::new(body, MAX_BODY_BYTES).collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(err) if err.downcast_ref::<LengthLimitError>().is_some() => {
                warn!(limit = MAX_BODY_BYTES, "request body too large");
                return Ok(StatusCode::PAYLOAD_TOO_LARGE.into_response());
            }
            Err(err) => return Err(anyhow::anyhow!(err).context("Failed to read request body")),
        };

        let upstream = self
            .client
            .request(parts.method, &url)
            .headers(headers)
            .body(body)
            .send()
            .await
            .with_context(|| format!("Upstream request to {url} failed"))?;

        let status = upstream.status();
        let mut headers = upstream.headers().clone();
        strip_hop_by_hop(&mut headers);

        let bytes = upstream
            .bytes()
            .await
            .context("Failed to read upstream response body")?;

        let mut response = Response::new(Body::from(bytes));
        *response.status_mut() = status;
        *response.headers_mut() = headers;

        Ok(response)
    }
}

fn strip_hop_by_hop(headers: &mut HeaderMap<HeaderValue>) {
    for name in &HOP_BY_HOP {
        headers.remove(name);
    }
}

/// Fallback handler: everything the gate admits ends up here.
pub async fn forward(State(upstream): State<Arc<Upstream>>, request: Request) -> Response {
    match upstream.send(request).await {
        Ok(response) => response,
        Err(err) => {
            error!("Failed to proxy request: {err:#}");
            StatusCode::BAD_GATEWAY.into_response()
        }
    }
}
