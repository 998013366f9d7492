//! Client for the identity service endpoints the gate depends on.
//!
//! Every call returns `Ok` only for a successful status with a decodable body.
//! Non-success statuses and transport failures are kept apart in
//! [`UpstreamError`] because the gate treats them differently.

use crate::{gate::GateConfig, APP_USER_AGENT};
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, instrument};

const REFRESH_PATH: &str = "/auth/refresh";
const VERIFY_PATH: &str = "/auth/verify";
const ORGANIZATIONS_PATH: &str = "/users/me/organizations";

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("identity service responded with {0}")]
    Status(StatusCode),
    #[error("identity service request failed: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("identity service response could not be decoded: {0}")]
    Decode(#[source] reqwest::Error),
}

impl UpstreamError {
    /// The call never produced a usable answer (as opposed to a rejection).
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Decode(_))
    }
}

/// Tokens minted by a successful refresh.
#[derive(Debug)]
pub struct RefreshedTokens {
    pub access_token: SecretString,
    pub refresh_token: Option<SecretString>,
}

#[derive(Deserialize)]
struct RefreshResponse {
    access_token: String,
    refresh_token: Option<String>,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct Organization {
    pub id: String,
}

#[derive(Clone, Debug)]
pub struct IdentityClient {
    client: Client,
    base_url: String,
}

impl IdentityClient {
    /// Build a client for the configured identity service.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &GateConfig) -> Result<Self, reqwest::Error> {
        let mut builder = Client::builder().user_agent(APP_USER_AGENT);
        if let Some(timeout) = config.identity_timeout() {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            base_url: config.identity_url().to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Exchange a refresh token for a new access token (and maybe a rotated refresh token).
    ///
    /// # Errors
    /// Returns [`UpstreamError`] on a non-success status, network failure or malformed body.
    #[instrument(skip_all)]
    pub async fn refresh(
        &self,
        refresh_token: &SecretString,
    ) -> Result<RefreshedTokens, UpstreamError> {
        let response = self
            .client
            .post(self.url(REFRESH_PATH))
            .json(&json!({ "refresh_token": refresh_token.expose_secret() }))
            .send()
            .await
            .map_err(UpstreamError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            debug!("refresh rejected: {}", status);
            return Err(UpstreamError::Status(status));
        }

        let body: RefreshResponse = response.json().await.map_err(UpstreamError::Decode)?;

        Ok(RefreshedTokens {
            access_token: SecretString::from(body.access_token),
            refresh_token: body.refresh_token.map(SecretString::from),
        })
    }

    /// Check an access token. The response body is ignored.
    ///
    /// # Errors
    /// Returns [`UpstreamError`] when the token is rejected or the service is unreachable.
    #[instrument(skip_all)]
    pub async fn verify(&self, access_token: &SecretString) -> Result<(), UpstreamError> {
        let response = self
            .client
            .get(self.url(VERIFY_PATH))
            .bearer_auth(access_token.expose_secret())
            .send()
            .await
            .map_err(UpstreamError::Transport)?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            debug!("verify rejected: {}", status);
            Err(UpstreamError::Status(status))
        }
    }

    /// List the organizations the token's user belongs to.
    ///
    /// # Errors
    /// Returns [`UpstreamError`] on a non-success status, network failure or malformed body.
    #[instrument(skip_all)]
    pub async fn organizations(
        &self,
        access_token: &SecretString,
    ) -> Result<Vec<Organization>, UpstreamError> {
        let response = self
            .client
            .get(self.url(ORGANIZATIONS_PATH))
            .bearer_auth(access_token.expose_secret())
            .send()
            .await
            .map_err(UpstreamError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::Status(status));
        }

        response.json().await.map_err(UpstreamError::Decode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{bail, Result};
    use std::{net::TcpListener, time::Duration};
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn can_bind_localhost() -> bool {
        TcpListener::bind("127.0.0.1:0").is_ok()
    }

    fn client(server: &MockServer) -> IdentityClient {
        IdentityClient::new(&GateConfig::new(server.uri())).unwrap()
    }

    fn secret(value: &str) -> SecretString {
        SecretString::from(value.to_string())
    }

    #[tokio::test]
    async fn refresh_returns_tokens() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/auth/refresh"))
            .and(body_json(json!({ "refresh_token": "r-1" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "a-2",
                "refresh_token": "r-2"
            })))
            .mount(&server)
            .await;

        let tokens = client(&server).refresh(&secret("r-1")).await?;
        assert_eq!(tokens.access_token.expose_secret(), "a-2");
        assert_eq!(
            tokens.refresh_token.as_ref().map(|t| t.expose_secret()),
            Some("r-2")
        );
        Ok(())
    }

    #[tokio::test]
    async fn refresh_without_rotation() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/auth/refresh"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "access_token": "a-2" })),
            )
            .mount(&server)
            .await;

        let tokens = client(&server).refresh(&secret("r-1")).await?;
        assert_eq!(tokens.access_token.expose_secret(), "a-2");
        assert!(tokens.refresh_token.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn refresh_rejected() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/auth/refresh"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        match client(&server).refresh(&secret("r-1")).await {
            Err(UpstreamError::Status(status)) => assert_eq!(status, StatusCode::UNAUTHORIZED),
            other => bail!("expected status error, got {other:?}"),
        }
        Ok(())
    }

    #[tokio::test]
    async fn refresh_malformed_body_is_decode_error() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/auth/refresh"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "token": "x" })))
            .mount(&server)
            .await;

        let err = match client(&server).refresh(&secret("r-1")).await {
            Err(err) => err,
            Ok(_) => bail!("expected decode error"),
        };
        assert!(matches!(err, UpstreamError::Decode(_)));
        assert!(err.is_transport());
        Ok(())
    }

    #[tokio::test]
    async fn verify_sends_bearer() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/auth/verify"))
            .and(header("Authorization", "Bearer a-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "user_id": "u-1" })))
            .mount(&server)
            .await;

        let identity = client(&server);
        identity.verify(&secret("a-1")).await?;

        let rejected = identity.verify(&secret("other")).await;
        assert!(matches!(rejected, Err(UpstreamError::Status(_))));
        Ok(())
    }

    #[tokio::test]
    async fn organizations_list() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/users/me/organizations"))
            .and(header("Authorization", "Bearer a-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "id": "org-1", "name": "Acme", "role": "owner" },
                { "id": "org-2", "name": "Globex" }
            ])))
            .mount(&server)
            .await;

        let orgs = client(&server).organizations(&secret("a-1")).await?;
        assert_eq!(
            orgs,
            vec![
                Organization {
                    id: "org-1".to_string()
                },
                Organization {
                    id: "org-2".to_string()
                },
            ]
        );
        Ok(())
    }

    #[tokio::test]
    async fn organizations_error_status() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/users/me/organizations"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let result = client(&server).organizations(&secret("a-1")).await;
        match result {
            Err(err) => assert!(!err.is_transport()),
            Ok(_) => bail!("expected status error"),
        }
        Ok(())
    }

    #[tokio::test]
    async fn unreachable_service_is_transport_error() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        // Grab a free port and release it so nothing is listening there.
        let port = TcpListener::bind("127.0.0.1:0")?.local_addr()?.port();
        let config = GateConfig::new(format!("http://127.0.0.1:{port}"))
            .with_identity_timeout(Some(Duration::from_secs(2)));
        let identity = IdentityClient::new(&config)?;

        match identity.verify(&secret("a-1")).await {
            Err(err) => assert!(err.is_transport()),
            Ok(()) => bail!("expected transport error"),
        }
        Ok(())
    }
}
