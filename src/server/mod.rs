use crate::{
    gate::{middleware as gate_middleware, Gate, GateConfig},
    proxy::{self, Upstream},
};
use anyhow::{Context, Result};
use axum::{
    body::Body,
    http::{HeaderName, HeaderValue, Request},
    middleware::from_fn_with_state,
    routing::get,
    Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::PropagateRequestIdLayer, set_header::SetRequestHeaderLayer, trace::TraceLayer,
};
use tracing::{error, info, info_span, Span};
use ulid::Ulid;

pub mod health;

const X_REQUEST_ID: &str = "x-request-id";

/// Build the application: the gate in front of the upstream proxy, with
/// `/health` answered locally and never gated.
#[must_use]
pub fn router(gate: Arc<Gate>, upstream: Arc<Upstream>) -> Router {
    Router::new()
        .fallback(proxy::forward)
        .with_state(upstream)
        .layer(from_fn_with_state(gate, gate_middleware))
        .route("/health", get(health::health).options(health::health))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static(X_REQUEST_ID),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    X_REQUEST_ID,
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span)),
        )
}

/// Start the server
/// # Errors
/// Return error if the gate or upstream cannot be configured or the listener fails
pub async fn new(port: u16, config: GateConfig, upstream_url: &str) -> Result<()> {
    let gate = Arc::new(Gate::new(config).context("Failed to build identity service client")?);
    let upstream = Arc::new(Upstream::new(upstream_url)?);

    info!(
        identity_url = gate.config().identity_url(),
        upstream_url = upstream.base_url(),
        production = gate.config().production(),
        "gate configured"
    );

    let app = router(gate, upstream);

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for shutdown signal: {err}");
                std::future::pending::<()>().await;
            }
            info!("Gracefully shutdown");
        })
        .await?;

    Ok(())
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.path = request.uri().path(),
        request_id
    )
}
