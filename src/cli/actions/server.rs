use crate::{cli::telemetry, gate::GateConfig, server};
use anyhow::Result;
use std::time::Duration;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub identity_url: String,
    pub upstream_url: String,
    pub production: bool,
    pub identity_timeout: Option<Duration>,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the gate cannot be configured or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let config = GateConfig::new(args.identity_url)
        .with_production(args.production)
        .with_identity_timeout(args.identity_timeout);

    let result = server::new(args.port, config, &args.upstream_url).await;

    telemetry::shutdown_tracer();

    result
}
