use crate::cli::{
    actions::{server::Args, Action},
    commands::{ARG_IDENTITY_TIMEOUT, ARG_IDENTITY_URL, ARG_PORT, ARG_PRODUCTION, ARG_UPSTREAM_URL},
};
use anyhow::{anyhow, Context, Result};
use std::time::Duration;
use url::Url;

/// # Errors
/// Returns an error if required arguments are missing or are not valid URLs.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(8080);

    let identity_url = http_url(matches, ARG_IDENTITY_URL)?;
    let upstream_url = http_url(matches, ARG_UPSTREAM_URL)?;

    Ok(Action::Server(Args {
        port,
        identity_url,
        upstream_url,
        production: matches.get_flag(ARG_PRODUCTION),
        identity_timeout: matches
            .get_one::<u64>(ARG_IDENTITY_TIMEOUT)
            .map(|seconds| Duration::from_secs(*seconds)),
    }))
}

fn http_url(matches: &clap::ArgMatches, name: &str) -> Result<String> {
    let value = matches
        .get_one::<String>(name)
        .cloned()
        .with_context(|| format!("missing required argument: --{name}"))?;

    let url = Url::parse(&value).with_context(|| format!("invalid --{name}: {value}"))?;
    match url.scheme() {
        "http" | "https" => Ok(value),
        scheme => Err(anyhow!("invalid --{name}: unsupported scheme {scheme}")),
    }
}
