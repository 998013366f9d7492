//! # Portero (Authentication & Onboarding Gate)
//!
//! `portero` sits in front of a web application and decides, for every page
//! request, whether the request may reach the application, must be redirected,
//! or may continue after its credentials were refreshed.
//!
//! ## Credentials
//!
//! Two opaque bearer tokens travel in `HttpOnly` cookies: a short lived
//! `access_token` and a long lived `refresh_token`. The gate never inspects
//! them; it asks the identity service to verify or refresh them.
//!
//! ## Routes
//!
//! Every path is either **public**, **onboarding** or **protected**:
//!
//! - **Public** paths are always reachable. Signed-in users visiting `/login` or
//!   `/signup` are sent to `/dashboard`.
//! - **Protected** paths need a verified access token. Without one the gate tries
//!   a silent refresh and otherwise redirects to `/login?redirect=<path>`.
//! - **Onboarding** paths (organization creation, plan choice, team invite) are
//!   protected paths that only make sense for users without an organization.
//!
//! ## Organizations
//!
//! Verified users without any organization are sent to `/create-organization`.
//! Users with organizations get a `current_org_id` cookie that defaults to their
//! first membership.
//!
//! Verification and organization lookups fail open: when the identity service
//! cannot be reached, the request continues and the destination handler is
//! responsible for enforcing access.

pub mod cli;
pub mod gate;
pub mod identity;
pub mod proxy;
pub mod server;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
