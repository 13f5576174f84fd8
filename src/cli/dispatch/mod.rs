//! Map parsed command-line arguments to the action to run.

use crate::cli::actions::{server::Args, Action};
use crate::cli::commands::{
    provider, session, ARG_ALLOWED_DOMAIN, ARG_BASE_URL, ARG_DEBUG_SESSION_INFO, ARG_PORT,
    ARG_PUBLIC, ARG_SERVE_PATH,
};
use anyhow::{Context, Result};
use std::path::PathBuf;

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(8080);
    let base_url = matches
        .get_one::<String>(ARG_BASE_URL)
        .cloned()
        .context("missing required argument: --base-url")?;
    let allowed_domain = matches
        .get_one::<String>(ARG_ALLOWED_DOMAIN)
        .cloned()
        .context("missing required argument: --allowed-domain")?;
    let serve_path = matches
        .get_one::<PathBuf>(ARG_SERVE_PATH)
        .cloned()
        .unwrap_or_else(|| PathBuf::from("/var/www"));

    let provider = provider::Options::parse(matches)?;
    let session = session::Options::parse(matches)?;

    Ok(Action::Server(Args {
        port,
        base_url,
        allowed_domain,
        serve_path,
        public_assets: matches.get_flag(ARG_PUBLIC),
        debug_session_info: matches.get_flag(ARG_DEBUG_SESSION_INFO),
        client_id: provider.client_id,
        client_secret: provider.client_secret,
        auth_url: provider.auth_url,
        token_url: provider.token_url,
        userinfo_url: provider.userinfo_url,
        scopes: provider.scopes,
        provider_timeout_seconds: provider.timeout_seconds,
        cookie_key: session.cookie_key,
        cookie_fallback_key: session.cookie_fallback_key,
        cookie_name: session.cookie_name,
        session_lifespan_seconds: session.lifespan_seconds,
    }))
}
