use crate::staticgate::{
    self,
    config::{decode_cookie_key, GateConfig},
    provider::{ProviderClient, ProviderConfig},
    session::SessionCodec,
    state::GateState,
};
use anyhow::{Context, Result};
use secrecy::{ExposeSecret, SecretString};
use std::{path::PathBuf, sync::Arc, time::Duration};
use tracing::debug;
use url::Url;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub base_url: String,
    pub allowed_domain: String,
    pub serve_path: PathBuf,
    pub public_assets: bool,
    pub debug_session_info: bool,
    pub client_id: String,
    pub client_secret: SecretString,
    pub auth_url: String,
    pub token_url: String,
    pub userinfo_url: String,
    pub scopes: Vec<String>,
    pub provider_timeout_seconds: u64,
    pub cookie_key: SecretString,
    pub cookie_fallback_key: Option<SecretString>,
    pub cookie_name: String,
    pub session_lifespan_seconds: i64,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the configuration is invalid or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let port = args.port;
    let state = build_state(args)?;

    debug!("Gate state: {:?}", state);

    staticgate::new(port, Arc::new(state)).await
}

/// Validate the arguments and assemble the shared state.
///
/// # Errors
/// Returns an error naming the offending setting.
pub fn build_state(args: Args) -> Result<GateState> {
    let config = GateConfig::new(&args.base_url, args.allowed_domain)
        .context("Invalid server configuration")?
        .with_serve_path(args.serve_path)
        .with_public_assets(args.public_assets)
        .with_debug_session_info(args.debug_session_info)
        .with_session_lifespan(time::Duration::seconds(args.session_lifespan_seconds))
        .context("Invalid session lifespan")?;

    let key = decode_cookie_key("STATICGATE_COOKIE_KEY", args.cookie_key.expose_secret())?;
    let fallback_key = args
        .cookie_fallback_key
        .as_ref()
        .map(|key| decode_cookie_key("STATICGATE_COOKIE_FALLBACK_KEY", key.expose_secret()))
        .transpose()?;

    let codec = SessionCodec::new(key, config.session_lifespan())
        .with_fallback_key(fallback_key)
        .with_cookie_name(args.cookie_name)
        .with_secure(config.secure_cookies());

    let endpoint = |name: &str, value: &str| -> Result<Url> {
        Url::parse(value).with_context(|| format!("Invalid {name}: {value}"))
    };

    let provider_config = ProviderConfig::new(
        args.client_id,
        args.client_secret,
        config.callback_url()?,
    )?
    .with_auth_url(endpoint("authorization URL", &args.auth_url)?)
    .with_token_url(endpoint("token URL", &args.token_url)?)
    .with_userinfo_url(endpoint("userinfo URL", &args.userinfo_url)?)
    .with_scopes(args.scopes)
    .with_timeout(Duration::from_secs(args.provider_timeout_seconds));

    let provider = ProviderClient::new(provider_config).context("Failed to build HTTP client")?;

    Ok(GateState::new(config, codec, provider))
}
