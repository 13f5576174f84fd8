use anyhow::{Context, Result};
use clap::{Arg, ArgMatches, Command};
use secrecy::SecretString;

use crate::staticgate::provider::{
    DEFAULT_AUTH_URL, DEFAULT_SCOPES, DEFAULT_TOKEN_URL, DEFAULT_USERINFO_URL,
};

pub const ARG_CLIENT_ID: &str = "client-id";
pub const ARG_CLIENT_SECRET: &str = "client-secret";
pub const ARG_AUTH_URL: &str = "auth-url";
pub const ARG_TOKEN_URL: &str = "token-url";
pub const ARG_USERINFO_URL: &str = "userinfo-url";
pub const ARG_SCOPES: &str = "scopes";
pub const ARG_PROVIDER_TIMEOUT: &str = "provider-timeout";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_CLIENT_ID)
                .long(ARG_CLIENT_ID)
                .help("OAuth client id registered with the identity provider")
                .env("STATICGATE_CLIENT_ID")
                .required(true),
        )
        .arg(
            Arg::new(ARG_CLIENT_SECRET)
                .long(ARG_CLIENT_SECRET)
                .help("OAuth client secret")
                .env("STATICGATE_CLIENT_SECRET")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new(ARG_AUTH_URL)
                .long(ARG_AUTH_URL)
                .help("Provider authorization endpoint")
                .env("STATICGATE_AUTH_URL")
                .default_value(DEFAULT_AUTH_URL),
        )
        .arg(
            Arg::new(ARG_TOKEN_URL)
                .long(ARG_TOKEN_URL)
                .help("Provider token endpoint")
                .env("STATICGATE_TOKEN_URL")
                .default_value(DEFAULT_TOKEN_URL),
        )
        .arg(
            Arg::new(ARG_USERINFO_URL)
                .long(ARG_USERINFO_URL)
                .help("Provider userinfo endpoint")
                .env("STATICGATE_USERINFO_URL")
                .default_value(DEFAULT_USERINFO_URL),
        )
        .arg(
            Arg::new(ARG_SCOPES)
                .long(ARG_SCOPES)
                .help("Comma separated OAuth scopes to request")
                .env("STATICGATE_SCOPES")
                .value_delimiter(',')
                .default_values(DEFAULT_SCOPES),
        )
        .arg(
            Arg::new(ARG_PROVIDER_TIMEOUT)
                .long(ARG_PROVIDER_TIMEOUT)
                .help("Timeout in seconds for token and userinfo requests")
                .env("STATICGATE_PROVIDER_TIMEOUT")
                .default_value("10")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
}

#[derive(Debug)]
pub struct Options {
    pub client_id: String,
    pub client_secret: SecretString,
    pub auth_url: String,
    pub token_url: String,
    pub userinfo_url: String,
    pub scopes: Vec<String>,
    pub timeout_seconds: u64,
}

impl Options {
    /// # Errors
    /// Returns an error if a required argument is missing.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        let string = |name: &str| -> Result<String> {
            matches
                .get_one::<String>(name)
                .cloned()
                .with_context(|| format!("missing required argument: --{name}"))
        };

        Ok(Self {
            client_id: string(ARG_CLIENT_ID)?,
            client_secret: SecretString::from(string(ARG_CLIENT_SECRET)?),
            auth_url: string(ARG_AUTH_URL)?,
            token_url: string(ARG_TOKEN_URL)?,
            userinfo_url: string(ARG_USERINFO_URL)?,
            scopes: matches
                .get_many::<String>(ARG_SCOPES)
                .map(|scopes| {
                    scopes
                        .map(|scope| scope.trim().to_string())
                        .filter(|scope| !scope.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
            timeout_seconds: matches
                .get_one::<u64>(ARG_PROVIDER_TIMEOUT)
                .copied()
                .unwrap_or(10),
        })
    }
}
