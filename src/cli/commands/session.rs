use anyhow::{Context, Result};
use clap::{Arg, ArgMatches, Command};
use secrecy::SecretString;

use crate::staticgate::session::codec::SESSION_COOKIE_NAME;

pub const ARG_COOKIE_KEY: &str = "cookie-key";
pub const ARG_COOKIE_FALLBACK_KEY: &str = "cookie-fallback-key";
pub const ARG_COOKIE_NAME: &str = "cookie-name";
pub const ARG_SESSION_LIFESPAN: &str = "session-lifespan";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_COOKIE_KEY)
                .long(ARG_COOKIE_KEY)
                .help("Base64 encoded 64-byte key sealing the session cookie (see generate-secrets)")
                .env("STATICGATE_COOKIE_KEY")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new(ARG_COOKIE_FALLBACK_KEY)
                .long(ARG_COOKIE_FALLBACK_KEY)
                .help("Previous cookie key, still accepted when opening cookies")
                .env("STATICGATE_COOKIE_FALLBACK_KEY")
                .hide_env_values(true),
        )
        .arg(
            Arg::new(ARG_COOKIE_NAME)
                .long(ARG_COOKIE_NAME)
                .help("Name of the session cookie")
                .env("STATICGATE_COOKIE_NAME")
                .default_value(SESSION_COOKIE_NAME),
        )
        .arg(
            Arg::new(ARG_SESSION_LIFESPAN)
                .long(ARG_SESSION_LIFESPAN)
                .help("Session lifespan in seconds")
                .env("STATICGATE_SESSION_LIFESPAN")
                .default_value("86400")
                .value_parser(clap::value_parser!(i64).range(1..)),
        )
}

#[derive(Debug)]
pub struct Options {
    pub cookie_key: SecretString,
    pub cookie_fallback_key: Option<SecretString>,
    pub cookie_name: String,
    pub lifespan_seconds: i64,
}

impl Options {
    /// # Errors
    /// Returns an error if the cookie key is missing.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        Ok(Self {
            cookie_key: matches
                .get_one::<String>(ARG_COOKIE_KEY)
                .cloned()
                .map(SecretString::from)
                .context("missing required argument: --cookie-key")?,
            cookie_fallback_key: matches
                .get_one::<String>(ARG_COOKIE_FALLBACK_KEY)
                .filter(|key| !key.trim().is_empty())
                .cloned()
                .map(SecretString::from),
            cookie_name: matches
                .get_one::<String>(ARG_COOKIE_NAME)
                .cloned()
                .unwrap_or_else(|| SESSION_COOKIE_NAME.to_string()),
            lifespan_seconds: matches
                .get_one::<i64>(ARG_SESSION_LIFESPAN)
                .copied()
                .unwrap_or(86_400),
        })
    }
}
