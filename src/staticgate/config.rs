//! Immutable runtime configuration, built once at startup.

use axum_extra::extract::cookie::Key;
use base64ct::{Base64, Encoding};
use rand::{rngs::OsRng, RngCore};
use std::path::PathBuf;
use time::Duration;
use url::Url;

/// Required length of a cookie key, in bytes.
pub const COOKIE_KEY_LENGTH: usize = 64;

pub const DEFAULT_SESSION_LIFESPAN: Duration = Duration::hours(24);

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{name} is not valid base64")]
    KeyEncoding { name: &'static str },
    #[error("bad length for {name}: expected {COOKIE_KEY_LENGTH} bytes, got {actual}")]
    KeyLength { name: &'static str, actual: usize },
    #[error("invalid {name}: {source}")]
    Url {
        name: &'static str,
        #[source]
        source: url::ParseError,
    },
    #[error("{name} must not be empty")]
    Empty { name: &'static str },
    #[error("session lifespan must be positive")]
    Lifespan,
}

/// Decode a base64 cookie key and check its length.
///
/// # Errors
/// Returns [`ConfigError::KeyEncoding`] or [`ConfigError::KeyLength`].
pub fn decode_cookie_key(name: &'static str, encoded: &str) -> Result<Key, ConfigError> {
    let bytes =
        Base64::decode_vec(encoded.trim()).map_err(|_| ConfigError::KeyEncoding { name })?;
    if bytes.len() != COOKIE_KEY_LENGTH {
        return Err(ConfigError::KeyLength {
            name,
            actual: bytes.len(),
        });
    }
    Ok(Key::from(bytes.as_slice()))
}

/// A fresh base64-encoded cookie key from the OS CSPRNG.
#[must_use]
pub fn generate_cookie_key() -> String {
    let mut bytes = [0u8; COOKIE_KEY_LENGTH];
    OsRng.fill_bytes(&mut bytes);
    Base64::encode_string(&bytes)
}

#[derive(Debug, Clone)]
pub struct GateConfig {
    base_url: Url,
    allowed_domain: String,
    serve_path: PathBuf,
    session_lifespan: Duration,
    public_assets: bool,
    debug_session_info: bool,
}

impl GateConfig {
    /// # Errors
    /// Returns an error if `base_url` does not parse or `allowed_domain` is
    /// empty.
    pub fn new(base_url: &str, allowed_domain: impl Into<String>) -> Result<Self, ConfigError> {
        let base_url = Url::parse(base_url).map_err(|source| ConfigError::Url {
            name: "base URL",
            source,
        })?;
        let allowed_domain = allowed_domain.into();
        if allowed_domain.trim().is_empty() {
            return Err(ConfigError::Empty {
                name: "allowed domain",
            });
        }
        Ok(Self {
            base_url,
            allowed_domain,
            serve_path: PathBuf::from("/var/www"),
            session_lifespan: DEFAULT_SESSION_LIFESPAN,
            public_assets: false,
            debug_session_info: false,
        })
    }

    #[must_use]
    pub fn with_serve_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.serve_path = path.into();
        self
    }

    /// # Errors
    /// Returns [`ConfigError::Lifespan`] for zero or negative lifespans.
    pub fn with_session_lifespan(mut self, lifespan: Duration) -> Result<Self, ConfigError> {
        if !lifespan.is_positive() {
            return Err(ConfigError::Lifespan);
        }
        self.session_lifespan = lifespan;
        Ok(self)
    }

    /// Serve assets without the login gate.
    #[must_use]
    pub fn with_public_assets(mut self, public: bool) -> Self {
        self.public_assets = public;
        self
    }

    /// Register the gated `/debug-session-info` endpoint.
    #[must_use]
    pub fn with_debug_session_info(mut self, enabled: bool) -> Self {
        self.debug_session_info = enabled;
        self
    }

    /// Provider redirect target: `<base_url>/callback`.
    ///
    /// # Errors
    /// Returns an error if the base URL cannot be a base (e.g. `mailto:`).
    pub fn callback_url(&self) -> Result<Url, ConfigError> {
        let base = self.base_url.as_str().trim_end_matches('/');
        Url::parse(&format!("{base}/callback")).map_err(|source| ConfigError::Url {
            name: "callback URL",
            source,
        })
    }

    /// Cookies are `Secure` when the site is served over HTTPS.
    #[must_use]
    pub fn secure_cookies(&self) -> bool {
        self.base_url.scheme() == "https"
    }

    #[must_use]
    pub fn allowed_domain(&self) -> &str {
        &self.allowed_domain
    }

    #[must_use]
    pub fn serve_path(&self) -> &std::path::Path {
        &self.serve_path
    }

    #[must_use]
    pub fn session_lifespan(&self) -> Duration {
        self.session_lifespan
    }

    #[must_use]
    pub fn public_assets(&self) -> bool {
        self.public_assets
    }

    #[must_use]
    pub fn debug_session_info(&self) -> bool {
        self.debug_session_info
    }
}
