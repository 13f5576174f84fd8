//! OAuth 2.0 client for the identity provider.
//!
//! Builds the authorization redirect, exchanges the authorization code for a
//! credential and fetches the user profile. Nothing here retries: every
//! failure ends the current login attempt.

use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;
use time::OffsetDateTime;
use tracing::{debug, instrument};
use url::Url;

use super::session::{Identity, ProviderToken};

pub const DEFAULT_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/auth";
pub const DEFAULT_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
pub const DEFAULT_USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v2/userinfo";
pub const DEFAULT_SCOPES: [&str; 2] = [
    "https://www.googleapis.com/auth/userinfo.profile",
    "https://www.googleapis.com/auth/userinfo.email",
];
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("request to {operation} failed: {source}")]
    Http {
        operation: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("{operation} returned HTTP {status}")]
    Status {
        operation: &'static str,
        status: u16,
    },
    #[error("{operation} returned an unreadable body: {source}")]
    Body {
        operation: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("{operation} returned a profile without an email")]
    MissingEmail { operation: &'static str },
}

#[derive(Clone)]
pub struct ProviderConfig {
    client_id: String,
    client_secret: SecretString,
    redirect_uri: Url,
    auth_url: Url,
    token_url: Url,
    userinfo_url: Url,
    scopes: Vec<String>,
    timeout: Duration,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"***")
            .field("redirect_uri", &self.redirect_uri.as_str())
            .field("auth_url", &self.auth_url.as_str())
            .field("token_url", &self.token_url.as_str())
            .field("userinfo_url", &self.userinfo_url.as_str())
            .field("scopes", &self.scopes)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ProviderConfig {
    /// Configuration pointing at the default (Google) endpoints.
    ///
    /// # Errors
    /// Returns an error if the built-in endpoint URLs fail to parse.
    pub fn new(
        client_id: impl Into<String>,
        client_secret: SecretString,
        redirect_uri: Url,
    ) -> Result<Self, url::ParseError> {
        Ok(Self {
            client_id: client_id.into(),
            client_secret,
            redirect_uri,
            auth_url: Url::parse(DEFAULT_AUTH_URL)?,
            token_url: Url::parse(DEFAULT_TOKEN_URL)?,
            userinfo_url: Url::parse(DEFAULT_USERINFO_URL)?,
            scopes: DEFAULT_SCOPES.iter().map(ToString::to_string).collect(),
            timeout: DEFAULT_TIMEOUT,
        })
    }

    #[must_use]
    pub fn with_auth_url(mut self, url: Url) -> Self {
        self.auth_url = url;
        self
    }

    #[must_use]
    pub fn with_token_url(mut self, url: Url) -> Self {
        self.token_url = url;
        self
    }

    #[must_use]
    pub fn with_userinfo_url(mut self, url: Url) -> Self {
        self.userinfo_url = url;
        self
    }

    #[must_use]
    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    /// Per-request timeout for the token and userinfo calls.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn redirect_uri(&self) -> &Url {
        &self.redirect_uri
    }

    #[must_use]
    pub fn scopes(&self) -> &[String] {
        &self.scopes
    }
}

/// Token endpoint response.
#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
}

impl TokenResponse {
    fn into_token(self, now: OffsetDateTime) -> ProviderToken {
        ProviderToken {
            access_token: self.access_token,
            token_type: self.token_type.unwrap_or_else(|| "Bearer".to_string()),
            refresh_token: self.refresh_token,
            expiry: self
                .expires_in
                .filter(|seconds| *seconds > 0)
                .map(|seconds| now + time::Duration::seconds(seconds)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProviderClient {
    config: ProviderConfig,
    http: Client,
}

impl ProviderClient {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: ProviderConfig) -> Result<Self, reqwest::Error> {
        let http = Client::builder()
            .user_agent(crate::APP_USER_AGENT)
            .timeout(config.timeout)
            .build()?;
        Ok(Self { config, http })
    }

    #[must_use]
    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    /// Authorization endpoint URL carrying `state` as the round-trip value.
    #[must_use]
    pub fn authorization_url(&self, state: &str) -> Url {
        let scope = self.config.scopes.join(" ");
        let mut url = self.config.auth_url.clone();
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.config.client_id)
            .append_pair("redirect_uri", self.config.redirect_uri.as_str())
            .append_pair("scope", &scope)
            .append_pair("state", state);
        url
    }

    /// Exchange an authorization code for a provider credential.
    ///
    /// # Errors
    /// Returns [`ProviderError`] on network failure, a non-success status (code
    /// already used, expired, wrong client) or an unparseable response.
    #[instrument(skip_all)]
    pub async fn exchange_code(&self, code: &str) -> Result<ProviderToken, ProviderError> {
        const OPERATION: &str = "token exchange";

        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.config.redirect_uri.as_str()),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.expose_secret()),
        ];

        let response = self
            .http
            .post(self.config.token_url.clone())
            .form(&params)
            .send()
            .await
            .map_err(|source| ProviderError::Http {
                operation: OPERATION,
                source,
            })?;
        let response = ensure_success(response, OPERATION)?;

        let token: TokenResponse =
            response
                .json()
                .await
                .map_err(|source| ProviderError::Body {
                    operation: OPERATION,
                    source,
                })?;

        debug!("code exchange succeeded");

        Ok(token.into_token(OffsetDateTime::now_utc()))
    }

    /// Fetch the user profile for `token`.
    ///
    /// # Errors
    /// Returns [`ProviderError`] on network failure, a non-success status, a
    /// body that is not a userinfo document or a profile with no email.
    #[instrument(skip_all)]
    pub async fn fetch_identity(&self, token: &ProviderToken) -> Result<Identity, ProviderError> {
        const OPERATION: &str = "userinfo request";

        let response = self
            .http
            .get(self.config.userinfo_url.clone())
            .bearer_auth(&token.access_token)
            .send()
            .await
            .map_err(|source| ProviderError::Http {
                operation: OPERATION,
                source,
            })?;
        let response = ensure_success(response, OPERATION)?;

        let identity =
            response
                .json::<Identity>()
                .await
                .map_err(|source| ProviderError::Body {
                    operation: OPERATION,
                    source,
                })?;

        if identity.email.is_empty() {
            return Err(ProviderError::MissingEmail {
                operation: OPERATION,
            });
        }

        Ok(identity)
    }
}

// The error body is dropped: providers may echo request parameters back.
fn ensure_success(
    response: reqwest::Response,
    operation: &'static str,
) -> Result<reqwest::Response, ProviderError> {
    if response.status().is_success() {
        Ok(response)
    } else {
        Err(ProviderError::Status {
            operation,
            status: response.status().as_u16(),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn client() -> ProviderClient {
        let config = ProviderConfig::new(
            "client-123.apps.example",
            SecretString::from("shh".to_string()),
            Url::parse("https://gate.example.com/callback").unwrap(),
        )
        .unwrap();
        ProviderClient::new(config).unwrap()
    }

    #[test]
    fn authorization_url_carries_parameters() {
        let url = client().authorization_url("AbCdEf0123456789");
        assert!(url.as_str().starts_with(DEFAULT_AUTH_URL));

        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        let get = |name: &str| {
            pairs
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.clone())
        };

        assert_eq!(get("response_type").as_deref(), Some("code"));
        assert_eq!(get("client_id").as_deref(), Some("client-123.apps.example"));
        assert_eq!(
            get("redirect_uri").as_deref(),
            Some("https://gate.example.com/callback")
        );
        assert_eq!(get("state").as_deref(), Some("AbCdEf0123456789"));
        assert_eq!(get("scope"), Some(DEFAULT_SCOPES.join(" ")));
    }

    #[test]
    fn authorization_url_never_contains_secret() {
        let url = client().authorization_url("state");
        assert!(!url.as_str().contains("shh"));
    }

    #[test]
    fn config_debug_is_redacted() {
        let debug = format!("{:?}", client().config());
        assert!(!debug.contains("shh"));
    }

    #[test]
    fn token_response_expiry() {
        let now = OffsetDateTime::now_utc();
        let response: TokenResponse = serde_json::from_str(
            r#"{"access_token":"abc","token_type":"Bearer","expires_in":3599,"id_token":"x"}"#,
        )
        .unwrap();
        let token = response.into_token(now);
        assert_eq!(token.access_token, "abc");
        assert_eq!(token.expiry, Some(now + time::Duration::seconds(3599)));

        let response: TokenResponse = serde_json::from_str(r#"{"access_token":"abc"}"#).unwrap();
        let token = response.into_token(now);
        assert_eq!(token.token_type, "Bearer");
        assert_eq!(token.expiry, None);
    }
}
