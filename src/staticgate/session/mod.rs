//! Session record carried inside the encrypted cookie.
//!
//! A session starts anonymous at `/login`, holds the pending CSRF state while
//! the user is at the identity provider, and becomes authenticated once the
//! callback attached a provider credential and the user's identity.

pub mod codec;
pub mod validator;

pub use codec::{CodecError, SessionCodec};
pub use validator::{authorize, validate, AuthorizationError, ValidationError};

use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use time::OffsetDateTime;

use super::random;

/// Credential issued by the identity provider after a code exchange.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderToken {
    pub access_token: String,
    pub token_type: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub expiry: Option<OffsetDateTime>,
}

impl std::fmt::Debug for ProviderToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderToken")
            .field("access_token", &"***")
            .field("token_type", &self.token_type)
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "***"))
            .field("expiry", &self.expiry)
            .finish()
    }
}

/// User profile returned by the provider's userinfo endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Stable subject identifier.
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub verified_email: bool,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub given_name: String,
    #[serde(default)]
    pub family_name: String,
    #[serde(default)]
    pub picture: String,
    #[serde(default)]
    pub locale: String,
    /// Organizational ("hosted") domain claim, e.g. `example.com`.
    #[serde(default)]
    pub hd: String,
}

/// Where a login attempt stands, derived from the session contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeStage {
    Start,
    AwaitingCallback,
    Complete,
}

impl HandshakeStage {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::AwaitingCallback => "awaiting_callback",
            Self::Complete => "complete",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Session {
    /// Client address observed when the session was created.
    pub remote_address: Option<IpAddr>,
    /// CSRF state for the pending login; empty once consumed.
    pub csrf_state: String,
    /// Always UTC, never mutated after creation.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// Local path to return to after login.
    #[serde(default)]
    pub return_to: Option<String>,
    #[serde(default)]
    pub provider_token: Option<ProviderToken>,
    #[serde(default)]
    pub identity: Option<Identity>,
}

impl Session {
    /// Create an anonymous session bound to `remote_address`, with a fresh
    /// CSRF state.
    #[must_use]
    pub fn new(remote_address: Option<IpAddr>) -> Self {
        Self::new_at(remote_address, OffsetDateTime::now_utc())
    }

    #[must_use]
    pub fn new_at(remote_address: Option<IpAddr>, created_at: OffsetDateTime) -> Self {
        Self {
            remote_address,
            csrf_state: random::csrf_state(),
            created_at: created_at.to_offset(time::UtcOffset::UTC),
            return_to: None,
            provider_token: None,
            identity: None,
        }
    }

    /// True when both the provider credential and an identity with an email
    /// are attached.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.provider_token.is_some()
            && self
                .identity
                .as_ref()
                .is_some_and(|identity| !identity.email.is_empty())
    }

    #[must_use]
    pub fn stage(&self) -> HandshakeStage {
        if self.is_authenticated() {
            HandshakeStage::Complete
        } else if self.csrf_state.is_empty() {
            HandshakeStage::Start
        } else {
            HandshakeStage::AwaitingCallback
        }
    }

    /// Attach the provider credential and identity, consuming the CSRF state.
    pub fn authenticate(&mut self, token: ProviderToken, identity: Identity) {
        self.csrf_state.clear();
        self.provider_token = Some(token);
        self.identity = Some(identity);
    }

    /// Drop credential, identity and any pending login, leaving an anonymous
    /// session.
    pub fn logout(&mut self) {
        self.csrf_state.clear();
        self.return_to = None;
        self.provider_token = None;
        self.identity = None;
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    pub fn token() -> ProviderToken {
        ProviderToken {
            access_token: "ya29.access".to_string(),
            token_type: "Bearer".to_string(),
            refresh_token: None,
            expiry: None,
        }
    }

    pub fn identity(domain: &str) -> Identity {
        Identity {
            id: "1234567890".to_string(),
            email: format!("alice@{domain}"),
            verified_email: true,
            name: "Alice Liddell".to_string(),
            locale: "en".to_string(),
            hd: domain.to_string(),
            ..Identity::default()
        }
    }

    pub fn authenticated(remote: Option<IpAddr>, created_at: OffsetDateTime) -> Session {
        let mut session = Session::new_at(remote, created_at);
        session.authenticate(token(), identity("example.com"));
        session
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_session_is_anonymous_and_awaiting_callback() {
        let session = Session::new(None);
        assert!(!session.is_authenticated());
        assert_eq!(session.csrf_state.len(), random::STATE_LENGTH);
        assert_eq!(session.stage(), HandshakeStage::AwaitingCallback);
        assert_eq!(session.created_at.offset(), time::UtcOffset::UTC);
    }

    #[test]
    fn authenticate_consumes_state() {
        let mut session = Session::new(None);
        session.authenticate(test_support::token(), test_support::identity("example.com"));
        assert!(session.is_authenticated());
        assert!(session.csrf_state.is_empty());
        assert_eq!(session.stage(), HandshakeStage::Complete);
    }

    #[test]
    fn empty_email_is_not_authenticated() {
        let mut session = Session::new(None);
        let mut identity = test_support::identity("example.com");
        identity.email.clear();
        session.authenticate(test_support::token(), identity);
        assert!(!session.is_authenticated());
        assert_eq!(session.stage(), HandshakeStage::Start);
    }

    #[test]
    fn logout_leaves_anonymous_session() {
        let mut session = test_support::authenticated(None, OffsetDateTime::now_utc());
        session.return_to = Some("/docs".to_string());
        session.logout();
        assert!(session.provider_token.is_none());
        assert!(session.identity.is_none());
        assert!(session.return_to.is_none());
        assert_eq!(session.stage(), HandshakeStage::Start);
    }

    #[test]
    fn provider_token_debug_is_redacted() {
        let debug = format!("{:?}", test_support::token());
        assert!(!debug.contains("ya29.access"));
        assert!(debug.contains("***"));
    }

    #[test]
    fn identity_accepts_partial_userinfo() {
        let identity: Identity =
            serde_json::from_str(r#"{"id":"42","email":"bob@example.com","extra":"ignored"}"#)
                .unwrap_or_default();
        assert_eq!(identity.id, "42");
        assert_eq!(identity.email, "bob@example.com");
        assert!(identity.hd.is_empty());
    }
}
