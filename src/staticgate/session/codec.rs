//! Cookie encoding for [`Session`].
//!
//! The session is wrapped in a small envelope carrying its issue time,
//! serialized to JSON and sealed with the `cookie` crate's private jar
//! (AES-256-GCM with the cookie name as associated data). Decoding fails
//! closed: anything that does not decrypt, does not match the envelope schema
//! or is older than the cookie max-age is an error, never a partial session.

use axum_extra::extract::cookie::{Cookie, CookieJar, Key, SameSite};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use tracing::debug;

use super::Session;

pub const SESSION_COOKIE_NAME: &str = "staticgate_session";

/// Issue times this far in the future are tolerated (clock skew between
/// instances sharing the key).
const MAX_CLOCK_SKEW: Duration = Duration::seconds(60);

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("session cookie failed authentication")]
    Forged,
    #[error("session cookie payload is malformed: {0}")]
    Malformed(#[source] serde_json::Error),
    #[error("session cookie has expired")]
    Expired,
    #[error("failed to serialize session: {0}")]
    Serialize(#[source] serde_json::Error),
    #[error("failed to seal session cookie")]
    Seal,
}

#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct Envelope {
    issued_at: i64,
    session: Session,
}

#[derive(Clone)]
pub struct SessionCodec {
    key: Key,
    fallback_key: Option<Key>,
    cookie_name: String,
    max_age: Duration,
    secure: bool,
}

impl std::fmt::Debug for SessionCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCodec")
            .field("key", &"***")
            .field("fallback_key", &self.fallback_key.as_ref().map(|_| "***"))
            .field("cookie_name", &self.cookie_name)
            .field("max_age", &self.max_age)
            .field("secure", &self.secure)
            .finish()
    }
}

impl SessionCodec {
    #[must_use]
    pub fn new(key: Key, max_age: Duration) -> Self {
        Self {
            key,
            fallback_key: None,
            cookie_name: SESSION_COOKIE_NAME.to_string(),
            max_age,
            secure: false,
        }
    }

    /// Also accept cookies sealed with `key` (previous key during rotation).
    #[must_use]
    pub fn with_fallback_key(mut self, key: Option<Key>) -> Self {
        self.fallback_key = key;
        self
    }

    #[must_use]
    pub fn with_cookie_name(mut self, name: impl Into<String>) -> Self {
        self.cookie_name = name.into();
        self
    }

    /// Mark cookies `Secure` (site served over HTTPS).
    #[must_use]
    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    #[must_use]
    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    /// Seal `session` into a ready-to-send cookie.
    ///
    /// # Errors
    /// Returns [`CodecError::Serialize`] if the session cannot be serialized,
    /// [`CodecError::Seal`] if the private jar produced no cookie.
    pub fn encode(&self, session: &Session) -> Result<Cookie<'static>, CodecError> {
        self.encode_at(session, OffsetDateTime::now_utc())
    }

    fn encode_at(
        &self,
        session: &Session,
        now: OffsetDateTime,
    ) -> Result<Cookie<'static>, CodecError> {
        let envelope = Envelope {
            issued_at: now.unix_timestamp(),
            session: session.clone(),
        };
        let plaintext = serde_json::to_string(&envelope).map_err(CodecError::Serialize)?;

        let mut jar = cookie::CookieJar::new();
        jar.private_mut(&self.key)
            .add(Cookie::new(self.cookie_name.clone(), plaintext));
        let sealed = jar
            .get(&self.cookie_name)
            .map(|cookie| cookie.value().to_string())
            .ok_or(CodecError::Seal)?;

        Ok(Cookie::build((self.cookie_name.clone(), sealed))
            .http_only(true)
            .secure(self.secure)
            .same_site(SameSite::Lax)
            .path("/")
            .max_age(self.max_age)
            .build())
    }

    /// Open a sealed cookie value.
    ///
    /// # Errors
    /// [`CodecError::Forged`] if the value does not authenticate under any
    /// configured key, [`CodecError::Malformed`] if the plaintext does not
    /// match the session schema, [`CodecError::Expired`] if the cookie is
    /// max-age old or older.
    pub fn decode(&self, value: &str) -> Result<Session, CodecError> {
        self.decode_at(value, OffsetDateTime::now_utc())
    }

    fn decode_at(&self, value: &str, now: OffsetDateTime) -> Result<Session, CodecError> {
        let plaintext = self
            .open(&self.key, value)
            .or_else(|| {
                let plaintext = self
                    .fallback_key
                    .as_ref()
                    .and_then(|key| self.open(key, value));
                if plaintext.is_some() {
                    debug!("session cookie opened with fallback key");
                }
                plaintext
            })
            .ok_or(CodecError::Forged)?;

        let envelope: Envelope =
            serde_json::from_str(&plaintext).map_err(CodecError::Malformed)?;

        let issued_at = envelope.issued_at;
        let age = now.unix_timestamp().saturating_sub(issued_at);
        if age >= self.max_age.whole_seconds() || -age > MAX_CLOCK_SKEW.whole_seconds() {
            return Err(CodecError::Expired);
        }

        Ok(envelope.session)
    }

    fn open(&self, key: &Key, value: &str) -> Option<String> {
        let jar = cookie::CookieJar::new();
        jar.private(key)
            .decrypt(Cookie::new(self.cookie_name.clone(), value.to_string()))
            .map(|cookie| cookie.value().to_string())
    }

    /// Read the session cookie from `jar`.
    ///
    /// `Ok(None)` means no cookie was sent (an anonymous visitor); a cookie
    /// that is present but cannot be decoded is an error.
    ///
    /// # Errors
    /// Propagates [`SessionCodec::decode`] errors.
    pub fn load(&self, jar: &CookieJar) -> Result<Option<Session>, CodecError> {
        match jar.get(&self.cookie_name) {
            Some(cookie) => self.decode(cookie.value()).map(Some),
            None => Ok(None),
        }
    }

    /// Add the sealed `session` cookie to `jar`.
    ///
    /// # Errors
    /// Propagates [`SessionCodec::encode`] errors.
    pub fn store(&self, jar: CookieJar, session: &Session) -> Result<CookieJar, CodecError> {
        Ok(jar.add(self.encode(session)?))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::staticgate::session::test_support;
    use std::net::{IpAddr, Ipv4Addr};

    fn key(byte: u8) -> Key {
        Key::from(&[byte; 64][..])
    }

    fn codec() -> SessionCodec {
        SessionCodec::new(key(7), Duration::hours(24))
    }

    fn sample() -> Session {
        let mut session = test_support::authenticated(
            Some(IpAddr::V4(Ipv4Addr::new(192, 0, 2, 10))),
            OffsetDateTime::now_utc(),
        );
        session.return_to = Some("/reports/index.html".to_string());
        session
    }

    #[test]
    fn round_trip_authenticated() {
        let codec = codec();
        let session = sample();
        let cookie = codec.encode(&session).unwrap();
        assert_eq!(codec.decode(cookie.value()).unwrap(), session);
    }

    #[test]
    fn round_trip_anonymous() {
        let codec = codec();
        let session = Session::new(None);
        let cookie = codec.encode(&session).unwrap();
        assert_eq!(codec.decode(cookie.value()).unwrap(), session);
    }

    #[test]
    fn encoded_value_hides_contents() {
        let cookie = codec().encode(&sample()).unwrap();
        assert!(!cookie.value().contains("ya29.access"));
        assert!(!cookie.value().contains("alice@example.com"));
    }

    #[test]
    fn cookie_attributes() {
        let codec = codec().with_secure(true);
        let cookie = codec.encode(&sample()).unwrap();
        assert_eq!(cookie.name(), SESSION_COOKIE_NAME);
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.max_age(), Some(Duration::hours(24)));
    }

    #[test]
    fn any_flipped_byte_is_rejected() {
        let codec = codec();
        let value = codec.encode(&sample()).unwrap().value().to_string();
        let bytes = value.as_bytes();

        for index in 0..bytes.len() {
            let mut tampered = bytes.to_vec();
            tampered[index] = if tampered[index] == b'A' { b'B' } else { b'A' };
            let tampered = String::from_utf8(tampered).unwrap();
            if tampered == value {
                continue;
            }
            assert!(
                matches!(codec.decode(&tampered), Err(CodecError::Forged)),
                "byte {index} flip was accepted"
            );
        }
    }

    #[test]
    fn wrong_key_is_rejected() {
        let cookie = codec().encode(&sample()).unwrap();
        let other = SessionCodec::new(key(8), Duration::hours(24));
        assert!(matches!(
            other.decode(cookie.value()),
            Err(CodecError::Forged)
        ));
    }

    #[test]
    fn garbage_is_rejected() {
        let codec = codec();
        assert!(matches!(codec.decode(""), Err(CodecError::Forged)));
        assert!(matches!(codec.decode("bogus"), Err(CodecError::Forged)));
    }

    #[test]
    fn cookie_name_is_bound() {
        let cookie = codec().encode(&sample()).unwrap();
        let renamed = codec().with_cookie_name("other");
        assert!(matches!(
            renamed.decode(cookie.value()),
            Err(CodecError::Forged)
        ));
    }

    #[test]
    fn fallback_key_opens_old_cookies() {
        let session = sample();
        let old = SessionCodec::new(key(1), Duration::hours(24));
        let cookie = old.encode(&session).unwrap();

        let rotated =
            SessionCodec::new(key(2), Duration::hours(24)).with_fallback_key(Some(key(1)));
        let decoded = rotated.decode(cookie.value()).unwrap();
        assert_eq!(decoded, session);

        // Re-encoding always uses the current key.
        let reencoded = rotated.encode(&decoded).unwrap();
        assert!(old.decode(reencoded.value()).is_err());
        assert_eq!(rotated.decode(reencoded.value()).unwrap(), session);
    }

    #[test]
    fn wrong_shape_is_malformed() {
        let codec = codec();
        let mut jar = cookie::CookieJar::new();
        jar.private_mut(&key(7)).add(Cookie::new(
            SESSION_COOKIE_NAME,
            r#"{"issued_at":0,"session":"not a session"}"#,
        ));
        let value = jar.get(SESSION_COOKIE_NAME).unwrap().value().to_string();
        assert!(matches!(codec.decode(&value), Err(CodecError::Malformed(_))));
    }

    #[test]
    fn unknown_fields_are_malformed() {
        let codec = codec();
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let session = serde_json::to_value(Session::new(None)).unwrap();
        let payload = serde_json::json!({
            "issued_at": now,
            "session": session,
            "admin": true,
        });
        let mut jar = cookie::CookieJar::new();
        jar.private_mut(&key(7))
            .add(Cookie::new(SESSION_COOKIE_NAME, payload.to_string()));
        let value = jar.get(SESSION_COOKIE_NAME).unwrap().value().to_string();
        assert!(matches!(codec.decode(&value), Err(CodecError::Malformed(_))));
    }

    #[test]
    fn expired_cookie_is_rejected() {
        let codec = codec();
        let now = OffsetDateTime::now_utc();
        let cookie = codec
            .encode_at(&sample(), now - Duration::hours(24) - Duration::seconds(1))
            .unwrap();
        assert!(matches!(
            codec.decode_at(cookie.value(), now),
            Err(CodecError::Expired)
        ));

        // A cookie exactly one max-age old is already expired.
        let cookie = codec.encode_at(&sample(), now - Duration::hours(24)).unwrap();
        assert!(matches!(
            codec.decode_at(cookie.value(), now),
            Err(CodecError::Expired)
        ));

        let cookie = codec
            .encode_at(&sample(), now - Duration::hours(24) + Duration::seconds(1))
            .unwrap();
        assert!(codec.decode_at(cookie.value(), now).is_ok());

        let cookie = codec.encode_at(&sample(), now + Duration::hours(1)).unwrap();
        assert!(matches!(
            codec.decode_at(cookie.value(), now),
            Err(CodecError::Expired)
        ));
    }

    #[test]
    fn load_distinguishes_missing_from_malformed() {
        let codec = codec();
        assert!(matches!(codec.load(&CookieJar::new()), Ok(None)));

        let jar = CookieJar::new().add(Cookie::new(SESSION_COOKIE_NAME, "bogus"));
        assert!(codec.load(&jar).is_err());

        let session = sample();
        let jar = codec.store(CookieJar::new(), &session).unwrap();
        assert_eq!(codec.load(&jar).unwrap(), Some(session));
    }
}
