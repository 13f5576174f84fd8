use axum::{response::IntoResponse, Extension, Json};
use serde::Serialize;
use std::net::IpAddr;
use time::OffsetDateTime;

use crate::staticgate::{
    gate::AuthenticatedSession,
    session::{Identity, Session},
};

#[derive(Debug, Serialize)]
struct TokenInfo<'a> {
    token_type: &'a str,
    access_token: &'static str,
    has_refresh_token: bool,
    #[serde(with = "time::serde::rfc3339::option")]
    expiry: Option<OffsetDateTime>,
}

#[derive(Debug, Serialize)]
struct SessionInfo<'a> {
    stage: &'static str,
    remote_address: Option<IpAddr>,
    #[serde(with = "time::serde::rfc3339")]
    created_at: OffsetDateTime,
    provider_token: Option<TokenInfo<'a>>,
    identity: Option<&'a Identity>,
}

impl<'a> From<&'a Session> for SessionInfo<'a> {
    fn from(session: &'a Session) -> Self {
        Self {
            stage: session.stage().as_str(),
            remote_address: session.remote_address,
            created_at: session.created_at,
            provider_token: session.provider_token.as_ref().map(|token| TokenInfo {
                token_type: &token.token_type,
                access_token: "***",
                has_refresh_token: token.refresh_token.is_some(),
                expiry: token.expiry,
            }),
            identity: session.identity.as_ref(),
        }
    }
}

// axum handler for /debug-session-info, mounted behind the gate
pub async fn session_info(
    Extension(AuthenticatedSession(session)): Extension<AuthenticatedSession>,
) -> impl IntoResponse {
    Json(SessionInfo::from(&session)).into_response()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::staticgate::session::test_support;

    #[test]
    fn credentials_are_redacted() {
        let session = test_support::authenticated(None, OffsetDateTime::now_utc());
        let value = serde_json::to_value(SessionInfo::from(&session)).unwrap();
        let text = value.to_string();
        assert!(!text.contains("ya29.access"));
        assert_eq!(value["stage"], "complete");
        assert_eq!(value["provider_token"]["access_token"], "***");
        assert_eq!(value["identity"]["email"], "alice@example.com");
    }
}
