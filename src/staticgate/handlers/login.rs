//! Login handshake: `/login` starts it, `/callback` finishes it.
//!
//! The pending CSRF state lives in the session cookie between the two
//! requests. A failed callback never writes a cookie, so the browser keeps
//! whatever session it had before the attempt.

use axum::{
    extract::Query,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Extension,
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use std::sync::Arc;
use time::OffsetDateTime;
use tracing::{debug, error, info, instrument, warn};

use super::{pages, sanitize_next, ClientAddress};
use crate::staticgate::{
    provider::ProviderError,
    random::STATE_LENGTH,
    session::{authorize, validate, CodecError, Session},
    state::GateState,
};

#[derive(Debug, thiserror::Error)]
pub enum HandshakeError {
    #[error("no session cookie on callback")]
    MissingSession,
    #[error("session cookie error: {0}")]
    Session(#[from] CodecError),
    #[error("invalid state returned with response; CSRF attempt?")]
    Csrf,
    #[error("provider returned an error: {0}")]
    ProviderDenied(String),
    #[error("no authorization code on callback")]
    MissingCode,
    #[error("code exchange failed: {0}")]
    ProviderExchange(#[source] ProviderError),
    #[error("identity fetch failed: {0}")]
    ProviderFetch(#[source] ProviderError),
}

impl HandshakeError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::ProviderExchange(_) | Self::ProviderFetch(_) => StatusCode::BAD_GATEWAY,
            Self::Session(CodecError::Serialize(_) | CodecError::Seal) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for HandshakeError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("login failed: {self}");
        } else {
            warn!("login rejected: {self}");
        }
        pages::login_failed(status)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginParams {
    next: Option<String>,
}

/// `GET /login`
///
/// Redirects straight to `next` when the current session already grants
/// access; otherwise stores a fresh anonymous session and sends the browser
/// to the provider.
#[instrument(skip_all)]
pub async fn login(
    Extension(state): Extension<Arc<GateState>>,
    ClientAddress(remote): ClientAddress,
    jar: CookieJar,
    Query(params): Query<LoginParams>,
) -> Result<(CookieJar, Redirect), HandshakeError> {
    let next = sanitize_next(params.next.as_deref());

    match state.codec().load(&jar) {
        Ok(Some(session)) => {
            let config = state.config();
            let granted = validate(
                Some(&session),
                remote,
                config.session_lifespan(),
                OffsetDateTime::now_utc(),
            )
            .is_ok()
                && authorize(&session, config.allowed_domain()).is_ok();
            if granted {
                debug!("session already valid, skipping provider");
                let destination = next.unwrap_or_else(|| "/".to_string());
                return Ok((jar, Redirect::temporary(&destination)));
            }
        }
        Ok(None) => {}
        Err(err) => debug!("replacing unreadable session: {err}"),
    }

    let mut session = Session::new(remote);
    session.return_to = next;

    let url = state.provider().authorization_url(&session.csrf_state);
    let jar = state.codec().store(jar, &session)?;

    debug!(stage = session.stage().as_str(), "redirecting to provider");

    Ok((jar, Redirect::temporary(url.as_str())))
}

#[derive(Debug, Default, Deserialize)]
pub struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

/// `GET /callback`
#[instrument(skip_all)]
pub async fn callback(
    Extension(state): Extension<Arc<GateState>>,
    jar: CookieJar,
    Query(params): Query<CallbackParams>,
) -> Result<(CookieJar, Redirect), HandshakeError> {
    let mut session = state
        .codec()
        .load(&jar)?
        .ok_or(HandshakeError::MissingSession)?;

    verify_state(&session.csrf_state, params.state.as_deref().unwrap_or_default())?;

    if let Some(reason) = params.error {
        return Err(HandshakeError::ProviderDenied(reason));
    }

    let code = params
        .code
        .filter(|code| !code.is_empty())
        .ok_or(HandshakeError::MissingCode)?;

    let token = state
        .provider()
        .exchange_code(&code)
        .await
        .map_err(HandshakeError::ProviderExchange)?;

    let identity = state
        .provider()
        .fetch_identity(&token)
        .await
        .map_err(HandshakeError::ProviderFetch)?;

    let email = identity.email.clone();
    session.authenticate(token, identity);
    let destination = session.return_to.take().unwrap_or_else(|| "/".to_string());
    let jar = state.codec().store(jar, &session)?;

    info!(%email, stage = session.stage().as_str(), "login completed");

    Ok((jar, Redirect::temporary(&destination)))
}

/// The state echoed by the provider must match the pending one exactly. An
/// empty or wrongly sized stored state means no login is pending.
pub(crate) fn verify_state(stored: &str, returned: &str) -> Result<(), HandshakeError> {
    if stored.len() != STATE_LENGTH || stored != returned {
        return Err(HandshakeError::Csrf);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_state_matches_exactly() {
        assert!(verify_state("AbCdEf0123456789", "AbCdEf0123456789").is_ok());
        assert!(matches!(
            verify_state("AbCdEf0123456789", "AbCdEf012345678"),
            Err(HandshakeError::Csrf)
        ));
        assert!(matches!(
            verify_state("AbCdEf0123456789", "abcdef0123456789"),
            Err(HandshakeError::Csrf)
        ));
    }

    #[test]
    fn verify_state_rejects_consumed_state() {
        assert!(matches!(verify_state("", ""), Err(HandshakeError::Csrf)));
        assert!(matches!(verify_state("short", "short"), Err(HandshakeError::Csrf)));
    }

    #[test]
    fn error_statuses() {
        assert_eq!(HandshakeError::Csrf.status(), StatusCode::BAD_REQUEST);
        assert_eq!(HandshakeError::MissingSession.status(), StatusCode::BAD_REQUEST);
        assert_eq!(HandshakeError::MissingCode.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            HandshakeError::ProviderDenied("access_denied".to_string()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            HandshakeError::Session(CodecError::Forged).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            HandshakeError::Session(CodecError::Seal).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            HandshakeError::ProviderFetch(ProviderError::MissingEmail {
                operation: "userinfo request"
            })
            .status(),
            StatusCode::BAD_GATEWAY
        );
    }
}
