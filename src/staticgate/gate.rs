//! Access gate in front of the protected routes.
//!
//! Every protected request decodes the session cookie, checks that it
//! authenticates the caller and that the identity belongs to the allowed
//! domain. Unauthenticated callers get a login prompt, authenticated
//! outsiders get a 403.

use axum::{
    extract::Request,
    middleware::Next,
    response::Response,
    Extension,
};
use axum_extra::extract::cookie::CookieJar;
use std::{net::IpAddr, sync::Arc};
use time::OffsetDateTime;
use tracing::{debug, warn};

use super::{
    config::GateConfig,
    handlers::{client_address, pages},
    session::{authorize, validate, AuthorizationError, Session, ValidationError},
    state::GateState,
};

#[derive(Debug, thiserror::Error)]
pub enum AccessError {
    #[error("session does not have valid auth: {0}")]
    Unauthenticated(#[from] ValidationError),
    #[error("session is not authorized: {0}")]
    Forbidden(#[from] AuthorizationError),
}

/// Session that passed the gate, available to protected handlers.
#[derive(Debug, Clone)]
pub struct AuthenticatedSession(pub Session);

/// Decide whether `session` grants access to a caller at `remote`.
///
/// # Errors
/// [`AccessError::Unauthenticated`] when validation fails,
/// [`AccessError::Forbidden`] when the identity is outside the allowed domain.
pub fn check_access(
    session: Option<Session>,
    remote: Option<IpAddr>,
    config: &GateConfig,
    now: OffsetDateTime,
) -> Result<Session, AccessError> {
    validate(session.as_ref(), remote, config.session_lifespan(), now)?;
    let session = session.ok_or(ValidationError::MissingSession)?;
    authorize(&session, config.allowed_domain())?;
    Ok(session)
}

/// Middleware for `axum::middleware::from_fn`.
pub async fn require_login(
    Extension(state): Extension<Arc<GateState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let remote = client_address(request.headers(), request.extensions());

    let session = state.codec().load(&jar).unwrap_or_else(|err| {
        warn!("ignoring session cookie: {err}");
        None
    });

    match check_access(session, remote, state.config(), OffsetDateTime::now_utc()) {
        Ok(session) => {
            request.extensions_mut().insert(AuthenticatedSession(session));
            next.run(request).await
        }
        Err(AccessError::Unauthenticated(reason)) => {
            debug!(%reason, "login required");
            let target = request
                .uri()
                .path_and_query()
                .map_or("/", |path| path.as_str());
            pages::login_prompt(target)
        }
        Err(err @ AccessError::Forbidden(_)) => {
            warn!("{err}");
            pages::forbidden()
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::staticgate::session::test_support;
    use std::net::Ipv4Addr;
    use time::Duration;

    fn config() -> GateConfig {
        GateConfig::new("http://localhost:8080", "example.com").unwrap()
    }

    const REMOTE: Option<IpAddr> = Some(IpAddr::V4(Ipv4Addr::new(192, 0, 2, 1)));

    #[test]
    fn grants_valid_session() {
        let now = OffsetDateTime::now_utc();
        let session = test_support::authenticated(REMOTE, now - Duration::minutes(5));
        let granted = check_access(Some(session.clone()), REMOTE, &config(), now);
        assert!(matches!(granted, Ok(s) if s == session));
    }

    #[test]
    fn missing_session_is_unauthenticated() {
        let result = check_access(None, REMOTE, &config(), OffsetDateTime::now_utc());
        assert!(matches!(
            result,
            Err(AccessError::Unauthenticated(ValidationError::MissingSession))
        ));
    }

    #[test]
    fn anonymous_session_is_unauthenticated() {
        let now = OffsetDateTime::now_utc();
        let result = check_access(Some(Session::new_at(REMOTE, now)), REMOTE, &config(), now);
        assert!(matches!(result, Err(AccessError::Unauthenticated(_))));
    }

    #[test]
    fn outsider_is_forbidden_not_unauthenticated() {
        let now = OffsetDateTime::now_utc();
        let mut session = Session::new_at(REMOTE, now);
        session.authenticate(test_support::token(), test_support::identity("other.org"));
        let result = check_access(Some(session), REMOTE, &config(), now);
        assert!(matches!(
            result,
            Err(AccessError::Forbidden(AuthorizationError::WrongDomain))
        ));
    }

    #[test]
    fn address_change_is_unauthenticated() {
        let now = OffsetDateTime::now_utc();
        let session = test_support::authenticated(REMOTE, now);
        let other = Some(IpAddr::V4(Ipv4Addr::new(198, 51, 100, 7)));
        let result = check_access(Some(session), other, &config(), now);
        assert!(matches!(
            result,
            Err(AccessError::Unauthenticated(ValidationError::AddressMismatch))
        ));
    }
}
