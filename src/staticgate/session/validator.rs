//! Authentication and authorization checks for a decoded session.

use std::net::IpAddr;
use time::{Duration, OffsetDateTime};

use super::Session;

/// First failing authentication check. Messages are safe to log; they never
/// include credential or profile contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("no session")]
    MissingSession,
    #[error("no provider token attached to session")]
    MissingToken,
    #[error("no identity attached to session")]
    MissingIdentity,
    #[error("no authenticated email")]
    MissingEmail,
    #[error("remote address does not match the session")]
    AddressMismatch,
    #[error("session is from the future")]
    FromTheFuture,
    #[error("session has expired")]
    Expired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AuthorizationError {
    #[error("identity does not belong to the allowed domain")]
    WrongDomain,
}

/// Decide whether `session` authenticates a request from `remote` at `now`.
///
/// Checks run in a fixed order and stop at the first failure.
///
/// # Errors
/// Returns the first failing [`ValidationError`].
pub fn validate(
    session: Option<&Session>,
    remote: Option<IpAddr>,
    lifespan: Duration,
    now: OffsetDateTime,
) -> Result<(), ValidationError> {
    let session = session.ok_or(ValidationError::MissingSession)?;

    if session.provider_token.is_none() {
        return Err(ValidationError::MissingToken);
    }

    let identity = session
        .identity
        .as_ref()
        .ok_or(ValidationError::MissingIdentity)?;

    if identity.email.is_empty() {
        return Err(ValidationError::MissingEmail);
    }

    if session.remote_address != remote {
        return Err(ValidationError::AddressMismatch);
    }

    let age = now - session.created_at;
    if age.is_negative() {
        return Err(ValidationError::FromTheFuture);
    }
    if age >= lifespan {
        return Err(ValidationError::Expired);
    }

    Ok(())
}

/// Check the organizational domain claim against `allowed_domain`.
///
/// Kept apart from [`validate`] so callers that only need authentication can
/// skip it.
///
/// # Errors
/// Returns [`AuthorizationError::WrongDomain`] when the claim differs or no
/// identity is attached.
pub fn authorize(session: &Session, allowed_domain: &str) -> Result<(), AuthorizationError> {
    match &session.identity {
        Some(identity) if identity.hd == allowed_domain => Ok(()),
        _ => Err(AuthorizationError::WrongDomain),
    }
}
