use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension,
};
use axum_extra::extract::cookie::CookieJar;
use std::sync::Arc;
use tracing::{debug, error, info};

use super::{pages, ClientAddress};
use crate::staticgate::{session::Session, state::GateState};

// axum handler for /logout
pub async fn logout(
    Extension(state): Extension<Arc<GateState>>,
    ClientAddress(remote): ClientAddress,
    jar: CookieJar,
) -> Response {
    let mut session = match state.codec().load(&jar) {
        Ok(Some(session)) => session,
        Ok(None) => Session::new(remote),
        Err(err) => {
            debug!("logging out unreadable session: {err}");
            Session::new(remote)
        }
    };

    if let Some(identity) = &session.identity {
        info!(email = %identity.email, "logout");
    }

    session.logout();

    match state.codec().store(jar, &session) {
        Ok(jar) => (jar, pages::logged_out()).into_response(),
        Err(err) => {
            error!("Failed to store session on logout: {err}");
            (StatusCode::INTERNAL_SERVER_ERROR, "failed to log out").into_response()
        }
    }
}
