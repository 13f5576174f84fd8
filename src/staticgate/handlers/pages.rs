//! Small static pages returned by the gate and the login handlers.

use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use url::form_urlencoded;

const LOGIN_FAILED: &str = "An error occurred while authenticating you. Please try again, and ask for help if the issue persists.";

fn page(title: &str, body: &str) -> Html<String> {
    Html(format!(
        "<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\"><title>{title}</title></head>\
         <body><p>{body}</p></body></html>\n"
    ))
}

/// Challenge shown when the session does not authenticate the request.
pub fn login_prompt(next: &str) -> Response {
    let next: String = form_urlencoded::byte_serialize(next.as_bytes()).collect();
    (
        StatusCode::UNAUTHORIZED,
        page(
            "Login required",
            &format!("You need to log in! [<a href=\"/login?next={next}\">log in</a>]"),
        ),
    )
        .into_response()
}

pub fn forbidden() -> Response {
    (
        StatusCode::FORBIDDEN,
        page(
            "Forbidden",
            "You are not authorized to view this resource. Are you using the correct account? \
             [<a href=\"/logout\">log out</a>]",
        ),
    )
        .into_response()
}

/// Generic failure page for an abandoned login attempt.
pub fn login_failed(status: StatusCode) -> Response {
    (
        status,
        page(
            "Login failed",
            &format!("{LOGIN_FAILED} [<a href=\"/login\">log in again</a>]"),
        ),
    )
        .into_response()
}

pub fn logged_out() -> Html<String> {
    page(
        "Logged out",
        "Okay, you're logged out. [<a href=\"/\">home</a>]",
    )
}

// axum handler for /error
pub async fn error() -> impl IntoResponse {
    page("Login failed", LOGIN_FAILED)
}
