//! # Staticgate (static assets behind an OAuth login)
//!
//! `staticgate` serves a directory of static assets and only hands them out to
//! users who logged in through an OAuth identity provider and belong to the
//! configured organizational domain.
//!
//! ## Sessions
//!
//! There is no server-side session table. The whole session record lives in a
//! single cookie, encrypted and authenticated with a 64-byte key
//! (`STATICGATE_COOKIE_KEY`). Every instance sharing that key can serve any
//! request; losing the key logs everybody out.
//!
//! ## Login handshake
//!
//! `/login` stores a random CSRF state in a fresh anonymous session and
//! redirects to the provider. `/callback` checks the echoed state, exchanges the
//! authorization code, fetches the user profile and stores both in the cookie.
//! Failures are terminal for the attempt; the user starts again from `/login`.

pub mod cli;
pub mod staticgate;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_commit_hash_format() {
        if GIT_COMMIT_HASH == "unknown" {
            // Acceptable in non-git build environments
            return;
        }
        assert!(
            GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit()),
            "GIT_COMMIT_HASH should be a hex string, got: {GIT_COMMIT_HASH}"
        );
    }

    #[test]
    fn test_app_user_agent_format() {
        assert!(APP_USER_AGENT.starts_with(env!("CARGO_PKG_NAME")));
        assert!(APP_USER_AGENT.contains(env!("CARGO_PKG_VERSION")));
    }
}
