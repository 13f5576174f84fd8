//! Random tokens for the login handshake.

use rand::{distributions::Alphanumeric, rngs::OsRng, Rng};

/// Length of the CSRF state stored in the session and echoed by the provider.
pub const STATE_LENGTH: usize = 16;

/// Generate `length` characters drawn uniformly from `[A-Za-z0-9]`.
///
/// Uses the operating system CSPRNG; the result guards the login callback
/// against forged requests, so it must not be predictable.
#[must_use]
pub fn generate(length: usize) -> String {
    OsRng
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

/// Generate a CSRF state token of [`STATE_LENGTH`] characters.
#[must_use]
pub fn csrf_state() -> String {
    generate(STATE_LENGTH)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn generate_has_requested_length() {
        assert_eq!(generate(0).len(), 0);
        assert_eq!(generate(1).len(), 1);
        assert_eq!(generate(64).len(), 64);
        assert_eq!(csrf_state().len(), STATE_LENGTH);
    }

    #[test]
    fn generate_uses_alphanumeric_alphabet() {
        let token = generate(512);
        assert!(
            token.chars().all(|c| c.is_ascii_alphanumeric()),
            "token should only contain [A-Za-z0-9]: {token}"
        );
    }

    #[test]
    fn generate_is_not_repeating() {
        let tokens: HashSet<String> = (0..100).map(|_| csrf_state()).collect();
        assert_eq!(tokens.len(), 100);
    }
}
