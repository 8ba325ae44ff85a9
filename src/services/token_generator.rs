//! Cryptographically secure random strings for session ids, refresh tokens
//! and password-reset tokens.

use rand::Rng;

/// 62 symbols: `A-Z`, `a-z`, `0-9`.
pub const ALPHANUMERIC: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// 64 symbols: [`ALPHANUMERIC`] plus `-` and `_`. Safe in URLs and headers.
pub const URL_SAFE: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_";

pub const SESSION_ID_LENGTH: usize = 32;
pub const REFRESH_TOKEN_LENGTH: usize = 64;
pub const RESET_TOKEN_LENGTH: usize = 32;

pub trait TokenGenerator: Send + Sync {
    /// Returns `length` symbols, each drawn uniformly from `alphabet`.
    fn random_token(&self, length: usize, alphabet: &[u8]) -> String;

    fn session_id(&self) -> String {
        self.random_token(SESSION_ID_LENGTH, ALPHANUMERIC)
    }

    fn refresh_token(&self) -> String {
        self.random_token(REFRESH_TOKEN_LENGTH, URL_SAFE)
    }
}

/// Generator backed by the thread-local CSPRNG (`ChaCha`, seeded from the OS).
#[derive(Debug, Clone, Copy, Default)]
pub struct SecureTokenGenerator;

impl TokenGenerator for SecureTokenGenerator {
    fn random_token(&self, length: usize, alphabet: &[u8]) -> String {
        assert!(!alphabet.is_empty(), "token alphabet must not be empty");

        let mut rng = rand::rng();
        (0..length)
            .map(|_| char::from(alphabet[rng.random_range(0..alphabet.len())]))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn alphabets_have_expected_sizes() {
        assert_eq!(ALPHANUMERIC.len(), 62);
        assert_eq!(URL_SAFE.len(), 64);
        let unique: HashSet<_> = URL_SAFE.iter().collect();
        assert_eq!(unique.len(), 64);
    }

    #[test]
    fn tokens_have_requested_length_and_alphabet() {
        let generator = SecureTokenGenerator;
        let token = generator.random_token(RESET_TOKEN_LENGTH, ALPHANUMERIC);
        assert_eq!(token.len(), 32);
        assert!(token.bytes().all(|b| ALPHANUMERIC.contains(&b)));

        let refresh = generator.refresh_token();
        assert_eq!(refresh.len(), REFRESH_TOKEN_LENGTH);
        assert!(refresh.bytes().all(|b| URL_SAFE.contains(&b)));
    }

    #[test]
    fn tokens_do_not_repeat() {
        let generator = SecureTokenGenerator;
        let tokens: HashSet<String> = (0..1000).map(|_| generator.session_id()).collect();
        assert_eq!(tokens.len(), 1000);
    }

    #[test]
    fn every_symbol_is_reachable() {
        let generator = SecureTokenGenerator;
        let sample = generator.random_token(20_000, ALPHANUMERIC);
        let seen: HashSet<u8> = sample.bytes().collect();
        assert_eq!(seen.len(), ALPHANUMERIC.len());
    }
}
