//! Argon2id password hashing.
//!
//! Hashing and verification are CPU-bound; the async helpers move them onto
//! the blocking pool so they never stall the runtime.

use anyhow::{Context, Result};
use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use std::sync::OnceLock;
use tokio::task;

use crate::config::SecurityConfig;

/// Hash a password using Argon2id with optional custom params.
/// If config is None, uses the argon2 crate defaults.
pub fn hash_password(password: &str, config: Option<&SecurityConfig>) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);

    let argon2 = if let Some(cfg) = config {
        let params = Params::new(
            cfg.argon2_memory_cost_kib,
            cfg.argon2_time_cost,
            cfg.argon2_parallelism,
            None,
        )
        .map_err(|e| anyhow::anyhow!("Invalid Argon2 params: {e}"))?;
        Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
    } else {
        Argon2::default()
    };

    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {e}"))?;

    Ok(hash.to_string())
}

/// Verify a password against a PHC-formatted hash. Params are read from the
/// hash itself, so hashes made with older settings keep verifying.
pub fn verify_password(password_hash: &str, password: &str) -> Result<bool> {
    let parsed_hash = PasswordHash::new(password_hash)
        .map_err(|e| anyhow::anyhow!("Invalid password hash format: {e}"))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// A hash of a throwaway password, made once per process with the first
/// params seen. Login checks it when there is no account to check against,
/// so a miss costs the same argon2 work as a wrong password.
pub fn decoy_hash(config: &SecurityConfig) -> Result<&'static str> {
    static DECOY: OnceLock<String> = OnceLock::new();
    if let Some(hash) = DECOY.get() {
        return Ok(hash);
    }
    let hash = hash_password("authkeep-decoy-password", Some(config))?;
    Ok(DECOY.get_or_init(|| hash))
}

pub async fn hash_password_blocking(password: String, config: SecurityConfig) -> Result<String> {
    task::spawn_blocking(move || hash_password(&password, Some(&config)))
        .await
        .context("Password hashing task panicked")?
}

pub async fn verify_password_blocking(password_hash: String, password: String) -> Result<bool> {
    task::spawn_blocking(move || verify_password(&password_hash, &password))
        .await
        .context("Password verification task panicked")?
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cheap_config() -> SecurityConfig {
        SecurityConfig {
            argon2_memory_cost_kib: 1024,
            argon2_time_cost: 1,
            argon2_parallelism: 1,
            ..SecurityConfig::default()
        }
    }

    #[test]
    fn hash_then_verify() {
        let hash = hash_password("Secret123!", Some(&cheap_config())).unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password(&hash, "Secret123!").unwrap());
        assert!(!verify_password(&hash, "secret123!").unwrap());
    }

    #[test]
    fn same_password_gets_distinct_salts() {
        let a = hash_password("Secret123!", Some(&cheap_config())).unwrap();
        let b = hash_password("Secret123!", Some(&cheap_config())).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn garbage_hash_is_an_error() {
        assert!(verify_password("not-a-phc-string", "whatever").is_err());
    }

    #[test]
    fn decoy_hash_is_stable_and_rejects_guesses() {
        let first = decoy_hash(&cheap_config()).unwrap();
        let second = decoy_hash(&SecurityConfig::default()).unwrap();
        assert_eq!(first, second);
        assert!(first.starts_with("$argon2id$"));
        assert!(!verify_password(first, "Secret123!").unwrap());
    }

    #[tokio::test]
    async fn blocking_helpers_round_trip() {
        let hash = hash_password_blocking("Secret123!".to_string(), cheap_config())
            .await
            .unwrap();
        assert!(
            verify_password_blocking(hash, "Secret123!".to_string())
                .await
                .unwrap()
        );
    }
}
