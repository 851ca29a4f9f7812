// ABOUTME: Credential generation and Argon2 secret hashing shared by engine and adapters
// ABOUTME: All randomness comes from ring's SystemRandom
//
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::errors::OAuthError;
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use ring::rand::{SecureRandom, SystemRandom};
use std::sync::OnceLock;
use tracing::error;

/// Hex-encoded random string from `byte_len` bytes of CSPRNG output.
///
/// Authorization codes use 32 bytes, access and refresh tokens 40, client
/// ids 16, client secrets 32.
pub fn random_hex(byte_len: usize) -> Result<String, OAuthError> {
    let rng = SystemRandom::new();
    let mut bytes = vec![0u8; byte_len];
    rng.fill(&mut bytes).map_err(|_| {
        error!("SystemRandom failed - cannot generate secure random bytes");
        OAuthError::server_error("Secure random generation failed")
    })?;
    Ok(hex::encode(bytes))
}

/// Hash a client secret with Argon2id and a random salt
pub fn hash_client_secret(secret: &str) -> Result<String, OAuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(secret.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| {
            error!("Failed to hash client secret: {e}");
            OAuthError::server_error("Failed to hash client secret")
        })
}

/// Verify a plaintext secret against a stored Argon2 hash
#[must_use]
pub fn verify_client_secret(secret: &str, stored_hash: &str) -> bool {
    PasswordHash::new(stored_hash).is_ok_and(|parsed| {
        Argon2::default()
            .verify_password(secret.as_bytes(), &parsed)
            .is_ok()
    })
}

/// Verification against a throwaway hash, run when the client is unknown or
/// public so the missing-client path costs the same as a secret mismatch.
pub fn dummy_verify(secret: &str) {
    static DUMMY_HASH: OnceLock<String> = OnceLock::new();
    let hash = DUMMY_HASH
        .get_or_init(|| hash_client_secret("mcpauth-timing-pad").unwrap_or_default());
    let _ = verify_client_secret(secret, hash);
}
