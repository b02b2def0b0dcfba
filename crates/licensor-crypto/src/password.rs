// SPDX-FileCopyrightText: 2026 Licensor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Argon2id hashing for the admin password, stored as a PHC string.

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use licensor_core::LicensorError;
use ring::rand::{SecureRandom, SystemRandom};
use secrecy::{ExposeSecret, SecretString};

fn hasher() -> Argon2<'static> {
    Argon2::new(Algorithm::Argon2id, Version::V0x13, Params::default())
}

/// Hash `password` with a fresh random salt.
pub fn hash_password(password: &SecretString) -> Result<String, LicensorError> {
    let mut salt_bytes = [0u8; 16];
    SystemRandom::new()
        .fill(&mut salt_bytes)
        .map_err(|_| LicensorError::Crypto("failed to generate random salt".to_string()))?;
    let salt = SaltString::encode_b64(&salt_bytes)
        .map_err(|e| LicensorError::Crypto(format!("invalid salt: {e}")))?;

    hasher()
        .hash_password(password.expose_secret().as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| LicensorError::Crypto(format!("Argon2id hashing failed: {e}")))
}

/// Check `password` against a stored PHC string.
///
/// A malformed stored hash is an error; a mismatch is `Ok(false)`.
pub fn verify_password(password: &SecretString, stored: &str) -> Result<bool, LicensorError> {
    let parsed = PasswordHash::new(stored)
        .map_err(|e| LicensorError::Crypto(format!("stored password hash is malformed: {e}")))?;
    Ok(hasher()
        .verify_password(password.expose_secret().as_bytes(), &parsed)
        .is_ok())
}
