// SPDX-FileCopyrightText: 2026 Licensor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Activation envelope: AES-256-GCM keyed by SHA-256 of the SN.
//!
//! Wire form is `base64(nonce || ciphertext || tag)` with the standard
//! alphabet and padding. Every call to [`seal`] draws a fresh 96-bit nonce
//! from the system CSPRNG.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use licensor_core::LicensorError;
use ring::aead::{AES_256_GCM, Aad, LessSafeKey, NONCE_LEN, Nonce, UnboundKey};
use ring::digest::{SHA256, digest};
use ring::rand::{SecureRandom, SystemRandom};
use zeroize::Zeroizing;

fn aead_key(key: &[u8; 32]) -> Result<LessSafeKey, LicensorError> {
    let unbound = UnboundKey::new(&AES_256_GCM, key)
        .map_err(|_| LicensorError::Crypto("failed to create AES-256-GCM key".to_string()))?;
    Ok(LessSafeKey::new(unbound))
}

/// Encrypt with a random nonce. Returns `(ciphertext_with_tag, nonce)`.
pub fn seal(key: &[u8; 32], plaintext: &[u8]) -> Result<(Vec<u8>, [u8; NONCE_LEN]), LicensorError> {
    let key = aead_key(key)?;

    let mut nonce_bytes = [0u8; NONCE_LEN];
    SystemRandom::new()
        .fill(&mut nonce_bytes)
        .map_err(|_| LicensorError::Crypto("failed to generate random nonce".to_string()))?;

    let mut in_out = plaintext.to_vec();
    key.seal_in_place_append_tag(
        Nonce::assume_unique_for_key(nonce_bytes),
        Aad::empty(),
        &mut in_out,
    )
    .map_err(|_| LicensorError::Crypto("AES-256-GCM encryption failed".to_string()))?;

    Ok((in_out, nonce_bytes))
}

/// Decrypt `ciphertext` (tag appended). Fails on a wrong key or tampered data.
pub fn open(
    key: &[u8; 32],
    nonce_bytes: &[u8; NONCE_LEN],
    ciphertext: &[u8],
) -> Result<Vec<u8>, LicensorError> {
    let key = aead_key(key)?;
    let mut in_out = ciphertext.to_vec();
    let plaintext = key
        .open_in_place(
            Nonce::assume_unique_for_key(*nonce_bytes),
            Aad::empty(),
            &mut in_out,
        )
        .map_err(|_| {
            LicensorError::Crypto("AES-256-GCM decryption failed: wrong key or corrupted data".to_string())
        })?;
    Ok(plaintext.to_vec())
}

/// SHA-256 of the SN bytes. Whoever holds the SN can derive the key.
pub fn derive_sn_key(sn: &str) -> Zeroizing<[u8; 32]> {
    let hash = digest(&SHA256, sn.as_bytes());
    let mut key = Zeroizing::new([0u8; 32]);
    key.copy_from_slice(hash.as_ref());
    key
}

/// Seal `plaintext` for the holder of `sn` and encode it for transport.
pub fn encrypt_for_sn(sn: &str, plaintext: &[u8]) -> Result<String, LicensorError> {
    let key = derive_sn_key(sn);
    let (ciphertext, nonce) = seal(&key, plaintext)?;

    let mut envelope = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    envelope.extend_from_slice(&nonce);
    envelope.extend_from_slice(&ciphertext);
    Ok(STANDARD.encode(envelope))
}

/// Inverse of [`encrypt_for_sn`]. Clients do this; the server uses it in tests
/// and diagnostics.
pub fn decrypt_for_sn(sn: &str, encoded: &str) -> Result<Vec<u8>, LicensorError> {
    let envelope = STANDARD
        .decode(encoded)
        .map_err(|e| LicensorError::Crypto(format!("invalid base64 envelope: {e}")))?;
    if envelope.len() < NONCE_LEN {
        return Err(LicensorError::Crypto("envelope shorter than nonce".to_string()));
    }
    let (nonce, ciphertext) = envelope.split_at(NONCE_LEN);
    let mut nonce_bytes = [0u8; NONCE_LEN];
    nonce_bytes.copy_from_slice(nonce);

    let key = derive_sn_key(sn);
    open(&key, &nonce_bytes, ciphertext)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sn_envelope_round_trips() {
        let sn = "ABCD-EFGH-IJKL-MNOP";
        let plaintext = br#"{"llm_api_key":"sk-test"}"#;

        let encoded = encrypt_for_sn(sn, plaintext).unwrap();
        assert_eq!(decrypt_for_sn(sn, &encoded).unwrap(), plaintext);
    }

    #[test]
    fn wrong_sn_cannot_open_envelope() {
        let encoded = encrypt_for_sn("ABCD-EFGH-IJKL-MNOP", b"payload").unwrap();
        assert!(decrypt_for_sn("ABCD-EFGH-IJKL-MNOQ", &encoded).is_err());
    }

    #[test]
    fn envelope_layout_is_nonce_then_sealed_payload() {
        let encoded = encrypt_for_sn("SN", b"hello").unwrap();
        let raw = STANDARD.decode(encoded).unwrap();
        assert_eq!(raw.len(), NONCE_LEN + 5 + 16);
    }

    #[test]
    fn same_plaintext_encrypts_differently() {
        let a = encrypt_for_sn("SN", b"same").unwrap();
        let b = encrypt_for_sn("SN", b"same").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn key_is_sha256_of_sn() {
        let key = derive_sn_key("abc");
        assert_eq!(
            hex::encode(*key),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn tampered_envelope_fails() {
        let encoded = encrypt_for_sn("SN", b"do not tamper").unwrap();
        let mut raw = STANDARD.decode(encoded).unwrap();
        let last = raw.len() - 1;
        raw[last] ^= 0x01;
        assert!(decrypt_for_sn("SN", &STANDARD.encode(raw)).is_err());
    }

    #[test]
    fn truncated_envelope_is_rejected() {
        assert!(decrypt_for_sn("SN", &STANDARD.encode([0u8; 4])).is_err());
        assert!(decrypt_for_sn("SN", "not base64!").is_err());
    }
}
