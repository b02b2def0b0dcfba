// SPDX-FileCopyrightText: 2026 Licensor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Random identifiers drawn from the system CSPRNG.

use licensor_core::LicensorError;
use ring::rand::{SecureRandom, SystemRandom};

const SN_CHARSET: &[u8; 36] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const PASSWORD_CHARSET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz23456789";

fn random_bytes<const N: usize>() -> Result<[u8; N], LicensorError> {
    let mut buf = [0u8; N];
    SystemRandom::new()
        .fill(&mut buf)
        .map_err(|_| LicensorError::Crypto("system random source failed".to_string()))?;
    Ok(buf)
}

/// `len` characters uniformly drawn from `charset` (rejection sampling).
fn random_string(charset: &[u8], len: usize) -> Result<String, LicensorError> {
    let limit = 256 - (256 % charset.len());
    let mut out = String::with_capacity(len);
    while out.len() < len {
        for b in random_bytes::<32>()? {
            if (b as usize) < limit && out.len() < len {
                out.push(charset[b as usize % charset.len()] as char);
            }
        }
    }
    Ok(out)
}

/// A serial number of the form `XXXX-XXXX-XXXX-XXXX` over `A-Z0-9`.
pub fn generate_sn() -> Result<String, LicensorError> {
    let raw = random_string(SN_CHARSET, 16)?;
    Ok(format!("{}-{}-{}-{}", &raw[0..4], &raw[4..8], &raw[8..12], &raw[12..16]))
}

/// 16 hex characters, used for captcha and config ids.
pub fn generate_short_id() -> Result<String, LicensorError> {
    Ok(hex::encode(random_bytes::<8>()?))
}

/// 64 hex characters, used for session tokens.
pub fn generate_token() -> Result<String, LicensorError> {
    Ok(hex::encode(random_bytes::<32>()?))
}

/// A readable random password without look-alike characters.
pub fn generate_password(len: usize) -> Result<String, LicensorError> {
    random_string(PASSWORD_CHARSET, len)
}
