// SPDX-FileCopyrightText: 2026 Licensor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cryptographic primitives for the Licensor service.
//!
//! - [`envelope`]: AES-256-GCM under a key derived from the SN itself
//! - [`password`]: Argon2id hashing of the admin password
//! - [`ids`]: random serial numbers, short ids, and session tokens

pub mod envelope;
pub mod ids;
pub mod password;

pub use envelope::{decrypt_for_sn, derive_sn_key, encrypt_for_sn};
pub use ids::{generate_password, generate_short_id, generate_sn, generate_token};
pub use password::{hash_password, verify_password};
