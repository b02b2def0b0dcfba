// SPDX-FileCopyrightText: 2026 Licensor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Licensor service.
//!
//! Expected domain outcomes (policy denials, rate limits, inventory
//! exhaustion, invalid serial numbers) are NOT errors. They travel as typed
//! outcome enums from `licensor-engine`. This enum covers the failures that
//! abort a request.

use thiserror::Error;

/// The primary error type used across all Licensor crates.
#[derive(Debug, Error)]
pub enum LicensorError {
    /// Configuration errors (invalid TOML, missing required fields, bad values).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, migration).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Key derivation, encryption, or password hashing failures.
    #[error("crypto error: {0}")]
    Crypto(String),

    /// Outbound notification failures (SMTP configuration, transport).
    #[error("notification error: {message}")]
    Notify {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Caller supplied an invalid value.
    #[error("validation error: {0}")]
    Validation(String),

    /// A referenced entity does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The operation conflicts with existing state (e.g. group still in use).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl LicensorError {
    /// Whether the error was caused by the caller rather than the server.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            LicensorError::Validation(_) | LicensorError::NotFound(_) | LicensorError::Conflict(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_are_classified() {
        assert!(LicensorError::Validation("bad".into()).is_client_error());
        assert!(LicensorError::NotFound("sn".into()).is_client_error());
        assert!(LicensorError::Conflict("in use".into()).is_client_error());
        assert!(!LicensorError::Internal("boom".into()).is_client_error());
        assert!(
            !LicensorError::Storage {
                source: Box::new(std::io::Error::other("disk")),
            }
            .is_client_error()
        );
    }

    #[test]
    fn display_includes_context() {
        let err = LicensorError::Timeout {
            duration: std::time::Duration::from_secs(10),
        };
        assert_eq!(err.to_string(), "operation timed out after 10s");

        let err = LicensorError::Notify {
            message: "smtp host missing".into(),
            source: None,
        };
        assert!(err.to_string().contains("smtp host missing"));
    }
}
