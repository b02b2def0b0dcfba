// SPDX-FileCopyrightText: 2026 Licensor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Licensor serial-number service.
//!
//! Provides the error type, domain records, timestamp helpers, and the
//! traits that let the engine talk to notifiers and expiring stores without
//! depending on their implementations.

pub mod error;
pub mod time;
pub mod traits;
pub mod types;

pub use error::LicensorError;
pub use traits::{ExpiringStore, Notifier};
pub use types::{
    ActivationPayload, ConditionEntry, CredentialConfig, CredentialKind, EmailRecord,
    FilterEntry, FilterList, FilterToggles, Group, GroupKind, License, LicenseStats,
    MAX_VALID_DAYS, NewLicense, ProductType, RequestLimits, ResponseCode, SmtpSettings, SnIssuedNotice,
};

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn response_codes_serialize_screaming_snake() {
        let cases = [
            (ResponseCode::Success, "SUCCESS"),
            (ResponseCode::InvalidRequest, "INVALID_REQUEST"),
            (ResponseCode::InvalidSn, "INVALID_SN"),
            (ResponseCode::SnDisabled, "SN_DISABLED"),
            (ResponseCode::SnExpired, "SN_EXPIRED"),
            (ResponseCode::EncryptFailed, "ENCRYPT_FAILED"),
            (ResponseCode::InvalidEmail, "INVALID_EMAIL"),
            (ResponseCode::EmailBlacklisted, "EMAIL_BLACKLISTED"),
            (ResponseCode::EmailNotWhitelisted, "EMAIL_NOT_WHITELISTED"),
            (ResponseCode::EmailAlreadyUsed, "EMAIL_ALREADY_USED"),
            (ResponseCode::RateLimitExceeded, "RATE_LIMIT_EXCEEDED"),
            (ResponseCode::EmailLimitExceeded, "EMAIL_LIMIT_EXCEEDED"),
            (ResponseCode::NoAvailableSn, "NO_AVAILABLE_SN"),
            (ResponseCode::InternalError, "INTERNAL_ERROR"),
        ];
        for (code, text) in cases {
            assert_eq!(code.to_string(), text);
            assert_eq!(serde_json::to_string(&code).unwrap(), format!("\"{text}\""));
            assert_eq!(ResponseCode::from_str(text).unwrap(), code);
        }
    }

    #[test]
    fn already_used_counts_as_success() {
        assert!(ResponseCode::Success.is_success());
        assert!(ResponseCode::EmailAlreadyUsed.is_success());
        assert!(!ResponseCode::NoAvailableSn.is_success());
    }

    #[test]
    fn secrets_are_redacted_in_debug() {
        let cfg = CredentialConfig {
            id: "c1".into(),
            name: "primary".into(),
            provider_type: "openai".into(),
            base_url: String::new(),
            api_key: "sk-very-secret".into(),
            model: "gpt".into(),
            is_active: true,
            start_date: String::new(),
            end_date: String::new(),
            group_id: String::new(),
        };
        let dbg = format!("{cfg:?}");
        assert!(!dbg.contains("sk-very-secret"));
        assert!(dbg.contains("[redacted]"));

        let smtp = SmtpSettings {
            password: "hunter2".into(),
            ..Default::default()
        };
        assert!(!format!("{smtp:?}").contains("hunter2"));
    }

    #[test]
    fn filter_defaults() {
        let toggles = FilterToggles::default();
        assert!(toggles.blacklist_enabled);
        assert!(!toggles.whitelist_enabled);
        assert!(!toggles.conditions_enabled);
        assert_eq!(RequestLimits::default().daily_request_limit, 5);
        assert_eq!(FilterList::from_str("whitelist").unwrap(), FilterList::Whitelist);
        assert_eq!(GroupKind::License.to_string(), "license");
    }
}
