// SPDX-FileCopyrightText: 2026 Licensor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.

use crate::diagnostic::ConfigError;
use crate::model::LicensorConfig;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Collects every failure instead of stopping at the first.
pub fn validate_config(config: &LicensorConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    let host = config.server.host.trim();
    if host.is_empty() {
        fail("server.host must not be empty".to_string());
    } else {
        let is_valid_ip = host.parse::<std::net::IpAddr>().is_ok();
        let is_valid_hostname = host
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-' || c == ':');
        if !is_valid_ip && !is_valid_hostname {
            fail(format!(
                "server.host `{host}` is not a valid IP address or hostname"
            ));
        }
    }

    if config.server.activation_port == 0 {
        fail("server.activation_port must be non-zero".to_string());
    }
    if config.server.admin_port == 0 {
        fail("server.admin_port must be non-zero".to_string());
    }
    if config.server.activation_port == config.server.admin_port {
        fail(format!(
            "server.activation_port and server.admin_port must differ, both are {}",
            config.server.admin_port
        ));
    }
    if config.server.request_timeout_secs < 1 {
        fail("server.request_timeout_secs must be at least 1".to_string());
    }

    if config.storage.database_path.trim().is_empty() {
        fail("storage.database_path must not be empty".to_string());
    }

    if config.admin.username.trim().is_empty() {
        fail("admin.username must not be empty".to_string());
    }
    if config.admin.session_ttl_secs < 1 {
        fail("admin.session_ttl_secs must be at least 1".to_string());
    }
    if config.admin.captcha_ttl_secs < 1 {
        fail("admin.captcha_ttl_secs must be at least 1".to_string());
    }
    if config.admin.lockout_secs < 1 {
        fail("admin.lockout_secs must be at least 1".to_string());
    }
    if config.admin.max_login_failures < 1 {
        fail("admin.max_login_failures must be at least 1".to_string());
    }
    if config.admin.max_login_failures > config.admin.permanent_lockout_after {
        fail(format!(
            "admin.max_login_failures ({}) must not exceed admin.permanent_lockout_after ({})",
            config.admin.max_login_failures, config.admin.permanent_lockout_after
        ));
    }

    if config.limits.daily_request_limit < 1 {
        fail(format!(
            "limits.daily_request_limit must be at least 1, got {}",
            config.limits.daily_request_limit
        ));
    }
    if config.limits.daily_email_limit < 1 {
        fail(format!(
            "limits.daily_email_limit must be at least 1, got {}",
            config.limits.daily_email_limit
        ));
    }
    if config.limits.batch_create_max < 1 {
        fail("limits.batch_create_max must be at least 1".to_string());
    }

    if config.notify.send_timeout_secs < 1 {
        fail("notify.send_timeout_secs must be at least 1".to_string());
    }

    if !LOG_LEVELS.contains(&config.logging.level.as_str()) {
        fail(format!(
            "logging.level `{}` must be one of {}",
            config.logging.level,
            LOG_LEVELS.join(", ")
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
