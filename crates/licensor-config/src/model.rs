// SPDX-FileCopyrightText: 2026 Licensor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Licensor service.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.
//!
//! Policy that operators tune at runtime (email filter toggles, daily
//! limits, SMTP) lives in the database settings table. The values here are
//! the defaults used until an administrator overrides them.

use serde::{Deserialize, Serialize};

/// Top-level Licensor configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LicensorConfig {
    /// Listener settings for the activation and admin surfaces.
    #[serde(default)]
    pub server: ServerConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Administrator login and session settings.
    #[serde(default)]
    pub admin: AdminConfig,

    /// Default request limits.
    #[serde(default)]
    pub limits: LimitsConfig,

    /// Outbound notification settings.
    #[serde(default)]
    pub notify: NotifyConfig,

    /// Log output settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Address both listeners bind to.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port of the public surface (`/activate`, `/request-sn`, `/health`).
    #[serde(default = "default_activation_port")]
    pub activation_port: u16,

    /// Port of the admin API.
    #[serde(default = "default_admin_port")]
    pub admin_port: u16,

    /// Per-request deadline in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Read the client address from `X-Forwarded-For` / `X-Real-IP`.
    /// Enable only behind a reverse proxy that overwrites these headers.
    #[serde(default = "default_trust_proxy_headers")]
    pub trust_proxy_headers: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            activation_port: default_activation_port(),
            admin_port: default_admin_port(),
            request_timeout_secs: default_request_timeout_secs(),
            trust_proxy_headers: default_trust_proxy_headers(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_activation_port() -> u16 {
    6699
}

fn default_admin_port() -> u16 {
    8899
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_trust_proxy_headers() -> bool {
    false
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,

    /// How long a statement waits on a locked database, in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

fn default_database_path() -> String {
    "licensor.db".to_string()
}

fn default_wal_mode() -> bool {
    true
}

fn default_busy_timeout_ms() -> u64 {
    5000
}

/// Administrator account and login protection.
#[derive(Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AdminConfig {
    /// Admin username seeded on first start.
    #[serde(default = "default_admin_username")]
    pub username: String,

    /// Password seeded on first start. When unset a random one is generated
    /// and printed once.
    #[serde(default)]
    pub initial_password: Option<String>,

    #[serde(default = "default_session_ttl_secs")]
    pub session_ttl_secs: u64,

    #[serde(default = "default_captcha_ttl_secs")]
    pub captcha_ttl_secs: u64,

    /// Failures from one IP before a temporary lockout.
    #[serde(default = "default_max_login_failures")]
    pub max_login_failures: u32,

    /// Length of a temporary lockout.
    #[serde(default = "default_lockout_secs")]
    pub lockout_secs: u64,

    /// Failures from one IP before it is locked out until restart.
    #[serde(default = "default_permanent_lockout_after")]
    pub permanent_lockout_after: u32,

    /// Set the `Secure` attribute on the session cookie.
    #[serde(default)]
    pub secure_cookie: bool,
}

impl std::fmt::Debug for AdminConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminConfig")
            .field("username", &self.username)
            .field(
                "initial_password",
                &self.initial_password.as_ref().map(|_| "[redacted]"),
            )
            .field("session_ttl_secs", &self.session_ttl_secs)
            .field("captcha_ttl_secs", &self.captcha_ttl_secs)
            .field("max_login_failures", &self.max_login_failures)
            .field("lockout_secs", &self.lockout_secs)
            .field("permanent_lockout_after", &self.permanent_lockout_after)
            .field("secure_cookie", &self.secure_cookie)
            .finish()
    }
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            username: default_admin_username(),
            initial_password: None,
            session_ttl_secs: default_session_ttl_secs(),
            captcha_ttl_secs: default_captcha_ttl_secs(),
            max_login_failures: default_max_login_failures(),
            lockout_secs: default_lockout_secs(),
            permanent_lockout_after: default_permanent_lockout_after(),
            secure_cookie: false,
        }
    }
}

fn default_admin_username() -> String {
    "admin".to_string()
}

fn default_session_ttl_secs() -> u64 {
    86_400
}

fn default_captcha_ttl_secs() -> u64 {
    300
}

fn default_max_login_failures() -> u32 {
    5
}

fn default_lockout_secs() -> u64 {
    3600
}

fn default_permanent_lockout_after() -> u32 {
    15
}

/// Request limit defaults.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LimitsConfig {
    /// SN requests per IP per day, used until the settings table overrides it.
    #[serde(default = "default_daily_limit")]
    pub daily_request_limit: i64,

    /// Distinct emails per IP per day, used until the settings table overrides it.
    #[serde(default = "default_daily_limit")]
    pub daily_email_limit: i64,

    /// Upper bound on a single batch-create call.
    #[serde(default = "default_batch_create_max")]
    pub batch_create_max: u32,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            daily_request_limit: default_daily_limit(),
            daily_email_limit: default_daily_limit(),
            batch_create_max: default_batch_create_max(),
        }
    }
}

fn default_daily_limit() -> i64 {
    5
}

fn default_batch_create_max() -> u32 {
    1000
}

/// Outbound notification configuration. SMTP credentials live in the
/// settings table; this only bounds delivery.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct NotifyConfig {
    #[serde(default = "default_send_timeout_secs")]
    pub send_timeout_secs: u64,

    /// Product name used in emails when the SN has no product type.
    #[serde(default = "default_product_fallback_name")]
    pub product_fallback_name: String,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            send_timeout_secs: default_send_timeout_secs(),
            product_fallback_name: default_product_fallback_name(),
        }
    }
}

fn default_send_timeout_secs() -> u64 {
    30
}

fn default_product_fallback_name() -> String {
    "Licensor".to_string()
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
