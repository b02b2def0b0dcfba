// SPDX-FileCopyrightText: 2026 Licensor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared by storage, engine, and gateway crates.
//!
//! Timestamps are carried as fixed-width UTC strings produced by
//! [`crate::time::format_timestamp`]; lexicographic order equals
//! chronological order, which the storage queries rely on.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Machine-readable outcome code returned on every public response.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResponseCode {
    Success,
    InvalidRequest,
    InvalidSn,
    SnDisabled,
    SnExpired,
    EncryptFailed,
    InvalidEmail,
    EmailBlacklisted,
    EmailNotWhitelisted,
    EmailAlreadyUsed,
    RateLimitExceeded,
    EmailLimitExceeded,
    NoAvailableSn,
    InternalError,
}

impl ResponseCode {
    /// Whether the code reports a successful outcome to the client.
    ///
    /// `EMAIL_ALREADY_USED` is a success: the caller receives their existing SN.
    pub fn is_success(self) -> bool {
        matches!(self, ResponseCode::Success | ResponseCode::EmailAlreadyUsed)
    }
}

/// A serial number record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct License {
    pub sn: String,
    pub created_at: String,
    /// `None` means "not yet started": the clock begins at first bind or activation.
    pub expires_at: Option<String>,
    pub valid_days: i64,
    pub description: String,
    pub is_active: bool,
    pub usage_count: i64,
    pub last_used_at: Option<String>,
    pub daily_analysis: i64,
    /// Empty string means ungrouped.
    pub license_group_id: String,
    pub llm_group_id: String,
    pub search_group_id: String,
    /// `0` means unclassified.
    pub product_id: i64,
    /// Email this SN has been handed out to, if any.
    pub bound_email: Option<String>,
}

/// Longest validity an admin may grant or add in one step, about a century.
pub const MAX_VALID_DAYS: i64 = 36_500;

/// Parameters for creating a batch of serial numbers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewLicense {
    pub sn: String,
    pub description: String,
    pub valid_days: i64,
    pub daily_analysis: i64,
    pub license_group_id: String,
    pub llm_group_id: String,
    pub search_group_id: String,
    pub product_id: i64,
}

/// Which credential family a configuration or group belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum CredentialKind {
    Llm,
    Search,
}

impl CredentialKind {
    /// Table holding configurations of this kind.
    pub fn config_table(self) -> &'static str {
        match self {
            CredentialKind::Llm => "llm_configs",
            CredentialKind::Search => "search_configs",
        }
    }

    /// The group namespace configurations of this kind belong to.
    pub fn group_kind(self) -> GroupKind {
        match self {
            CredentialKind::Llm => GroupKind::Llm,
            CredentialKind::Search => GroupKind::Search,
        }
    }
}

/// The three group namespaces an SN can be tagged with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum GroupKind {
    Llm,
    Search,
    License,
}

impl GroupKind {
    pub fn table(self) -> &'static str {
        match self {
            GroupKind::Llm => "llm_groups",
            GroupKind::Search => "search_groups",
            GroupKind::License => "license_groups",
        }
    }

    /// Column on `licenses` referencing this group kind.
    pub fn license_column(self) -> &'static str {
        match self {
            GroupKind::Llm => "llm_group_id",
            GroupKind::Search => "search_group_id",
            GroupKind::License => "license_group_id",
        }
    }
}

/// A named group used to partition SNs and credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: String,
    pub name: String,
    pub description: String,
    pub created_at: String,
}

/// A product category SNs can be issued for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductType {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub created_at: String,
}

/// An upstream credential handed to clients inside the activation payload.
///
/// LLM and search credentials share one shape; `model` is empty for search.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialConfig {
    pub id: String,
    pub name: String,
    pub provider_type: String,
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub is_active: bool,
    /// `YYYY-MM-DD`; empty means "since forever".
    pub start_date: String,
    /// `YYYY-MM-DD`; empty means "no end".
    pub end_date: String,
    /// Empty string means ungrouped.
    pub group_id: String,
}

impl std::fmt::Debug for CredentialConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialConfig")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("provider_type", &self.provider_type)
            .field("base_url", &self.base_url)
            .field("api_key", &"[redacted]")
            .field("model", &self.model)
            .field("is_active", &self.is_active)
            .field("start_date", &self.start_date)
            .field("end_date", &self.end_date)
            .field("group_id", &self.group_id)
            .finish()
    }
}

/// One row of the email-to-SN ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailRecord {
    pub id: i64,
    pub email: String,
    pub sn: String,
    pub ip: String,
    pub created_at: String,
    pub product_id: i64,
}

/// A blacklist or whitelist entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterEntry {
    pub pattern: String,
    pub created_at: String,
}

/// A conditions entry: a pattern that routes matching emails to groups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionEntry {
    pub pattern: String,
    pub llm_group_id: String,
    pub search_group_id: String,
    pub created_at: String,
}

/// Which pattern list an admin operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum FilterList {
    Blacklist,
    Whitelist,
}

impl FilterList {
    /// Backing table name.
    pub fn table(self) -> &'static str {
        match self {
            FilterList::Blacklist => "email_blacklist",
            FilterList::Whitelist => "email_whitelist",
        }
    }
}

/// Toggles controlling which email lists participate in policy evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterToggles {
    pub blacklist_enabled: bool,
    pub whitelist_enabled: bool,
    pub conditions_enabled: bool,
}

impl Default for FilterToggles {
    fn default() -> Self {
        Self {
            blacklist_enabled: true,
            whitelist_enabled: false,
            conditions_enabled: false,
        }
    }
}

/// Per-IP daily counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestLimits {
    pub daily_request_limit: i64,
    pub daily_email_limit: i64,
}

impl Default for RequestLimits {
    fn default() -> Self {
        Self {
            daily_request_limit: 5,
            daily_email_limit: 5,
        }
    }
}

/// Outgoing SMTP settings, edited at runtime by the administrator.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmtpSettings {
    pub enabled: bool,
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from_email: String,
    pub from_name: String,
    pub use_tls: bool,
    pub use_starttls: bool,
}

impl std::fmt::Debug for SmtpSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpSettings")
            .field("enabled", &self.enabled)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"[redacted]")
            .field("from_email", &self.from_email)
            .field("from_name", &self.from_name)
            .field("use_tls", &self.use_tls)
            .field("use_starttls", &self.use_starttls)
            .finish()
    }
}

/// The decrypted contents of an activation response.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivationPayload {
    pub llm_type: String,
    pub llm_base_url: String,
    pub llm_api_key: String,
    pub llm_model: String,
    pub llm_start_date: String,
    pub llm_end_date: String,
    pub search_type: String,
    pub search_api_key: String,
    pub search_start_date: String,
    pub search_end_date: String,
    pub expires_at: String,
    pub activated_at: String,
    pub daily_analysis: i64,
    pub product_id: i64,
    pub product_name: String,
}

impl std::fmt::Debug for ActivationPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActivationPayload")
            .field("llm_type", &self.llm_type)
            .field("llm_model", &self.llm_model)
            .field("llm_api_key", &"[redacted]")
            .field("search_type", &self.search_type)
            .field("search_api_key", &"[redacted]")
            .field("expires_at", &self.expires_at)
            .field("product_id", &self.product_id)
            .finish_non_exhaustive()
    }
}

/// Everything the notifier needs to tell a requester about their new SN.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnIssuedNotice {
    pub email: String,
    pub sn: String,
    pub expires_at: String,
    pub days_left: i64,
    pub product_id: i64,
    pub product_name: String,
}

/// Inventory and ledger counts shown on the admin dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicenseStats {
    pub total: i64,
    pub active: i64,
    pub disabled: i64,
    pub bound: i64,
    pub available: i64,
    pub expired: i64,
    pub email_records: i64,
}
