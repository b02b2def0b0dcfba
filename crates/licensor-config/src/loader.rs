// SPDX-FileCopyrightText: 2026 Licensor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Layered configuration loading with Figment.
//!
//! Lookup order: `./licensor.toml` > `~/.config/licensor/licensor.toml` >
//! `/etc/licensor/licensor.toml`, with `LICENSOR_` environment overrides on top.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::LicensorConfig;

pub(crate) const SYSTEM_CONFIG_PATH: &str = "/etc/licensor/licensor.toml";
pub(crate) const LOCAL_CONFIG_PATH: &str = "licensor.toml";

pub(crate) fn user_config_path() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join("licensor/licensor.toml"))
        .unwrap_or_default()
}

/// Load configuration from the standard hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/licensor/licensor.toml`
/// 3. `~/.config/licensor/licensor.toml`
/// 4. `./licensor.toml`
/// 5. `LICENSOR_*` environment variables
pub fn load_config() -> Result<LicensorConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only. No files, no environment.
pub fn load_config_from_str(toml_content: &str) -> Result<LicensorConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(LicensorConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from one explicit file with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<LicensorConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(LicensorConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// The Figment used by [`load_config`], before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(LicensorConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG_PATH))
        .merge(Toml::file(user_config_path()))
        .merge(Toml::file(LOCAL_CONFIG_PATH))
        .merge(env_provider())
}

/// Environment provider with explicit section mapping.
///
/// `Env::split("_")` would turn `LICENSOR_SERVER_ADMIN_PORT` into
/// `server.admin.port`; only the first segment names the section.
pub(crate) fn env_provider() -> Env {
    Env::prefixed("LICENSOR_").map(|key| {
        let mapped = map_env_key(key.as_str());
        mapped.into()
    })
}

/// Maps a lowercased, prefix-stripped env key to its dotted config path.
pub(crate) fn map_env_key(key: &str) -> String {
    const SECTIONS: [&str; 6] = ["server", "storage", "admin", "limits", "notify", "logging"];
    for section in SECTIONS {
        if let Some(rest) = key.strip_prefix(section).and_then(|r| r.strip_prefix('_')) {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_keys_map_only_the_section_segment() {
        assert_eq!(map_env_key("server_admin_port"), "server.admin_port");
        assert_eq!(map_env_key("admin_initial_password"), "admin.initial_password");
        assert_eq!(map_env_key("limits_daily_email_limit"), "limits.daily_email_limit");
        assert_eq!(map_env_key("logging_level"), "logging.level");
        assert_eq!(map_env_key("unrelated"), "unrelated");
    }
}
