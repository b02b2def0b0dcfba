// SPDX-FileCopyrightText: 2026 Licensor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Admin credential seeding and the `reset-password` / `check-config` commands.

use licensor_config::LicensorConfig;
use licensor_config::model::AdminConfig;
use licensor_core::LicensorError;
use licensor_crypto::{generate_password, hash_password};
use licensor_storage::Database;
use licensor_storage::queries::settings;
use secrecy::SecretString;
use tracing::info;

/// Length of generated admin passwords.
const GENERATED_PASSWORD_LEN: usize = 16;

async fn hash(password: String) -> Result<String, LicensorError> {
    tokio::task::spawn_blocking(move || hash_password(&SecretString::from(password)))
        .await
        .map_err(|e| LicensorError::Internal(format!("password hashing task failed: {e}")))?
}

/// Seed the admin username and password on first start.
///
/// Existing values are left alone. Returns the plaintext password only when
/// one was generated, so the caller can show it once.
pub async fn seed_admin(db: &Database, admin: &AdminConfig) -> Result<Option<String>, LicensorError> {
    settings::set_if_absent(db, settings::ADMIN_USERNAME, &admin.username).await?;
    if settings::get(db, settings::ADMIN_PASSWORD).await?.is_some() {
        return Ok(None);
    }

    let (password, generated) = match admin.initial_password.clone() {
        Some(p) if !p.is_empty() => (p, false),
        _ => (generate_password(GENERATED_PASSWORD_LEN)?, true),
    };
    let hashed = hash(password.clone()).await?;
    if !settings::set_if_absent(db, settings::ADMIN_PASSWORD, &hashed).await? {
        return Ok(None);
    }
    info!(username = %admin.username, generated, "admin credentials seeded");
    Ok(generated.then_some(password))
}

/// `licensor reset-password`
pub async fn reset_password(
    config: &LicensorConfig,
    password: Option<String>,
) -> Result<(), LicensorError> {
    let (password, generated) = match password {
        Some(p) if !p.is_empty() => (p, false),
        _ => (generate_password(GENERATED_PASSWORD_LEN)?, true),
    };
    let db = Database::from_config(&config.storage).await?;
    let hashed = hash(password.clone()).await?;
    settings::set(&db, settings::ADMIN_PASSWORD, &hashed).await?;
    db.close().await?;

    if generated {
        println!("admin password reset to: {password}");
    } else {
        println!("admin password reset");
    }
    Ok(())
}

/// `licensor check-config`: print the effective configuration with secrets masked.
pub fn print_config(config: &LicensorConfig) {
    let mut shown = config.clone();
    if shown.admin.initial_password.is_some() {
        shown.admin.initial_password = Some("[redacted]".to_string());
    }
    match toml::to_string_pretty(&shown) {
        Ok(text) => {
            println!("configuration is valid\n");
            print!("{text}");
        }
        Err(e) => println!("configuration is valid (could not render it: {e})"),
    }
}
