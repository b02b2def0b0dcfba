// SPDX-FileCopyrightText: 2026 Licensor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Runtime-tunable settings stored as key/value rows.

use licensor_core::{FilterToggles, LicensorError, RequestLimits, SmtpSettings};
use rusqlite::{OptionalExtension, params};

use crate::database::{Database, map_tr_err};

pub const ADMIN_USERNAME: &str = "admin_username";
pub const ADMIN_PASSWORD: &str = "admin_password";
pub const BLACKLIST_ENABLED: &str = "blacklist_enabled";
pub const WHITELIST_ENABLED: &str = "whitelist_enabled";
pub const CONDITIONS_ENABLED: &str = "conditions_enabled";
pub const DAILY_REQUEST_LIMIT: &str = "daily_request_limit";
pub const DAILY_EMAIL_LIMIT: &str = "daily_email_limit";

const SMTP_KEYS: [&str; 9] = [
    "smtp_enabled",
    "smtp_host",
    "smtp_port",
    "smtp_username",
    "smtp_password",
    "smtp_from_email",
    "smtp_from_name",
    "smtp_use_tls",
    "smtp_use_starttls",
];

pub async fn get(db: &Database, key: &str) -> Result<Option<String>, LicensorError> {
    let key = key.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<String>, rusqlite::Error> {
            conn.query_row(
                "SELECT value FROM settings WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Write several settings in one transaction.
pub async fn set_many(db: &Database, entries: Vec<(String, String)>) -> Result<(), LicensorError> {
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            let tx = conn.transaction()?;
            {
                let mut stmt = tx.prepare(
                    "INSERT INTO settings (key, value) VALUES (?1, ?2)
                     ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                )?;
                for (key, value) in &entries {
                    stmt.execute(params![key, value])?;
                }
            }
            tx.commit()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn set(db: &Database, key: &str, value: &str) -> Result<(), LicensorError> {
    set_many(db, vec![(key.to_string(), value.to_string())]).await
}

/// Write `value` only if `key` has no value yet. Returns whether it was written.
pub async fn set_if_absent(db: &Database, key: &str, value: &str) -> Result<bool, LicensorError> {
    let key = key.to_string();
    let value = value.to_string();
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let n = conn.execute(
                "INSERT OR IGNORE INTO settings (key, value) VALUES (?1, ?2)",
                params![key, value],
            )?;
            Ok(n > 0)
        })
        .await
        .map_err(map_tr_err)
}

async fn get_many(db: &Database, keys: &[&str]) -> Result<Vec<Option<String>>, LicensorError> {
    let keys: Vec<String> = keys.iter().map(|k| k.to_string()).collect();
    db.connection()
        .call(move |conn| -> Result<Vec<Option<String>>, rusqlite::Error> {
            let mut stmt = conn.prepare("SELECT value FROM settings WHERE key = ?1")?;
            let values = keys
                .iter()
                .map(|key| stmt.query_row(params![key], |row| row.get(0)).optional())
                .collect::<Result<Vec<_>, _>>()?;
            Ok(values)
        })
        .await
        .map_err(map_tr_err)
}

fn flag(value: Option<&String>, default: bool) -> bool {
    match value.map(String::as_str) {
        Some("true") | Some("1") => true,
        Some("false") | Some("0") => false,
        _ => default,
    }
}

/// Email filter toggles. Blacklist defaults on, the others off.
pub async fn filter_toggles(db: &Database) -> Result<FilterToggles, LicensorError> {
    let values = get_many(db, &[BLACKLIST_ENABLED, WHITELIST_ENABLED, CONDITIONS_ENABLED]).await?;
    let defaults = FilterToggles::default();
    Ok(FilterToggles {
        blacklist_enabled: flag(values[0].as_ref(), defaults.blacklist_enabled),
        whitelist_enabled: flag(values[1].as_ref(), defaults.whitelist_enabled),
        conditions_enabled: flag(values[2].as_ref(), defaults.conditions_enabled),
    })
}

pub async fn set_filter_toggles(db: &Database, toggles: FilterToggles) -> Result<(), LicensorError> {
    set_many(
        db,
        vec![
            (BLACKLIST_ENABLED.to_string(), toggles.blacklist_enabled.to_string()),
            (WHITELIST_ENABLED.to_string(), toggles.whitelist_enabled.to_string()),
            (CONDITIONS_ENABLED.to_string(), toggles.conditions_enabled.to_string()),
        ],
    )
    .await
}

/// Daily limits, falling back to `defaults` for missing or unparsable values.
/// Stored values below 1 are treated as missing.
pub async fn request_limits(
    db: &Database,
    defaults: RequestLimits,
) -> Result<RequestLimits, LicensorError> {
    let values = get_many(db, &[DAILY_REQUEST_LIMIT, DAILY_EMAIL_LIMIT]).await?;
    let parse = |v: Option<&String>, default: i64| {
        v.and_then(|s| s.trim().parse::<i64>().ok())
            .filter(|n| *n >= 1)
            .unwrap_or(default)
    };
    Ok(RequestLimits {
        daily_request_limit: parse(values[0].as_ref(), defaults.daily_request_limit),
        daily_email_limit: parse(values[1].as_ref(), defaults.daily_email_limit),
    })
}

/// Persist limits. Values below 1 are reset to 5.
pub async fn set_request_limits(
    db: &Database,
    limits: RequestLimits,
) -> Result<RequestLimits, LicensorError> {
    let fallback = RequestLimits::default();
    let limits = RequestLimits {
        daily_request_limit: if limits.daily_request_limit < 1 {
            fallback.daily_request_limit
        } else {
            limits.daily_request_limit
        },
        daily_email_limit: if limits.daily_email_limit < 1 {
            fallback.daily_email_limit
        } else {
            limits.daily_email_limit
        },
    };
    set_many(
        db,
        vec![
            (DAILY_REQUEST_LIMIT.to_string(), limits.daily_request_limit.to_string()),
            (DAILY_EMAIL_LIMIT.to_string(), limits.daily_email_limit.to_string()),
        ],
    )
    .await?;
    Ok(limits)
}

pub async fn smtp(db: &Database) -> Result<SmtpSettings, LicensorError> {
    let v = get_many(db, &SMTP_KEYS).await?;
    let text = |i: usize| v[i].clone().unwrap_or_default();
    Ok(SmtpSettings {
        enabled: flag(v[0].as_ref(), false),
        host: text(1),
        port: v[2].as_deref().and_then(|p| p.parse().ok()).unwrap_or(587),
        username: text(3),
        password: text(4),
        from_email: text(5),
        from_name: text(6),
        use_tls: flag(v[7].as_ref(), false),
        use_starttls: flag(v[8].as_ref(), true),
    })
}

pub async fn set_smtp(db: &Database, smtp: SmtpSettings) -> Result<(), LicensorError> {
    let values = [
        smtp.enabled.to_string(),
        smtp.host,
        smtp.port.to_string(),
        smtp.username,
        smtp.password,
        smtp.from_email,
        smtp.from_name,
        smtp.use_tls.to_string(),
        smtp.use_starttls.to_string(),
    ];
    set_many(
        db,
        SMTP_KEYS
            .iter()
            .map(|k| k.to_string())
            .zip(values)
            .collect(),
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("test.db").to_str().unwrap())
            .await
            .unwrap();
        (db, dir)
    }

    #[tokio::test]
    async fn toggles_default_to_blacklist_only() {
        let (db, _dir) = setup_db().await;
        assert_eq!(filter_toggles(&db).await.unwrap(), FilterToggles::default());

        let toggles = FilterToggles {
            blacklist_enabled: false,
            whitelist_enabled: true,
            conditions_enabled: true,
        };
        set_filter_toggles(&db, toggles).await.unwrap();
        assert_eq!(filter_toggles(&db).await.unwrap(), toggles);
    }

    #[tokio::test]
    async fn limits_below_one_reset_to_five() {
        let (db, _dir) = setup_db().await;
        let stored = set_request_limits(
            &db,
            RequestLimits {
                daily_request_limit: 0,
                daily_email_limit: 3,
            },
        )
        .await
        .unwrap();
        assert_eq!(stored.daily_request_limit, 5);
        assert_eq!(stored.daily_email_limit, 3);

        set(&db, DAILY_EMAIL_LIMIT, "garbage").await.unwrap();
        let limits = request_limits(&db, RequestLimits::default()).await.unwrap();
        assert_eq!(limits.daily_email_limit, 5);
    }

    #[tokio::test]
    async fn set_if_absent_keeps_first_value() {
        let (db, _dir) = setup_db().await;
        assert!(set_if_absent(&db, ADMIN_USERNAME, "admin").await.unwrap());
        assert!(!set_if_absent(&db, ADMIN_USERNAME, "other").await.unwrap());
        assert_eq!(get(&db, ADMIN_USERNAME).await.unwrap().as_deref(), Some("admin"));
    }

    #[tokio::test]
    async fn smtp_settings_round_trip_with_defaults() {
        let (db, _dir) = setup_db().await;
        let empty = smtp(&db).await.unwrap();
        assert!(!empty.enabled);
        assert_eq!(empty.port, 587);

        let configured = SmtpSettings {
            enabled: true,
            host: "smtp.example.com".into(),
            port: 465,
            username: "mailer".into(),
            password: "pw".into(),
            from_email: "noreply@example.com".into(),
            from_name: "Licensor".into(),
            use_tls: true,
            use_starttls: false,
        };
        set_smtp(&db, configured.clone()).await.unwrap();
        assert_eq!(smtp(&db).await.unwrap(), configured);
    }
}
