// SPDX-FileCopyrightText: 2026 Licensor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! LLM and search credential configurations.

use licensor_core::time::validate_date;
use licensor_core::{CredentialConfig, CredentialKind, LicensorError};
use rusqlite::params;

use crate::database::{Database, map_tr_err};

const CONFIG_COLUMNS: &str =
    "id, name, provider_type, base_url, api_key, model, is_active, start_date, end_date, group_id";

fn config_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<CredentialConfig> {
    Ok(CredentialConfig {
        id: row.get(0)?,
        name: row.get(1)?,
        provider_type: row.get(2)?,
        base_url: row.get(3)?,
        api_key: row.get(4)?,
        model: row.get(5)?,
        is_active: row.get(6)?,
        start_date: row.get(7)?,
        end_date: row.get(8)?,
        group_id: row.get(9)?,
    })
}

pub async fn list(
    db: &Database,
    kind: CredentialKind,
) -> Result<Vec<CredentialConfig>, LicensorError> {
    db.connection()
        .call(move |conn| -> Result<Vec<CredentialConfig>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {CONFIG_COLUMNS} FROM {} ORDER BY rowid ASC",
                kind.config_table()
            ))?;
            let rows = stmt.query_map([], config_from_row)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Insert or replace a configuration.
///
/// Saving an active config clears the active flag on the other configs of
/// the same group. Resolution never relies on this.
pub async fn save(
    db: &Database,
    kind: CredentialKind,
    config: CredentialConfig,
) -> Result<(), LicensorError> {
    if config.id.trim().is_empty() {
        return Err(LicensorError::Validation("config id must not be empty".to_string()));
    }
    validate_date(&config.start_date)?;
    validate_date(&config.end_date)?;
    if !config.start_date.is_empty()
        && !config.end_date.is_empty()
        && config.end_date < config.start_date
    {
        return Err(LicensorError::Validation(format!(
            "end_date {} is before start_date {}",
            config.end_date, config.start_date
        )));
    }

    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            let table = kind.config_table();
            let tx = conn.transaction()?;
            if config.is_active {
                tx.execute(
                    &format!("UPDATE {table} SET is_active = 0 WHERE group_id = ?1 AND id <> ?2"),
                    params![config.group_id, config.id],
                )?;
            }
            tx.execute(
                &format!(
                    "INSERT INTO {table} ({CONFIG_COLUMNS})
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                     ON CONFLICT(id) DO UPDATE SET
                         name = excluded.name,
                         provider_type = excluded.provider_type,
                         base_url = excluded.base_url,
                         api_key = excluded.api_key,
                         model = excluded.model,
                         is_active = excluded.is_active,
                         start_date = excluded.start_date,
                         end_date = excluded.end_date,
                         group_id = excluded.group_id"
                ),
                params![
                    config.id,
                    config.name,
                    config.provider_type,
                    config.base_url,
                    config.api_key,
                    config.model,
                    config.is_active,
                    config.start_date,
                    config.end_date,
                    config.group_id,
                ],
            )?;
            tx.commit()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn delete(db: &Database, kind: CredentialKind, id: &str) -> Result<bool, LicensorError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let n = conn.execute(
                &format!("DELETE FROM {} WHERE id = ?1", kind.config_table()),
                params![id],
            )?;
            Ok(n > 0)
        })
        .await
        .map_err(map_tr_err)
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

    fn config(id: &str, group: &str, active: bool) -> CredentialConfig {
        CredentialConfig {
            id: id.to_string(),
            name: id.to_string(),
            provider_type: "openai".to_string(),
            base_url: "https://api.example.com/v1".to_string(),
            api_key: format!("key-{id}"),
            model: "gpt".to_string(),
            is_active: active,
            start_date: "2026-01-01".to_string(),
            end_date: String::new(),
            group_id: group.to_string(),
        }
    }

    #[tokio::test]
    async fn saving_active_config_bumps_previous_in_same_group() {
        let (db, _dir) = setup_db().await;
        save(&db, CredentialKind::Llm, config("a", "g", true)).await.unwrap();
        save(&db, CredentialKind::Llm, config("other", "h", true)).await.unwrap();
        save(&db, CredentialKind::Llm, config("b", "g", true)).await.unwrap();

        let configs = list(&db, CredentialKind::Llm).await.unwrap();
        let active: Vec<_> = configs.iter().filter(|c| c.is_active).map(|c| c.id.as_str()).collect();
        assert_eq!(active, vec!["other", "b"]);
    }

    #[tokio::test]
    async fn save_updates_in_place() {
        let (db, _dir) = setup_db().await;
        save(&db, CredentialKind::Search, config("s", "", false)).await.unwrap();
        let mut updated = config("s", "", false);
        updated.api_key = "rotated".to_string();
        save(&db, CredentialKind::Search, updated).await.unwrap();

        let configs = list(&db, CredentialKind::Search).await.unwrap();
        assert_eq!(configs.len(), 1);
        assert_eq!(configs[0].api_key, "rotated");
        assert!(list(&db, CredentialKind::Llm).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn rejects_bad_dates() {
        let (db, _dir) = setup_db().await;
        let mut bad = config("x", "", false);
        bad.start_date = "2026/01/01".to_string();
        assert!(matches!(
            save(&db, CredentialKind::Llm, bad).await.unwrap_err(),
            LicensorError::Validation(_)
        ));

        let mut inverted = config("y", "", false);
        inverted.end_date = "2025-12-31".to_string();
        assert!(save(&db, CredentialKind::Llm, inverted).await.is_err());
    }

    #[tokio::test]
    async fn delete_reports_missing() {
        let (db, _dir) = setup_db().await;
        save(&db, CredentialKind::Llm, config("a", "", false)).await.unwrap();
        assert!(delete(&db, CredentialKind::Llm, "a").await.unwrap());
        assert!(!delete(&db, CredentialKind::Llm, "a").await.unwrap());
    }
}
