// SPDX-FileCopyrightText: 2026 Licensor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Blacklist, whitelist, and conditions pattern tables.
//!
//! Patterns are stored trimmed and lowercased. Lists come back in creation
//! order, which is also the evaluation order for conditions.

use licensor_core::{ConditionEntry, FilterEntry, FilterList, LicensorError};
use rusqlite::params;

use crate::database::{Database, map_tr_err};

fn normalize(pattern: &str) -> Result<String, LicensorError> {
    let pattern = pattern.trim().to_lowercase();
    if pattern.is_empty() || pattern == "@" {
        return Err(LicensorError::Validation("pattern must not be empty".to_string()));
    }
    Ok(pattern)
}

pub async fn list(db: &Database, which: FilterList) -> Result<Vec<FilterEntry>, LicensorError> {
    db.connection()
        .call(move |conn| -> Result<Vec<FilterEntry>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT pattern, created_at FROM {} ORDER BY created_at ASC, rowid ASC",
                which.table()
            ))?;
            let rows = stmt.query_map([], |row| {
                Ok(FilterEntry {
                    pattern: row.get(0)?,
                    created_at: row.get(1)?,
                })
            })?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Add a pattern. Returns `false` if it was already present.
pub async fn add(db: &Database, which: FilterList, pattern: &str) -> Result<bool, LicensorError> {
    let pattern = normalize(pattern)?;
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let n = conn.execute(
                &format!("INSERT OR IGNORE INTO {} (pattern) VALUES (?1)", which.table()),
                params![pattern],
            )?;
            Ok(n > 0)
        })
        .await
        .map_err(map_tr_err)
}

pub async fn remove(
    db: &Database,
    which: FilterList,
    pattern: &str,
) -> Result<bool, LicensorError> {
    let pattern = pattern.trim().to_lowercase();
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let n = conn.execute(
                &format!("DELETE FROM {} WHERE pattern = ?1", which.table()),
                params![pattern],
            )?;
            Ok(n > 0)
        })
        .await
        .map_err(map_tr_err)
}

pub async fn list_conditions(db: &Database) -> Result<Vec<ConditionEntry>, LicensorError> {
    db.connection()
        .call(|conn| -> Result<Vec<ConditionEntry>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT pattern, llm_group_id, search_group_id, created_at
                 FROM email_conditions ORDER BY created_at ASC, rowid ASC",
            )?;
            let rows = stmt.query_map([], |row| {
                Ok(ConditionEntry {
                    pattern: row.get(0)?,
                    llm_group_id: row.get(1)?,
                    search_group_id: row.get(2)?,
                    created_at: row.get(3)?,
                })
            })?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Add or replace a condition. Replacing keeps the original list position.
pub async fn upsert_condition(
    db: &Database,
    pattern: &str,
    llm_group_id: &str,
    search_group_id: &str,
) -> Result<(), LicensorError> {
    let pattern = normalize(pattern)?;
    let llm_group_id = llm_group_id.trim().to_string();
    let search_group_id = search_group_id.trim().to_string();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT INTO email_conditions (pattern, llm_group_id, search_group_id)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(pattern) DO UPDATE SET
                     llm_group_id = excluded.llm_group_id,
                     search_group_id = excluded.search_group_id",
                params![pattern, llm_group_id, search_group_id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn remove_condition(db: &Database, pattern: &str) -> Result<bool, LicensorError> {
    let pattern = pattern.trim().to_lowercase();
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let n = conn.execute(
                "DELETE FROM email_conditions WHERE pattern = ?1",
                params![pattern],
            )?;
            Ok(n > 0)
        })
        .await
        .map_err(map_tr_err)
}
