// SPDX-FileCopyrightText: 2026 Licensor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! LLM, search, and license groups plus product types.
//!
//! Deleting an LLM or search group clears every reference to it. Deleting a
//! license group or product type that is still referenced is refused.

use licensor_core::{Group, GroupKind, LicensorError, ProductType};
use rusqlite::{OptionalExtension, params};

use crate::database::{Database, map_tr_err};

pub async fn list(db: &Database, kind: GroupKind) -> Result<Vec<Group>, LicensorError> {
    db.connection()
        .call(move |conn| -> Result<Vec<Group>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT id, name, description, created_at FROM {} ORDER BY created_at ASC, rowid ASC",
                kind.table()
            ))?;
            let rows = stmt.query_map([], |row| {
                Ok(Group {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    description: row.get(2)?,
                    created_at: row.get(3)?,
                })
            })?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Create or rename a group.
pub async fn upsert(
    db: &Database,
    kind: GroupKind,
    id: &str,
    name: &str,
    description: &str,
) -> Result<(), LicensorError> {
    let id = id.trim().to_string();
    if id.is_empty() || id.eq_ignore_ascii_case("none") {
        return Err(LicensorError::Validation(format!(
            "group id must be non-empty and not 'none', got '{id}'"
        )));
    }
    let name = name.trim().to_string();
    let description = description.to_string();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                &format!(
                    "INSERT INTO {} (id, name, description) VALUES (?1, ?2, ?3)
                     ON CONFLICT(id) DO UPDATE SET name = excluded.name,
                         description = excluded.description",
                    kind.table()
                ),
                params![id, name, description],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

enum DeleteResult {
    Deleted,
    Missing,
    InUse(i64),
}

/// Delete a group. Returns `false` if it did not exist.
pub async fn delete(db: &Database, kind: GroupKind, id: &str) -> Result<bool, LicensorError> {
    let id = id.to_string();
    let result = db
        .connection()
        .call({
            let id = id.clone();
            move |conn| -> Result<DeleteResult, rusqlite::Error> {
                let tx = conn.transaction()?;
                let column = kind.license_column();
                if kind == GroupKind::License {
                    let in_use: i64 = tx.query_row(
                        &format!("SELECT COUNT(*) FROM licenses WHERE {column} = ?1"),
                        params![id],
                        |row| row.get(0),
                    )?;
                    if in_use > 0 {
                        return Ok(DeleteResult::InUse(in_use));
                    }
                } else {
                    let config_table = match kind {
                        GroupKind::Llm => "llm_configs",
                        _ => "search_configs",
                    };
                    tx.execute(
                        &format!("UPDATE licenses SET {column} = '' WHERE {column} = ?1"),
                        params![id],
                    )?;
                    tx.execute(
                        &format!("UPDATE {config_table} SET group_id = '' WHERE group_id = ?1"),
                        params![id],
                    )?;
                    tx.execute(
                        &format!("UPDATE email_conditions SET {column} = '' WHERE {column} = ?1"),
                        params![id],
                    )?;
                }
                let n = tx.execute(
                    &format!("DELETE FROM {} WHERE id = ?1", kind.table()),
                    params![id],
                )?;
                tx.commit()?;
                Ok(if n > 0 {
                    DeleteResult::Deleted
                } else {
                    DeleteResult::Missing
                })
            }
        })
        .await
        .map_err(map_tr_err)?;

    match result {
        DeleteResult::Deleted => Ok(true),
        DeleteResult::Missing => Ok(false),
        DeleteResult::InUse(count) => Err(LicensorError::Conflict(format!(
            "{kind} group '{id}' is used by {count} license(s)"
        ))),
    }
}

fn product_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ProductType> {
    Ok(ProductType {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        created_at: row.get(3)?,
    })
}

pub async fn list_products(db: &Database) -> Result<Vec<ProductType>, LicensorError> {
    db.connection()
        .call(|conn| -> Result<Vec<ProductType>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT id, name, description, created_at FROM product_types ORDER BY id ASC",
            )?;
            let rows = stmt.query_map([], product_from_row)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_product(db: &Database, id: i64) -> Result<Option<ProductType>, LicensorError> {
    db.connection()
        .call(move |conn| -> Result<Option<ProductType>, rusqlite::Error> {
            conn.query_row(
                "SELECT id, name, description, created_at FROM product_types WHERE id = ?1",
                params![id],
                product_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Create a product type. Returns its new id.
pub async fn create_product(
    db: &Database,
    name: &str,
    description: &str,
) -> Result<i64, LicensorError> {
    let name = name.trim().to_string();
    if name.is_empty() {
        return Err(LicensorError::Validation("product name must not be empty".to_string()));
    }
    let description = description.to_string();
    let created = db
        .connection()
        .call({
            let name = name.clone();
            move |conn| -> Result<Option<i64>, rusqlite::Error> {
                let n = conn.execute(
                    "INSERT OR IGNORE INTO product_types (name, description) VALUES (?1, ?2)",
                    params![name, description],
                )?;
                Ok((n > 0).then(|| conn.last_insert_rowid()))
            }
        })
        .await
        .map_err(map_tr_err)?;
    created.ok_or_else(|| LicensorError::Conflict(format!("product '{name}' already exists")))
}

pub async fn delete_product(db: &Database, id: i64) -> Result<bool, LicensorError> {
    let result = db
        .connection()
        .call(move |conn| -> Result<DeleteResult, rusqlite::Error> {
            let tx = conn.transaction()?;
            let in_use: i64 = tx.query_row(
                "SELECT COUNT(*) FROM licenses WHERE product_id = ?1",
                params![id],
                |row| row.get(0),
            )?;
            if in_use > 0 {
                return Ok(DeleteResult::InUse(in_use));
            }
            let n = tx.execute("DELETE FROM product_types WHERE id = ?1", params![id])?;
            tx.commit()?;
            Ok(if n > 0 {
                DeleteResult::Deleted
            } else {
                DeleteResult::Missing
            })
        })
        .await
        .map_err(map_tr_err)?;

    match result {
        DeleteResult::Deleted => Ok(true),
        DeleteResult::Missing => Ok(false),
        DeleteResult::InUse(count) => Err(LicensorError::Conflict(format!(
            "product {id} is used by {count} license(s)"
        ))),
    }
}
