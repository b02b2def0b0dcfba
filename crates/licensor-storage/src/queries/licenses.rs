// SPDX-FileCopyrightText: 2026 Licensor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! License inventory: lookups, admin mutations, and the atomic claim used
//! by SN allocation.

use chrono::{DateTime, Duration, Utc};
use licensor_core::time::format_timestamp;
use licensor_core::{License, LicenseStats, LicensorError, NewLicense};
use rusqlite::{OptionalExtension, TransactionBehavior, params, params_from_iter};

use crate::database::{Database, map_tr_err};

pub(crate) const LICENSE_COLUMNS: &str = "sn, created_at, expires_at, valid_days, description, \
     is_active, usage_count, last_used_at, daily_analysis, license_group_id, llm_group_id, \
     search_group_id, product_id, bound_email";

pub(crate) fn license_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<License> {
    Ok(License {
        sn: row.get(0)?,
        created_at: row.get(1)?,
        expires_at: row.get(2)?,
        valid_days: row.get(3)?,
        description: row.get(4)?,
        is_active: row.get(5)?,
        usage_count: row.get(6)?,
        last_used_at: row.get(7)?,
        daily_analysis: row.get(8)?,
        license_group_id: row.get(9)?,
        llm_group_id: row.get(10)?,
        search_group_id: row.get(11)?,
        product_id: row.get(12)?,
        bound_email: row.get(13)?,
    })
}

/// `base` moved forward by `days`, or a conversion error when the result
/// falls outside chrono's range. Runs on the writer thread, so it must not panic.
fn add_days(base: DateTime<Utc>, days: i64) -> rusqlite::Result<DateTime<Utc>> {
    Duration::try_days(days)
        .and_then(|delta| base.checked_add_signed(delta))
        .ok_or_else(|| {
            rusqlite::Error::ToSqlConversionFailure(
                format!("{days} days from {} is out of range", format_timestamp(base)).into(),
            )
        })
}

/// Expiry a license would get if its clock started at `now`.
pub fn stamped_expiry(now: DateTime<Utc>, valid_days: i64) -> rusqlite::Result<String> {
    add_days(now, valid_days).map(format_timestamp)
}

/// Constraints for claiming one available license.
#[derive(Debug, Clone)]
pub struct ClaimRequest {
    pub email: String,
    pub ip: String,
    pub product_id: i64,
    /// Exact LLM group match when set.
    pub llm_group_id: Option<String>,
    /// Exact search group match when set.
    pub search_group_id: Option<String>,
    /// Try ungrouped inventory first, then fall back to any match.
    pub prefer_ungrouped: bool,
    pub now: DateTime<Utc>,
}

/// A license successfully bound to an email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimedLicense {
    pub license: License,
    pub record_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimOutcome {
    Claimed(ClaimedLicense),
    /// The email already holds a live SN for this product.
    AlreadyBound { sn: String },
    /// No license satisfies the constraints.
    Exhausted,
}

/// Per-stage counts explaining why nothing could be claimed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InventoryBreakdown {
    pub total: i64,
    pub active: i64,
    pub unexpired: i64,
    pub unused: i64,
    pub unbound: i64,
}

fn select_available(
    tx: &rusqlite::Transaction<'_>,
    req: &ClaimRequest,
    now: &str,
    ungrouped_only: bool,
) -> rusqlite::Result<Option<License>> {
    let mut sql = format!(
        "SELECT {LICENSE_COLUMNS} FROM licenses
         WHERE is_active = 1
           AND usage_count = 0
           AND bound_email IS NULL
           AND (expires_at IS NULL OR expires_at > ?1)
           AND NOT EXISTS (SELECT 1 FROM email_records e WHERE e.sn = licenses.sn)"
    );
    let mut args: Vec<rusqlite::types::Value> = vec![now.to_string().into()];

    if req.product_id > 0 {
        args.push(req.product_id.into());
        sql.push_str(&format!(" AND product_id = ?{}", args.len()));
    } else {
        sql.push_str(" AND product_id = 0");
    }
    if let Some(group) = &req.llm_group_id {
        args.push(group.clone().into());
        sql.push_str(&format!(" AND llm_group_id = ?{}", args.len()));
    }
    if let Some(group) = &req.search_group_id {
        args.push(group.clone().into());
        sql.push_str(&format!(" AND search_group_id = ?{}", args.len()));
    }
    if ungrouped_only {
        sql.push_str(" AND llm_group_id = '' AND search_group_id = ''");
    }
    sql.push_str(" ORDER BY created_at ASC, rowid ASC LIMIT 1");

    tx.query_row(&sql, params_from_iter(args), license_from_row)
        .optional()
}

/// Atomically select the oldest eligible license and bind it to `req.email`.
///
/// Runs as one `BEGIN IMMEDIATE` transaction on the writer thread: the
/// existing-binding check, the eligibility query, the license update, and
/// the ledger insert either all happen or none do. `UNIQUE(sn)` and
/// `UNIQUE(email, product_id)` on `email_records` back this up at the schema level.
pub async fn claim(db: &Database, req: ClaimRequest) -> Result<ClaimOutcome, LicensorError> {
    db.connection()
        .call(move |conn| -> Result<ClaimOutcome, rusqlite::Error> {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let now = format_timestamp(req.now);

            let existing: Option<String> = tx
                .query_row(
                    "SELECT e.sn FROM email_records e JOIN licenses l ON l.sn = e.sn
                     WHERE e.email = ?1 AND e.product_id = ?2",
                    params![req.email, req.product_id],
                    |row| row.get(0),
                )
                .optional()?;
            if let Some(sn) = existing {
                tx.commit()?;
                return Ok(ClaimOutcome::AlreadyBound { sn });
            }
            tx.execute(
                "DELETE FROM email_records WHERE email = ?1 AND product_id = ?2
                 AND sn NOT IN (SELECT sn FROM licenses)",
                params![req.email, req.product_id],
            )?;

            let mut candidate = None;
            if req.prefer_ungrouped {
                candidate = select_available(&tx, &req, &now, true)?;
            }
            if candidate.is_none() {
                candidate = select_available(&tx, &req, &now, false)?;
            }
            let Some(mut license) = candidate else {
                tx.commit()?;
                return Ok(ClaimOutcome::Exhausted);
            };

            let expires_at = match &license.expires_at {
                Some(expires_at) => expires_at.clone(),
                None => stamped_expiry(req.now, license.valid_days)?,
            };
            let description = format!("requested by {}", req.email);

            tx.execute(
                "UPDATE licenses SET expires_at = ?1, description = ?2, bound_email = ?3
                 WHERE sn = ?4 AND bound_email IS NULL",
                params![expires_at, description, req.email, license.sn],
            )?;
            tx.execute(
                "INSERT INTO email_records (email, sn, ip, created_at, product_id)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![req.email, license.sn, req.ip, now, req.product_id],
            )?;
            let record_id = tx.last_insert_rowid();
            tx.commit()?;

            license.expires_at = Some(expires_at);
            license.description = description;
            license.bound_email = Some(req.email);
            Ok(ClaimOutcome::Claimed(ClaimedLicense { license, record_id }))
        })
        .await
        .map_err(map_tr_err)
}

/// Counts at each eligibility stage, used to log why a claim found nothing.
pub async fn inventory_breakdown(
    db: &Database,
    now: DateTime<Utc>,
) -> Result<InventoryBreakdown, LicensorError> {
    let now = format_timestamp(now);
    db.connection()
        .call(move |conn| -> Result<InventoryBreakdown, rusqlite::Error> {
            conn.query_row(
                "SELECT
                    COUNT(*),
                    COALESCE(SUM(is_active = 1), 0),
                    COALESCE(SUM(is_active = 1 AND (expires_at IS NULL OR expires_at > ?1)), 0),
                    COALESCE(SUM(is_active = 1 AND (expires_at IS NULL OR expires_at > ?1)
                        AND usage_count = 0), 0),
                    COALESCE(SUM(is_active = 1 AND (expires_at IS NULL OR expires_at > ?1)
                        AND usage_count = 0 AND bound_email IS NULL
                        AND sn NOT IN (SELECT sn FROM email_records)), 0)
                 FROM licenses",
                params![now],
                |row| {
                    Ok(InventoryBreakdown {
                        total: row.get(0)?,
                        active: row.get(1)?,
                        unexpired: row.get(2)?,
                        unused: row.get(3)?,
                        unbound: row.get(4)?,
                    })
                },
            )
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get(db: &Database, sn: &str) -> Result<Option<License>, LicensorError> {
    let sn = sn.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<License>, rusqlite::Error> {
            conn.query_row(
                &format!("SELECT {LICENSE_COLUMNS} FROM licenses WHERE sn = ?1"),
                params![sn],
                license_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Count one activation: bump usage, touch `last_used_at`, and start the
/// expiry clock if it has not started yet. Returns the updated license.
pub async fn record_activation(
    db: &Database,
    sn: &str,
    now: DateTime<Utc>,
) -> Result<Option<License>, LicensorError> {
    let sn = sn.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<License>, rusqlite::Error> {
            let tx = conn.transaction()?;
            let Some(valid_days) = tx
                .query_row(
                    "SELECT valid_days FROM licenses WHERE sn = ?1",
                    params![sn],
                    |row| row.get::<_, i64>(0),
                )
                .optional()?
            else {
                return Ok(None);
            };
            tx.execute(
                "UPDATE licenses SET usage_count = usage_count + 1, last_used_at = ?1,
                     expires_at = COALESCE(expires_at, ?2)
                 WHERE sn = ?3",
                params![format_timestamp(now), stamped_expiry(now, valid_days)?, sn],
            )?;
            let license = tx.query_row(
                &format!("SELECT {LICENSE_COLUMNS} FROM licenses WHERE sn = ?1"),
                params![sn],
                license_from_row,
            )?;
            tx.commit()?;
            Ok(Some(license))
        })
        .await
        .map_err(map_tr_err)
}

/// Insert one license. Fails with `Conflict` if the SN already exists.
pub async fn insert(
    db: &Database,
    license: NewLicense,
    created_at: DateTime<Utc>,
) -> Result<(), LicensorError> {
    let sn = license.sn.clone();
    let inserted = insert_batch(db, vec![license], created_at).await?;
    if inserted == 0 {
        return Err(LicensorError::Conflict(format!("serial number {sn} already exists")));
    }
    Ok(())
}

/// Insert many licenses in one transaction. Duplicate SNs are skipped.
/// Returns how many rows were inserted.
///
/// Rows share `created_at`; allocation breaks the tie by insertion order.
pub async fn insert_batch(
    db: &Database,
    licenses: Vec<NewLicense>,
    created_at: DateTime<Utc>,
) -> Result<usize, LicensorError> {
    let created_at = format_timestamp(created_at);
    db.connection()
        .call(move |conn| -> Result<usize, rusqlite::Error> {
            let tx = conn.transaction()?;
            let mut inserted = 0;
            {
                let mut stmt = tx.prepare(
                    "INSERT OR IGNORE INTO licenses (sn, created_at, valid_days, description,
                         daily_analysis, license_group_id, llm_group_id, search_group_id, product_id)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                )?;
                for l in &licenses {
                    inserted += stmt.execute(params![
                        l.sn,
                        created_at,
                        l.valid_days,
                        l.description,
                        l.daily_analysis,
                        l.license_group_id,
                        l.llm_group_id,
                        l.search_group_id,
                        l.product_id,
                    ])?;
                }
            }
            tx.commit()?;
            Ok(inserted)
        })
        .await
        .map_err(map_tr_err)
}

/// Status filter for license listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LicenseStatus {
    Active,
    Disabled,
    Bound,
    Available,
    Expired,
}

/// Listing filters. `None` fields are unconstrained.
#[derive(Debug, Clone, Default)]
pub struct LicenseQuery {
    /// Substring match on SN, description, or bound email.
    pub search: Option<String>,
    pub product_id: Option<i64>,
    pub llm_group_id: Option<String>,
    pub search_group_id: Option<String>,
    pub license_group_id: Option<String>,
    pub status: Option<LicenseStatus>,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LicensePage {
    pub licenses: Vec<License>,
    pub total: i64,
}

pub async fn list(
    db: &Database,
    query: LicenseQuery,
    now: DateTime<Utc>,
) -> Result<LicensePage, LicensorError> {
    let now = format_timestamp(now);
    db.connection()
        .call(move |conn| -> Result<LicensePage, rusqlite::Error> {
            let mut clauses: Vec<String> = Vec::new();
            let mut args: Vec<rusqlite::types::Value> = Vec::new();

            if let Some(q) = query.search.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
                args.push(format!("%{q}%").into());
                let n = args.len();
                clauses.push(format!(
                    "(sn LIKE ?{n} OR description LIKE ?{n} OR COALESCE(bound_email, '') LIKE ?{n})"
                ));
            }
            if let Some(id) = query.product_id {
                args.push(id.into());
                clauses.push(format!("product_id = ?{}", args.len()));
            }
            for (column, value) in [
                ("llm_group_id", &query.llm_group_id),
                ("search_group_id", &query.search_group_id),
                ("license_group_id", &query.license_group_id),
            ] {
                if let Some(v) = value {
                    args.push(v.clone().into());
                    clauses.push(format!("{column} = ?{}", args.len()));
                }
            }
            match query.status {
                None => {}
                Some(LicenseStatus::Active) => clauses.push("is_active = 1".to_string()),
                Some(LicenseStatus::Disabled) => clauses.push("is_active = 0".to_string()),
                Some(LicenseStatus::Bound) => clauses.push("bound_email IS NOT NULL".to_string()),
                Some(LicenseStatus::Available) => {
                    args.push(now.clone().into());
                    clauses.push(format!(
                        "is_active = 1 AND usage_count = 0 AND bound_email IS NULL \
                         AND (expires_at IS NULL OR expires_at > ?{})",
                        args.len()
                    ));
                }
                Some(LicenseStatus::Expired) => {
                    args.push(now.clone().into());
                    clauses.push(format!(
                        "expires_at IS NOT NULL AND expires_at <= ?{}",
                        args.len()
                    ));
                }
            }

            let where_sql = if clauses.is_empty() {
                String::new()
            } else {
                format!(" WHERE {}", clauses.join(" AND "))
            };

            let total: i64 = conn.query_row(
                &format!("SELECT COUNT(*) FROM licenses{where_sql}"),
                params_from_iter(args.iter()),
                |row| row.get(0),
            )?;

            args.push(query.limit.max(1).into());
            let limit_n = args.len();
            args.push(query.offset.max(0).into());
            let offset_n = args.len();
            let mut stmt = conn.prepare(&format!(
                "SELECT {LICENSE_COLUMNS} FROM licenses{where_sql}
                 ORDER BY created_at DESC, rowid DESC LIMIT ?{limit_n} OFFSET ?{offset_n}"
            ))?;
            let licenses = stmt
                .query_map(params_from_iter(args.iter()), license_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(LicensePage { licenses, total })
        })
        .await
        .map_err(map_tr_err)
}

/// Enable or disable a license. Returns `false` if it does not exist.
pub async fn set_active(db: &Database, sn: &str, active: bool) -> Result<bool, LicensorError> {
    let sn = sn.to_string();
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let n = conn.execute(
                "UPDATE licenses SET is_active = ?1 WHERE sn = ?2",
                params![active, sn],
            )?;
            Ok(n > 0)
        })
        .await
        .map_err(map_tr_err)
}

/// Push the expiry out by `days`, counting from whichever is later: now or
/// the current expiry. A license whose clock has not started gets the days
/// added to `valid_days` instead.
pub async fn extend(
    db: &Database,
    sn: &str,
    days: i64,
    now: DateTime<Utc>,
) -> Result<Option<License>, LicensorError> {
    let sn = sn.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<License>, rusqlite::Error> {
            let tx = conn.transaction()?;
            let Some(expires_at) = tx
                .query_row(
                    "SELECT expires_at FROM licenses WHERE sn = ?1",
                    params![sn],
                    |row| row.get::<_, Option<String>>(0),
                )
                .optional()?
            else {
                return Ok(None);
            };

            match expires_at {
                Some(current) => {
                    let base = DateTime::parse_from_rfc3339(&current)
                        .map(|dt| dt.with_timezone(&Utc))
                        .unwrap_or(now)
                        .max(now);
                    tx.execute(
                        "UPDATE licenses SET expires_at = ?1 WHERE sn = ?2",
                        params![format_timestamp(add_days(base, days)?), sn],
                    )?;
                }
                None => {
                    tx.execute(
                        "UPDATE licenses SET valid_days = valid_days + ?1 WHERE sn = ?2",
                        params![days, sn],
                    )?;
                }
            }
            let license = tx.query_row(
                &format!("SELECT {LICENSE_COLUMNS} FROM licenses WHERE sn = ?1"),
                params![sn],
                license_from_row,
            )?;
            tx.commit()?;
            Ok(Some(license))
        })
        .await
        .map_err(map_tr_err)
}

pub async fn set_daily_analysis(
    db: &Database,
    sn: &str,
    daily_analysis: i64,
) -> Result<bool, LicensorError> {
    let sn = sn.to_string();
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let n = conn.execute(
                "UPDATE licenses SET daily_analysis = ?1 WHERE sn = ?2",
                params![daily_analysis, sn],
            )?;
            Ok(n > 0)
        })
        .await
        .map_err(map_tr_err)
}

/// Group and product assignment for one license.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LicenseGroups {
    pub license_group_id: String,
    pub llm_group_id: String,
    pub search_group_id: String,
    pub product_id: i64,
}

pub async fn set_groups(
    db: &Database,
    sn: &str,
    groups: LicenseGroups,
) -> Result<bool, LicensorError> {
    let sn = sn.to_string();
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let n = conn.execute(
                "UPDATE licenses SET license_group_id = ?1, llm_group_id = ?2,
                     search_group_id = ?3, product_id = ?4
                 WHERE sn = ?5",
                params![
                    groups.license_group_id,
                    groups.llm_group_id,
                    groups.search_group_id,
                    groups.product_id,
                    sn
                ],
            )?;
            Ok(n > 0)
        })
        .await
        .map_err(map_tr_err)
}

/// Delete a license only. Any ledger row pointing at it becomes stale and is
/// purged the next time its email re-requests.
pub async fn delete(db: &Database, sn: &str) -> Result<bool, LicensorError> {
    let sn = sn.to_string();
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            Ok(conn.execute("DELETE FROM licenses WHERE sn = ?1", params![sn])? > 0)
        })
        .await
        .map_err(map_tr_err)
}

/// Delete a license together with its ledger rows.
pub async fn force_delete(db: &Database, sn: &str) -> Result<bool, LicensorError> {
    let sn = sn.to_string();
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let tx = conn.transaction()?;
            tx.execute("DELETE FROM email_records WHERE sn = ?1", params![sn])?;
            let n = tx.execute("DELETE FROM licenses WHERE sn = ?1", params![sn])?;
            tx.commit()?;
            Ok(n > 0)
        })
        .await
        .map_err(map_tr_err)
}

/// Selects which unused licenses a bulk delete removes.
///
/// For each group field, `Some("none")` selects ungrouped licenses and
/// `Some(id)` selects that group. At least one filter or `delete_all` is required.
#[derive(Debug, Clone, Default)]
pub struct UnusedFilter {
    pub llm_group_id: Option<String>,
    pub search_group_id: Option<String>,
    pub license_group_id: Option<String>,
    pub product_id: Option<i64>,
    pub delete_all: bool,
}

/// Bulk-delete licenses that were never activated and never bound.
pub async fn delete_unused(db: &Database, filter: UnusedFilter) -> Result<usize, LicensorError> {
    let has_filter = filter.llm_group_id.is_some()
        || filter.search_group_id.is_some()
        || filter.license_group_id.is_some()
        || filter.product_id.is_some();
    if !has_filter && !filter.delete_all {
        return Err(LicensorError::Validation(
            "choose at least one group filter or set delete_all".to_string(),
        ));
    }

    db.connection()
        .call(move |conn| -> Result<usize, rusqlite::Error> {
            let mut sql = String::from(
                "DELETE FROM licenses WHERE usage_count = 0 AND bound_email IS NULL
                 AND sn NOT IN (SELECT sn FROM email_records)",
            );
            let mut args: Vec<rusqlite::types::Value> = Vec::new();
            for (column, value) in [
                ("llm_group_id", &filter.llm_group_id),
                ("search_group_id", &filter.search_group_id),
                ("license_group_id", &filter.license_group_id),
            ] {
                match value.as_deref() {
                    Some("none") => sql.push_str(&format!(" AND {column} = ''")),
                    Some(id) => {
                        args.push(id.to_string().into());
                        sql.push_str(&format!(" AND {column} = ?{}", args.len()));
                    }
                    None => {}
                }
            }
            if let Some(id) = filter.product_id {
                args.push(id.into());
                sql.push_str(&format!(" AND product_id = ?{}", args.len()));
            }
            conn.execute(&sql, params_from_iter(args))
        })
        .await
        .map_err(map_tr_err)
}

/// Delete disabled licenses that are not bound to any email.
pub async fn purge_disabled(db: &Database) -> Result<usize, LicensorError> {
    db.connection()
        .call(|conn| -> Result<usize, rusqlite::Error> {
            conn.execute(
                "DELETE FROM licenses WHERE is_active = 0 AND bound_email IS NULL
                 AND sn NOT IN (SELECT sn FROM email_records)",
                [],
            )
        })
        .await
        .map_err(map_tr_err)
}

/// Dashboard counters.
pub async fn stats(db: &Database, now: DateTime<Utc>) -> Result<LicenseStats, LicensorError> {
    let now = format_timestamp(now);
    db.connection()
        .call(move |conn| -> Result<LicenseStats, rusqlite::Error> {
            let mut stats = conn.query_row(
                "SELECT
                    COUNT(*),
                    COALESCE(SUM(is_active = 1), 0),
                    COALESCE(SUM(is_active = 0), 0),
                    COALESCE(SUM(bound_email IS NOT NULL), 0),
                    COALESCE(SUM(is_active = 1 AND usage_count = 0 AND bound_email IS NULL
                        AND (expires_at IS NULL OR expires_at > ?1)), 0),
                    COALESCE(SUM(expires_at IS NOT NULL AND expires_at <= ?1), 0)
                 FROM licenses",
                params![now],
                |row| {
                    Ok(LicenseStats {
                        total: row.get(0)?,
                        active: row.get(1)?,
                        disabled: row.get(2)?,
                        bound: row.get(3)?,
                        available: row.get(4)?,
                        expired: row.get(5)?,
                        email_records: 0,
                    })
                },
            )?;
            stats.email_records =
                conn.query_row("SELECT COUNT(*) FROM email_records", [], |row| row.get(0))?;
            Ok(stats)
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::email_records;
    use chrono::TimeZone;
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    fn t(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, day, 12, 0, 0).unwrap()
    }

    fn new_license(sn: &str) -> NewLicense {
        NewLicense {
            sn: sn.to_string(),
            description: String::new(),
            valid_days: 30,
            daily_analysis: 20,
            license_group_id: String::new(),
            llm_group_id: String::new(),
            search_group_id: String::new(),
            product_id: 0,
        }
    }

    fn claim_req(email: &str) -> ClaimRequest {
        ClaimRequest {
            email: email.to_string(),
            ip: "10.0.0.1".to_string(),
            product_id: 0,
            llm_group_id: None,
            search_group_id: None,
            prefer_ungrouped: false,
            now: t(10),
        }
    }

    #[tokio::test]
    async fn claim_takes_oldest_first() {
        let (db, _dir) = setup_db().await;
        insert(&db, new_license("CCCC"), t(3)).await.unwrap();
        insert(&db, new_license("AAAA"), t(1)).await.unwrap();
        insert(&db, new_license("BBBB"), t(2)).await.unwrap();

        let outcome = claim(&db, claim_req("a@x.com")).await.unwrap();
        let ClaimOutcome::Claimed(claimed) = outcome else {
            panic!("expected a claim, got {outcome:?}");
        };
        assert_eq!(claimed.license.sn, "AAAA");
        assert_eq!(claimed.license.description, "requested by a@x.com");
        assert_eq!(claimed.license.bound_email.as_deref(), Some("a@x.com"));
        assert_eq!(
            claimed.license.expires_at.as_deref(),
            Some("2026-04-09T12:00:00.000Z")
        );
    }

    #[tokio::test]
    async fn batch_ties_break_by_insertion_order() {
        let (db, _dir) = setup_db().await;
        let batch = vec![new_license("ZZZZ"), new_license("MMMM"), new_license("AAAA")];
        assert_eq!(insert_batch(&db, batch, t(1)).await.unwrap(), 3);

        let ClaimOutcome::Claimed(first) = claim(&db, claim_req("a@x.com")).await.unwrap() else {
            panic!("expected a claim");
        };
        assert_eq!(first.license.sn, "ZZZZ");
    }

    #[tokio::test]
    async fn claim_returns_existing_binding() {
        let (db, _dir) = setup_db().await;
        insert(&db, new_license("AAAA"), t(1)).await.unwrap();
        insert(&db, new_license("BBBB"), t(2)).await.unwrap();

        claim(&db, claim_req("a@x.com")).await.unwrap();
        let again = claim(&db, claim_req("a@x.com")).await.unwrap();
        assert_eq!(again, ClaimOutcome::AlreadyBound { sn: "AAAA".into() });
    }

    #[tokio::test]
    async fn claim_skips_ineligible_licenses() {
        let (db, _dir) = setup_db().await;
        insert(&db, new_license("DISABLED"), t(1)).await.unwrap();
        set_active(&db, "DISABLED", false).await.unwrap();
        insert(&db, new_license("USED"), t(2)).await.unwrap();
        record_activation(&db, "USED", t(2)).await.unwrap();
        insert(&db, new_license("EXPIRED"), t(3)).await.unwrap();
        db.connection()
            .call(|conn| -> Result<usize, rusqlite::Error> {
                conn.execute(
                    "UPDATE licenses SET expires_at = '2026-03-05T00:00:00.000Z' WHERE sn = 'EXPIRED'",
                    [],
                )
            })
            .await
            .unwrap();
        let mut product = new_license("PRODUCT7");
        product.product_id = 7;
        insert(&db, product, t(4)).await.unwrap();

        assert_eq!(
            claim(&db, claim_req("a@x.com")).await.unwrap(),
            ClaimOutcome::Exhausted
        );

        let breakdown = inventory_breakdown(&db, t(10)).await.unwrap();
        assert_eq!(breakdown.total, 4);
        assert_eq!(breakdown.active, 3);
        assert_eq!(breakdown.unexpired, 2);
        assert_eq!(breakdown.unused, 1);
        assert_eq!(breakdown.unbound, 1);

        let mut req = claim_req("a@x.com");
        req.product_id = 7;
        let ClaimOutcome::Claimed(claimed) = claim(&db, req).await.unwrap() else {
            panic!("product 7 license should be claimable");
        };
        assert_eq!(claimed.license.sn, "PRODUCT7");
    }

    #[tokio::test]
    async fn prefer_ungrouped_falls_back_to_grouped() {
        let (db, _dir) = setup_db().await;
        let mut grouped = new_license("GROUPED");
        grouped.llm_group_id = "g1".into();
        insert(&db, grouped, t(1)).await.unwrap();
        insert(&db, new_license("PLAIN"), t(2)).await.unwrap();

        let mut req = claim_req("a@x.com");
        req.prefer_ungrouped = true;
        let ClaimOutcome::Claimed(first) = claim(&db, req.clone()).await.unwrap() else {
            panic!("expected a claim");
        };
        assert_eq!(first.license.sn, "PLAIN");

        req.email = "b@x.com".into();
        let ClaimOutcome::Claimed(second) = claim(&db, req).await.unwrap() else {
            panic!("expected fallback claim");
        };
        assert_eq!(second.license.sn, "GROUPED");
    }

    #[tokio::test]
    async fn group_constraints_are_exact() {
        let (db, _dir) = setup_db().await;
        let mut a = new_license("LLM-A");
        a.llm_group_id = "a".into();
        insert(&db, a, t(1)).await.unwrap();
        let mut b = new_license("LLM-B");
        b.llm_group_id = "b".into();
        b.search_group_id = "s".into();
        insert(&db, b, t(2)).await.unwrap();

        let mut req = claim_req("a@x.com");
        req.llm_group_id = Some("b".into());
        req.search_group_id = Some("s".into());
        let ClaimOutcome::Claimed(claimed) = claim(&db, req).await.unwrap() else {
            panic!("expected a claim");
        };
        assert_eq!(claimed.license.sn, "LLM-B");
    }

    #[tokio::test]
    async fn concurrent_claims_bind_single_license_once() {
        let (db, _dir) = setup_db().await;
        insert(&db, new_license("ONLY"), t(1)).await.unwrap();

        let mut handles = Vec::new();
        for i in 0..16 {
            let db = db.clone();
            handles.push(tokio::spawn(async move {
                claim(&db, claim_req(&format!("user{i}@x.com"))).await.unwrap()
            }));
        }
        let mut claimed = 0;
        let mut exhausted = 0;
        for h in handles {
            match h.await.unwrap() {
                ClaimOutcome::Claimed(c) => {
                    assert_eq!(c.license.sn, "ONLY");
                    claimed += 1;
                }
                ClaimOutcome::Exhausted => exhausted += 1,
                other => panic!("unexpected outcome {other:?}"),
            }
        }
        assert_eq!(claimed, 1);
        assert_eq!(exhausted, 15);
    }

    #[tokio::test]
    async fn activation_starts_clock_and_counts_usage() {
        let (db, _dir) = setup_db().await;
        insert(&db, new_license("AAAA"), t(1)).await.unwrap();
        let license = record_activation(&db, "AAAA", t(5)).await.unwrap().unwrap();
        assert_eq!(license.usage_count, 1);
        assert_eq!(license.expires_at.as_deref(), Some("2026-04-04T12:00:00.000Z"));
        let again = record_activation(&db, "AAAA", t(6)).await.unwrap().unwrap();
        assert_eq!(again.usage_count, 2);
        assert_eq!(again.expires_at, license.expires_at);
        assert!(record_activation(&db, "NOPE", t(6)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn extend_counts_from_later_of_now_and_expiry() {
        let (db, _dir) = setup_db().await;
        insert(&db, new_license("AAAA"), t(1)).await.unwrap();
        let unstarted = extend(&db, "AAAA", 10, t(2)).await.unwrap().unwrap();
        assert_eq!(unstarted.valid_days, 40);
        assert!(unstarted.expires_at.is_none());

        record_activation(&db, "AAAA", t(2)).await.unwrap();
        let extended = extend(&db, "AAAA", 5, t(3)).await.unwrap().unwrap();
        assert_eq!(extended.expires_at.as_deref(), Some("2026-04-16T12:00:00.000Z"));
        assert!(extend(&db, "MISSING", 5, t(3)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn out_of_range_validity_fails_without_killing_the_connection() {
        let (db, _dir) = setup_db().await;
        insert(
            &db,
            NewLicense {
                valid_days: 100_000_000,
                ..new_license("HUGE")
            },
            t(1),
        )
        .await
        .unwrap();

        assert!(claim(&db, claim_req("a@x.com")).await.is_err());
        assert!(record_activation(&db, "HUGE", t(2)).await.is_err());

        let license = get(&db, "HUGE").await.unwrap().unwrap();
        assert!(license.bound_email.is_none());
        assert!(license.expires_at.is_none());
        assert!(
            email_records::list(&db, None, 10, 0)
                .await
                .unwrap()
                .0
                .is_empty()
        );

        insert(&db, new_license("FINE"), t(1)).await.unwrap();
        record_activation(&db, "FINE", t(2)).await.unwrap();
        assert!(extend(&db, "FINE", i64::MAX, t(3)).await.is_err());
        let fine = get(&db, "FINE").await.unwrap().unwrap();
        assert_eq!(fine.expires_at.as_deref(), Some("2026-04-01T12:00:00.000Z"));
    }

    #[tokio::test]
    async fn delete_unused_requires_filter_and_respects_none() {
        let (db, _dir) = setup_db().await;
        insert(&db, new_license("CLAIMED"), t(1)).await.unwrap();
        claim(&db, claim_req("a@x.com")).await.unwrap();
        let mut grouped = new_license("GROUPED");
        grouped.llm_group_id = "g1".into();
        insert(&db, grouped, t(2)).await.unwrap();
        insert(&db, new_license("PLAIN"), t(3)).await.unwrap();

        let err = delete_unused(&db, UnusedFilter::default()).await.unwrap_err();
        assert!(matches!(err, LicensorError::Validation(_)));

        let removed = delete_unused(
            &db,
            UnusedFilter {
                llm_group_id: Some("none".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(removed, 1);
        assert!(get(&db, "CLAIMED").await.unwrap().is_some());
        assert!(get(&db, "GROUPED").await.unwrap().is_some());
        assert!(get(&db, "PLAIN").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn purge_disabled_keeps_bound_licenses() {
        let (db, _dir) = setup_db().await;
        insert(&db, new_license("BOUND"), t(1)).await.unwrap();
        insert(&db, new_license("LOOSE"), t(2)).await.unwrap();
        claim(&db, claim_req("a@x.com")).await.unwrap();
        set_active(&db, "BOUND", false).await.unwrap();
        set_active(&db, "LOOSE", false).await.unwrap();

        assert_eq!(purge_disabled(&db).await.unwrap(), 1);
        assert!(get(&db, "BOUND").await.unwrap().is_some());
        assert!(get(&db, "LOOSE").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn force_delete_removes_ledger_rows() {
        let (db, _dir) = setup_db().await;
        insert(&db, new_license("AAAA"), t(1)).await.unwrap();
        claim(&db, claim_req("a@x.com")).await.unwrap();
        assert!(force_delete(&db, "AAAA").await.unwrap());
        let stats = stats(&db, t(10)).await.unwrap();
        assert_eq!(stats.total, 0);
        assert_eq!(stats.email_records, 0);
    }

    #[tokio::test]
    async fn list_filters_and_pages() {
        let (db, _dir) = setup_db().await;
        for (i, sn) in ["A1", "A2", "A3"].iter().enumerate() {
            insert(&db, new_license(sn), t(i as u32 + 1)).await.unwrap();
        }
        set_active(&db, "A2", false).await.unwrap();

        let page = list(
            &db,
            LicenseQuery {
                status: Some(LicenseStatus::Active),
                limit: 1,
                ..Default::default()
            },
            t(10),
        )
        .await
        .unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.licenses.len(), 1);
        assert_eq!(page.licenses[0].sn, "A3");

        let page = list(
            &db,
            LicenseQuery {
                search: Some("a2".into()),
                limit: 10,
                ..Default::default()
            },
            t(10),
        )
        .await
        .unwrap();
        assert_eq!(page.total, 1);
    }

    #[tokio::test]
    async fn insert_rejects_duplicate_sn() {
        let (db, _dir) = setup_db().await;
        insert(&db, new_license("AAAA"), t(1)).await.unwrap();
        let err = insert(&db, new_license("AAAA"), t(2)).await.unwrap_err();
        assert!(matches!(err, LicensorError::Conflict(_)));
    }
}
