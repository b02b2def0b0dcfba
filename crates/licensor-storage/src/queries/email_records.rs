// SPDX-FileCopyrightText: 2026 Licensor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The email-to-SN ledger.

use licensor_core::{EmailRecord, LicensorError};
use rusqlite::{OptionalExtension, params};

use crate::database::{Database, map_tr_err};

fn record_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<EmailRecord> {
    Ok(EmailRecord {
        id: row.get(0)?,
        email: row.get(1)?,
        sn: row.get(2)?,
        ip: row.get(3)?,
        created_at: row.get(4)?,
        product_id: row.get(5)?,
    })
}

/// The SN bound to `email` for `product_id`, if that SN still exists.
pub async fn find_live_binding(
    db: &Database,
    email: &str,
    product_id: i64,
) -> Result<Option<String>, LicensorError> {
    let email = email.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<String>, rusqlite::Error> {
            conn.query_row(
                "SELECT e.sn FROM email_records e JOIN licenses l ON l.sn = e.sn
                 WHERE e.email = ?1 AND e.product_id = ?2",
                params![email, product_id],
                |row| row.get(0),
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Delete ledger rows for `email`/`product_id` whose SN no longer exists.
/// Returns the SNs that were purged.
pub async fn purge_stale(
    db: &Database,
    email: &str,
    product_id: i64,
) -> Result<Vec<String>, LicensorError> {
    let email = email.to_string();
    db.connection()
        .call(move |conn| -> Result<Vec<String>, rusqlite::Error> {
            let tx = conn.transaction()?;
            let stale = {
                let mut stmt = tx.prepare(
                    "SELECT sn FROM email_records WHERE email = ?1 AND product_id = ?2
                     AND sn NOT IN (SELECT sn FROM licenses)",
                )?;
                stmt.query_map(params![email, product_id], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?
            };
            if !stale.is_empty() {
                tx.execute(
                    "DELETE FROM email_records WHERE email = ?1 AND product_id = ?2
                     AND sn NOT IN (SELECT sn FROM licenses)",
                    params![email, product_id],
                )?;
            }
            tx.commit()?;
            Ok(stale)
        })
        .await
        .map_err(map_tr_err)
}

/// Ledger rows matching `search` (substring of email, SN, or IP), newest first.
pub async fn list(
    db: &Database,
    search: Option<String>,
    limit: i64,
    offset: i64,
) -> Result<(Vec<EmailRecord>, i64), LicensorError> {
    let pattern = format!(
        "%{}%",
        search.as_deref().map(str::trim).unwrap_or_default().to_lowercase()
    );
    db.connection()
        .call(move |conn| -> Result<(Vec<EmailRecord>, i64), rusqlite::Error> {
            let filter = "WHERE email LIKE ?1 OR sn LIKE ?1 OR ip LIKE ?1";
            let total: i64 = conn.query_row(
                &format!("SELECT COUNT(*) FROM email_records {filter}"),
                params![pattern],
                |row| row.get(0),
            )?;
            let mut stmt = conn.prepare(&format!(
                "SELECT id, email, sn, ip, created_at, product_id FROM email_records {filter}
                 ORDER BY id DESC LIMIT ?2 OFFSET ?3"
            ))?;
            let rows = stmt
                .query_map(params![pattern, limit.max(1), offset.max(0)], record_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok((rows, total))
        })
        .await
        .map_err(map_tr_err)
}

/// Remove every binding held by `email` and release the SNs for reuse
/// by clearing their bound marker. Returns how many rows were removed.
pub async fn clear_by_email(db: &Database, email: &str) -> Result<usize, LicensorError> {
    let email = email.trim().to_lowercase();
    db.connection()
        .call(move |conn| -> Result<usize, rusqlite::Error> {
            let tx = conn.transaction()?;
            tx.execute(
                "UPDATE licenses SET bound_email = NULL WHERE bound_email = ?1",
                params![email],
            )?;
            let n = tx.execute("DELETE FROM email_records WHERE email = ?1", params![email])?;
            tx.commit()?;
            Ok(n)
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::licenses::{self, ClaimRequest};
    use chrono::{TimeZone, Utc};
    use licensor_core::NewLicense;
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("test.db").to_str().unwrap())
            .await
            .unwrap();
        (db, dir)
    }

    async fn seed_bound(db: &Database, sn: &str, email: &str) {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        licenses::insert(
            db,
            NewLicense {
                sn: sn.to_string(),
                description: String::new(),
                valid_days: 365,
                daily_analysis: 20,
                license_group_id: String::new(),
                llm_group_id: String::new(),
                search_group_id: String::new(),
                product_id: 0,
            },
            now,
        )
        .await
        .unwrap();
        licenses::claim(
            db,
            ClaimRequest {
                email: email.to_string(),
                ip: "1.2.3.4".to_string(),
                product_id: 0,
                llm_group_id: None,
                search_group_id: None,
                prefer_ungrouped: false,
                now,
            },
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn stale_binding_is_purged_after_license_delete() {
        let (db, _dir) = setup_db().await;
        seed_bound(&db, "AAAA", "a@x.com").await;
        assert_eq!(
            find_live_binding(&db, "a@x.com", 0).await.unwrap().as_deref(),
            Some("AAAA")
        );

        licenses::delete(&db, "AAAA").await.unwrap();
        assert!(find_live_binding(&db, "a@x.com", 0).await.unwrap().is_none());
        assert_eq!(purge_stale(&db, "a@x.com", 0).await.unwrap(), vec!["AAAA"]);
        assert!(purge_stale(&db, "a@x.com", 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn list_searches_email_sn_and_ip() {
        let (db, _dir) = setup_db().await;
        seed_bound(&db, "AAAA", "a@x.com").await;
        seed_bound(&db, "BBBB", "b@y.com").await;

        let (rows, total) = list(&db, Some("y.com".into()), 10, 0).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(rows[0].sn, "BBBB");

        let (_, total) = list(&db, Some("1.2.3".into()), 10, 0).await.unwrap();
        assert_eq!(total, 2);
    }

    #[tokio::test]
    async fn clear_by_email_releases_binding() {
        let (db, _dir) = setup_db().await;
        seed_bound(&db, "AAAA", "a@x.com").await;
        assert_eq!(clear_by_email(&db, " A@X.com ").await.unwrap(), 1);
        let license = licenses::get(&db, "AAAA").await.unwrap().unwrap();
        assert!(license.bound_email.is_none());
    }
}
