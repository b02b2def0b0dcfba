// SPDX-FileCopyrightText: 2026 Licensor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-IP daily request counters.
//!
//! The counter key includes the calendar date, so counts reset by key change
//! rather than by any sweep.

use licensor_core::LicensorError;
use rusqlite::{OptionalExtension, params};

use crate::database::{Database, map_tr_err};

/// What one IP has done on one day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DailyUsage {
    /// Admitted SN requests.
    pub requests: i64,
    /// Distinct emails bound from this IP, taken from the ledger.
    pub distinct_emails: i64,
}

fn usage_in(conn: &rusqlite::Connection, ip: &str, day: &str) -> rusqlite::Result<DailyUsage> {
    let requests: i64 = conn
        .query_row(
            "SELECT count FROM request_limits WHERE ip = ?1 AND date = ?2",
            params![ip, day],
            |row| row.get(0),
        )
        .optional()?
        .unwrap_or(0);
    let distinct_emails: i64 = conn.query_row(
        "SELECT COUNT(DISTINCT email) FROM email_records
         WHERE ip = ?1 AND substr(created_at, 1, 10) = ?2",
        params![ip, day],
        |row| row.get(0),
    )?;
    Ok(DailyUsage {
        requests,
        distinct_emails,
    })
}

pub async fn usage(db: &Database, ip: &str, day: &str) -> Result<DailyUsage, LicensorError> {
    let ip = ip.to_string();
    let day = day.to_string();
    db.connection()
        .call(move |conn| -> Result<DailyUsage, rusqlite::Error> { usage_in(conn, &ip, &day) })
        .await
        .map_err(map_tr_err)
}

/// Read today's usage, let `decide` judge it, and bump the request counter
/// when `decide` admits the request, all in one writer-thread call so two
/// concurrent requests cannot both slip under the limit.
///
/// `decide` returns its verdict plus whether the request was admitted.
pub async fn admit_with<T, F>(
    db: &Database,
    ip: &str,
    day: &str,
    decide: F,
) -> Result<T, LicensorError>
where
    T: Send + 'static,
    F: FnOnce(DailyUsage) -> (T, bool) + Send + 'static,
{
    let ip = ip.to_string();
    let day = day.to_string();
    db.connection()
        .call(move |conn| -> Result<T, rusqlite::Error> {
            let tx = conn.transaction()?;
            let usage = usage_in(&tx, &ip, &day)?;
            let (verdict, admitted) = decide(usage);
            if admitted {
                tx.execute(
                    "INSERT INTO request_limits (ip, date, count) VALUES (?1, ?2, 1)
                     ON CONFLICT(ip, date) DO UPDATE SET count = count + 1",
                    params![ip, day],
                )?;
            }
            tx.commit()?;
            Ok(verdict)
        })
        .await
        .map_err(map_tr_err)
}

/// Forget every counter held for `ip`. Returns how many day rows were removed.
pub async fn clear_ip(db: &Database, ip: &str) -> Result<usize, LicensorError> {
    let ip = ip.trim().to_string();
    db.connection()
        .call(move |conn| -> Result<usize, rusqlite::Error> {
            conn.execute("DELETE FROM request_limits WHERE ip = ?1", params![ip])
        })
        .await
        .map_err(map_tr_err)
}
