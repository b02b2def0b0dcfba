// SPDX-FileCopyrightText: 2026 Licensor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embedded schema migrations (refinery).
//!
//! SQL files under `migrations/` are compiled into the binary and applied on
//! every [`crate::Database`] open. Applied versions are tracked in
//! `refinery_schema_history`.

use licensor_core::LicensorError;
use tracing::info;

mod embedded {
    use refinery::embed_migrations;
    embed_migrations!("migrations");
}

/// Apply every pending migration.
pub fn run_migrations(conn: &mut rusqlite::Connection) -> Result<(), LicensorError> {
    let report = embedded::migrations::runner()
        .run(conn)
        .map_err(|e| LicensorError::Storage {
            source: Box::new(e),
        })?;
    for migration in report.applied_migrations() {
        info!(version = migration.version(), name = migration.name(), "migration applied");
    }
    Ok(())
}
