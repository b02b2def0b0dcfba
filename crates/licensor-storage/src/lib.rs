// SPDX-FileCopyrightText: 2026 Licensor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence for the Licensor service.
//!
//! All access goes through a single background connection thread
//! (tokio-rusqlite), so writes are serialized and multi-statement operations
//! run inside one transaction on that thread.

pub mod database;
pub mod migrations;
pub mod queries;

pub use database::Database;
