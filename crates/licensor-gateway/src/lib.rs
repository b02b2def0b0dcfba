// SPDX-FileCopyrightText: 2026 Licensor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP surfaces for Licensor.
//!
//! The public router serves `/activate`, `/request-sn`, and `/health` to
//! client applications. The admin router serves the login flow and the
//! session-protected management API. Both share one [`AppState`] and run on
//! separate listeners.

pub mod admin;
pub mod auth;
pub mod client_ip;
pub mod error;
pub mod handlers;
pub mod server;
pub mod store;

pub use error::{ApiError, ApiResult};
pub use server::{AppState, admin_router, bind, public_router, serve};
pub use store::{MemoryStore, SWEEP_INTERVAL, spawn_sweeper};
