// SPDX-FileCopyrightText: 2026 Licensor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Licensor integration tests.
//!
//! - [`TestHarness`] owns a temp SQLite database and a ready [`LicenseService`](licensor_engine::LicenseService).
//! - [`RecordingNotifier`] captures SN-issued notices instead of sending mail.

pub mod harness;
pub mod recording_notifier;

pub use harness::{TestHarness, TestHarnessBuilder};
pub use recording_notifier::RecordingNotifier;
