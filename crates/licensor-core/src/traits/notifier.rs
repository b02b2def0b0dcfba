// SPDX-FileCopyrightText: 2026 Licensor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound notification trait.

use async_trait::async_trait;

use crate::error::LicensorError;
use crate::types::SnIssuedNotice;

/// Delivers "your serial number" messages to requesters.
///
/// Callers never wait on delivery: the engine spawns the send and only logs
/// the result, so implementations may block for as long as their transport
/// timeout allows.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Sends the notice. Returning `Ok(())` when notifications are disabled is expected.
    async fn send_sn_issued(&self, notice: &SnIssuedNotice) -> Result<(), LicensorError>;
}
