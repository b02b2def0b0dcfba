// SPDX-FileCopyrightText: 2026 Licensor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Notifier that records notices for assertions.

use std::time::Duration;

use async_trait::async_trait;
use licensor_core::{LicensorError, Notifier, SnIssuedNotice};
use tokio::sync::{Mutex, Notify};

/// Captures every [`SnIssuedNotice`] handed to it.
///
/// Notices are sent from a background task, so tests that assert on them
/// should go through [`RecordingNotifier::wait_for`].
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<SnIssuedNotice>>,
    arrived: Notify,
    fail: bool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// A notifier that records the notice and then reports an SMTP failure.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub async fn sent(&self) -> Vec<SnIssuedNotice> {
        self.sent.lock().await.clone()
    }

    pub async fn sent_count(&self) -> usize {
        self.sent.lock().await.len()
    }

    /// Wait until at least `count` notices arrived, or `timeout` elapsed.
    /// Returns whatever was recorded.
    pub async fn wait_for(&self, count: usize, timeout: Duration) -> Vec<SnIssuedNotice> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let arrived = self.arrived.notified();
            {
                let sent = self.sent.lock().await;
                if sent.len() >= count {
                    return sent.clone();
                }
            }
            if tokio::time::timeout_at(deadline, arrived).await.is_err() {
                return self.sent().await;
            }
        }
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_sn_issued(&self, notice: &SnIssuedNotice) -> Result<(), LicensorError> {
        self.sent.lock().await.push(notice.clone());
        self.arrived.notify_waiters();
        if self.fail {
            return Err(LicensorError::Notify {
                message: "recording notifier configured to fail".to_string(),
                source: None,
            });
        }
        Ok(())
    }
}
