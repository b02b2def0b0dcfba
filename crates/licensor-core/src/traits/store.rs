// SPDX-FileCopyrightText: 2026 Licensor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Key-value store with per-entry expiry, used for admin sessions,
//! captcha challenges, and login lockout counters.

use std::time::Duration;

/// A concurrent map whose entries disappear after their TTL.
pub trait ExpiringStore<V>: Send + Sync
where
    V: Clone + Send + Sync,
{
    /// Inserts or replaces `key`, expiring after `ttl`.
    fn insert(&self, key: String, value: V, ttl: Duration);

    /// Returns the value if present and not expired.
    fn get(&self, key: &str) -> Option<V>;

    /// Removes and returns the value if present and not expired.
    fn take(&self, key: &str) -> Option<V>;

    fn remove(&self, key: &str);

    /// Drops expired entries. Returns how many were removed.
    fn purge_expired(&self) -> usize;
}
