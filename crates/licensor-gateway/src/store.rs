// SPDX-FileCopyrightText: 2026 Licensor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory [`ExpiringStore`] for single-process deployments.
//!
//! Expiry is checked against the wall clock on every read; a background
//! sweeper only reclaims memory for entries nobody reads again.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};

use licensor_core::ExpiringStore;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// How often [`spawn_sweeper`] purges expired entries.
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(300);

struct Entry<V> {
    value: V,
    /// `None` never expires.
    expires_at: Option<Instant>,
}

impl<V> Entry<V> {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| now < at)
    }
}

/// `RwLock<HashMap>` with per-entry deadlines.
pub struct MemoryStore<V> {
    entries: RwLock<HashMap<String, Entry<V>>>,
}

impl<V> Default for MemoryStore<V> {
    fn default() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }
}

impl<V> MemoryStore<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn clear(&self) {
        self.write().clear();
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Entry<V>>> {
        self.entries.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Entry<V>>> {
        self.entries.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl<V> ExpiringStore<V> for MemoryStore<V>
where
    V: Clone + Send + Sync,
{
    fn insert(&self, key: String, value: V, ttl: Duration) {
        let expires_at = Instant::now().checked_add(ttl);
        self.write().insert(key, Entry { value, expires_at });
    }

    fn get(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        self.read()
            .get(key)
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.value.clone())
    }

    fn take(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        self.write()
            .remove(key)
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.value)
    }

    fn remove(&self, key: &str) {
        self.write().remove(key);
    }

    fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.write();
        let before = entries.len();
        entries.retain(|_, entry| entry.is_live(now));
        before - entries.len()
    }
}

/// Periodically purge `stores` until `cancel` fires.
pub fn spawn_sweeper(
    stores: Vec<Arc<dyn Sweep>>,
    interval: Duration,
    cancel: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    let purged: usize = stores.iter().map(|s| s.sweep()).sum();
                    if purged > 0 {
                        debug!(purged, "swept expired in-memory entries");
                    }
                }
            }
        }
    })
}

/// Object-safe purge hook so stores of different value types share one sweeper.
pub trait Sweep: Send + Sync {
    fn sweep(&self) -> usize;
}

impl<V> Sweep for MemoryStore<V>
where
    V: Clone + Send + Sync,
{
    fn sweep(&self) -> usize {
        self.purge_expired()
    }
}
