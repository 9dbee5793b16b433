use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

use super::{RateLimitStore, WindowState};
use crate::error::StoreError;

#[derive(Debug, Clone, Copy)]
struct WindowEntry {
    count: u64,
    expires_at: Instant,
}

impl WindowEntry {
    fn state(&self, now: Instant) -> WindowState {
        WindowState {
            count: self.count,
            reset_after: self.expires_at.saturating_duration_since(now),
        }
    }
}

/// Process-local store. State is lost on restart.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<DashMap<String, WindowEntry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Removes every window that has already elapsed. Returns how many were dropped.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.expires_at > now);
        before.saturating_sub(self.entries.len())
    }

    /// Periodically purges expired windows until the handle is aborted.
    pub fn spawn_sweeper(&self, interval: Duration) -> JoinHandle<()> {
        let store = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let purged = store.purge_expired();
                if purged > 0 {
                    tracing::debug!(purged, remaining = store.len(), "Purged expired rate limit windows");
                }
            }
        })
    }
}

#[async_trait]
impl RateLimitStore for MemoryStore {
    async fn increment(&self, key: &str, window: Duration) -> Result<WindowState, StoreError> {
        let now = Instant::now();
        let mut entry = self
            .entries
            .entry(key.to_string())
            .or_insert(WindowEntry {
                count: 0,
                expires_at: now + window,
            });

        if entry.expires_at <= now {
            entry.count = 0;
            entry.expires_at = now + window;
        }
        entry.count += 1;

        Ok(entry.state(now))
    }

    async fn get(&self, key: &str) -> Result<Option<WindowState>, StoreError> {
        let now = Instant::now();
        Ok(self
            .entries
            .get(key)
            .filter(|entry| entry.expires_at > now)
            .map(|entry| entry.state(now)))
    }

    async fn reset(&self, key: &str) -> Result<(), StoreError> {
        self.entries.remove(key);
        Ok(())
    }
}
