//! Storage backends for rate-limit windows.
//!
//! Limiters only talk to [`RateLimitStore`], so the in-process map can be
//! swapped for a shared backend without touching the admission middleware.

mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

use crate::error::StoreError;

/// Counter state of one key inside its current window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WindowState {
    pub count: u64,
    pub reset_after: Duration,
}

#[async_trait]
pub trait RateLimitStore: Send + Sync {
    /// Records one hit for `key` and returns the updated window.
    ///
    /// A new window of length `window` opens when the key is unknown or its
    /// previous window has elapsed. The read-modify-write is atomic per key.
    async fn increment(&self, key: &str, window: Duration) -> Result<WindowState, StoreError>;

    /// Current window for `key`, or `None` when absent or expired.
    async fn get(&self, key: &str) -> Result<Option<WindowState>, StoreError>;

    /// Drops any state held for `key`.
    async fn reset(&self, key: &str) -> Result<(), StoreError>;
}
