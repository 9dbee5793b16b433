use std::sync::Arc;
use std::time::Duration;

use crate::error::StoreError;
use crate::key_generator::{KeyGenerator, KeyStrategy};
use crate::rate_limit_config::{RateLimitPolicy, SlowDownPolicy};
use crate::store::RateLimitStore;

/// Outcome of a limiter check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allowed {
        limit: u64,
        remaining: u64,
        reset_after: Duration,
    },
    Rejected {
        retry_after: u64,
    },
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allowed { .. })
    }
}

/// Fixed-window request cap keyed by client identity.
#[derive(Clone)]
pub struct RateLimiter {
    name: &'static str,
    policy: RateLimitPolicy,
    keys: KeyGenerator,
    store: Arc<dyn RateLimitStore>,
}

impl RateLimiter {
    pub fn new(
        name: &'static str,
        policy: RateLimitPolicy,
        strategy: KeyStrategy,
        store: Arc<dyn RateLimitStore>,
    ) -> Self {
        Self {
            name,
            policy,
            keys: KeyGenerator::new(name, strategy),
            store,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn policy(&self) -> &RateLimitPolicy {
        &self.policy
    }

    /// Counts this request against the client's window and decides admission.
    ///
    /// Rejected requests still count, so a client hammering the endpoint stays
    /// blocked until the window it opened has elapsed.
    pub async fn check(&self, client_ip: &str, path: &str) -> Result<Decision, StoreError> {
        let key = self.keys.generate_key(client_ip, path);
        let state = self.store.increment(&key, self.policy.window).await?;

        if state.count > self.policy.max_requests {
            tracing::warn!(
                limiter = self.name,
                client_ip = %client_ip,
                count = state.count,
                limit = self.policy.max_requests,
                "Rate limit exceeded"
            );
            return Ok(Decision::Rejected {
                retry_after: self.policy.retry_after_secs(),
            });
        }

        Ok(Decision::Allowed {
            limit: self.policy.max_requests,
            remaining: self.policy.max_requests - state.count,
            reset_after: state.reset_after,
        })
    }

    /// Clears the client's window for this limiter.
    pub async fn reset(&self, client_ip: &str, path: &str) -> Result<(), StoreError> {
        let key = self.keys.generate_key(client_ip, path);
        self.store.reset(&key).await
    }
}

/// Delays, never rejects, clients that keep calling inside one window.
#[derive(Clone)]
pub struct SpeedLimiter {
    policy: SlowDownPolicy,
    keys: KeyGenerator,
    store: Arc<dyn RateLimitStore>,
}

impl SpeedLimiter {
    pub fn new(policy: SlowDownPolicy, store: Arc<dyn RateLimitStore>) -> Self {
        Self {
            policy,
            keys: KeyGenerator::new("slowdown", KeyStrategy::ClientIp),
            store,
        }
    }

    pub fn policy(&self) -> &SlowDownPolicy {
        &self.policy
    }

    /// Records the request and returns how long it must wait before proceeding.
    pub async fn delay_for(&self, client_ip: &str) -> Result<Duration, StoreError> {
        let key = self.keys.generate_key(client_ip, "");
        let state = self.store.increment(&key, self.policy.window).await?;
        Ok(self.policy.delay_for(state.count))
    }
}
