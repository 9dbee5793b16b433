use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Fixed-window request cap for one limiter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitPolicy {
    pub max_requests: u64,
    #[serde(with = "humantime_serde")]
    pub window: Duration,
    pub message: String,
}

/// Progressive delay applied once a client passes `delay_after` requests in a window.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlowDownPolicy {
    pub delay_after: u64,
    #[serde(with = "humantime_serde")]
    pub window: Duration,
    #[serde(with = "humantime_serde")]
    pub delay_step: Duration,
    #[serde(with = "humantime_serde")]
    pub max_delay: Duration,
}

/// Every policy the admission pipeline knows about.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionPolicies {
    pub speed_down: SlowDownPolicy,
    pub general: RateLimitPolicy,
    pub post_generation: RateLimitPolicy,
    pub strict: RateLimitPolicy,
}

impl RateLimitPolicy {
    pub fn new(max_requests: u64, window: Duration, message: impl Into<String>) -> Self {
        Self {
            max_requests,
            window,
            message: message.into(),
        }
    }

    /// 100 requests per 15 minutes across the API.
    pub fn general() -> Self {
        Self::new(
            100,
            Duration::from_secs(15 * 60),
            "Too many requests from this IP, please try again in 15 minutes.",
        )
    }

    /// 10 generations per hour.
    pub fn post_generation() -> Self {
        Self::new(
            10,
            Duration::from_secs(60 * 60),
            "Post generation limit exceeded. You can generate 10 posts per hour. Consider upgrading for higher limits.",
        )
    }

    /// 3 requests per minute, for endpoints with a higher abuse risk.
    pub fn strict() -> Self {
        Self::new(3, Duration::from_secs(60), "Too many requests. Please slow down.")
    }

    /// Seconds a rejected client is told to wait.
    pub fn retry_after_secs(&self) -> u64 {
        (self.window.as_millis() as f64 / 1000.0).round() as u64
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.max_requests == 0 {
            return Err("Rate limit max requests must be greater than 0".to_string());
        }
        if self.window.is_zero() {
            return Err("Rate limit window must be greater than 0".to_string());
        }
        Ok(())
    }
}

impl SlowDownPolicy {
    /// Delay owed by the `count`-th request of a window.
    pub fn delay_for(&self, count: u64) -> Duration {
        if count <= self.delay_after {
            return Duration::ZERO;
        }
        let excess = (count - self.delay_after).min(u32::MAX as u64) as u32;
        self.delay_step.saturating_mul(excess).min(self.max_delay)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.window.is_zero() {
            return Err("Slow-down window must be greater than 0".to_string());
        }
        if self.max_delay < self.delay_step {
            return Err("Slow-down max delay must not be smaller than the delay step".to_string());
        }
        Ok(())
    }
}

impl Default for SlowDownPolicy {
    fn default() -> Self {
        Self {
            delay_after: 5,
            window: Duration::from_secs(15 * 60),
            delay_step: Duration::from_millis(500),
            max_delay: Duration::from_secs(20),
        }
    }
}

impl Default for AdmissionPolicies {
    fn default() -> Self {
        Self {
            speed_down: SlowDownPolicy::default(),
            general: RateLimitPolicy::general(),
            post_generation: RateLimitPolicy::post_generation(),
            strict: RateLimitPolicy::strict(),
        }
    }
}

impl AdmissionPolicies {
    pub fn validate(&self) -> Result<(), String> {
        self.speed_down.validate()?;
        self.general.validate()?;
        self.post_generation.validate()?;
        self.strict.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_after_matches_window() {
        assert_eq!(RateLimitPolicy::general().retry_after_secs(), 900);
        assert_eq!(RateLimitPolicy::post_generation().retry_after_secs(), 3600);
        assert_eq!(RateLimitPolicy::strict().retry_after_secs(), 60);
    }

    #[test]
    fn test_slow_down_delay_progression() {
        let policy = SlowDownPolicy::default();
        assert_eq!(policy.delay_for(1), Duration::ZERO);
        assert_eq!(policy.delay_for(5), Duration::ZERO);
        assert_eq!(policy.delay_for(6), Duration::from_millis(500));
        assert_eq!(policy.delay_for(8), Duration::from_millis(1500));
        assert_eq!(policy.delay_for(45), Duration::from_secs(20));
        assert_eq!(policy.delay_for(10_000), Duration::from_secs(20));
    }

    #[test]
    fn test_policy_validation() {
        assert!(AdmissionPolicies::default().validate().is_ok());
        assert!(RateLimitPolicy::new(0, Duration::from_secs(1), "x").validate().is_err());
        assert!(RateLimitPolicy::new(1, Duration::ZERO, "x").validate().is_err());
    }

    #[test]
    fn test_policies_serialize_with_human_durations() {
        let json = serde_json::to_value(AdmissionPolicies::default()).unwrap();
        assert_eq!(json["general"]["maxRequests"], 100);
        assert_eq!(json["general"]["window"], "15m");
        assert_eq!(json["postGeneration"]["window"], "1h");
        assert_eq!(json["speedDown"]["delayStep"], "500ms");
    }
}
