//! Per-request usage sampling. Nothing is stored; records only feed the logs.

use axum::extract::{OriginalUri, Request};
use axum::http::header::USER_AGENT;
use chrono::Utc;

use crate::middleware::RequestContext;
use crate::models::UsageRecord;

#[derive(Debug, Clone)]
pub struct UsageTracker {
    upgrade_url: String,
}

impl UsageTracker {
    pub fn new(upgrade_url: impl Into<String>) -> Self {
        Self {
            upgrade_url: upgrade_url.into(),
        }
    }

    pub fn upgrade_url(&self) -> &str {
        &self.upgrade_url
    }

    /// Builds and logs the usage record for `request`.
    pub fn track(&self, context: &RequestContext, request: &Request) -> UsageRecord {
        let endpoint = request
            .extensions()
            .get::<OriginalUri>()
            .map(|uri| uri.path().to_string())
            .unwrap_or_else(|| request.uri().path().to_string());
        let user_agent = request
            .headers()
            .get(USER_AGENT)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        let record = UsageRecord {
            ip: context.client_ip.clone(),
            timestamp: Utc::now(),
            endpoint,
            user_agent,
        };

        tracing::info!(
            target: "post_generator::usage",
            request_id = %context.id,
            ip = %record.ip,
            endpoint = %record.endpoint,
            user_agent = record.user_agent.as_deref().unwrap_or("-"),
            "Usage recorded"
        );

        record
    }

    /// Free-tier quota check. Quotas are enforced by the rate limiters for now,
    /// so every record is within limits.
    pub fn within_free_tier(&self, _record: &UsageRecord) -> bool {
        true
    }
}
