use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use crate::middleware::RequestId;

/// Errors raised while loading configuration at startup.
///
/// All of these are fatal: the process exits instead of serving degraded traffic.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("OPENAI_API_KEY is required but was not set")]
    MissingApiKey,

    #[error("failed to read environment: {0}")]
    Env(envconfig::Error),

    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl From<envconfig::Error> for ConfigError {
    fn from(err: envconfig::Error) -> Self {
        match err {
            envconfig::Error::EnvVarMissing {
                name: "OPENAI_API_KEY",
            } => ConfigError::MissingApiKey,
            other => ConfigError::Env(other),
        }
    }
}

/// Failures reported by a rate-limit store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("rate limit store unavailable: {0}")]
    Unavailable(String),
}

/// One rejected request field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldViolation {
    pub field: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    pub location: &'static str,
}

impl FieldViolation {
    pub fn body(field: impl Into<String>, message: impl Into<String>, value: Option<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            value,
            location: "body",
        }
    }
}

/// Every failure that can reach an HTTP caller.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("invalid input parameters")]
    Validation(Vec<FieldViolation>),

    #[error("{message}")]
    RateLimited { message: String, retry_after: u64 },

    #[error("free tier limit reached")]
    FreeTierExceeded { upgrade_url: String },

    #[error("provider throttled request {request_id}")]
    ProviderThrottled { request_id: RequestId },

    #[error("provider unavailable for request {request_id}")]
    ProviderUnavailable { request_id: RequestId },

    #[error("internal error for request {request_id:?}")]
    Internal { request_id: Option<RequestId> },
}

#[derive(Debug, Serialize)]
struct ValidationBody<'a> {
    success: bool,
    error: &'static str,
    details: &'a [FieldViolation],
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RateLimitBody<'a> {
    error: &'a str,
    retry_after: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UpgradeBody<'a> {
    success: bool,
    error: &'static str,
    upgrade_url: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FailureBody {
    pub success: bool,
    pub error: &'static str,
    pub request_id: Option<RequestId>,
}

impl FailureBody {
    pub(crate) fn new(error: &'static str, request_id: Option<RequestId>) -> Self {
        Self {
            success: false,
            error,
            request_id,
        }
    }
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::RateLimited { .. }
            | AppError::FreeTierExceeded { .. }
            | AppError::ProviderThrottled { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::ProviderUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match self {
            AppError::Validation(details) => (
                status,
                Json(ValidationBody {
                    success: false,
                    error: "Invalid input parameters",
                    details: &details,
                }),
            )
                .into_response(),
            AppError::RateLimited {
                message,
                retry_after,
            } => {
                let mut response = (
                    status,
                    Json(RateLimitBody {
                        error: &message,
                        retry_after,
                    }),
                )
                    .into_response();
                response
                    .headers_mut()
                    .insert(header::RETRY_AFTER, HeaderValue::from(retry_after));
                response
            }
            AppError::FreeTierExceeded { upgrade_url } => (
                status,
                Json(UpgradeBody {
                    success: false,
                    error: "Free tier limit reached. Upgrade to keep generating posts.",
                    upgrade_url: &upgrade_url,
                }),
            )
                .into_response(),
            AppError::ProviderThrottled { request_id } => (
                status,
                Json(FailureBody::new(
                    "The AI service is busy right now. Please wait a moment and try again.",
                    Some(request_id),
                )),
            )
                .into_response(),
            AppError::ProviderUnavailable { request_id } => (
                status,
                Json(FailureBody::new(
                    "Post generation is temporarily unavailable. Please try again later.",
                    Some(request_id),
                )),
            )
                .into_response(),
            AppError::Internal { request_id } => (
                status,
                Json(FailureBody::new(
                    "Failed to generate post. Please try again.",
                    request_id,
                )),
            )
                .into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let id = RequestId::new();
        assert_eq!(AppError::Validation(vec![]).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AppError::RateLimited {
                message: "slow down".into(),
                retry_after: 900
            }
            .status_code(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            AppError::ProviderThrottled { request_id: id }.status_code(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            AppError::ProviderUnavailable { request_id: id }.status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            AppError::Internal { request_id: Some(id) }.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_rate_limited_sets_retry_after_header() {
        let response = AppError::RateLimited {
            message: "Too many requests".into(),
            retry_after: 3600,
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "3600");
    }

    #[test]
    fn test_field_violation_serialization() {
        let violation = FieldViolation::body("topic", "Invalid topic selected", Some("x".into()));
        let json = serde_json::to_value(&violation).unwrap();
        assert_eq!(json["field"], "topic");
        assert_eq!(json["location"], "body");
        assert_eq!(json["value"], "x");
    }
}
