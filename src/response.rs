use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::{GenerationMetadata, GenerationResult};
use crate::rate_limit_config::AdmissionPolicies;

/// Every route the service answers, reported by the 404 fallback.
pub const AVAILABLE_ENDPOINTS: [&str; 3] = [
    "GET /health",
    "GET /api/status",
    "POST /api/generate-post",
];

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub success: bool,
    pub content: String,
    pub metadata: GenerationMetadata,
}

impl From<GenerationResult> for GenerateResponse {
    fn from(result: GenerationResult) -> Self {
        Self {
            success: true,
            content: result.content,
            metadata: result.metadata,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
}

impl HealthResponse {
    pub fn healthy() -> Self {
        Self {
            status: "healthy",
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
    pub environment: &'static str,
    pub version: &'static str,
    pub limits: AdmissionPolicies,
    pub timestamp: DateTime<Utc>,
}

impl StatusResponse {
    pub fn operational(environment: &'static str, limits: AdmissionPolicies) -> Self {
        Self {
            status: "operational",
            environment,
            version: env!("CARGO_PKG_VERSION"),
            limits,
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotFoundResponse {
    pub success: bool,
    pub error: &'static str,
    pub available_endpoints: &'static [&'static str],
}

impl NotFoundResponse {
    pub fn new() -> Self {
        Self {
            success: false,
            error: "Endpoint not found",
            available_endpoints: &AVAILABLE_ENDPOINTS,
        }
    }
}

impl Default for NotFoundResponse {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_serialization() {
        let json = serde_json::to_value(HealthResponse::healthy()).unwrap();
        assert_eq!(json["status"], "healthy");
        assert!(json["timestamp"].as_str().unwrap().contains('T'));
    }

    #[test]
    fn test_not_found_serialization() {
        let json = serde_json::to_value(NotFoundResponse::new()).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["availableEndpoints"].as_array().unwrap().len(), 3);
    }
}
