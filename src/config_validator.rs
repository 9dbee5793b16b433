use axum::http::HeaderValue;

use crate::config::Config;
use crate::error::ConfigError;

/// Validates configuration objects for consistency and correctness
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validates the provider base URL
    pub fn validate_base_url(url: &str) -> Result<(), ConfigError> {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(ConfigError::Validation(format!(
                "Provider base URL must start with 'http://' or 'https://', got '{}'",
                url
            )));
        }

        Ok(())
    }

    /// Validates CORS origins; each must be a usable header value with a scheme
    pub fn validate_origins(origins: &[String]) -> Result<(), ConfigError> {
        for origin in origins {
            if HeaderValue::from_str(origin).is_err() {
                return Err(ConfigError::Validation(format!(
                    "Origin '{}' is not a valid header value",
                    origin
                )));
            }
            if !origin.starts_with("http://") && !origin.starts_with("https://") {
                return Err(ConfigError::Validation(format!(
                    "Origin '{}' must include the http:// or https:// scheme",
                    origin
                )));
            }
        }

        Ok(())
    }

    /// Validates the whole service configuration
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        if config.openai_api_key.trim().is_empty() {
            return Err(ConfigError::MissingApiKey);
        }

        if config.port == 0 {
            return Err(ConfigError::Validation(
                "Server port must be greater than 0".to_string(),
            ));
        }

        if config.provider_timeout.is_zero() {
            return Err(ConfigError::Validation(
                "Provider timeout must be greater than 0".to_string(),
            ));
        }

        if config.cleanup_interval.is_zero() {
            return Err(ConfigError::Validation(
                "Cleanup interval must be greater than 0".to_string(),
            ));
        }

        if config.environment.is_production() && config.trust_proxy_hops == 0 {
            tracing::warn!(
                "TRUST_PROXY_HOPS is 0 in production; behind a load balancer every client shares one rate limit"
            );
        }

        Self::validate_base_url(&config.openai_base_url)?;
        Self::validate_origins(&config.allowed_origins)?;
        config.limits.validate().map_err(ConfigError::Validation)?;

        Ok(())
    }
}
