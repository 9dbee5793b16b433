use envconfig::Envconfig;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;
use crate::rate_limit_config::AdmissionPolicies;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Test => "test",
            Environment::Production => "production",
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "test" => Ok(Environment::Test),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(format!("unknown environment '{other}'")),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw environment variables, before derived defaults are applied.
#[derive(Debug, Envconfig, Clone)]
pub struct EnvSettings {
    /// Provider API key
    #[envconfig(from = "OPENAI_API_KEY")]
    pub openai_api_key: String,

    #[envconfig(from = "OPENAI_BASE_URL", default = "https://api.openai.com/v1")]
    pub openai_base_url: String,

    #[envconfig(from = "OPENAI_MODEL", default = "gpt-3.5-turbo")]
    pub openai_model: String,

    #[envconfig(from = "PORT", default = "3000")]
    pub port: u16,

    #[envconfig(from = "APP_ENV")]
    pub app_env: Option<Environment>,

    /// Fallback for `APP_ENV`
    #[envconfig(from = "NODE_ENV")]
    pub node_env: Option<Environment>,

    #[envconfig(from = "TRUST_PROXY_HOPS", default = "1")]
    pub trust_proxy_hops: usize,

    #[envconfig(from = "PROVIDER_TIMEOUT_SECS", default = "30")]
    pub provider_timeout_secs: u64,

    #[envconfig(from = "PROVIDER_MAX_RETRIES", default = "2")]
    pub provider_max_retries: u32,

    #[envconfig(from = "UPGRADE_URL", default = "/upgrade")]
    pub upgrade_url: String,

    #[envconfig(from = "LOG_LEVEL", default = "info")]
    pub log_level: String,

    /// Comma-separated CORS origins
    #[envconfig(from = "ALLOWED_ORIGINS")]
    pub allowed_origins: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Provider API key
    pub openai_api_key: String,
    /// Provider API root, without the trailing `/chat/completions`
    pub openai_base_url: String,
    pub openai_model: String,
    pub port: u16,
    pub environment: Environment,
    /// Number of reverse proxies in front of the service whose
    /// `X-Forwarded-For` entries are trusted
    pub trust_proxy_hops: usize,
    /// CORS allow-list; empty means no cross-origin access
    pub allowed_origins: Vec<String>,
    pub provider_timeout: Duration,
    pub provider_max_retries: u32,
    pub provider_retry_base_delay: Duration,
    pub upgrade_url: String,
    pub log_level: String,
    /// How often expired rate limit windows are purged
    pub cleanup_interval: Duration,
    pub limits: AdmissionPolicies,
}

impl Config {
    /// Defaults for everything except the provider key.
    pub fn new(openai_api_key: impl Into<String>) -> Self {
        let environment = Environment::Development;
        let port = 3000;
        Self {
            openai_api_key: openai_api_key.into(),
            openai_base_url: "https://api.openai.com/v1".to_string(),
            openai_model: "gpt-3.5-turbo".to_string(),
            port,
            environment,
            trust_proxy_hops: 1,
            allowed_origins: default_origins(environment, port),
            provider_timeout: Duration::from_secs(30),
            provider_max_retries: 2,
            provider_retry_base_delay: Duration::from_millis(500),
            upgrade_url: "/upgrade".to_string(),
            log_level: "info".to_string(),
            cleanup_interval: Duration::from_secs(60),
            limits: AdmissionPolicies::default(),
        }
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::try_from(EnvSettings::init_from_env()?)
    }

    /// Overrides the port, keeping development origins in step with it.
    pub fn with_port(mut self, port: u16) -> Self {
        if self.allowed_origins == default_origins(self.environment, self.port) {
            self.allowed_origins = default_origins(self.environment, port);
        }
        self.port = port;
        self
    }
}

impl TryFrom<EnvSettings> for Config {
    type Error = ConfigError;

    fn try_from(env: EnvSettings) -> Result<Self, Self::Error> {
        let api_key = env.openai_api_key.trim();
        if api_key.is_empty() {
            return Err(ConfigError::MissingApiKey);
        }

        let environment = env.app_env.or(env.node_env).unwrap_or(Environment::Development);
        let allowed_origins = match env.allowed_origins {
            Some(origins) => origins
                .split(',')
                .map(str::trim)
                .filter(|origin| !origin.is_empty())
                .map(str::to_string)
                .collect(),
            None => default_origins(environment, env.port),
        };

        Ok(Self {
            openai_base_url: env.openai_base_url,
            openai_model: env.openai_model,
            port: env.port,
            environment,
            trust_proxy_hops: env.trust_proxy_hops,
            allowed_origins,
            provider_timeout: Duration::from_secs(env.provider_timeout_secs),
            provider_max_retries: env.provider_max_retries,
            upgrade_url: env.upgrade_url,
            log_level: env.log_level,
            ..Config::new(api_key)
        })
    }
}

/// Production origins must be configured explicitly.
fn default_origins(environment: Environment, port: u16) -> Vec<String> {
    if environment.is_production() {
        Vec::new()
    } else {
        vec![
            format!("http://localhost:{port}"),
            format!("http://127.0.0.1:{port}"),
        ]
    }
}
