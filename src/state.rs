use std::sync::Arc;

use crate::config::Config;
use crate::generator::PostGenerator;
use crate::key_generator::{ClientIpResolver, KeyStrategy};
use crate::provider::{CompletionProvider, OpenAiClient, OpenAiConfig, ProviderError, RetryPolicy};
use crate::rate_limiter::{RateLimiter, SpeedLimiter};
use crate::store::{MemoryStore, RateLimitStore};
use crate::usage::UsageTracker;

/// The admission stages, built once from configuration.
pub struct AdmissionPipeline {
    pub resolver: ClientIpResolver,
    pub speed: SpeedLimiter,
    pub general: RateLimiter,
    pub post_generation: RateLimiter,
    pub strict: RateLimiter,
    pub usage: UsageTracker,
}

impl AdmissionPipeline {
    pub fn new(config: &Config, store: Arc<dyn RateLimitStore>) -> Self {
        let limits = &config.limits;
        Self {
            resolver: ClientIpResolver::new(config.trust_proxy_hops),
            speed: SpeedLimiter::new(limits.speed_down.clone(), store.clone()),
            general: RateLimiter::new(
                "general",
                limits.general.clone(),
                KeyStrategy::ClientIp,
                store.clone(),
            ),
            post_generation: RateLimiter::new(
                "generate",
                limits.post_generation.clone(),
                KeyStrategy::ClientIpAndPath,
                store.clone(),
            ),
            strict: RateLimiter::new(
                "strict",
                limits.strict.clone(),
                KeyStrategy::ClientIpAndPath,
                store,
            ),
            usage: UsageTracker::new(config.upgrade_url.clone()),
        }
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub admission: Arc<AdmissionPipeline>,
    pub generator: Arc<PostGenerator>,
}

impl AppState {
    pub fn new(
        config: Config,
        provider: Arc<dyn CompletionProvider>,
        store: Arc<dyn RateLimitStore>,
    ) -> Self {
        let admission = AdmissionPipeline::new(&config, store);
        Self {
            config: Arc::new(config),
            admission: Arc::new(admission),
            generator: Arc::new(PostGenerator::new(provider)),
        }
    }

    /// Wires the OpenAI client and an in-memory store. The store is returned so
    /// the caller can run its sweeper.
    pub fn from_config(config: Config) -> Result<(Self, MemoryStore), ProviderError> {
        let client = OpenAiClient::new(OpenAiConfig {
            api_key: config.openai_api_key.clone(),
            base_url: config.openai_base_url.clone(),
            model: config.openai_model.clone(),
            timeout: config.provider_timeout,
            retry: RetryPolicy {
                max_retries: config.provider_max_retries,
                base_delay: config.provider_retry_base_delay,
            },
        })?;

        let store = MemoryStore::new();
        let state = Self::new(config, Arc::new(client), Arc::new(store.clone()));
        Ok((state, store))
    }
}
