//! Turns a validated selection into a generated post.

use std::sync::Arc;

use crate::catalog::build_prompt;
use crate::error::AppError;
use crate::metadata::{hashtags_for, optimal_posting_time};
use crate::middleware::RequestContext;
use crate::models::{GenerationMetadata, GenerationRequest, GenerationResult};
use crate::provider::{CompletionProvider, CompletionRequest, ProviderError, SamplingParams};

/// Persona and house rules sent as the system message on every call.
pub const SYSTEM_INSTRUCTION: &str = "\
You are an expert LinkedIn content strategist who writes engaging, research-backed posts for working professionals. \
You understand behavioral psychology, current workplace trends, and how to turn research into practical advice.

House rules:
- Aim for 300-400 words unless the request sets a different length.
- Use 2-4 relevant emojis to improve readability; never more than one per paragraph.
- Open with a hook in the first line and keep paragraphs short.
- End with a single open question that invites readers to comment.
- Tone: professional but conversational, confident without hype.
- Do not include hashtags; they are added separately.";

pub struct PostGenerator {
    provider: Arc<dyn CompletionProvider>,
    sampling: SamplingParams,
}

impl PostGenerator {
    pub fn new(provider: Arc<dyn CompletionProvider>) -> Self {
        Self {
            provider,
            sampling: SamplingParams::default(),
        }
    }

    /// Builds the provider request for a selection.
    pub fn completion_request(&self, request: &GenerationRequest) -> CompletionRequest {
        CompletionRequest {
            system: SYSTEM_INSTRUCTION.to_string(),
            user: build_prompt(
                request.topic.as_str(),
                request.audience.as_str(),
                request.style.map(|style| style.as_str()),
            ),
            sampling: self.sampling,
        }
    }

    pub async fn generate(
        &self,
        request: &GenerationRequest,
        context: &RequestContext,
    ) -> Result<GenerationResult, AppError> {
        let completion = self.completion_request(request);

        let content = self
            .provider
            .complete(&completion)
            .await
            .map_err(|err| classify(err, context))?;

        let processing_time_ms = context.started_at.elapsed().as_millis() as u64;
        tracing::info!(
            request_id = %context.id,
            topic = %request.topic,
            audience = %request.audience,
            processing_time_ms,
            "Post generated"
        );

        Ok(GenerationResult {
            content,
            metadata: GenerationMetadata {
                topic: request.topic,
                audience: request.audience,
                style: request.style,
                optimal_time: optimal_posting_time(request.audience.as_str()),
                hashtags: hashtags_for(request.topic.as_str(), request.audience.as_str()),
                processing_time_ms,
                request_id: context.id,
            },
        })
    }
}

/// Maps a provider failure to what the caller sees. The raw error is only logged.
fn classify(err: ProviderError, context: &RequestContext) -> AppError {
    tracing::error!(
        request_id = %context.id,
        client_ip = %context.client_ip,
        error = %err,
        "Provider call failed"
    );

    let request_id = context.id;
    match err {
        ProviderError::RateLimited(_) => AppError::ProviderThrottled { request_id },
        ProviderError::QuotaExceeded(_) => AppError::ProviderUnavailable { request_id },
        _ => AppError::Internal {
            request_id: Some(request_id),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::RequestId;
    use crate::models::{Audience, Style, Topic};
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Instant;

    struct Recording {
        seen: Mutex<Vec<CompletionRequest>>,
        reply: fn() -> Result<String, ProviderError>,
    }

    #[async_trait]
    impl CompletionProvider for Recording {
        async fn complete(&self, request: &CompletionRequest) -> Result<String, ProviderError> {
            self.seen.lock().unwrap().push(request.clone());
            (self.reply)()
        }
    }

    fn generator(reply: fn() -> Result<String, ProviderError>) -> (PostGenerator, Arc<Recording>) {
        let provider = Arc::new(Recording {
            seen: Mutex::new(Vec::new()),
            reply,
        });
        (PostGenerator::new(provider.clone()), provider)
    }

    fn context() -> RequestContext {
        RequestContext {
            id: RequestId::new(),
            client_ip: "127.0.0.1".to_string(),
            started_at: Instant::now(),
        }
    }

    fn request() -> GenerationRequest {
        GenerationRequest {
            topic: Topic::BehavioralPsychology,
            audience: Audience::HrProfessionals,
            style: Some(Style::Professional),
        }
    }

    #[tokio::test]
    async fn test_generate_builds_result() {
        let (generator, provider) = generator(|| Ok("A great post".to_string()));
        let ctx = context();

        let result = generator.generate(&request(), &ctx).await.unwrap();

        assert_eq!(result.content, "A great post");
        assert_eq!(result.metadata.request_id, ctx.id);
        assert_eq!(result.metadata.optimal_time, "Wednesday 9:00 AM EST");
        assert_eq!(result.metadata.hashtags.len(), 7);
        assert_eq!(result.metadata.style, Some(Style::Professional));

        let seen = provider.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].system, SYSTEM_INSTRUCTION);
        assert!(seen[0].user.contains("HR professionals"));
        assert_eq!(seen[0].sampling, SamplingParams::default());
    }

    #[test]
    fn test_length_rule_matches_catalog() {
        assert!(SYSTEM_INSTRUCTION.contains("300-400 words"));

        let fallback = build_prompt("anything", "anyone", None);
        assert!(fallback.contains("300-400 words"));
        for topic in Topic::ALL {
            for audience in Audience::ALL {
                if let Some(template) = crate::catalog::template_for(topic.as_str(), audience.as_str()) {
                    if template.contains(" words") {
                        assert!(template.contains("300-400 words"), "{topic} / {audience}");
                    }
                }
            }
        }
    }

    #[tokio::test]
    async fn test_provider_throttling_maps_to_429() {
        let (generator, _) = generator(|| Err(ProviderError::RateLimited("slow".into())));
        let ctx = context();
        let err = generator.generate(&request(), &ctx).await.unwrap_err();
        assert!(matches!(err, AppError::ProviderThrottled { request_id } if request_id == ctx.id));
    }

    #[tokio::test]
    async fn test_quota_exhaustion_maps_to_503() {
        let (generator, _) = generator(|| Err(ProviderError::QuotaExceeded("quota".into())));
        let err = generator.generate(&request(), &context()).await.unwrap_err();
        assert!(matches!(err, AppError::ProviderUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_other_failures_map_to_internal() {
        let (generator, _) = generator(|| Err(ProviderError::Timeout));
        let ctx = context();
        let err = generator.generate(&request(), &ctx).await.unwrap_err();
        assert!(matches!(err, AppError::Internal { request_id: Some(id) } if id == ctx.id));
    }
}
