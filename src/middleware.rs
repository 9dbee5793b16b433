//! Request context, logging, and the admission pipeline stages.
//!
//! Stages run in this order for the generation endpoint: [`speed_down`],
//! [`general_limit`], [`generation_limit`], [`validate_generation`],
//! [`track_usage`]. Each may short-circuit with an [`AppError`].

use axum::body::Body;
use axum::extract::{ConnectInfo, OriginalUri, Request, State};
use axum::http::{HeaderName, HeaderValue};
use axum::middleware::Next;
use axum::response::Response;
use axum::Extension;
use serde::Serialize;
use std::fmt;
use std::net::SocketAddr;
use std::time::Instant;
use tracing::info;
use uuid::Uuid;

use crate::error::{AppError, FieldViolation, StoreError};
use crate::rate_limiter::{Decision, RateLimiter};
use crate::state::AppState;
use crate::validation::GenerationPayload;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Largest generation body accepted.
pub const MAX_BODY_BYTES: usize = 10 * 1024;

/// Correlates logs, responses and support requests for one HTTP call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct RequestId(Uuid);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

tokio::task_local! {
    static CURRENT_REQUEST_ID: RequestId;
}

/// Id of the request being served on this task, if any.
pub fn current_request_id() -> Option<RequestId> {
    CURRENT_REQUEST_ID.try_with(|id| *id).ok()
}

/// Set once at entry and carried in request extensions.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub id: RequestId,
    pub client_ip: String,
    pub started_at: Instant,
}

/// Assigns the request id, resolves the client identity and echoes the id back.
pub async fn request_context(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let client_ip = state.admission.resolver.resolve(request.headers(), peer);
    let id = RequestId::new();

    request.extensions_mut().insert(RequestContext {
        id,
        client_ip,
        started_at: Instant::now(),
    });

    let mut response = CURRENT_REQUEST_ID.scope(id, next.run(request)).await;
    if let Ok(value) = HeaderValue::from_str(&id.to_string()) {
        response
            .headers_mut()
            .insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
    }
    response
}

/// Logging middleware for request/response tracking
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let context = request.extensions().get::<RequestContext>().cloned();
    let (request_id, client_ip) = match &context {
        Some(ctx) => (ctx.id.to_string(), ctx.client_ip.clone()),
        None => ("-".to_string(), "unknown".to_string()),
    };

    info!(
        target: "post_generator::middleware",
        method = %method,
        uri = %uri,
        client_ip = %client_ip,
        request_id = %request_id,
        "Incoming request"
    );

    let response = next.run(request).await;

    info!(
        target: "post_generator::middleware",
        method = %method,
        uri = %uri,
        status = %response.status(),
        request_id = %request_id,
        elapsed_ms = context.map(|ctx| ctx.started_at.elapsed().as_millis() as u64).unwrap_or_default(),
        "Request completed"
    );

    response
}

fn store_failure(err: StoreError, context: &RequestContext) -> AppError {
    tracing::error!(request_id = %context.id, error = %err, "Rate limit store failure");
    AppError::Internal {
        request_id: Some(context.id),
    }
}

fn original_path(request: &Request) -> String {
    request
        .extensions()
        .get::<OriginalUri>()
        .map(|uri| uri.path().to_string())
        .unwrap_or_else(|| request.uri().path().to_string())
}

/// Adds progressive delay for clients that keep calling. Never rejects.
pub async fn speed_down(
    State(state): State<AppState>,
    Extension(context): Extension<RequestContext>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let delay = state
        .admission
        .speed
        .delay_for(&context.client_ip)
        .await
        .map_err(|err| store_failure(err, &context))?;

    if !delay.is_zero() {
        tracing::debug!(
            request_id = %context.id,
            client_ip = %context.client_ip,
            delay_ms = delay.as_millis() as u64,
            "Slowing down client"
        );
        tokio::time::sleep(delay).await;
    }

    Ok(next.run(request).await)
}

async fn enforce(
    limiter: &RateLimiter,
    context: &RequestContext,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let path = original_path(&request);
    let decision = limiter
        .check(&context.client_ip, &path)
        .await
        .map_err(|err| store_failure(err, context))?;

    match decision {
        Decision::Allowed {
            limit,
            remaining,
            reset_after,
        } => {
            let mut response = next.run(request).await;
            // the innermost limiter's numbers win
            let headers = response.headers_mut();
            headers
                .entry("ratelimit-limit")
                .or_insert_with(|| HeaderValue::from(limit));
            headers
                .entry("ratelimit-remaining")
                .or_insert_with(|| HeaderValue::from(remaining));
            headers
                .entry("ratelimit-reset")
                .or_insert_with(|| HeaderValue::from(reset_after.as_secs()));
            Ok(response)
        }
        Decision::Rejected { retry_after } => {
            tracing::warn!(
                limiter = limiter.name(),
                request_id = %context.id,
                client_ip = %context.client_ip,
                path = %path,
                retry_after,
                "Rate limit exceeded"
            );
            Err(AppError::RateLimited {
                message: limiter.policy().message.clone(),
                retry_after,
            })
        }
    }
}

/// API-wide request cap.
pub async fn general_limit(
    State(state): State<AppState>,
    Extension(context): Extension<RequestContext>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    enforce(&state.admission.general, &context, request, next).await
}

/// Cap for the generation endpoint.
pub async fn generation_limit(
    State(state): State<AppState>,
    Extension(context): Extension<RequestContext>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    enforce(&state.admission.post_generation, &context, request, next).await
}

/// Three-per-minute cap for endpoints with a higher abuse risk.
pub async fn strict_limit(
    State(state): State<AppState>,
    Extension(context): Extension<RequestContext>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    enforce(&state.admission.strict, &context, request, next).await
}

/// Checks the generation body and hands a typed request to the handler.
pub async fn validate_generation(request: Request, next: Next) -> Result<Response, AppError> {
    let (parts, body) = request.into_parts();
    let bytes = axum::body::to_bytes(body, MAX_BODY_BYTES).await.map_err(|_| {
        AppError::Validation(vec![FieldViolation::body(
            "body",
            format!("Request body must be a JSON object of at most {MAX_BODY_BYTES} bytes"),
            None,
        )])
    })?;

    let validated = GenerationPayload::from_slice(&bytes)?.into_request()?;

    let mut request = Request::from_parts(parts, Body::from(bytes));
    request.extensions_mut().insert(validated);
    Ok(next.run(request).await)
}

/// Records usage and applies the free-tier check.
pub async fn track_usage(
    State(state): State<AppState>,
    Extension(context): Extension<RequestContext>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let usage = &state.admission.usage;
    let record = usage.track(&context, &request);

    if !usage.within_free_tier(&record) {
        return Err(AppError::FreeTierExceeded {
            upgrade_url: usage.upgrade_url().to_string(),
        });
    }

    request.extensions_mut().insert(record);
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::provider::{CompletionProvider, CompletionRequest, ProviderError};
    use crate::store::MemoryStore;
    use async_trait::async_trait;
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::Router;
    use std::sync::Arc;
    use tower::ServiceExt;

    struct Unused;

    #[async_trait]
    impl CompletionProvider for Unused {
        async fn complete(&self, _request: &CompletionRequest) -> Result<String, ProviderError> {
            Err(ProviderError::EmptyCompletion)
        }
    }

    fn state() -> AppState {
        AppState::new(
            Config::new("test-key"),
            Arc::new(Unused),
            Arc::new(MemoryStore::new()),
        )
    }

    fn strict_router(state: AppState) -> Router {
        Router::new()
            .route("/sensitive", get(|| async { "ok" }))
            .layer(axum::middleware::from_fn_with_state(state.clone(), strict_limit))
            .layer(axum::middleware::from_fn_with_state(state.clone(), request_context))
            .with_state(state)
    }

    fn request() -> Request {
        Request::builder()
            .uri("/sensitive")
            .header("x-forwarded-for", "198.51.100.4")
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn test_request_id_header_is_set() {
        let response = strict_router(state()).oneshot(request()).await.unwrap();
        let id = response.headers().get(REQUEST_ID_HEADER).unwrap().to_str().unwrap();
        assert!(Uuid::parse_str(id).is_ok());
    }

    #[tokio::test]
    async fn test_strict_limiter_rejects_fourth_request() {
        let app = strict_router(state());

        for _ in 0..3 {
            let response = app.clone().oneshot(request()).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            assert!(response.headers().contains_key("ratelimit-remaining"));
        }

        let response = app.oneshot(request()).await.unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()["retry-after"], "60");
    }

    #[tokio::test]
    async fn test_current_request_id_outside_scope() {
        assert!(current_request_id().is_none());
        let id = RequestId::new();
        let seen = CURRENT_REQUEST_ID.scope(id, async { current_request_id() }).await;
        assert_eq!(seen, Some(id));
    }
}
