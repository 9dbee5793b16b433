use axum::body::Body;
use axum::http::{header, HeaderMap, Request, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use http_body_util::BodyExt;
use post_generator::config::Config;
use post_generator::provider::{
    CompletionProvider, CompletionRequest, OpenAiClient, OpenAiConfig, ProviderError, RetryPolicy,
    SamplingParams,
};
use post_generator::{create_app, AppState};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use tower::ServiceExt;

/// A throwaway chat-completions endpoint that always answers the same way.
struct FakeProvider {
    base_url: String,
    hits: Arc<AtomicUsize>,
    last_request: Arc<Mutex<Option<(HeaderMap, Value)>>>,
}

async fn spawn_provider(status: StatusCode, reply: Value, delay: Duration) -> FakeProvider {
    let hits = Arc::new(AtomicUsize::new(0));
    let last_request = Arc::new(Mutex::new(None));

    let counter = hits.clone();
    let recorded = last_request.clone();
    let app = Router::new().route(
        "/v1/chat/completions",
        post(move |headers: HeaderMap, Json(body): Json<Value>| {
            let counter = counter.clone();
            let recorded = recorded.clone();
            let reply = reply.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                *recorded.lock().unwrap() = Some((headers, body));
                tokio::time::sleep(delay).await;
                (status, Json(reply))
            }
        }),
    );

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    FakeProvider {
        base_url: format!("http://{addr}/v1"),
        hits,
        last_request,
    }
}

fn client(base_url: &str, timeout: Duration, max_retries: u32) -> OpenAiClient {
    OpenAiClient::new(OpenAiConfig {
        api_key: "sk-test".to_string(),
        base_url: base_url.to_string(),
        model: "gpt-3.5-turbo".to_string(),
        timeout,
        retry: RetryPolicy {
            max_retries,
            base_delay: Duration::from_millis(5),
        },
    })
    .unwrap()
}

fn completion() -> CompletionRequest {
    CompletionRequest {
        system: "You write posts.".to_string(),
        user: "Write about leadership.".to_string(),
        sampling: SamplingParams::default(),
    }
}

fn success_reply(content: &str) -> Value {
    json!({
        "choices": [{"index": 0, "message": {"role": "assistant", "content": content}}]
    })
}

#[tokio::test]
async fn test_successful_completion() {
    let fake = spawn_provider(StatusCode::OK, success_reply("Hello LinkedIn"), Duration::ZERO).await;
    let client = client(&fake.base_url, Duration::from_secs(5), 2);

    let content = client.complete(&completion()).await.unwrap();
    assert_eq!(content, "Hello LinkedIn");
    assert_eq!(fake.hits.load(Ordering::SeqCst), 1);

    let (headers, body) = fake.last_request.lock().unwrap().clone().unwrap();
    assert_eq!(headers[header::AUTHORIZATION], "Bearer sk-test");
    assert_eq!(body["model"], "gpt-3.5-turbo");
    assert_eq!(body["max_tokens"], 1000);
    assert_eq!(body["messages"][0]["role"], "system");
    assert_eq!(body["messages"][1]["content"], "Write about leadership.");
}

#[tokio::test]
async fn test_server_errors_are_retried() {
    let fake = spawn_provider(
        StatusCode::INTERNAL_SERVER_ERROR,
        json!({"error": {"message": "boom"}}),
        Duration::ZERO,
    )
    .await;
    let client = client(&fake.base_url, Duration::from_secs(5), 2);

    let err = client.complete(&completion()).await.unwrap_err();
    assert!(matches!(err, ProviderError::Api { status: 500, .. }));
    assert_eq!(fake.hits.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_timeouts_are_retried() {
    let fake = spawn_provider(
        StatusCode::OK,
        success_reply("too late"),
        Duration::from_millis(500),
    )
    .await;
    let client = client(&fake.base_url, Duration::from_millis(100), 1);

    let err = client.complete(&completion()).await.unwrap_err();
    assert!(matches!(err, ProviderError::Timeout));
    assert_eq!(fake.hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_quota_exhaustion_is_not_retried() {
    let fake = spawn_provider(
        StatusCode::TOO_MANY_REQUESTS,
        json!({"error": {"message": "quota", "type": "insufficient_quota", "code": "insufficient_quota"}}),
        Duration::ZERO,
    )
    .await;
    let client = client(&fake.base_url, Duration::from_secs(5), 2);

    let err = client.complete(&completion()).await.unwrap_err();
    assert!(matches!(err, ProviderError::QuotaExceeded(_)));
    assert_eq!(fake.hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_throttling_is_not_retried() {
    let fake = spawn_provider(
        StatusCode::TOO_MANY_REQUESTS,
        json!({"error": {"message": "Rate limit reached", "code": "rate_limit_exceeded"}}),
        Duration::ZERO,
    )
    .await;
    let client = client(&fake.base_url, Duration::from_secs(5), 2);

    let err = client.complete(&completion()).await.unwrap_err();
    assert!(matches!(err, ProviderError::RateLimited(_)));
    assert_eq!(fake.hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_empty_completion_is_an_error() {
    let fake = spawn_provider(StatusCode::OK, success_reply("   "), Duration::ZERO).await;
    let client = client(&fake.base_url, Duration::from_secs(5), 2);

    let err = client.complete(&completion()).await.unwrap_err();
    assert!(matches!(err, ProviderError::EmptyCompletion));
}

#[tokio::test]
async fn test_failing_provider_through_the_app() {
    let fake = spawn_provider(
        StatusCode::BAD_GATEWAY,
        json!({"error": {"message": "upstream exploded"}}),
        Duration::ZERO,
    )
    .await;

    let mut config = Config::new("sk-test");
    config.openai_base_url = fake.base_url.clone();
    config.provider_retry_base_delay = Duration::from_millis(5);
    let (state, _store) = AppState::from_config(config).unwrap();
    let app = create_app(state);

    let request = Request::builder()
        .method("POST")
        .uri("/api/generate-post")
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-forwarded-for", "192.0.2.7")
        .body(Body::from(
            json!({"topic": "leadership-trends", "audience": "executives"}).to_string(),
        ))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let request_id = response.headers()["x-request-id"].to_str().unwrap().to_string();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap();

    assert_eq!(body["success"], false);
    assert_eq!(body["requestId"], request_id);
    assert!(!body.to_string().contains("upstream exploded"));
    assert_eq!(fake.hits.load(Ordering::SeqCst), 3);
}
