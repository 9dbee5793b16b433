use crate::config::Config;
use crate::error::FailureBody;
use crate::handlers::{api_status, generate_post, health_check, not_found};
use crate::middleware::{
    current_request_id, general_limit, generation_limit, logging_middleware, request_context,
    speed_down, track_usage, validate_generation, REQUEST_ID_HEADER,
};
use crate::provider::ProviderError;
use crate::state::AppState;
use crate::store::MemoryStore;
use axum::extract::{Request, State};
use axum::http::{header, HeaderName, HeaderValue, Method, StatusCode};
use axum::middleware::{from_fn, from_fn_with_state, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use std::any::Any;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

const CONTENT_SECURITY_POLICY: &str = "default-src 'self'; \
     style-src 'self' 'unsafe-inline'; \
     script-src 'self'; \
     img-src 'self' data: https:; \
     connect-src 'self'; \
     font-src 'self'; \
     object-src 'none'; \
     media-src 'self'; \
     frame-src 'none'; \
     frame-ancestors 'self'";

const STRICT_TRANSPORT_SECURITY: &str = "max-age=15552000; includeSubDomains";

/// Builds the full router: health outside the admission pipeline, the API behind it.
pub fn create_app(state: AppState) -> Router {
    let generate = post(generate_post)
        .layer(from_fn_with_state(state.clone(), track_usage))
        .layer(from_fn(validate_generation))
        .layer(from_fn_with_state(state.clone(), generation_limit));

    let api = Router::new()
        .route("/generate-post", generate)
        .route("/status", get(api_status))
        .layer(from_fn_with_state(state.clone(), general_limit))
        .layer(from_fn_with_state(state.clone(), speed_down));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api)
        .fallback(not_found)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(from_fn_with_state(state.clone(), request_context))
                .layer(from_fn(logging_middleware))
                .layer(cors_layer(&state.config))
                .layer(from_fn_with_state(state.clone(), security_headers))
                .layer(CatchPanicLayer::custom(handle_panic)),
        )
        .with_state(state)
}

fn cors_layer(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
        .expose_headers([
            HeaderName::from_static(REQUEST_ID_HEADER),
            header::RETRY_AFTER,
        ])
}

/// Browser hardening headers, added unless a handler already set them.
async fn security_headers(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    let mut set = |name: HeaderName, value: &'static str| {
        headers
            .entry(name)
            .or_insert_with(|| HeaderValue::from_static(value));
    };
    set(header::CONTENT_SECURITY_POLICY, CONTENT_SECURITY_POLICY);
    set(header::X_FRAME_OPTIONS, "SAMEORIGIN");
    set(header::X_CONTENT_TYPE_OPTIONS, "nosniff");
    set(header::REFERRER_POLICY, "no-referrer");
    set(HeaderName::from_static("cross-origin-opener-policy"), "same-origin");
    set(HeaderName::from_static("cross-origin-resource-policy"), "same-origin");
    if state.config.environment.is_production() {
        set(header::STRICT_TRANSPORT_SECURITY, STRICT_TRANSPORT_SECURITY);
    }

    response
}

/// Last-resort handler: a panic anywhere below still yields a JSON error.
fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(message) = err.downcast_ref::<String>() {
        message.clone()
    } else if let Some(message) = err.downcast_ref::<&str>() {
        message.to_string()
    } else {
        "unknown panic payload".to_string()
    };

    let request_id = current_request_id();
    tracing::error!(
        request_id = %request_id.map(|id| id.to_string()).unwrap_or_else(|| "-".to_string()),
        panic = %detail,
        "Unhandled error while serving request"
    );

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(FailureBody::new(
            "Something went wrong. Please try again.",
            request_id,
        )),
    )
        .into_response()
}

pub struct Server {
    app: Router,
    port: u16,
    store: MemoryStore,
    cleanup_interval: Duration,
}

impl Server {
    pub fn new(config: Config) -> Result<Self, ProviderError> {
        let port = config.port;
        let cleanup_interval = config.cleanup_interval;
        let (state, store) = AppState::from_config(config)?;

        Ok(Self {
            app: create_app(state),
            port,
            store,
            cleanup_interval,
        })
    }

    pub async fn run(self) -> std::io::Result<()> {
        let listener = tokio::net::TcpListener::bind(("0.0.0.0", self.port)).await?;
        let sweeper = self.store.spawn_sweeper(self.cleanup_interval);

        tracing::info!("Post generator listening on port {}", self.port);
        tracing::info!("Health check available at /health");
        tracing::info!("Post generation available at POST /api/generate-post");

        // Run server with graceful shutdown
        axum::serve(
            listener,
            self.app
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await?;

        sweeper.abort();
        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown");
        },
    }
}
