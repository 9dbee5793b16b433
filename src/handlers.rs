use axum::{extract::State, http::StatusCode, response::IntoResponse, Extension, Json};

use crate::error::AppError;
use crate::middleware::RequestContext;
use crate::models::GenerationRequest;
use crate::response::{GenerateResponse, HealthResponse, NotFoundResponse, StatusResponse};
use crate::state::AppState;

/// Liveness probe. Sits outside the admission pipeline.
pub async fn health_check() -> impl IntoResponse {
    Json(HealthResponse::healthy())
}

/// Static description of the service and its limits.
pub async fn api_status(State(state): State<AppState>) -> impl IntoResponse {
    Json(StatusResponse::operational(
        state.config.environment.as_str(),
        state.config.limits.clone(),
    ))
}

/// Generates a post for a request that already passed admission.
pub async fn generate_post(
    State(state): State<AppState>,
    Extension(context): Extension<RequestContext>,
    Extension(request): Extension<GenerationRequest>,
) -> Result<Json<GenerateResponse>, AppError> {
    let result = state.generator.generate(&request, &context).await?;
    Ok(Json(result.into()))
}

pub async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(NotFoundResponse::new()))
}
