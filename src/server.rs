use std::sync::Arc;

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};

use crate::config::Config;
use crate::error::RigspecError;
use crate::gemini::{self, GeminiClient, GenerateContentRequest};
use crate::retry;
use crate::types::{ComponentSpec, ErrorBody, GenerateRequest};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub client: GeminiClient,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            config: Arc::new(config),
            client: GeminiClient::new(),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/api/generate",
            post(generate).fallback(method_not_allowed),
        )
        .with_state(state)
}

async fn method_not_allowed() -> impl IntoResponse {
    (StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed")
}

/// The whole pipeline: validate input, check credential, build payload,
/// call with retry, extract and parse output, respond. Every failure is
/// terminal for the invocation; there is no partial or fallback content.
async fn generate(
    State(state): State<AppState>,
    payload: Result<Json<GenerateRequest>, JsonRejection>,
) -> Result<Json<Vec<ComponentSpec>>, RigspecError> {
    let Json(req) = payload
        .map_err(|e| RigspecError::InvalidInput(format!("request body: {e}")))?;

    let prompt = req
        .prompt
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .ok_or_else(|| {
            RigspecError::InvalidInput("prompt is required and must be non-empty".to_string())
        })?;

    // Credential check happens before any outbound call; a missing key is a
    // configuration fault, not a provider failure.
    let api_key = match state.config.api_key.as_deref() {
        Some(key) => key,
        None => {
            tracing::error!("GEMINI_API_KEY is not configured");
            return Err(RigspecError::MissingApiKey);
        }
    };

    let request = GenerateContentRequest::new(prompt, req.hardware_data.as_deref());

    let response =
        retry::generate_with_retry(&state.client, &state.config, api_key, &request).await?;

    let text = gemini::extract_text(response)?;
    let components = gemini::parse_components(&text)
        .inspect_err(|e| tracing::error!(error = %e, "generated text failed to parse"))?;

    Ok(Json(components))
}

impl IntoResponse for RigspecError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = ErrorBody {
            message: self.to_string(),
            error_code: self.error_code(),
            error_details: self.error_details(),
        };
        (status, Json(body)).into_response()
    }
}
