use std::sync::Arc;

use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::{
    api::{EchoMessage, ErrorResponse, HealthResponse, OPENAPI_SPEC},
    ports::echo::Echo,
};

const APPLICATION_JSON: &str = "application/json";
const APPLICATION_YAML: &str = "application/yaml";

/// Body used when even the error response cannot be encoded
const FALLBACK_ERROR_BODY: &str = r#"{"error":"Internal server error"}"#;

/// Shared, immutable state handed to every handler
#[derive(Clone)]
pub struct AppState {
    echo: Arc<dyn Echo>,
}

impl AppState {
    pub fn new(echo: Arc<dyn Echo>) -> Self {
        Self { echo }
    }
}

/// Failures surfaced to API callers as JSON error bodies
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Invalid JSON")]
    InvalidJson(#[source] serde_json::Error),

    #[error("Missing required fields: message and author")]
    MissingFields,

    #[error("Internal server error")]
    Encode(#[source] serde_json::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidJson(_) | ApiError::MissingFields => StatusCode::BAD_REQUEST,
            ApiError::Encode(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::InvalidJson(e) => {
                tracing::warn!(error = %e, "Failed to decode request body");
            }
            ApiError::MissingFields => {
                tracing::warn!("Missing required fields in request");
            }
            ApiError::Encode(e) => {
                tracing::error!(error = %e, "Failed to encode response");
            }
        }

        error_response(self.status(), &self.to_string())
    }
}

/// Serialize `value` as a JSON response, degrading to a 500 if encoding fails
pub fn json_response<T: Serialize>(status: StatusCode, value: &T) -> Response {
    match serde_json::to_vec(value) {
        Ok(body) => with_content_type(status, APPLICATION_JSON, Body::from(body)),
        Err(e) => ApiError::Encode(e).into_response(),
    }
}

/// A JSON `{"error": message}` response
pub fn error_response(status: StatusCode, message: &str) -> Response {
    match serde_json::to_vec(&ErrorResponse::new(message)) {
        Ok(body) => with_content_type(status, APPLICATION_JSON, Body::from(body)),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode error response");
            with_content_type(
                StatusCode::INTERNAL_SERVER_ERROR,
                APPLICATION_JSON,
                Body::from(FALLBACK_ERROR_BODY),
            )
        }
    }
}

fn with_content_type(status: StatusCode, content_type: &'static str, body: Body) -> Response {
    let mut response = Response::new(body);
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    response
}

/// Decode and validate an echo request body
pub fn parse_echo_request(body: &[u8]) -> Result<EchoMessage, ApiError> {
    let request: EchoMessage = serde_json::from_slice(body).map_err(ApiError::InvalidJson)?;

    if !request.is_complete() {
        return Err(ApiError::MissingFields);
    }

    Ok(request)
}

/// `POST /v1/echo`
///
/// The body is decoded regardless of `Content-Type`.
pub async fn post_echo(State(state): State<AppState>, body: Bytes) -> Response {
    match parse_echo_request(&body) {
        Ok(request) => {
            let response = state.echo.echo(request);
            json_response(StatusCode::OK, &response)
        }
        Err(e) => e.into_response(),
    }
}

/// `GET /healthz`
pub async fn get_health() -> Response {
    json_response(StatusCode::OK, &HealthResponse::ok())
}

/// `GET /readyz`
///
/// No dependency checks are performed, readiness mirrors liveness.
pub async fn get_ready() -> Response {
    json_response(StatusCode::OK, &HealthResponse::ready())
}

/// `GET /api/openapi.yaml`
pub async fn get_openapi() -> Response {
    with_content_type(StatusCode::OK, APPLICATION_YAML, Body::from(OPENAPI_SPEC))
}
