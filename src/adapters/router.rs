use std::sync::Arc;

use axum::{
    Router,
    http::StatusCode,
    middleware,
    routing::{get, post},
};
use tower_http::{
    catch_panic::CatchPanicLayer,
    timeout::{RequestBodyTimeoutLayer, ResponseBodyTimeoutLayer, TimeoutLayer},
    trace::TraceLayer,
};

use super::{
    http_handler::{AppState, get_health, get_openapi, get_ready, post_echo},
    middleware::{
        REQUEST_TIMEOUT, handle_panic, make_request_span, real_ip_middleware, record_response,
        request_id_middleware,
    },
};
use crate::{config::models::ServerConfig, ports::echo::Echo};

/// Build the application router with its full middleware stack.
///
/// Layers are listed innermost first; a request passes through request id,
/// access log, panic recovery, real IP and the timeouts before reaching a
/// handler.
pub fn build_router(echo: Arc<dyn Echo>, server: &ServerConfig) -> Router {
    Router::new()
        .route("/healthz", get(get_health))
        .route("/readyz", get(get_ready))
        .route("/v1/echo", post(post_echo))
        .route("/api/openapi.yaml", get(get_openapi))
        .with_state(AppState::new(echo))
        .layer(RequestBodyTimeoutLayer::new(server.read_timeout))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::GATEWAY_TIMEOUT,
            REQUEST_TIMEOUT,
        ))
        .layer(ResponseBodyTimeoutLayer::new(server.write_timeout))
        .layer(middleware::from_fn(real_ip_middleware))
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(make_request_span)
                .on_response(record_response),
        )
        .layer(middleware::from_fn(request_id_middleware))
}
