//! Request-scoped middleware attached to the router.
//!
//! Request ids and client addresses are resolved once per request and stored
//! as request extensions so handlers and log lines see the same values. The
//! access-log span and panic handler plug into `tower-http`'s `TraceLayer` and
//! `CatchPanicLayer`.
use std::{
    any::Any,
    net::{IpAddr, SocketAddr},
    time::Duration,
};

use axum::{
    body::Body,
    extract::{ConnectInfo, Request},
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode},
    middleware::Next,
    response::Response,
};
use tracing::Span;

use super::http_handler::error_response;
use crate::tracing_setup::create_request_span;

pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

const TRUE_CLIENT_IP: HeaderName = HeaderName::from_static("true-client-ip");
const X_REAL_IP: HeaderName = HeaderName::from_static("x-real-ip");
const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");

/// Upper bound for every request, independent of body timeouts
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Longest caller-supplied request id that is propagated as-is
pub const MAX_REQUEST_ID_LEN: usize = 128;

/// Request id resolved for the current request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(pub String);

/// Client address after honouring proxy headers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientIp(pub IpAddr);

fn incoming_request_id(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(&X_REQUEST_ID)?.to_str().ok()?.trim();
    if value.is_empty() || value.len() > MAX_REQUEST_ID_LEN {
        return None;
    }
    Some(value.to_string())
}

/// Propagate the caller's `X-Request-ID` or generate a UUID v4, and echo it
/// on the response.
pub async fn request_id_middleware(mut req: Request, next: Next) -> Response {
    let request_id =
        incoming_request_id(req.headers()).unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    let header_value = HeaderValue::from_str(&request_id).ok();
    if let Some(value) = &header_value {
        req.headers_mut().insert(X_REQUEST_ID, value.clone());
    }
    req.extensions_mut().insert(RequestId(request_id));

    let mut response = next.run(req).await;

    if let Some(value) = header_value {
        response.headers_mut().insert(X_REQUEST_ID, value);
    }

    response
}

fn parse_ip(value: &HeaderValue) -> Option<IpAddr> {
    value.to_str().ok()?.trim().parse().ok()
}

/// Client address announced by a proxy, most specific header first
pub fn forwarded_client_ip(headers: &HeaderMap) -> Option<IpAddr> {
    if let Some(ip) = headers.get(&TRUE_CLIENT_IP).and_then(parse_ip) {
        return Some(ip);
    }
    if let Some(ip) = headers.get(&X_REAL_IP).and_then(parse_ip) {
        return Some(ip);
    }

    headers
        .get(&X_FORWARDED_FOR)?
        .to_str()
        .ok()?
        .split(',')
        .next()?
        .trim()
        .parse()
        .ok()
}

/// Resolve the client address and store it as a [`ClientIp`] extension.
///
/// Falls back to the socket peer when no proxy header is usable.
pub async fn real_ip_middleware(mut req: Request, next: Next) -> Response {
    let client_ip = forwarded_client_ip(req.headers()).or_else(|| {
        req.extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip())
    });

    if let Some(ip) = client_ip {
        Span::current().record("client.ip", tracing::field::display(ip));
        req.extensions_mut().insert(ClientIp(ip));
    }

    next.run(req).await
}

/// Span wrapping one request, used by `TraceLayer::make_span_with`
pub fn make_request_span(req: &Request) -> Span {
    let request_id = req
        .headers()
        .get(&X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    create_request_span(req.method().as_str(), req.uri().path(), request_id)
}

/// Access log line, used by `TraceLayer::on_response`
pub fn record_response(response: &Response<Body>, latency: Duration, span: &Span) {
    let status = response.status().as_u16();
    let duration_ms = latency.as_millis() as u64;

    span.record("http.status_code", status);
    span.record("duration_ms", duration_ms);

    tracing::info!(status, duration_ms, "Request completed");
}

/// Turn a handler panic into a 500 JSON response, used by `CatchPanicLayer::custom`
pub fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.as_str()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        *s
    } else {
        "unknown panic payload"
    };

    tracing::error!(panic = detail, "Handler panicked while serving request");

    error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
}

#[cfg(test)]
mod tests {
    use axum::{Extension, Router, middleware, routing::get};
    use tower::ServiceExt; // for oneshot

    use super::*;

    fn request_id_app() -> Router {
        Router::new()
            .route(
                "/",
                get(|Extension(RequestId(id)): Extension<RequestId>| async move { id }),
            )
            .layer(middleware::from_fn(request_id_middleware))
    }

    async fn body_string(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_request_id_is_generated() {
        let response = request_id_app()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        let header = response
            .headers()
            .get("X-Request-ID")
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        let parsed = uuid::Uuid::parse_str(&header).unwrap();
        assert_eq!(parsed.get_version_num(), 4);

        // the handler saw the same id
        assert_eq!(body_string(response).await, header);
    }

    #[tokio::test]
    async fn test_request_id_is_propagated() {
        let response = request_id_app()
            .oneshot(
                Request::builder()
                    .uri("/")
                    .header("X-Request-ID", "trace-abc-123")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(
            response.headers().get("X-Request-ID").unwrap(),
            "trace-abc-123"
        );
        assert_eq!(body_string(response).await, "trace-abc-123");
    }

    #[tokio::test]
    async fn test_oversized_request_id_is_replaced() {
        let oversized = "a".repeat(MAX_REQUEST_ID_LEN + 1);
        let response = request_id_app()
            .oneshot(
                Request::builder()
                    .uri("/")
                    .header("X-Request-ID", oversized.as_str())
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        let header = response.headers().get("X-Request-ID").unwrap();
        assert_ne!(header, oversized.as_str());
        assert!(uuid::Uuid::parse_str(header.to_str().unwrap()).is_ok());
    }

    #[test]
    fn test_forwarded_client_ip_precedence() {
        let mut headers = HeaderMap::new();
        assert_eq!(forwarded_client_ip(&headers), None);

        headers.insert(
            "X-Forwarded-For",
            HeaderValue::from_static("203.0.113.7, 10.0.0.1"),
        );
        assert_eq!(
            forwarded_client_ip(&headers),
            Some("203.0.113.7".parse().unwrap())
        );

        headers.insert("X-Real-IP", HeaderValue::from_static("198.51.100.2"));
        assert_eq!(
            forwarded_client_ip(&headers),
            Some("198.51.100.2".parse().unwrap())
        );

        headers.insert("True-Client-IP", HeaderValue::from_static("2001:db8::1"));
        assert_eq!(
            forwarded_client_ip(&headers),
            Some("2001:db8::1".parse().unwrap())
        );
    }

    #[test]
    fn test_unparseable_forwarded_header_is_skipped() {
        let mut headers = HeaderMap::new();
        headers.insert("X-Real-IP", HeaderValue::from_static("not-an-ip"));
        headers.insert("X-Forwarded-For", HeaderValue::from_static("192.0.2.9"));
        assert_eq!(
            forwarded_client_ip(&headers),
            Some("192.0.2.9".parse().unwrap())
        );
    }

    fn client_ip_app() -> Router {
        Router::new()
            .route(
                "/",
                get(|ip: Option<Extension<ClientIp>>| async move {
                    ip.map(|Extension(ClientIp(ip))| ip.to_string())
                        .unwrap_or_default()
                }),
            )
            .layer(middleware::from_fn(real_ip_middleware))
    }

    #[tokio::test]
    async fn test_real_ip_from_proxy_header() {
        let response = client_ip_app()
            .oneshot(
                Request::builder()
                    .uri("/")
                    .header("X-Real-IP", "198.51.100.2")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(body_string(response).await, "198.51.100.2");
    }

    #[tokio::test]
    async fn test_real_ip_falls_back_to_peer() {
        let peer: SocketAddr = "192.0.2.44:51000".parse().unwrap();
        let mut request = Request::builder().uri("/").body(Body::empty()).unwrap();
        request.extensions_mut().insert(ConnectInfo(peer));

        let response = client_ip_app().oneshot(request).await.unwrap();
        assert_eq!(body_string(response).await, "192.0.2.44");
    }

    #[tokio::test]
    async fn test_handle_panic_payloads() {
        let payloads: [Box<dyn Any + Send>; 3] = [
            Box::new("static str") as Box<dyn Any + Send>,
            Box::new(String::from("owned")) as Box<dyn Any + Send>,
            Box::new(42_u32) as Box<dyn Any + Send>,
        ];
        for payload in payloads {
            let response = handle_panic(payload);
            assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
            assert_eq!(
                body_string(response).await,
                r#"{"error":"Internal server error"}"#
            );
        }
    }
}
