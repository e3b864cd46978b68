mod common;

use reqwest::{StatusCode, header::CONTENT_TYPE};
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;

use common::{start_app, url};

#[tokio::test]
async fn test_echo_end_to_end() {
    let app = start_app().await;
    let client = reqwest::Client::new();

    let response = client
        .post(url(&app, "/v1/echo"))
        .json(&json!({"message": "Hello, World!", "author": "Alice"}))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(CONTENT_TYPE).unwrap(),
        "application/json"
    );
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({"message": "Hello, World!", "author": "Alice"}));

    app.run_until(cancelled()).await.unwrap();
}

#[tokio::test]
async fn test_echo_validation_end_to_end() {
    let app = start_app().await;
    let client = reqwest::Client::new();

    let cases = [
        ("\"invalid json\"", "Invalid JSON"),
        (r#"{"author":"Alice"}"#, "Missing required fields: message and author"),
        (r#"{"message":"","author":""}"#, "Missing required fields: message and author"),
    ];

    for (body, expected) in cases {
        let response = client
            .post(url(&app, "/v1/echo"))
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body: {body}");
        let error: Value = response.json().await.unwrap();
        assert_eq!(error, json!({"error": expected}), "body: {body}");
    }

    app.run_until(cancelled()).await.unwrap();
}

#[tokio::test]
async fn test_probes_end_to_end() {
    let app = start_app().await;

    let health = reqwest::get(url(&app, "/healthz")).await.unwrap();
    assert_eq!(health.status(), StatusCode::OK);
    assert_eq!(health.text().await.unwrap(), r#"{"status":"ok"}"#);

    let ready = reqwest::get(url(&app, "/readyz")).await.unwrap();
    assert_eq!(ready.status(), StatusCode::OK);
    assert_eq!(ready.text().await.unwrap(), r#"{"status":"ready"}"#);

    app.run_until(cancelled()).await.unwrap();
}

#[tokio::test]
async fn test_openapi_document_end_to_end() {
    let app = start_app().await;

    let response = reqwest::get(url(&app, "/api/openapi.yaml")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(CONTENT_TYPE).unwrap(),
        "application/yaml"
    );
    assert_eq!(
        response.text().await.unwrap(),
        hello_echo::api::OPENAPI_SPEC
    );

    app.run_until(cancelled()).await.unwrap();
}

#[tokio::test]
async fn test_request_id_end_to_end() {
    let app = start_app().await;
    let client = reqwest::Client::new();

    let supplied = client
        .get(url(&app, "/healthz"))
        .header("X-Request-ID", "e2e-request-1")
        .send()
        .await
        .unwrap();
    assert_eq!(
        supplied.headers().get("x-request-id").unwrap(),
        "e2e-request-1"
    );

    let generated = client.get(url(&app, "/healthz")).send().await.unwrap();
    let id = generated
        .headers()
        .get("x-request-id")
        .unwrap()
        .to_str()
        .unwrap();
    assert!(uuid::Uuid::parse_str(id).is_ok());

    app.run_until(cancelled()).await.unwrap();
}

#[tokio::test]
async fn test_health_command_probe() {
    let app = start_app().await;

    let mut server = common::test_config().server;
    server.port = app.local_addr().port();
    assert!(hello_echo::check_health(&server).await.is_ok());

    app.run_until(cancelled()).await.unwrap();
}

fn cancelled() -> CancellationToken {
    let token = CancellationToken::new();
    token.cancel();
    token
}
