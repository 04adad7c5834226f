//! End-to-end serving over a real listener.

use std::time::Duration;

use serde_json::Value;

mod common;

use common::{TestServer, HEALTH_DOCUMENT};

#[tokio::test]
async fn test_get_returns_configured_response() {
    let server = TestServer::start("endpoints.yaml", HEALTH_DOCUMENT).await;
    let client = reqwest::Client::new();

    let response = client.get(server.url("/health")).send().await.unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.headers()["content-type"], "text/plain");
    assert!(response.headers().contains_key("x-request-id"));
    assert_eq!(response.text().await.unwrap(), "ok");

    server.stop().await;
}

#[tokio::test]
async fn test_unsupported_method_is_405() {
    let server = TestServer::start("endpoints.yaml", HEALTH_DOCUMENT).await;
    let client = reqwest::Client::new();

    let response = client.post(server.url("/health")).send().await.unwrap();
    assert_eq!(response.status(), 405);
    assert_eq!(response.headers()["allow"], "GET");

    server.stop().await;
}

#[tokio::test]
async fn test_unknown_path_is_404() {
    let server = TestServer::start("endpoints.yaml", HEALTH_DOCUMENT).await;
    let client = reqwest::Client::new();

    let response = client.get(server.url("/missing")).send().await.unwrap();
    assert_eq!(response.status(), 404);
    assert!(response.text().await.unwrap().is_empty());

    server.stop().await;
}

#[tokio::test]
async fn test_info_lists_loaded_endpoints() {
    let server = TestServer::start("endpoints.yaml", HEALTH_DOCUMENT).await;
    let client = reqwest::Client::new();

    let info: Value = client
        .get(server.url("/_static/info"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(info["total"], 1);
    assert_eq!(info["endpoints"][0]["path"], "/health");
    assert_eq!(info["endpoints"][0]["methods"][0], "GET");

    server.stop().await;
}

#[tokio::test]
async fn test_legacy_entry_answers_every_method() {
    let document = r#"{"endpoints": [{"path": "/legacy", "status-code": 202, "body": "accepted"}]}"#;
    let server = TestServer::start("endpoints.json", document).await;
    let client = reqwest::Client::new();

    for method in [reqwest::Method::GET, reqwest::Method::DELETE, reqwest::Method::PATCH] {
        let response = client.request(method, server.url("/legacy")).send().await.unwrap();
        assert_eq!(response.status(), 202);
        assert_eq!(response.text().await.unwrap(), "accepted");
    }

    server.stop().await;
}

#[tokio::test]
async fn test_toml_document() {
    let document = r#"
[[endpoints]]
path = "/ping"

[[endpoints.methods]]
method = "PUT"
statusCode = 201
body = "pong"
"#;
    let server = TestServer::start("endpoints.toml", document).await;
    let client = reqwest::Client::new();

    let response = client.put(server.url("/ping")).send().await.unwrap();
    assert_eq!(response.status(), 201);
    assert_eq!(response.text().await.unwrap(), "pong");

    server.stop().await;
}

#[tokio::test]
async fn test_shutdown_stops_listener() {
    let server = TestServer::start("endpoints.yaml", HEALTH_DOCUMENT).await;
    let url = server.url("/health");
    server.stop().await;

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(1))
        .build()
        .unwrap();
    assert!(client.get(url).send().await.is_err());
}

#[tokio::test]
async fn test_bad_entry_at_startup_is_skipped() {
    let document = r#"[
        {"path": "/good", "methods": [{"method": "GET", "statusCode": 200, "body": "fine"}]},
        {"path": "/bad", "methods": [{"method": "GET"}]}
    ]"#;
    let server = TestServer::start("endpoints.json", document).await;
    let client = reqwest::Client::new();

    let response = client.get(server.url("/good")).send().await.unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.unwrap(), "fine");
    assert_eq!(client.get(server.url("/bad")).send().await.unwrap().status(), 404);

    server.stop().await;
}
