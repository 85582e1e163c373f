//! HTTP contract tests driven through the router with `oneshot`

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::{config, dispatcher, under, RecordingRunner, ScriptedModel};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;
use task_dispatch::core::config::NoMatchPolicy;
use task_dispatch::server::build_router;
use tempfile::TempDir;
use tower::ServiceExt;

fn app(root: &Path, model: ScriptedModel) -> axum::Router {
    let d = dispatcher(
        config(root, NoMatchPolicy::Reject),
        Arc::new(model),
        Arc::new(RecordingRunner::default()),
    );
    build_router(Arc::new(d))
}

async fn send(app: axum::Router, method: &str, uri: &str) -> (StatusCode, Vec<u8>) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes().to_vec();
    (status, body)
}

fn detail(body: &[u8]) -> String {
    let value: Value = serde_json::from_slice(body).unwrap();
    value["detail"].as_str().unwrap().to_string()
}

/// Minimal query-string escaping for the characters these tests use
fn encode(s: &str) -> String {
    s.replace('%', "%25")
        .replace(' ', "%20")
        .replace(',', "%2C")
        .replace('/', "%2F")
}

#[tokio::test]
async fn test_health() {
    let dir = TempDir::new().unwrap();
    let (status, body) = send(app(dir.path(), ScriptedModel::default()), "GET", "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"ok");
}

#[tokio::test]
async fn test_run_success_envelope() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    std::fs::write(root.join("dates.txt"), "2024-03-14\n2024-03-21\n").unwrap();
    let model = ScriptedModel::selecting(
        "count_days",
        json!({"days": "Thu", "input": under(root, "dates.txt"), "output": under(root, "out.txt")}),
    );

    let uri = format!("/run?task={}", encode("Count the Thursdays in the dates file"));
    let (status, body) = send(app(root, model), "POST", &uri).await;

    assert_eq!(status, StatusCode::OK);
    let value: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(value["message"], "Task completed successfully");
    assert!(value["response"].as_str().unwrap().contains("out.txt"));
    assert_eq!(std::fs::read_to_string(root.join("out.txt")).unwrap(), "2");
}

#[tokio::test]
async fn test_run_without_task_is_400() {
    let dir = TempDir::new().unwrap();
    let (status, body) = send(app(dir.path(), ScriptedModel::default()), "POST", "/run").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(detail(&body), "Missing 'task' parameter");

    let (status, _) = send(app(dir.path(), ScriptedModel::default()), "POST", "/run?task=").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_run_missing_parameter_detail() {
    let dir = TempDir::new().unwrap();
    let model = ScriptedModel::selecting("recent_logs", json!({"count": 3}));
    let uri = format!("/run?task={}", encode("Write the first line of the newest logs"));
    let (status, body) = send(app(dir.path(), model), "POST", &uri).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(detail(&body), "Missing required parameter: input, output");
}

#[tokio::test]
async fn test_run_missing_input_file_is_404() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    let model = ScriptedModel::selecting(
        "extract_email",
        json!({"input": under(root, "email.txt"), "output": under(root, "sender.txt")}),
    );
    let uri = format!("/run?task={}", encode("Find the sender of the email"));
    let (status, body) = send(app(root, model), "POST", &uri).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(detail(&body).contains("email.txt"));
}

#[tokio::test]
async fn test_read_file_and_errors() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    std::fs::write(root.join("notes.txt"), "hello\n").unwrap();
    std::fs::create_dir(root.join("sub")).unwrap();

    let uri = format!("/read?path={}", encode(&under(root, "notes.txt")));
    let (status, body) = send(app(root, ScriptedModel::default()), "GET", &uri).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"hello\n");

    let uri = format!("/read?path={}", encode(&under(root, "missing.txt")));
    let (status, _) = send(app(root, ScriptedModel::default()), "GET", &uri).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let uri = format!("/read?path={}", encode(&under(root, "sub")));
    let (status, _) = send(app(root, ScriptedModel::default()), "GET", &uri).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(app(root, ScriptedModel::default()), "GET", "/read").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let uri = format!("/read?path={}", encode("/etc/passwd"));
    let (status, body) = send(app(root, ScriptedModel::default()), "GET", &uri).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(detail(&body).contains("not allowed"));
}

#[tokio::test]
async fn test_files_listing_sorted() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    std::fs::write(root.join("b.txt"), "12345").unwrap();
    std::fs::write(root.join("a.txt"), "1").unwrap();
    std::fs::create_dir(root.join("logs")).unwrap();

    let uri = format!("/files?path={}", encode(&root.to_string_lossy()));
    let (status, body) = send(app(root, ScriptedModel::default()), "GET", &uri).await;
    assert_eq!(status, StatusCode::OK);
    let entries: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(
        entries,
        json!([
            {"name": "a.txt", "is_dir": false, "size": 1},
            {"name": "b.txt", "is_dir": false, "size": 5},
            {"name": "logs", "is_dir": true, "size": 0},
        ])
    );

    let uri = format!("/files?path={}", encode(&under(root, "a.txt")));
    let (status, _) = send(app(root, ScriptedModel::default()), "GET", &uri).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let uri = format!("/files?path={}", encode(&under(root, "nope")));
    let (status, _) = send(app(root, ScriptedModel::default()), "GET", &uri).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_cors_preflight_allows_post() {
    let dir = TempDir::new().unwrap();
    let request = Request::builder()
        .method("OPTIONS")
        .uri("/run")
        .header("origin", "https://example.com")
        .header("access-control-request-method", "POST")
        .body(Body::empty())
        .unwrap();
    let response = app(dir.path(), ScriptedModel::default())
        .oneshot(request)
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["access-control-allow-origin"],
        "*"
    );
}
