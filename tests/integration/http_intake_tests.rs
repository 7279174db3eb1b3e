//! HTTP intake against an in-memory cluster

use benchpool_common::{Fingerprint, Topic};
use benchpool_core::{JobBus, SubmissionStore};
use benchpool_sandbox::Formatter;
use benchpool_tests::common::{setup_test_logging, wait_until, Cluster, LineFormatter};
use benchpool_transport::ApiResponse;
use reqwest::StatusCode;
use serde_json::json;
use std::time::Duration;

const HELLO: &str = "package main\nimport \"fmt\"\nfunc main() {\nfmt.Println(\"hi\")\n}\n";

async fn post(base: &str, path: &str, body: serde_json::Value) -> (StatusCode, ApiResponse) {
    let response = reqwest::Client::new()
        .post(format!("{}{}", base, path))
        .json(&body)
        .send()
        .await
        .unwrap();
    let status = response.status();
    (status, response.json().await.unwrap())
}

#[tokio::test]
async fn test_run_submits_then_serves_cached_results() {
    setup_test_logging();
    let mut cluster = Cluster::start(1).await;
    let base = cluster.serve().await;

    let (status, body) = post(&base, "/run", json!({ "code": HELLO })).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.success);
    assert_eq!(body.message, "submitted");
    let hash = Fingerprint::of(&LineFormatter.normalize(HELLO).await.unwrap());
    assert_eq!(body.hash.as_deref(), Some(hash.as_str()));

    let store = cluster.store.clone();
    assert!(
        wait_until(Duration::from_secs(2), || {
            let store = store.clone();
            let hash = hash.clone();
            async move {
                store
                    .get(&hash)
                    .await
                    .unwrap()
                    .map(|s| s.has_results())
                    .unwrap_or(false)
            }
        })
        .await
    );

    let (status, body) = post(&base, "/benchmark", json!({ "code": HELLO })).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.success);
    assert!(body.message.contains("stdout:<br>hi<br>"));
    assert!(body.hash.is_none());
}

#[tokio::test]
async fn test_run_with_malformed_code_is_bad_request() {
    setup_test_logging();
    let mut cluster = Cluster::start(0).await;
    let base = cluster.serve().await;
    let code = "package main\nfun main() {}\n";

    let (status, body) = post(&base, "/run", json!({ "code": code })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(!body.success);
    assert!(body.message.contains("expected declaration"));
    assert_eq!(body.code.as_deref(), Some(code));
    assert!(cluster.store.is_empty().await);
}

#[tokio::test]
async fn test_fmt_reformats_without_publishing() {
    setup_test_logging();
    let mut cluster = Cluster::start(0).await;
    let base = cluster.serve().await;
    let mut jobs = cluster.bus.subscribe(Topic::NewJobs).await.unwrap();

    let (status, body) = post(&base, "/fmt", json!({ "code": HELLO })).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.success);
    assert_eq!(body.message, "reformatted code");
    assert_eq!(
        body.code.as_deref(),
        Some("package main\nimport \"fmt\"\nfunc main() {\n\tfmt.Println(\"hi\")\n}\n")
    );
    assert!(tokio::time::timeout(Duration::from_millis(100), jobs.next())
        .await
        .is_err());
    assert!(cluster.store.is_empty().await);
}

#[tokio::test]
async fn test_fmt_error_echoes_original_code() {
    setup_test_logging();
    let mut cluster = Cluster::start(0).await;
    let base = cluster.serve().await;
    let code = "fun main() {\n  oops\n}";

    let (status, body) = post(&base, "/fmt", json!({ "code": code })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(!body.success);
    assert_eq!(body.code.as_deref(), Some(code));
}

#[tokio::test]
async fn test_missing_code_field_is_json_error() {
    setup_test_logging();
    let mut cluster = Cluster::start(0).await;
    let base = cluster.serve().await;

    let (status, body) = post(&base, "/run", json!({ "source": "x" })).await;
    assert!(status.is_client_error());
    assert!(!body.success);
}

#[tokio::test]
async fn test_cors_headers_and_preflight() {
    setup_test_logging();
    let mut cluster = Cluster::start(0).await;
    let base = cluster.serve().await;
    let client = reqwest::Client::new();

    let response = client
        .request(reqwest::Method::OPTIONS, format!("{}/run", base))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["access-control-allow-origin"],
        "*"
    );

    let response = client
        .post(format!("{}/fmt", base))
        .json(&json!({ "code": "package main" }))
        .send()
        .await
        .unwrap();
    assert_eq!(
        response.headers()["access-control-allow-credentials"],
        "true"
    );
}
