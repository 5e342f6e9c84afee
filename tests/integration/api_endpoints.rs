//! Integration tests for API endpoints
//!
//! These tests verify that:
//! - REST endpoints serve connectors, status, history and descriptors
//! - Descriptor saves keep a backup and validate names
//! - The WebSocket stream starts the monitor and handles docker_action

use std::time::Duration;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use futures::{SinkExt, StreamExt};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use stackwatch::{
    HistoryPoint,
    actors::messages::DashboardEvent,
    api::{ApiConfig, ApiState, router, spawn_api_server},
    storage::HistoryStore,
};
use tempfile::tempdir;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tower::ServiceExt;

use crate::helpers::*;

fn test_api_config() -> ApiConfig {
    ApiConfig {
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        static_dir: None,
        enable_cors: true,
    }
}

async fn request(state: &ApiState, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let app = router(&test_api_config(), state.clone());

    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

    (status, body)
}

#[tokio::test]
async fn test_health_endpoint() {
    let dir = tempdir().unwrap();
    let state = ApiState::new(create_test_config(dir.path()));

    let (status, body) = request(&state, "GET", "/api/v1/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["monitor_running"], false);
}

#[tokio::test]
async fn test_connectors_are_sorted() {
    let dir = tempdir().unwrap();
    create_connector(dir.path(), "zeta", Some("docker-compose.yml"));
    create_connector(dir.path(), "alpha", Some("docker-compose.yaml"));
    create_connector(dir.path(), "nothing", None);
    let state = ApiState::new(create_test_config(dir.path()));

    let (status, body) = request(&state, "GET", "/api/v1/connectors", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!([
            { "name": "alpha", "has_config": true },
            { "name": "zeta", "has_config": true }
        ])
    );
}

#[tokio::test]
async fn test_status_endpoint() {
    let dir = tempdir().unwrap();
    create_core(dir.path());
    create_connector(dir.path(), "mitre", Some("docker-compose.yml"));
    let state = ApiState::new(create_test_config(dir.path()));

    let (status, body) = request(&state, "GET", "/api/v1/status", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "core": "stopped", "connector_mitre": "stopped" }));
}

#[tokio::test]
async fn test_history_endpoint_returns_persisted_points() {
    let dir = tempdir().unwrap();
    let config = create_test_config(dir.path());
    let store = HistoryStore::new(config.history_file.clone(), config.max_history_points);
    store.append(HistoryPoint {
        timestamp: chrono::Utc::now(),
        cpu: 12.0,
        ram: 34.0,
        disk: 56.0,
        mq_queued: 1,
        mq_total: 2,
        mq_rate_in: 0.0,
        mq_rate_out: 0.0,
    });
    let state = ApiState::new(config);

    let (status, body) = request(&state, "GET", "/api/v1/history", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["disk"], 56.0);
}

#[tokio::test]
async fn test_history_endpoint_with_corrupt_file() {
    let dir = tempdir().unwrap();
    let config = create_test_config(dir.path());
    std::fs::write(&config.history_file, "{broken").unwrap();
    let state = ApiState::new(config);

    let (status, body) = request(&state, "GET", "/api/v1/history", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn test_get_connector_descriptor() {
    let dir = tempdir().unwrap();
    create_connector(dir.path(), "mitre", Some("docker-compose.yaml"));
    create_connector(dir.path(), "bare", None);
    let state = ApiState::new(create_test_config(dir.path()));

    let (status, body) =
        request(&state, "GET", "/api/v1/groups/connector/mitre/descriptor", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["path"].as_str().unwrap().ends_with("docker-compose.yaml"));
    assert!(body["content"].as_str().unwrap().contains("services:"));

    let (status, _) =
        request(&state, "GET", "/api/v1/groups/connector/bare/descriptor", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unsafe_connector_name_is_rejected() {
    let dir = tempdir().unwrap();
    let state = ApiState::new(create_test_config(dir.path()));

    let (status, _) =
        request(&state, "GET", "/api/v1/groups/connector/a..b/descriptor", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = request(
        &state,
        "PUT",
        "/api/v1/groups/connector/a..b/descriptor",
        Some(json!({ "content": "services: {}\n" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_save_core_descriptor_keeps_backup() {
    let dir = tempdir().unwrap();
    let core = create_core(dir.path());
    let original = std::fs::read_to_string(core.join("docker-compose.yml")).unwrap();
    let state = ApiState::new(create_test_config(dir.path()));

    let (status, body) = request(
        &state,
        "PUT",
        "/api/v1/groups/core/descriptor",
        Some(json!({ "content": "services: {}\n" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["content"], "services: {}\n");
    assert_eq!(
        std::fs::read_to_string(core.join("docker-compose.yml")).unwrap(),
        "services: {}\n"
    );
    assert_eq!(
        std::fs::read_to_string(core.join("docker-compose.yml.bak")).unwrap(),
        original
    );
}

#[tokio::test]
async fn test_save_descriptor_refused_while_group_runs() {
    let dir = tempdir().unwrap();
    let core = create_core(dir.path());
    let original = std::fs::read_to_string(core.join("docker-compose.yml")).unwrap();
    let docker = create_fake_docker(dir.path(), RUNNING_DOCKER);
    let state = ApiState::new(create_test_config_with_docker(dir.path(), &docker));

    let (status, body) = request(
        &state,
        "PUT",
        "/api/v1/groups/core/descriptor",
        Some(json!({ "content": "services: {}\n" })),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("running"));
    assert_eq!(
        std::fs::read_to_string(core.join("docker-compose.yml")).unwrap(),
        original
    );
    assert!(!core.join("docker-compose.yml.bak").exists());
}

#[tokio::test]
async fn test_save_descriptor_for_missing_group() {
    let dir = tempdir().unwrap();
    let state = ApiState::new(create_test_config(dir.path()));

    let (status, _) = request(
        &state,
        "PUT",
        "/api/v1/groups/connector/ghost/descriptor",
        Some(json!({ "content": "services: {}\n" })),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

async fn next_event(
    stream: &mut (impl StreamExt<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin),
) -> DashboardEvent {
    loop {
        let message = tokio::time::timeout(Duration::from_secs(10), stream.next())
            .await
            .expect("timed out waiting for an event")
            .expect("stream ended")
            .expect("websocket error");

        if let Message::Text(text) = message {
            return serde_json::from_str(&text).unwrap();
        }
    }
}

#[tokio::test]
async fn test_websocket_connect_starts_monitor_and_handles_actions() {
    let dir = tempdir().unwrap();
    create_core(dir.path());
    let state = ApiState::new(create_test_config(dir.path()));
    let supervisor = state.supervisor.clone();

    let addr = spawn_api_server(test_api_config(), state).await.unwrap();
    let (socket, _) = connect_async(format!("ws://{addr}/api/v1/stream"))
        .await
        .unwrap();
    let (mut write, mut read) = socket.split();

    // connect triggers the loop and an immediate status probe
    let mut seen_status = false;
    let mut seen_stats = false;
    while !(seen_status && seen_stats) {
        match next_event(&mut read).await {
            DashboardEvent::StatusUpdate(status) => {
                assert!(status.contains_key("core"));
                seen_status = true;
            }
            DashboardEvent::SystemStats(_) => seen_stats = true,
            _ => {}
        }
    }
    assert!(supervisor.is_running());

    let action = json!({
        "event": "docker_action",
        "data": { "type": "connector", "action": "up", "target_name": "../x" }
    });
    write.send(Message::Text(action.to_string())).await.unwrap();

    loop {
        if let DashboardEvent::CommandOutput { line } = next_event(&mut read).await {
            assert_eq!(line, "Error: Invalid connector name.");
            break;
        }
    }
}

#[tokio::test]
async fn test_second_connection_reuses_the_monitor() {
    let dir = tempdir().unwrap();
    let state = ApiState::new(create_test_config(dir.path()));
    let supervisor = state.supervisor.clone();

    let addr = spawn_api_server(test_api_config(), state).await.unwrap();
    let url = format!("ws://{addr}/api/v1/stream");

    let (first, _) = connect_async(&url).await.unwrap();
    let (_, mut first_read) = first.split();
    next_event(&mut first_read).await;

    let (second, _) = connect_async(&url).await.unwrap();
    let (_, mut second_read) = second.split();
    next_event(&mut second_read).await;

    assert!(supervisor.is_running());
    assert!(!supervisor.ensure_started());
}
