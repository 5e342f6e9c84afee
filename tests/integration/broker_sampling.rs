//! Broker status and sampling against a mock management API

use std::time::{Duration, Instant};

use assert_matches::assert_matches;
use pretty_assertions::assert_eq;
use stackwatch::{
    BrokerStatus,
    config::BrokerConfig,
    monitors::{MetricsSampler, sampler::fetch_broker_status},
};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn broker_config(server: &MockServer, timeout_ms: u64) -> BrokerConfig {
    BrokerConfig {
        url: format!("{}/api/overview", server.uri()),
        timeout_ms,
        ..BrokerConfig::default()
    }
}

#[tokio::test]
async fn test_online_status_from_overview() {
    let mock_server = MockServer::start().await;

    // guest:guest
    Mock::given(method("GET"))
        .and(path("/api/overview"))
        .and(header("authorization", "Basic Z3Vlc3Q6Z3Vlc3Q="))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "queue_totals": {
                "messages": 120,
                "messages_ready": 100,
                "messages_unacknowledged": 20
            },
            "message_stats": {
                "publish_details": { "rate": 12.5 },
                "deliver_get_details": { "rate": 10.0 }
            }
        })))
        .mount(&mock_server)
        .await;

    let status = fetch_broker_status(&reqwest::Client::new(), &broker_config(&mock_server, 2000)).await;

    assert_eq!(
        status,
        BrokerStatus::Online {
            messages_ready: 100,
            messages_unacked: 20,
            messages_total: 120,
            publish_rate: 12.5,
            deliver_rate: 10.0,
        }
    );
}

#[tokio::test]
async fn test_non_200_is_error_with_code() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/overview"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&mock_server)
        .await;

    let status = fetch_broker_status(&reqwest::Client::new(), &broker_config(&mock_server, 2000)).await;

    assert_eq!(status, BrokerStatus::Error { http_code: 401 });
}

#[tokio::test]
async fn test_unreachable_broker_is_offline() {
    let config = BrokerConfig {
        url: "http://127.0.0.1:9/api/overview".to_string(),
        timeout_ms: 500,
        ..BrokerConfig::default()
    };

    let started = Instant::now();
    let status = fetch_broker_status(&reqwest::Client::new(), &config).await;

    assert_matches!(status, BrokerStatus::Offline { .. });
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn test_slow_broker_times_out_as_offline() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/overview"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&mock_server)
        .await;

    let started = Instant::now();
    let status = fetch_broker_status(&reqwest::Client::new(), &broker_config(&mock_server, 200)).await;

    assert_matches!(status, BrokerStatus::Offline { reason } if reason.contains("timed out"));
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn test_slow_broker_does_not_stack_on_sample_window() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/overview"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&mock_server)
        .await;

    let mut sampler = MetricsSampler::new(
        broker_config(&mock_server, 300),
        Duration::from_millis(100),
    );

    let started = Instant::now();
    let snapshot = sampler.sample().await;

    assert_matches!(snapshot.broker, BrokerStatus::Offline { .. });
    assert!(snapshot.ram_total_gb > 0.0);
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn test_system_stats_payload_is_flat() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/overview"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;

    let mut sampler = MetricsSampler::new(
        broker_config(&mock_server, 1000),
        Duration::from_millis(20),
    );
    let json = serde_json::to_value(sampler.sample().await).unwrap();

    assert_eq!(json["mq_status"], "error");
    assert_eq!(json["http_code"], 503);
    assert!(json["cpu_percent"].is_number());
    assert!(json["net_in_kbs"].is_number());
}
