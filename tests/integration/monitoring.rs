//! End-to-end monitoring pipeline tests
//!
//! These tests drive full probe cycles through the engine and verify:
//! - A failing endpoint opens exactly one incident
//! - Recovery resolves the incident and both transitions fire webhooks
//! - Unreachable endpoints are classified as failures
//! - Aggregation produces windows for recorded outcomes

use std::sync::Arc;

use beacon::aggregate::current_window;
use beacon::models::{IncidentEvent, IncidentStatus, ProbeOutcome};
use beacon::scheduler::TaskId;
use beacon::store::{MemoryStore, Store};
use beacon::MonitorEngine;
use chrono::Utc;
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::helpers::{create_test_endpoint, create_test_webhook, fast_engine_config};

#[tokio::test]
async fn test_incident_lifecycle_with_webhooks() {
    let target = MockServer::start().await;
    let hooks = MockServer::start().await;

    // First probe sees a 500, every later probe a 200
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .mount(&target)
        .await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&target)
        .await;

    Mock::given(method("POST"))
        .and(path("/notify"))
        .and(body_partial_json(serde_json::json!({
            "event": "incident_start"
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&hooks)
        .await;
    Mock::given(method("POST"))
        .and(path("/notify"))
        .and(body_partial_json(serde_json::json!({
            "event": "incident_resolved"
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&hooks)
        .await;

    let store = Arc::new(MemoryStore::new());
    let endpoint = create_test_endpoint(Uuid::new_v4(), format!("{}/health", target.uri()));
    let webhook = create_test_webhook(
        endpoint.service_id,
        format!("{}/notify", hooks.uri()),
        vec![IncidentEvent::IncidentStart, IncidentEvent::IncidentResolved],
    );
    store.upsert_endpoint(endpoint.clone()).await;
    store.insert_webhook(webhook).await;

    let engine = MonitorEngine::new(store.clone(), fast_engine_config());
    engine.start(endpoint.id).await.unwrap();

    // The immediate first tick runs the failing probe
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;
    assert_eq!(store.open_incident_count().await, 1);

    // Second cycle sees the recovery
    engine.run_now(TaskId::Endpoint(endpoint.id)).await.unwrap();
    assert_eq!(store.open_incident_count().await, 0);

    let incidents = store.incidents_for(endpoint.id).await;
    assert_eq!(incidents.len(), 1);
    assert_eq!(incidents[0].status, IncidentStatus::Resolved);
    assert!(incidents[0].resolved_at.is_some());

    engine.stop_all().await;
    // hooks mock server verifies both deliveries on drop
}

#[tokio::test]
async fn test_continued_failures_never_stack_incidents() {
    let target = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&target)
        .await;

    let store = Arc::new(MemoryStore::new());
    let endpoint = create_test_endpoint(Uuid::new_v4(), target.uri());
    store.upsert_endpoint(endpoint.clone()).await;

    let engine = MonitorEngine::new(store.clone(), fast_engine_config());
    engine.start(endpoint.id).await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;

    for _ in 0..3 {
        engine.run_now(TaskId::Endpoint(endpoint.id)).await.unwrap();
    }

    assert_eq!(store.open_incident_count().await, 1);
    assert!(store.outcomes().await.len() >= 4);

    engine.stop_all().await;
}

#[tokio::test]
async fn test_unreachable_endpoint_opens_incident() {
    let store = Arc::new(MemoryStore::new());
    // Nothing listens on the discard port
    let endpoint = create_test_endpoint(Uuid::new_v4(), "http://127.0.0.1:9/health".to_string());
    store.upsert_endpoint(endpoint.clone()).await;

    let engine = MonitorEngine::new(store.clone(), fast_engine_config());
    engine.start(endpoint.id).await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(500)).await;

    let outcomes = store.outcomes().await;
    assert!(!outcomes.is_empty());
    assert_eq!(outcomes[0].status_code, 0);
    assert!(!outcomes[0].success);
    assert_eq!(store.open_incident_count().await, 1);

    engine.stop_all().await;
}

#[tokio::test]
async fn test_aggregate_run_produces_windows() {
    let store = Arc::new(MemoryStore::new());
    let endpoint = create_test_endpoint(Uuid::new_v4(), "http://example.com/h".to_string());
    store.upsert_endpoint(endpoint.clone()).await;

    // Seed an outcome into the most recently completed window; the
    // aggregation pass only covers completed windows
    let (window_start, _) = current_window(
        Utc::now(),
        std::time::Duration::from_secs(fast_engine_config().window_secs),
    );
    store
        .create_outcome(&ProbeOutcome {
            endpoint_id: endpoint.id,
            status_code: 200,
            latency_ms: 30,
            success: true,
            error: None,
            timestamp: window_start + chrono::Duration::seconds(5),
        })
        .await
        .unwrap();

    let engine = MonitorEngine::new(store.clone(), fast_engine_config());
    engine.start_singletons().await;

    // The aggregate task's first tick fires immediately
    tokio::time::sleep(std::time::Duration::from_millis(300)).await;

    let windows = store.windows().await;
    assert_eq!(windows.len(), 1);
    assert_eq!(windows[0].endpoint_id, endpoint.id);
    assert_eq!(windows[0].total_probes, 1);
    assert_eq!(windows[0].success_probes, 1);
    assert_eq!(windows[0].window_start, window_start);

    engine.stop_all().await;
}
