//! Engine control semantics
//!
//! These tests verify start/stop behavior at the engine level:
//! - Start is idempotent under concurrency
//! - stop_all cancels everything including the singletons
//! - The task set is re-derived from the store on a fresh start_all

use std::sync::Arc;

use beacon::scheduler::TaskId;
use beacon::store::MemoryStore;
use beacon::MonitorEngine;
use uuid::Uuid;

use crate::helpers::{create_test_endpoint, fast_engine_config};

#[tokio::test]
async fn test_double_start_keeps_a_single_task() {
    let store = Arc::new(MemoryStore::new());
    let endpoint = create_test_endpoint(Uuid::new_v4(), "http://127.0.0.1:9/h".to_string());
    store.upsert_endpoint(endpoint.clone()).await;

    let engine = Arc::new(MonitorEngine::new(store, fast_engine_config()));

    let first = {
        let engine = engine.clone();
        let id = endpoint.id;
        tokio::spawn(async move { engine.start(id).await })
    };
    let second = {
        let engine = engine.clone();
        let id = endpoint.id;
        tokio::spawn(async move { engine.start(id).await })
    };
    first.await.unwrap().unwrap();
    second.await.unwrap().unwrap();

    let active = engine.active_tasks().await;
    assert_eq!(
        active
            .iter()
            .filter(|id| **id == TaskId::Endpoint(endpoint.id))
            .count(),
        1
    );

    engine.stop_all().await;
}

#[tokio::test]
async fn test_stop_all_cancels_singletons_too() {
    let store = Arc::new(MemoryStore::new());
    store
        .upsert_endpoint(create_test_endpoint(
            Uuid::new_v4(),
            "http://127.0.0.1:9/a".to_string(),
        ))
        .await;

    let engine = MonitorEngine::new(store, fast_engine_config());
    let report = engine.start_all().await.unwrap();
    assert!(report.all_started());

    let active = engine.active_tasks().await;
    assert!(active.contains(&TaskId::Aggregate));
    assert!(active.contains(&TaskId::Cleanup));

    let stopped = engine.stop_all().await;
    assert_eq!(stopped.len(), 3);
    assert!(engine.active_tasks().await.is_empty());
}

#[tokio::test]
async fn test_restart_rederives_task_set_from_store() {
    let store = Arc::new(MemoryStore::new());
    let endpoint = create_test_endpoint(Uuid::new_v4(), "http://127.0.0.1:9/h".to_string());
    store.upsert_endpoint(endpoint.clone()).await;

    // First engine goes away without any persisted scheduler state
    {
        let engine = MonitorEngine::new(store.clone(), fast_engine_config());
        engine.start_all().await.unwrap();
        engine.stop_all().await;
    }

    // A fresh engine reconstructs the same task set from the store
    let engine = MonitorEngine::new(store, fast_engine_config());
    let report = engine.start_all().await.unwrap();
    assert_eq!(report.started, vec![endpoint.id]);
    assert!(engine
        .active_tasks()
        .await
        .contains(&TaskId::Endpoint(endpoint.id)));

    engine.stop_all().await;
}

#[tokio::test]
async fn test_stopping_unknown_endpoint_is_a_noop() {
    let store = Arc::new(MemoryStore::new());
    let engine = MonitorEngine::new(store, fast_engine_config());

    assert!(!engine.stop(Uuid::new_v4()).await);
}
