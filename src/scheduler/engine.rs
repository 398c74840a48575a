//! Monitor engine - owns the live task set
//!
//! The engine holds one registry of all active tasks, keyed by [`TaskId`]:
//! one recurring probe task per monitored endpoint plus the aggregate and
//! cleanup singletons. The registry is the single source of truth for
//! cancel-all, so no task can leak just because its id was unknown at the
//! call site.
//!
//! Durability is re-derivation, not checkpointing: after a process restart,
//! `start_all` queries the store for the enabled endpoints and rebuilds the
//! task set, resuming the interval cadence rather than any mid-iteration
//! state.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use futures::future::join_all;
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument};
use uuid::Uuid;

use crate::aggregate::MetricsAggregator;
use crate::config::EngineConfig;
use crate::incident::IncidentTracker;
use crate::models::Endpoint;
use crate::probe::ProbeExecutor;
use crate::retention::RetentionSweeper;
use crate::store::Store;
use crate::webhook::WebhookNotifier;

use super::actions::{AggregateAction, CleanupAction, EndpointProbeAction};
use super::task::{TaskHandle, TaskId};

/// Per-endpoint results of a batch control operation
///
/// A batch never fails as a whole: endpoints that could not be started are
/// reported individually while the rest proceed.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub started: Vec<Uuid>,
    pub failed: Vec<(Uuid, String)>,
}

impl BatchReport {
    pub fn all_started(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Owns and controls all recurring monitoring tasks
pub struct MonitorEngine {
    store: Arc<dyn Store>,
    executor: Arc<ProbeExecutor>,
    tracker: Arc<IncidentTracker>,
    aggregator: Arc<MetricsAggregator>,
    sweeper: Arc<RetentionSweeper>,
    config: EngineConfig,

    /// All currently active tasks, including the two singletons.
    tasks: Mutex<HashMap<TaskId, TaskHandle>>,
}

impl MonitorEngine {
    pub fn new(store: Arc<dyn Store>, config: EngineConfig) -> Self {
        let executor = Arc::new(ProbeExecutor::new(store.clone()));
        let notifier = WebhookNotifier::with_timeout(store.clone(), config.webhook_timeout());
        let tracker = Arc::new(IncidentTracker::new(store.clone(), notifier));
        let aggregator = Arc::new(MetricsAggregator::new(store.clone()));
        let sweeper = Arc::new(RetentionSweeper::new(store.clone()));

        Self {
            store,
            executor,
            tracker,
            aggregator,
            sweeper,
            config,
            tasks: Mutex::new(HashMap::new()),
        }
    }

    /// Start the probe task for one endpoint.
    ///
    /// Idempotent: starting an endpoint whose task is already active is a
    /// no-op. An unknown or disabled endpoint is a configuration error and no
    /// task is scheduled.
    #[instrument(skip(self))]
    pub async fn start(&self, endpoint_id: Uuid) -> Result<()> {
        let endpoint = self
            .store
            .get_endpoint(endpoint_id)
            .await
            .context("cannot start monitoring")?;

        if !endpoint.enabled {
            anyhow::bail!("endpoint {} is disabled", endpoint.name);
        }

        self.spawn_endpoint_task(&endpoint).await;
        Ok(())
    }

    /// Start tasks for every enabled endpoint plus the two singletons.
    ///
    /// This is also the restart path: the live task set is re-derived from
    /// store state, not from any persisted scheduler state.
    pub async fn start_all(&self) -> Result<BatchReport> {
        let endpoints = self
            .store
            .list_enabled_endpoints()
            .await
            .context("failed to list enabled endpoints")?;

        let mut report = BatchReport::default();
        for endpoint in &endpoints {
            match self.start(endpoint.id).await {
                Ok(()) => report.started.push(endpoint.id),
                Err(e) => {
                    error!("failed to start monitoring for {}: {:#}", endpoint.name, e);
                    report.failed.push((endpoint.id, format!("{e:#}")));
                }
            }
        }

        self.start_singletons().await;

        info!(
            "started {} endpoint tasks ({} failed) plus aggregate and cleanup",
            report.started.len(),
            report.failed.len()
        );

        Ok(report)
    }

    /// Start the aggregate and cleanup singletons if they are not running.
    pub async fn start_singletons(&self) {
        let mut tasks = self.tasks.lock().await;

        if !Self::is_active(&tasks, TaskId::Aggregate) {
            let action = AggregateAction::new(
                self.store.clone(),
                self.aggregator.clone(),
                self.config.window(),
            );
            tasks.insert(
                TaskId::Aggregate,
                TaskHandle::spawn(
                    TaskId::Aggregate,
                    action,
                    self.config.window(),
                    self.config.retry_policy(),
                ),
            );
        }

        if !Self::is_active(&tasks, TaskId::Cleanup) {
            let action = CleanupAction::new(self.sweeper.clone(), self.config.retention_days);
            tasks.insert(
                TaskId::Cleanup,
                TaskHandle::spawn(
                    TaskId::Cleanup,
                    action,
                    self.config.sweep_interval(),
                    self.config.retry_policy(),
                ),
            );
        }
    }

    /// Stop the probe task for one endpoint.
    ///
    /// Idempotent: stopping an endpoint that is not being monitored succeeds.
    /// Returns whether a task was actually cancelled.
    #[instrument(skip(self))]
    pub async fn stop(&self, endpoint_id: Uuid) -> bool {
        self.stop_task(TaskId::Endpoint(endpoint_id)).await
    }

    /// Cancel every active task, including the singletons, and wait for all
    /// of them to terminate. Returns the ids that were stopped.
    pub async fn stop_all(&self) -> Vec<TaskId> {
        let handles: Vec<(TaskId, TaskHandle)> =
            { self.tasks.lock().await.drain().collect() };

        let stopped = join_all(handles.into_iter().map(|(id, handle)| async move {
            handle.shutdown().await;
            id
        }))
        .await;

        info!("stopped {} tasks", stopped.len());
        stopped
    }

    /// Ids of all tasks whose loop is still running.
    pub async fn active_tasks(&self) -> Vec<TaskId> {
        self.tasks
            .lock()
            .await
            .values()
            .filter(|handle| handle.is_active())
            .map(|handle| handle.id())
            .collect()
    }

    /// Trigger an immediate iteration of a task, bypassing its timer.
    pub async fn run_now(&self, id: TaskId) -> Result<()> {
        // Only the command sender is needed for the round-trip; release the
        // registry lock before awaiting the iteration so start/stop and
        // cancellation stay responsive while it runs.
        let commands = {
            let tasks = self.tasks.lock().await;
            tasks
                .get(&id)
                .with_context(|| format!("no active task {id}"))?
                .commands()
        };
        TaskHandle::run_now_via(&commands).await
    }

    /// Insert a probe task for the endpoint unless one is already active.
    /// The registry lock serializes concurrent starts for the same id.
    async fn spawn_endpoint_task(&self, endpoint: &Endpoint) {
        let id = TaskId::Endpoint(endpoint.id);
        let mut tasks = self.tasks.lock().await;

        if Self::is_active(&tasks, id) {
            debug!("task {id} already active, start is a no-op");
            return;
        }

        let action = EndpointProbeAction::new(
            endpoint.id,
            self.store.clone(),
            self.executor.clone(),
            self.tracker.clone(),
            self.config.retry_policy(),
        );

        let handle = TaskHandle::spawn(
            id,
            action,
            Duration::from_secs(endpoint.interval_secs),
            self.config.retry_policy(),
        );
        tasks.insert(id, handle);

        debug!("started task {id} with interval {}s", endpoint.interval_secs);
    }

    async fn stop_task(&self, id: TaskId) -> bool {
        let handle = self.tasks.lock().await.remove(&id);
        match handle {
            Some(handle) => {
                handle.shutdown().await;
                debug!("stopped task {id}");
                true
            }
            None => {
                debug!("task {id} not active, stop is a no-op");
                false
            }
        }
    }

    fn is_active(tasks: &HashMap<TaskId, TaskHandle>, id: TaskId) -> bool {
        tasks.get(&id).is_some_and(|handle| handle.is_active())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::HttpMethod;
    use crate::store::MemoryStore;
    use std::collections::HashMap;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fast_config() -> EngineConfig {
        EngineConfig {
            max_attempts: 2,
            retry_backoff_ms: 1,
            window_secs: 300,
            sweep_interval_secs: 3600,
            retention_days: 30,
            webhook_timeout_secs: 1,
        }
    }

    fn endpoint(url: &str, enabled: bool) -> Endpoint {
        Endpoint {
            id: Uuid::new_v4(),
            service_id: Uuid::new_v4(),
            name: "api".to_string(),
            url: url.to_string(),
            method: HttpMethod::Get,
            headers: HashMap::new(),
            expected_status: 200,
            timeout_ms: 1000,
            interval_secs: 3600,
            enabled,
        }
    }

    #[tokio::test]
    async fn test_start_unknown_endpoint_is_config_error() {
        let store = Arc::new(MemoryStore::new());
        let engine = MonitorEngine::new(store, fast_config());

        let result = engine.start(Uuid::new_v4()).await;
        assert!(result.is_err());
        assert!(engine.active_tasks().await.is_empty());
    }

    #[tokio::test]
    async fn test_start_disabled_endpoint_is_rejected() {
        let store = Arc::new(MemoryStore::new());
        let disabled = endpoint("http://127.0.0.1:9/h", false);
        store.upsert_endpoint(disabled.clone()).await;

        let engine = MonitorEngine::new(store, fast_config());
        assert!(engine.start(disabled.id).await.is_err());
        assert!(engine.active_tasks().await.is_empty());
    }

    #[tokio::test]
    async fn test_start_is_idempotent() {
        let store = Arc::new(MemoryStore::new());
        let ep = endpoint("http://127.0.0.1:9/h", true);
        store.upsert_endpoint(ep.clone()).await;

        let engine = MonitorEngine::new(store, fast_config());
        engine.start(ep.id).await.unwrap();
        engine.start(ep.id).await.unwrap();

        let active = engine.active_tasks().await;
        assert_eq!(
            active.iter().filter(|id| **id == TaskId::Endpoint(ep.id)).count(),
            1
        );

        engine.stop_all().await;
    }

    #[tokio::test]
    async fn test_stop_is_idempotent() {
        let store = Arc::new(MemoryStore::new());
        let ep = endpoint("http://127.0.0.1:9/h", true);
        store.upsert_endpoint(ep.clone()).await;

        let engine = MonitorEngine::new(store, fast_config());
        engine.start(ep.id).await.unwrap();

        assert!(engine.stop(ep.id).await);
        assert!(!engine.stop(ep.id).await);
    }

    #[tokio::test]
    async fn test_start_all_reports_per_endpoint_and_starts_singletons() {
        let store = Arc::new(MemoryStore::new());
        store.upsert_endpoint(endpoint("http://127.0.0.1:9/a", true)).await;
        store.upsert_endpoint(endpoint("http://127.0.0.1:9/b", true)).await;
        // Disabled endpoints are not part of the derived task set at all
        store.upsert_endpoint(endpoint("http://127.0.0.1:9/c", false)).await;

        let engine = MonitorEngine::new(store, fast_config());
        let report = engine.start_all().await.unwrap();

        assert!(report.all_started());
        assert_eq!(report.started.len(), 2);

        let active = engine.active_tasks().await;
        assert_eq!(active.len(), 4);
        assert!(active.contains(&TaskId::Aggregate));
        assert!(active.contains(&TaskId::Cleanup));

        engine.stop_all().await;
    }

    #[tokio::test]
    async fn test_stop_all_leaves_zero_active_tasks() {
        let store = Arc::new(MemoryStore::new());
        store.upsert_endpoint(endpoint("http://127.0.0.1:9/a", true)).await;

        let engine = MonitorEngine::new(store, fast_config());
        engine.start_all().await.unwrap();

        let stopped = engine.stop_all().await;
        assert_eq!(stopped.len(), 3);
        assert!(engine.active_tasks().await.is_empty());

        // A second stop-all is a harmless no-op
        assert!(engine.stop_all().await.is_empty());
    }

    #[tokio::test]
    async fn test_control_surface_stays_responsive_during_slow_iteration() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(1)))
            .mount(&mock_server)
            .await;

        let store = Arc::new(MemoryStore::new());
        let mut slow = endpoint(&mock_server.uri(), true);
        slow.timeout_ms = 5000;
        store.upsert_endpoint(slow.clone()).await;

        let engine = Arc::new(MonitorEngine::new(store, fast_config()));
        engine.start(slow.id).await.unwrap();

        let run = {
            let engine = engine.clone();
            let id = slow.id;
            tokio::spawn(async move { engine.run_now(TaskId::Endpoint(id)).await })
        };

        // Give run_now time to reach the in-flight probe
        tokio::time::sleep(Duration::from_millis(100)).await;

        // Control operations must not wait out the slow probe
        tokio::time::timeout(Duration::from_millis(500), engine.active_tasks())
            .await
            .expect("active_tasks stalled behind a running iteration");

        run.await.unwrap().unwrap();
        engine.stop_all().await;
    }

    #[tokio::test]
    async fn test_concurrent_starts_yield_one_task() {
        let store = Arc::new(MemoryStore::new());
        let ep = endpoint("http://127.0.0.1:9/h", true);
        store.upsert_endpoint(ep.clone()).await;

        let engine = Arc::new(MonitorEngine::new(store, fast_config()));

        let mut starts = Vec::new();
        for _ in 0..8 {
            let engine = engine.clone();
            let id = ep.id;
            starts.push(tokio::spawn(async move { engine.start(id).await }));
        }
        for start in starts {
            start.await.unwrap().unwrap();
        }

        assert_eq!(engine.active_tasks().await.len(), 1);
        engine.stop_all().await;
    }
}
