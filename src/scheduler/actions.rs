//! Task actions executed by the recurring tasks
//!
//! One action type per task kind: the per-endpoint probe pipeline and the two
//! singleton actions. Each action is one iteration's worth of work; the
//! surrounding [`RecurringTask`](super::task::RecurringTask) owns cadence,
//! retry and cancellation.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, error};
use uuid::Uuid;

use crate::aggregate::{MetricsAggregator, current_window};
use crate::incident::IncidentTracker;
use crate::probe::ProbeExecutor;
use crate::retention::RetentionSweeper;
use crate::store::Store;

use super::retry::RetryPolicy;
use super::task::TaskAction;

/// One probe cycle for one endpoint: probe → incident check → webhooks.
///
/// The endpoint row is re-read at the start of every cycle so configuration
/// edits take effect on the next iteration. Transport-level probe failures
/// are retried here with the task's own policy; only the final attempt is
/// classified into an outcome, so a transient blip that recovers within the
/// retry budget never reaches the incident tracker as a failure.
pub struct EndpointProbeAction {
    endpoint_id: Uuid,
    store: Arc<dyn Store>,
    executor: Arc<ProbeExecutor>,
    tracker: Arc<IncidentTracker>,
    retry: RetryPolicy,
}

impl EndpointProbeAction {
    pub fn new(
        endpoint_id: Uuid,
        store: Arc<dyn Store>,
        executor: Arc<ProbeExecutor>,
        tracker: Arc<IncidentTracker>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            endpoint_id,
            store,
            executor,
            tracker,
            retry,
        }
    }
}

#[async_trait]
impl TaskAction for EndpointProbeAction {
    async fn run(&self) -> Result<()> {
        let endpoint = self
            .store
            .get_endpoint(self.endpoint_id)
            .await
            .context("failed to load endpoint")?;

        if !endpoint.enabled {
            debug!("endpoint {} disabled, skipping probe", endpoint.name);
            return Ok(());
        }

        let outcome = match self.retry.run(|| self.executor.attempt(&endpoint)).await {
            Ok(outcome) => outcome,
            // Retries exhausted without ever getting a response: classify as
            // a definitive failure so the incident machinery sees it.
            Err(cause) => self.executor.unreachable(&endpoint, &cause),
        };

        self.executor.record(&outcome).await?;
        self.tracker.on_outcome(&endpoint, &outcome).await?;

        Ok(())
    }
}

/// Singleton aggregation pass over every enabled endpoint.
///
/// Each run covers the most recently completed window. A failure for one
/// endpoint is logged and does not stop the pass.
pub struct AggregateAction {
    store: Arc<dyn Store>,
    aggregator: Arc<MetricsAggregator>,
    window: Duration,
}

impl AggregateAction {
    pub fn new(store: Arc<dyn Store>, aggregator: Arc<MetricsAggregator>, window: Duration) -> Self {
        Self {
            store,
            aggregator,
            window,
        }
    }
}

#[async_trait]
impl TaskAction for AggregateAction {
    async fn run(&self) -> Result<()> {
        let (window_start, window_end) = current_window(Utc::now(), self.window);

        let endpoints = self
            .store
            .list_enabled_endpoints()
            .await
            .context("failed to list enabled endpoints")?;

        for endpoint in &endpoints {
            if let Err(e) = self
                .aggregator
                .aggregate(endpoint.id, window_start, window_end)
                .await
            {
                error!("failed to aggregate metrics for {}: {:#}", endpoint.name, e);
            }
        }

        Ok(())
    }
}

/// Singleton retention sweep.
pub struct CleanupAction {
    sweeper: Arc<RetentionSweeper>,
    retention_days: u32,
}

impl CleanupAction {
    pub fn new(sweeper: Arc<RetentionSweeper>, retention_days: u32) -> Self {
        Self {
            sweeper,
            retention_days,
        }
    }
}

#[async_trait]
impl TaskAction for CleanupAction {
    async fn run(&self) -> Result<()> {
        self.sweeper.sweep(self.retention_days).await
    }
}
