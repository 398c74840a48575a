//! Metrics aggregator - rolls probe outcomes into fixed time windows
//!
//! Windows are epoch-aligned: the window end is "now" truncated to the window
//! duration and the start is one duration earlier. Successive runs therefore
//! produce contiguous, non-overlapping windows no matter how much the task's
//! wake-up time jitters. Empty windows are never persisted.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, TimeZone, Utc};
use tracing::{debug, instrument, trace};
use uuid::Uuid;

use crate::models::MetricWindow;
use crate::store::Store;

/// Default window duration, matching the aggregate task cadence
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(300);

/// Summarizes raw probe outcomes into [`MetricWindow`] rows
pub struct MetricsAggregator {
    store: Arc<dyn Store>,
}

impl MetricsAggregator {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Aggregate one endpoint over `[window_start, window_end]`.
    ///
    /// Persists nothing when the window contains no outcomes. The latency
    /// average uses truncating integer division.
    #[instrument(skip(self), fields(endpoint = %endpoint_id))]
    pub async fn aggregate(
        &self,
        endpoint_id: Uuid,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Result<()> {
        let outcomes = self
            .store
            .list_outcomes_in_range(endpoint_id, window_start, window_end)
            .await
            .context("failed to list probe outcomes")?;

        if outcomes.is_empty() {
            trace!("no outcomes in window, skipping");
            return Ok(());
        }

        let total_probes = outcomes.len() as u64;
        let success_probes = outcomes.iter().filter(|o| o.success).count() as u64;

        let mut sum = 0u64;
        let mut min = outcomes[0].latency_ms;
        let mut max = outcomes[0].latency_ms;
        for outcome in &outcomes {
            sum += outcome.latency_ms;
            min = min.min(outcome.latency_ms);
            max = max.max(outcome.latency_ms);
        }

        let window = MetricWindow {
            id: Uuid::new_v4(),
            endpoint_id,
            window_start,
            window_end,
            total_probes,
            success_probes,
            avg_latency_ms: sum / total_probes,
            min_latency_ms: min,
            max_latency_ms: max,
        };

        debug!(
            "window {} .. {}: {}/{} probes ok, latency avg {}ms",
            window_start, window_end, success_probes, total_probes, window.avg_latency_ms
        );

        self.store
            .create_window(&window)
            .await
            .context("failed to save metric window")?;

        Ok(())
    }
}

/// The most recent completed window as of `now`.
///
/// The end is `now` truncated down to a multiple of `window`, the start is
/// one window earlier. Consecutive invocations one window apart yield
/// contiguous, non-overlapping ranges.
pub fn current_window(now: DateTime<Utc>, window: Duration) -> (DateTime<Utc>, DateTime<Utc>) {
    let window_secs = window.as_secs() as i64;
    let end_secs = now.timestamp() - now.timestamp().rem_euclid(window_secs);

    let end = Utc
        .timestamp_opt(end_secs, 0)
        .single()
        .expect("aligned timestamp in range");
    let start = Utc
        .timestamp_opt(end_secs - window_secs, 0)
        .single()
        .expect("aligned timestamp in range");

    (start, end)
}
