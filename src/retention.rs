//! Retention sweeper - purges stale probe data
//!
//! Probe outcomes and metric windows are hard-deleted once they age past the
//! retention horizon. No soft deletion here: these two entity types are raw
//! telemetry, unlike the operator-managed entities in the surrounding system.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use tracing::{info, instrument};

use crate::store::Store;

/// Bulk-deletes outcomes and windows older than the retention horizon
pub struct RetentionSweeper {
    store: Arc<dyn Store>,
}

impl RetentionSweeper {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Delete all probe outcomes and metric windows older than
    /// `now - retention_days`.
    #[instrument(skip(self))]
    pub async fn sweep(&self, retention_days: u32) -> Result<()> {
        let cutoff = Utc::now() - Duration::days(retention_days as i64);

        let outcomes = self
            .store
            .delete_outcomes_before(cutoff)
            .await
            .context("failed to delete old probe outcomes")?;

        let windows = self
            .store
            .delete_windows_before(cutoff)
            .await
            .context("failed to delete old metric windows")?;

        info!(
            "retention sweep removed {outcomes} probe outcomes and {windows} metric windows older than {cutoff}"
        );

        Ok(())
    }
}
