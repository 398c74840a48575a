//! Incident tracker - open/resolved state machine per endpoint
//!
//! Consumes classified probe outcomes and maintains the incident lifecycle:
//!
//! ```text
//! failure & no open incident  → create incident, emit incident_start
//! failure & open incident     → no-op (already tracked)
//! success & open incident     → resolve incident, emit incident_resolved
//! success & no open incident  → no-op
//! ```
//!
//! The store is the authoritative source of truth for "is there an open
//! incident"; the tracker keeps no state of its own. Concurrent probes for
//! the same endpoint cannot occur (one task per endpoint), so no locking is
//! needed beyond the store's read-modify-write.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{info, instrument, warn};

use crate::models::{Endpoint, Incident, IncidentEvent, IncidentStatus, ProbeOutcome};
use crate::store::Store;
use crate::webhook::WebhookNotifier;

/// Derives incident transitions from probe outcomes
pub struct IncidentTracker {
    store: Arc<dyn Store>,
    notifier: WebhookNotifier,
}

impl IncidentTracker {
    pub fn new(store: Arc<dyn Store>, notifier: WebhookNotifier) -> Self {
        Self { store, notifier }
    }

    /// Apply one classified outcome to the endpoint's incident state.
    ///
    /// The open-incident lookup distinguishes "none open" (`Ok(None)`, a
    /// normal state) from a genuine store failure, which is surfaced so the
    /// scheduler can retry the iteration.
    #[instrument(skip(self, endpoint, outcome), fields(endpoint = %endpoint.name, success = outcome.success))]
    pub async fn on_outcome(&self, endpoint: &Endpoint, outcome: &ProbeOutcome) -> Result<()> {
        let open = self
            .store
            .open_incident_for(endpoint.id)
            .await
            .context("open incident lookup failed")?;

        match (outcome.success, open) {
            (true, Some(mut incident)) => {
                let resolved_at = Utc::now();
                self.store
                    .resolve_incident(incident.id, resolved_at)
                    .await
                    .context("failed to resolve incident")?;

                incident.status = IncidentStatus::Resolved;
                incident.resolved_at = Some(resolved_at);

                info!("incident {} resolved for endpoint {}", incident.id, endpoint.name);

                self.notifier
                    .notify(endpoint.service_id, IncidentEvent::IncidentResolved, &incident)
                    .await?;
            }

            (false, None) => {
                let incident = Incident::open(endpoint);
                self.store
                    .create_incident(&incident)
                    .await
                    .context("failed to create incident")?;

                warn!("incident {} opened for endpoint {}", incident.id, endpoint.name);

                self.notifier
                    .notify(endpoint.service_id, IncidentEvent::IncidentStart, &incident)
                    .await?;
            }

            // Healthy with nothing tracked, or failing with an incident
            // already open: nothing to do.
            (true, None) | (false, Some(_)) => {}
        }

        Ok(())
    }
}
