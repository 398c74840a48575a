//! Store trait consumed by the monitoring core
//!
//! Durability, indexing and transactional guarantees are the implementation's
//! responsibility; the core only relies on the operations below.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{Endpoint, Incident, IncidentEvent, MetricWindow, ProbeOutcome, WebhookSubscription};

use super::error::StoreResult;

/// Persistence operations required by the scheduler and its tasks
///
/// Implementations must be `Send + Sync`; every component holds the store as
/// `Arc<dyn Store>` and calls it from independent tokio tasks. Each entity
/// has exactly one owning task, so the store only needs row-level
/// read-modify-write consistency, not distributed locking.
#[async_trait]
pub trait Store: Send + Sync {
    // === Endpoints ===

    /// Fetch one endpoint by id.
    ///
    /// Returns `StoreError::NotFound` if no such endpoint exists; the caller
    /// treats that as a configuration error, not a transient failure.
    async fn get_endpoint(&self, id: Uuid) -> StoreResult<Endpoint>;

    /// All endpoints with the enabled flag set.
    ///
    /// Used to derive the live task set, both at startup and on `start_all`.
    async fn list_enabled_endpoints(&self) -> StoreResult<Vec<Endpoint>>;

    // === Probe outcomes (append-only) ===

    async fn create_outcome(&self, outcome: &ProbeOutcome) -> StoreResult<()>;

    /// Outcomes for one endpoint with `start <= timestamp <= end`, ordered by
    /// timestamp ascending.
    async fn list_outcomes_in_range(
        &self,
        endpoint_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> StoreResult<Vec<ProbeOutcome>>;

    /// Hard-delete outcomes older than the cutoff. Returns the deleted count.
    async fn delete_outcomes_before(&self, cutoff: DateTime<Utc>) -> StoreResult<usize>;

    // === Incidents ===

    async fn create_incident(&self, incident: &Incident) -> StoreResult<()>;

    /// The open incident for an endpoint, if any.
    ///
    /// `Ok(None)` is the normal "endpoint is healthy" answer and must never
    /// be folded into the error path.
    async fn open_incident_for(&self, endpoint_id: Uuid) -> StoreResult<Option<Incident>>;

    /// Mark an incident resolved, stamping `resolved_at`.
    async fn resolve_incident(&self, id: Uuid, resolved_at: DateTime<Utc>) -> StoreResult<()>;

    // === Metric windows ===

    async fn create_window(&self, window: &MetricWindow) -> StoreResult<()>;

    /// Hard-delete windows whose end is older than the cutoff. Returns the
    /// deleted count.
    async fn delete_windows_before(&self, cutoff: DateTime<Utc>) -> StoreResult<usize>;

    // === Webhook subscriptions ===

    /// Enabled subscriptions of a service that listen for the given event.
    async fn list_enabled_webhooks(
        &self,
        service_id: Uuid,
        event: IncidentEvent,
    ) -> StoreResult<Vec<WebhookSubscription>>;
}
