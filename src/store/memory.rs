//! In-memory store (no persistence)
//!
//! Backs the test suite and single-process deployments of `beacond`. All
//! collections live behind one `RwLock`, which is more than enough for the
//! access pattern here: one writer task per endpoint plus the two singletons.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::{Endpoint, Incident, IncidentEvent, IncidentStatus, MetricWindow, ProbeOutcome, WebhookSubscription};

use super::backend::Store;
use super::error::{StoreError, StoreResult};

#[derive(Default)]
struct Inner {
    endpoints: HashMap<Uuid, Endpoint>,
    outcomes: Vec<ProbeOutcome>,
    incidents: HashMap<Uuid, Incident>,
    windows: Vec<MetricWindow>,
    webhooks: Vec<WebhookSubscription>,
}

/// In-memory `Store` implementation
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an endpoint.
    pub async fn upsert_endpoint(&self, endpoint: Endpoint) {
        self.inner.write().await.endpoints.insert(endpoint.id, endpoint);
    }

    /// Insert a webhook subscription.
    pub async fn insert_webhook(&self, webhook: WebhookSubscription) {
        self.inner.write().await.webhooks.push(webhook);
    }

    /// All stored outcomes, in insertion order.
    pub async fn outcomes(&self) -> Vec<ProbeOutcome> {
        self.inner.read().await.outcomes.clone()
    }

    /// All stored metric windows, in insertion order.
    pub async fn windows(&self) -> Vec<MetricWindow> {
        self.inner.read().await.windows.clone()
    }

    /// All incidents ever recorded for an endpoint.
    pub async fn incidents_for(&self, endpoint_id: Uuid) -> Vec<Incident> {
        let inner = self.inner.read().await;
        let mut incidents: Vec<_> = inner
            .incidents
            .values()
            .filter(|i| i.endpoint_id == endpoint_id)
            .cloned()
            .collect();
        incidents.sort_by_key(|i| i.started_at);
        incidents
    }

    /// Number of currently open incidents across all endpoints.
    pub async fn open_incident_count(&self) -> usize {
        self.inner
            .read()
            .await
            .incidents
            .values()
            .filter(|i| i.status == IncidentStatus::Open)
            .count()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get_endpoint(&self, id: Uuid) -> StoreResult<Endpoint> {
        self.inner
            .read()
            .await
            .endpoints
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("endpoint {id}")))
    }

    async fn list_enabled_endpoints(&self) -> StoreResult<Vec<Endpoint>> {
        let inner = self.inner.read().await;
        let mut endpoints: Vec<_> = inner
            .endpoints
            .values()
            .filter(|e| e.enabled)
            .cloned()
            .collect();
        endpoints.sort_by_key(|e| e.id);
        Ok(endpoints)
    }

    async fn create_outcome(&self, outcome: &ProbeOutcome) -> StoreResult<()> {
        self.inner.write().await.outcomes.push(outcome.clone());
        Ok(())
    }

    async fn list_outcomes_in_range(
        &self,
        endpoint_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> StoreResult<Vec<ProbeOutcome>> {
        let inner = self.inner.read().await;
        let mut outcomes: Vec<_> = inner
            .outcomes
            .iter()
            .filter(|o| o.endpoint_id == endpoint_id && o.timestamp >= start && o.timestamp <= end)
            .cloned()
            .collect();
        outcomes.sort_by_key(|o| o.timestamp);
        Ok(outcomes)
    }

    async fn delete_outcomes_before(&self, cutoff: DateTime<Utc>) -> StoreResult<usize> {
        let mut inner = self.inner.write().await;
        let before = inner.outcomes.len();
        inner.outcomes.retain(|o| o.timestamp >= cutoff);
        Ok(before - inner.outcomes.len())
    }

    async fn create_incident(&self, incident: &Incident) -> StoreResult<()> {
        self.inner
            .write()
            .await
            .incidents
            .insert(incident.id, incident.clone());
        Ok(())
    }

    async fn open_incident_for(&self, endpoint_id: Uuid) -> StoreResult<Option<Incident>> {
        let inner = self.inner.read().await;
        Ok(inner
            .incidents
            .values()
            .filter(|i| i.endpoint_id == endpoint_id && i.status == IncidentStatus::Open)
            .max_by_key(|i| i.started_at)
            .cloned())
    }

    async fn resolve_incident(&self, id: Uuid, resolved_at: DateTime<Utc>) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        let incident = inner
            .incidents
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("incident {id}")))?;
        incident.status = IncidentStatus::Resolved;
        incident.resolved_at = Some(resolved_at);
        Ok(())
    }

    async fn create_window(&self, window: &MetricWindow) -> StoreResult<()> {
        if window.window_start >= window.window_end {
            return Err(StoreError::InvalidData(format!(
                "window start {} is not before end {}",
                window.window_start, window.window_end
            )));
        }
        self.inner.write().await.windows.push(window.clone());
        Ok(())
    }

    async fn delete_windows_before(&self, cutoff: DateTime<Utc>) -> StoreResult<usize> {
        let mut inner = self.inner.write().await;
        let before = inner.windows.len();
        inner.windows.retain(|w| w.window_end >= cutoff);
        Ok(before - inner.windows.len())
    }

    async fn list_enabled_webhooks(
        &self,
        service_id: Uuid,
        event: IncidentEvent,
    ) -> StoreResult<Vec<WebhookSubscription>> {
        let inner = self.inner.read().await;
        Ok(inner
            .webhooks
            .iter()
            .filter(|w| w.enabled && w.service_id == service_id && w.events.contains(&event))
            .cloned()
            .collect())
    }
}
