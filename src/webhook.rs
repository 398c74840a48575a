//! Webhook notifier - delivers incident transition events
//!
//! Delivery is best-effort with exactly one attempt per subscription: a
//! subscription that is down, slow or misconfigured gets a warning in the log
//! and nothing else. There is no retry queue and no exactly-once guarantee.
//!
//! The notifier owns its own HTTP client with a fixed short timeout so that a
//! hanging webhook receiver can never stall a probe task beyond that bound.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, instrument, trace, warn};
use uuid::Uuid;

use crate::models::{Incident, IncidentEvent, WebhookSubscription};
use crate::store::Store;

/// Hard deadline for a single webhook delivery
pub const DELIVERY_TIMEOUT: Duration = Duration::from_secs(10);

/// JSON body POSTed to subscribed webhooks
///
/// `resolved_at` is omitted entirely while the incident is still open.
#[derive(Debug, Clone, Serialize)]
pub struct WebhookPayload {
    pub event: IncidentEvent,
    pub incident_id: Uuid,
    pub endpoint_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
}

impl WebhookPayload {
    pub fn new(event: IncidentEvent, incident: &Incident) -> Self {
        Self {
            event,
            incident_id: incident.id,
            endpoint_id: incident.endpoint_id,
            started_at: incident.started_at,
            message: incident.message.clone(),
            resolved_at: incident.resolved_at,
        }
    }
}

/// Delivers incident events to a service's enabled subscriptions
pub struct WebhookNotifier {
    store: Arc<dyn Store>,
    client: reqwest::Client,
}

impl WebhookNotifier {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self::with_timeout(store, DELIVERY_TIMEOUT)
    }

    pub fn with_timeout(store: Arc<dyn Store>, timeout: Duration) -> Self {
        Self {
            store,
            client: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .expect("Failed to build HTTP client"),
        }
    }

    /// Notify every enabled subscription of the service that listens for
    /// `event`.
    ///
    /// Per-subscription delivery failures are swallowed: one unreachable
    /// receiver must not block the others or fail the probe iteration. Only a
    /// failing subscription lookup is reported to the caller.
    #[instrument(skip(self, incident), fields(event = %event))]
    pub async fn notify(
        &self,
        service_id: Uuid,
        event: IncidentEvent,
        incident: &Incident,
    ) -> Result<()> {
        let subscriptions = self
            .store
            .list_enabled_webhooks(service_id, event)
            .await
            .context("failed to list webhook subscriptions")?;

        if subscriptions.is_empty() {
            trace!("no subscriptions for {event}");
            return Ok(());
        }

        let payload = WebhookPayload::new(event, incident);

        for subscription in &subscriptions {
            self.deliver(subscription, &payload).await;
        }

        Ok(())
    }

    /// Single delivery attempt, fire-and-forget.
    async fn deliver(&self, subscription: &WebhookSubscription, payload: &WebhookPayload) {
        let mut request = self.client.post(&subscription.url).json(payload);

        for (key, value) in &subscription.headers {
            request = request.header(key, value);
        }

        match request.send().await {
            Ok(response) if response.status().is_success() => {
                debug!("delivered {} to {}", payload.event, subscription.url);
            }
            Ok(response) => {
                warn!(
                    "webhook {} responded with status {}",
                    subscription.url,
                    response.status()
                );
            }
            Err(e) => {
                warn!("failed to deliver webhook to {}: {e}", subscription.url);
            }
        }
    }
}
