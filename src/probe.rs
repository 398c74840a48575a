//! Probe executor - one HTTP check against one endpoint
//!
//! The executor builds a request from the endpoint configuration, applies the
//! per-request deadline, classifies the result and persists the outcome. It
//! never retries: retrying transient transport failures is the scheduler's
//! concern, which is why the single attempt is exposed separately from the
//! classification of an unreachable endpoint.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{instrument, trace, warn};

use crate::models::{Endpoint, ProbeOutcome};
use crate::store::Store;

/// Issues probe requests and records their outcomes
pub struct ProbeExecutor {
    store: Arc<dyn Store>,

    /// HTTP client, reused across requests. Per-request timeouts come from
    /// the endpoint configuration, not the client.
    client: reqwest::Client,
}

impl ProbeExecutor {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            client: reqwest::Client::builder()
                .build()
                .expect("Failed to build HTTP client"),
        }
    }

    /// Probe an endpoint once and persist the outcome.
    ///
    /// Every path produces a persisted outcome: a response with the expected
    /// status (success), a response with any other status (failure), or no
    /// response at all (failure with status 0). The returned value is the
    /// in-memory outcome the incident tracker acts on, decoupled from the
    /// persistence write.
    ///
    /// Only a failed store write surfaces as an error.
    #[instrument(skip(self, endpoint), fields(endpoint = %endpoint.name))]
    pub async fn probe(&self, endpoint: &Endpoint) -> Result<ProbeOutcome> {
        let outcome = match self.attempt(endpoint).await {
            Ok(outcome) => outcome,
            Err(e) => self.unreachable(endpoint, &e),
        };
        self.record(&outcome).await?;
        Ok(outcome)
    }

    /// Execute a single HTTP attempt and classify the response.
    ///
    /// Returns an error only when no response was received (transport error
    /// or timeout); the caller decides whether to retry or to classify the
    /// endpoint as unreachable via [`ProbeExecutor::unreachable`].
    pub async fn attempt(&self, endpoint: &Endpoint) -> Result<ProbeOutcome> {
        trace!("probing {} {}", endpoint.method.as_str(), endpoint.url);

        let mut request = self
            .client
            .request(endpoint.method.into(), &endpoint.url)
            .timeout(Duration::from_millis(endpoint.timeout_ms));

        for (key, value) in &endpoint.headers {
            request = request.header(key, value);
        }

        let start = Instant::now();
        let response = request.send().await.context("probe request failed")?;
        let latency_ms = start.elapsed().as_millis() as u64;

        let status_code = response.status().as_u16();
        let success = status_code == endpoint.expected_status;
        let error = if success {
            None
        } else {
            Some(format!(
                "expected status {} but got {}",
                endpoint.expected_status, status_code
            ))
        };

        Ok(ProbeOutcome {
            endpoint_id: endpoint.id,
            status_code,
            latency_ms,
            success,
            error,
            timestamp: Utc::now(),
        })
    }

    /// Classify an endpoint that produced no response as a failure outcome.
    ///
    /// `status_code` is 0 because nothing was received; the latency is not
    /// meaningful for an aborted request and is recorded as 0.
    pub fn unreachable(&self, endpoint: &Endpoint, cause: &anyhow::Error) -> ProbeOutcome {
        warn!("endpoint {} unreachable: {:#}", endpoint.name, cause);

        ProbeOutcome {
            endpoint_id: endpoint.id,
            status_code: 0,
            latency_ms: 0,
            success: false,
            error: Some(format!("{cause:#}")),
            timestamp: Utc::now(),
        }
    }

    /// Persist an outcome. Outcomes are append-only.
    pub async fn record(&self, outcome: &ProbeOutcome) -> Result<()> {
        self.store
            .create_outcome(outcome)
            .await
            .context("failed to save probe outcome")?;
        Ok(())
    }
}
