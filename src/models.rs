//! Core entities shared between the scheduler, the probing pipeline and the
//! store.
//!
//! All entities are owned by the store; the monitoring core only holds
//! transient copies for the duration of one task iteration. `ProbeOutcome` is
//! append-only and never updated after creation.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A monitored HTTP target with its polling configuration.
///
/// Endpoints are read fresh from the store at the start of every probe cycle,
/// so configuration edits take effect on the next iteration without
/// restarting the task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Endpoint {
    pub id: Uuid,

    /// Owning service (tenant).
    pub service_id: Uuid,

    /// Display name, used to derive incident messages.
    pub name: String,

    pub url: String,

    #[serde(default)]
    pub method: HttpMethod,

    /// Custom headers sent with every probe request.
    #[serde(default)]
    pub headers: HashMap<String, String>,

    /// The exact status code that counts as success.
    pub expected_status: u16,

    /// Hard deadline for a single probe request.
    pub timeout_ms: u64,

    /// Seconds between probe cycles.
    pub interval_secs: u64,

    pub enabled: bool,
}

/// HTTP method used for probe requests
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
    Delete,
    Head,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Head => "HEAD",
        }
    }
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Delete => reqwest::Method::DELETE,
            HttpMethod::Head => reqwest::Method::HEAD,
        }
    }
}

/// Result of a single classified probe against an endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeOutcome {
    pub endpoint_id: Uuid,

    /// Observed status code; 0 when no response was received at all.
    pub status_code: u16,

    pub latency_ms: u64,

    pub success: bool,

    /// Human-readable cause, set on failure.
    pub error: Option<String>,

    pub timestamp: DateTime<Utc>,
}

/// A tracked period during which an endpoint is considered down.
///
/// Invariant: at most one open incident exists per endpoint at any time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Incident {
    pub id: Uuid,
    pub endpoint_id: Uuid,
    pub status: IncidentStatus,
    pub started_at: DateTime<Utc>,

    /// None while the incident is open.
    pub resolved_at: Option<DateTime<Utc>>,

    pub message: String,
}

impl Incident {
    /// Open a new incident for a failing endpoint.
    pub fn open(endpoint: &Endpoint) -> Self {
        Self {
            id: Uuid::new_v4(),
            endpoint_id: endpoint.id,
            status: IncidentStatus::Open,
            started_at: Utc::now(),
            resolved_at: None,
            message: format!("Endpoint {} is down", endpoint.name),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncidentStatus {
    Open,
    Resolved,
}

impl std::fmt::Display for IncidentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IncidentStatus::Open => write!(f, "open"),
            IncidentStatus::Resolved => write!(f, "resolved"),
        }
    }
}

/// Incident state transitions that webhook subscriptions can listen for.
///
/// Closed set on purpose: the payload shape is shared across variants, and
/// consumers match on the tag rather than an open string map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncidentEvent {
    IncidentStart,
    IncidentResolved,
}

impl IncidentEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            IncidentEvent::IncidentStart => "incident_start",
            IncidentEvent::IncidentResolved => "incident_resolved",
        }
    }
}

impl std::fmt::Display for IncidentEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Probe outcomes summarized over one fixed time bucket.
///
/// Windows are epoch-aligned, contiguous and non-overlapping. A window with
/// `total_probes == 0` is never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricWindow {
    pub id: Uuid,
    pub endpoint_id: Uuid,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub total_probes: u64,
    pub success_probes: u64,

    /// Integer average (truncating division).
    pub avg_latency_ms: u64,
    pub min_latency_ms: u64,
    pub max_latency_ms: u64,
}

/// A registered external URL notified on incident state transitions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookSubscription {
    pub id: Uuid,
    pub service_id: Uuid,
    pub name: String,
    pub url: String,

    /// Events this subscription wants to receive.
    pub events: Vec<IncidentEvent>,

    /// Custom headers added to every delivery.
    #[serde(default)]
    pub headers: HashMap<String, String>,

    pub enabled: bool,
}
