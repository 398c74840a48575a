//! Configuration file handling for the daemon
//!
//! The config file is JSON: a list of services (each with its endpoints and
//! webhook subscriptions) plus engine settings. Every engine setting has a
//! default, so a minimal config only lists what to monitor.

use std::collections::HashMap;
use std::time::Duration;

use tracing::trace;
use uuid::Uuid;

use crate::models::{Endpoint, HttpMethod, IncidentEvent, WebhookSubscription};
use crate::scheduler::RetryPolicy;

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Config {
    pub services: Option<Vec<ServiceConfig>>,

    #[serde(default)]
    pub engine: EngineConfig,
}

/// One tenant service with its monitored endpoints and webhooks
#[derive(Debug, Clone, serde::Deserialize)]
pub struct ServiceConfig {
    pub name: String,

    #[serde(default)]
    pub endpoints: Vec<EndpointConfig>,

    #[serde(default)]
    pub webhooks: Vec<WebhookConfig>,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct EndpointConfig {
    pub name: String,
    pub url: String,

    #[serde(default)]
    pub method: HttpMethod,

    #[serde(default)]
    pub headers: HashMap<String, String>,

    #[serde(default = "default_expected_status")]
    pub expected_status: u16,

    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct WebhookConfig {
    pub name: String,
    pub url: String,

    pub events: Vec<IncidentEvent>,

    #[serde(default)]
    pub headers: HashMap<String, String>,

    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

/// Scheduler and retention settings
#[derive(Debug, Clone, serde::Deserialize)]
pub struct EngineConfig {
    /// Attempts per task iteration, including the first one
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Initial backoff between retry attempts
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Metric window duration; also the aggregate task cadence
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,

    /// Cadence of the retention cleanup task
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,

    /// Probe data older than this is purged
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,

    /// Hard deadline for one webhook delivery
    #[serde(default = "default_webhook_timeout_secs")]
    pub webhook_timeout_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            retry_backoff_ms: default_retry_backoff_ms(),
            window_secs: default_window_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
            retention_days: default_retention_days(),
            webhook_timeout_secs: default_webhook_timeout_secs(),
        }
    }
}

impl EngineConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            backoff: Duration::from_millis(self.retry_backoff_ms),
        }
    }

    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn webhook_timeout(&self) -> Duration {
        Duration::from_secs(self.webhook_timeout_secs)
    }
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    1000
}

fn default_window_secs() -> u64 {
    300
}

fn default_sweep_interval_secs() -> u64 {
    24 * 60 * 60
}

fn default_retention_days() -> u32 {
    30
}

fn default_webhook_timeout_secs() -> u64 {
    10
}

fn default_expected_status() -> u16 {
    200
}

fn default_timeout_ms() -> u64 {
    5000
}

fn default_interval_secs() -> u64 {
    15
}

fn default_enabled() -> bool {
    true
}

impl Config {
    /// Turn the config into store records, assigning one fresh service id per
    /// service entry.
    pub fn materialize(&self) -> (Vec<Endpoint>, Vec<WebhookSubscription>) {
        let mut endpoints = Vec::new();
        let mut webhooks = Vec::new();

        for service in self.services.as_deref().unwrap_or_default() {
            let service_id = Uuid::new_v4();

            for endpoint in &service.endpoints {
                endpoints.push(Endpoint {
                    id: Uuid::new_v4(),
                    service_id,
                    name: endpoint.name.clone(),
                    url: endpoint.url.clone(),
                    method: endpoint.method,
                    headers: endpoint.headers.clone(),
                    expected_status: endpoint.expected_status,
                    timeout_ms: endpoint.timeout_ms,
                    interval_secs: endpoint.interval_secs,
                    enabled: endpoint.enabled,
                });
            }

            for webhook in &service.webhooks {
                webhooks.push(WebhookSubscription {
                    id: Uuid::new_v4(),
                    service_id,
                    name: webhook.name.clone(),
                    url: webhook.url.clone(),
                    events: webhook.events.clone(),
                    headers: webhook.headers.clone(),
                    enabled: webhook.enabled,
                });
            }
        }

        (endpoints, webhooks)
    }
}

pub fn read_config_file(path: &str) -> anyhow::Result<Config> {
    let file_content = std::fs::read_to_string(path)?;
    serde_json::from_str(&file_content)
        .map_err(|e| anyhow::anyhow!("Invalid configuration file provided: {e}"))
        .inspect(|config| trace!("loaded config: {config:?}"))
}
