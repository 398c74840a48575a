//! Helper functions for integration tests

use std::collections::HashMap;

use beacon::config::EngineConfig;
use beacon::models::{Endpoint, HttpMethod, IncidentEvent, WebhookSubscription};
use uuid::Uuid;

pub fn create_test_endpoint(service_id: Uuid, url: String) -> Endpoint {
    Endpoint {
        id: Uuid::new_v4(),
        service_id,
        name: "test-endpoint".to_string(),
        url,
        method: HttpMethod::Get,
        headers: HashMap::new(),
        expected_status: 200,
        timeout_ms: 1000,
        // Large interval so only the immediate first tick and manual
        // run_now calls drive iterations during a test
        interval_secs: 3600,
        enabled: true,
    }
}

pub fn create_test_webhook(
    service_id: Uuid,
    url: String,
    events: Vec<IncidentEvent>,
) -> WebhookSubscription {
    WebhookSubscription {
        id: Uuid::new_v4(),
        service_id,
        name: "test-hook".to_string(),
        url,
        events,
        headers: HashMap::new(),
        enabled: true,
    }
}

pub fn fast_engine_config() -> EngineConfig {
    EngineConfig {
        max_attempts: 2,
        retry_backoff_ms: 1,
        window_secs: 300,
        sweep_interval_secs: 3600,
        retention_days: 30,
        webhook_timeout_secs: 2,
    }
}
