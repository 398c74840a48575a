pub mod aggregate;
pub mod config;
pub mod incident;
pub mod models;
pub mod probe;
pub mod retention;
pub mod scheduler;
pub mod store;
pub mod webhook;

pub use config::{Config, EngineConfig, read_config_file};
pub use models::{
    Endpoint, HttpMethod, Incident, IncidentEvent, IncidentStatus, MetricWindow, ProbeOutcome,
    WebhookSubscription,
};
pub use scheduler::{MonitorEngine, TaskId};
pub use store::{MemoryStore, Store, StoreError, StoreResult};
