//! Recurring-task scheduler
//!
//! This module implements the task layer of the monitoring engine. Each
//! monitored endpoint gets its own recurring task, plus two singletons for
//! aggregation and retention.
//!
//! ## Architecture Overview
//!
//! ```text
//!               ┌─────────────────┐
//!               │  MonitorEngine  │
//!               └────────┬────────┘
//!                        │ spawns + registry
//!        ┌───────────────┼────────────────────┐
//!        │               │                    │
//! ┌──────▼───────┐ ┌─────▼───────┐   ┌────────▼───────┐
//! │ ProbeTask-1  │ │ ProbeTask-N │   │   Singletons   │
//! │ (endpoint A) │ │ (endpoint N)│   │ aggregate,     │
//! └──────┬───────┘ └─────┬───────┘   │ cleanup        │
//!        │               │           └────────────────┘
//!        └───────┬───────┘
//!                │ per iteration
//!        ┌───────▼────────────────────────────┐
//!        │ probe → record → incident → hooks  │
//!        └────────────────────────────────────┘
//! ```
//!
//! Each task is an independent tokio task driven by an interval ticker raced
//! against an mpsc command channel (RunNow, Shutdown). The engine holds the
//! handles in one registry so that cancel-all can enumerate everything.

pub mod engine;
pub mod retry;
pub mod task;

mod actions;

pub use engine::{BatchReport, MonitorEngine};
pub use retry::RetryPolicy;
pub use task::{TaskAction, TaskHandle, TaskId};
