//! Store abstraction for monitoring state
//!
//! The monitoring core reads and writes all durable state through the
//! [`Store`] trait: endpoints, probe outcomes, incidents, metric windows and
//! webhook subscriptions. Backends own durability and indexing; the core only
//! depends on the operations declared here.
//!
//! The crate ships [`MemoryStore`] for tests and single-process deployments.
//! Database-backed implementations live outside the core.

pub mod backend;
pub mod error;
pub mod memory;

pub use backend::Store;
pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
