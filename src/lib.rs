//! SANDWICH-SENTINEL
//!
//! A streaming detector for sandwich-attack MEV: watches pending
//! transactions, batches them, flags frontrun/victim/backrun triples, and
//! publishes confirmed findings.
//!
//! - Mempool subscription with reconnect/backoff
//! - Size/time batching
//! - Pure-function pattern detection
//! - Fail-closed historical validation, fail-open deduplication
//! - At-least-once publishing with bounded retry

pub mod batcher;
pub mod config;
pub mod dedup;
pub mod detector;
pub mod finding;
pub mod mempool;
pub mod metrics;
pub mod publisher;
pub mod supervisor;
pub mod transaction;
pub mod validator;

pub use config::Config;
pub use finding::{Alert, Finding};
pub use metrics::{HealthSnapshot, Metrics};
pub use supervisor::Supervisor;
pub use transaction::{Batch, Transaction};
