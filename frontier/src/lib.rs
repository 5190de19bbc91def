//! # frontier
//!
//! A shared crawl frontier for many independent worker processes.
//!
//! The frontier is the backlog of pending fetch targets plus the duplicate
//! filter that keeps a crawl job from fetching the same resource twice. All
//! of its state lives in one shared store (Redis in production), and every
//! operation is a single atomic round-trip against it, so workers on
//! different machines cooperate without talking to each other and a worker
//! that dies loses at most the one request it had popped.
//!
//! ## Modules
//!
//! - `request`: the pending fetch target and its JSON wire form.
//! - `fingerprint`: url canonicalization and request fingerprints.
//! - `dupefilter`: atomic test-and-set over the fingerprint set.
//! - `queue`: the FIFO backlog.
//! - `seeds`: start url loading and the external seed set.
//! - `scheduler`: `next_request` / `report_discovered` for workers.
//! - `worker`: a worker loop driving a user supplied `PageHandler`.
pub mod dupefilter;
pub mod error;
pub mod fingerprint;
pub mod logging;
pub mod queue;
pub mod request;
pub mod retry;
pub mod scheduler;
pub mod seeds;
#[cfg(test)]
mod testing;
pub mod worker;

pub use crate::dupefilter::{Admission, DupeFilter};
pub use crate::error::FrontierError;
pub use crate::fingerprint::{Fingerprint, canonicalize_url, fingerprint};
pub use crate::logging::init_logging;
pub use crate::queue::FrontierQueue;
pub use crate::request::{Method, Request};
pub use crate::retry::RetryPolicy;
pub use crate::scheduler::{AdmissionReport, DiscoveryReport, Scheduler, SchedulerStats};
pub use crate::seeds::{SeedLoader, SeedReport};
pub use crate::worker::{
    PageHandler, Worker, WorkerId, WorkerOptions, WorkerOptionsBuilder, WorkerStats,
    run_workers, shutdown_on_ctrl_c,
};

// re-export
pub use async_trait;
pub use frontier_config as config;
pub use frontier_store as store;
pub use tracing;
