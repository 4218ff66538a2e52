#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

/// Tracing target for job store operations.
pub const TRACING_TARGET_STORE: &str = "dsort_core::store";

/// Tracing target for lifecycle controller operations.
pub const TRACING_TARGET_CONTROLLER: &str = "dsort_core::controller";

/// Tracing target for sort engine operations.
pub const TRACING_TARGET_ENGINE: &str = "dsort_core::engine";

mod controller;
mod error;
mod health;
mod job;
mod store;

pub mod engine;
pub mod prelude;
pub mod spec;

pub use controller::JobController;
pub use error::{BoxedError, Error, ErrorKind, Result};
pub use health::{ServiceHealth, ServiceStatus};
pub use job::{Job, JobId, JobState, JobSummary, Metrics, MetricsSnapshot};
pub use store::{DEFAULT_MAX_JOBS, JobStore};
