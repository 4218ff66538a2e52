//! Convenient re-exports for common use.

pub use crate::engine::{EngineEvent, SortEngine};
pub use crate::error::{Error, ErrorKind, Result};
pub use crate::job::{JobId, JobState, Metrics, MetricsSnapshot};
pub use crate::spec::{SortSpec, SortSpecRequest};
pub use crate::{JobController, JobStore};
