//! Typed requests, one per gateway operation.

use dsort_core::JobId;
use dsort_core::spec::SortSpecRequest;

/// Starts a sort job.
#[derive(Debug, Clone, PartialEq)]
pub struct StartSort {
    /// Specification of the job.
    pub spec: SortSpecRequest,
}

impl StartSort {
    /// Creates a start request for `spec`.
    pub fn new(spec: SortSpecRequest) -> Self {
        Self { spec }
    }
}

impl From<SortSpecRequest> for StartSort {
    fn from(spec: SortSpecRequest) -> Self {
        Self::new(spec)
    }
}

/// Aborts a sort job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AbortSort {
    /// Job to abort.
    pub sort_uuid: JobId,
}

impl AbortSort {
    /// Creates an abort request for job `sort_uuid`.
    pub fn new(sort_uuid: JobId) -> Self {
        Self { sort_uuid }
    }
}

/// Reads the metrics of a sort job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortMetrics {
    /// Job to read.
    pub sort_uuid: JobId,
}

impl SortMetrics {
    /// Creates a metrics request for job `sort_uuid`.
    pub fn new(sort_uuid: JobId) -> Self {
        Self { sort_uuid }
    }
}
