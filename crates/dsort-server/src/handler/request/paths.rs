//! Path parameter types for HTTP handlers.

use std::str::FromStr;

use dsort_core::JobId;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::handler::Result;

/// Path parameters addressing one sort job.
///
/// The id is kept as text so that values which are not UUIDs are reported as
/// unknown jobs rather than as malformed requests.
#[must_use]
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct SortPathParams {
    /// Identifier returned by `POST /sort/start`.
    pub sort_uuid: String,
}

impl SortPathParams {
    /// Parses the addressed job id.
    pub fn job_id(&self) -> Result<JobId> {
        Ok(JobId::from_str(&self.sort_uuid)?)
    }
}
