//! Bodies of the internal engine signal routes.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Failure report from the sort engine.
#[must_use]
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Validate)]
pub struct FailSort {
    /// Why the sort failed.
    #[validate(length(min = 1, max = 4096))]
    pub reason: String,
}
