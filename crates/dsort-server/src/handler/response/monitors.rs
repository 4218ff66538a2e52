//! Monitor response types.

use dsort_core::ServiceHealth;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Health report of the gateway and its job store.
#[must_use]
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct MonitorStatus {
    /// Application version.
    pub version: String,
    /// Status, check time and store metrics.
    #[serde(flatten)]
    pub health: ServiceHealth,
}

impl MonitorStatus {
    /// Wraps `health` with the running application version.
    pub fn new(health: ServiceHealth) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_owned(),
            health,
        }
    }
}
