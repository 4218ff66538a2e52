//! Health reporting for the sort service.

use std::collections::BTreeMap;

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Represents the operational status of a service.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
pub enum ServiceStatus {
    /// Service is operating normally
    #[default]
    Healthy,
    /// Service is operating with some issues but still functional
    Degraded,
    /// Service is not operational
    Unhealthy,
}

/// Health information for a service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
pub struct ServiceHealth {
    /// Current service status
    pub status: ServiceStatus,
    /// Optional message describing the current state
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Timestamp when the health check was performed
    pub checked_at: Timestamp,
    /// Additional metrics about the service
    #[serde(default)]
    pub metrics: BTreeMap<String, Value>,
}

impl ServiceHealth {
    fn with_status(status: ServiceStatus, message: Option<String>) -> Self {
        Self {
            status,
            message,
            checked_at: Timestamp::now(),
            metrics: BTreeMap::new(),
        }
    }

    /// Creates a new healthy service health report.
    pub fn healthy() -> Self {
        Self::with_status(ServiceStatus::Healthy, None)
    }

    /// Creates a new degraded service health report.
    pub fn degraded(message: impl Into<String>) -> Self {
        Self::with_status(ServiceStatus::Degraded, Some(message.into()))
    }

    /// Creates a new unhealthy service health report.
    pub fn unhealthy(message: impl Into<String>) -> Self {
        Self::with_status(ServiceStatus::Unhealthy, Some(message.into()))
    }

    /// Adds a metric to the health report.
    pub fn with_metric(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metrics.insert(key.into(), value.into());
        self
    }

    /// Returns `true` unless the service is unhealthy.
    pub fn is_operational(&self) -> bool {
        self.status != ServiceStatus::Unhealthy
    }
}
