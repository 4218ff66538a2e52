use std::sync::Arc;
use std::time::Duration;

#[cfg(feature = "config")]
use clap::{Args, ValueEnum};
use derive_builder::Builder;
use dsort_core::engine::{
    EventSender, ExternalEngine, SimulatedEngine, SimulatedEngineConfig, SortEngine,
};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use tokio_util::sync::CancellationToken;

/// Default values for configuration options.
mod defaults {
    /// Default number of retained jobs.
    pub const MAX_JOBS: usize = dsort_core::DEFAULT_MAX_JOBS;

    /// Default retention of finished jobs in seconds.
    pub const RETENTION_SECS: u64 = 3600;

    /// Default pause between retention sweeps in seconds.
    pub const SWEEP_INTERVAL_SECS: u64 = 60;

    /// Default pause between simulated progress reports in milliseconds.
    pub const SIMULATED_STEP_MS: u64 = 50;

    /// Default capacity of the engine event channel.
    pub const EVENT_CAPACITY: usize = dsort_core::engine::DEFAULT_EVENT_CAPACITY;
}

/// Engine that executes started sort jobs.
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
#[cfg_attr(feature = "config", derive(ValueEnum))]
pub enum EngineKind {
    /// Jobs run in an outside engine that reports through the internal routes.
    #[default]
    External,
    /// Jobs run in-process on timers.
    Simulated,
}

/// App [`state`] configuration.
///
/// [`state`]: crate::service::ServiceState
#[derive(Debug, Clone, Serialize, Deserialize, Builder)]
#[cfg_attr(feature = "config", derive(Args))]
#[must_use = "config does nothing unless you use it"]
#[builder(
    pattern = "owned",
    setter(into, strip_option, prefix = "with"),
    build_fn(validate = "Self::validate")
)]
pub struct ServiceConfig {
    /// Maximum number of jobs kept in the store.
    #[cfg_attr(
        feature = "config",
        arg(long, env = "DSORT_MAX_JOBS", default_value_t = defaults::MAX_JOBS)
    )]
    #[builder(default = "defaults::MAX_JOBS")]
    pub max_jobs: usize,

    /// Seconds a finished job stays observable before it is evicted.
    #[cfg_attr(
        feature = "config",
        arg(long, env = "DSORT_RETENTION_SECS", default_value_t = defaults::RETENTION_SECS)
    )]
    #[builder(default = "defaults::RETENTION_SECS")]
    pub retention_secs: u64,

    /// Seconds between two retention sweeps.
    #[cfg_attr(
        feature = "config",
        arg(long, env = "DSORT_SWEEP_INTERVAL_SECS", default_value_t = defaults::SWEEP_INTERVAL_SECS)
    )]
    #[builder(default = "defaults::SWEEP_INTERVAL_SECS")]
    pub sweep_interval_secs: u64,

    /// Bearer token required on the sort and internal routes.
    ///
    /// The gateway is open when unset.
    #[cfg_attr(feature = "config", arg(long, env = "DSORT_API_TOKEN"))]
    #[serde(default, skip_serializing)]
    #[builder(default)]
    pub api_token: Option<String>,

    /// Engine executing started jobs.
    #[cfg_attr(
        feature = "config",
        arg(long, env = "DSORT_ENGINE", value_enum, default_value_t = EngineKind::External)
    )]
    #[builder(default)]
    pub engine: EngineKind,

    /// Milliseconds between progress reports of the simulated engine.
    #[cfg_attr(
        feature = "config",
        arg(long, env = "DSORT_SIMULATED_STEP_MS", default_value_t = defaults::SIMULATED_STEP_MS)
    )]
    #[builder(default = "defaults::SIMULATED_STEP_MS")]
    pub simulated_step_ms: u64,

    /// Capacity of the engine event channel.
    #[cfg_attr(
        feature = "config",
        arg(long, env = "DSORT_EVENT_CAPACITY", default_value_t = defaults::EVENT_CAPACITY)
    )]
    #[builder(default = "defaults::EVENT_CAPACITY")]
    pub event_capacity: usize,
}

impl ServiceConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> ServiceConfigBuilder {
        ServiceConfigBuilder::default()
    }

    /// Returns how long finished jobs are retained.
    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_secs)
    }

    /// Returns the pause between retention sweeps.
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    /// Returns the configured token, ignoring blank values.
    pub fn api_token(&self) -> Option<&str> {
        self.api_token.as_deref().filter(|token| !token.trim().is_empty())
    }

    /// Creates the configured engine.
    ///
    /// The simulated engine reports through `events` and stops silently once
    /// `shutdown` is cancelled. The external engine reports nothing.
    pub fn create_engine(
        &self,
        events: EventSender,
        shutdown: CancellationToken,
    ) -> Arc<dyn SortEngine> {
        match self.engine {
            EngineKind::External => Arc::new(ExternalEngine),
            EngineKind::Simulated => {
                let config = SimulatedEngineConfig {
                    step: Duration::from_millis(self.simulated_step_ms),
                    ..SimulatedEngineConfig::default()
                };
                Arc::new(SimulatedEngine::new(events, config).with_shutdown(shutdown))
            }
        }
    }
}

impl ServiceConfigBuilder {
    fn validate(builder: &ServiceConfigBuilder) -> Result<(), String> {
        if builder.max_jobs == Some(0) {
            return Err("Maximum number of jobs must be greater than 0".to_owned());
        }

        if builder.sweep_interval_secs == Some(0) {
            return Err("Sweep interval must be at least 1 second".to_owned());
        }

        if builder.simulated_step_ms == Some(0) {
            return Err("Simulated step must be at least 1 millisecond".to_owned());
        }

        if builder.event_capacity == Some(0) {
            return Err("Event channel capacity must be greater than 0".to_owned());
        }

        Ok(())
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            max_jobs: defaults::MAX_JOBS,
            retention_secs: defaults::RETENTION_SECS,
            sweep_interval_secs: defaults::SWEEP_INTERVAL_SECS,
            api_token: None,
            engine: EngineKind::default(),
            simulated_step_ms: defaults::SIMULATED_STEP_MS,
            event_capacity: defaults::EVENT_CAPACITY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_applies_defaults() {
        let config = ServiceConfig::builder()
            .with_api_token("secret")
            .build()
            .unwrap();

        assert_eq!(config.max_jobs, 10_000);
        assert_eq!(config.retention(), Duration::from_secs(3600));
        assert_eq!(config.sweep_interval(), Duration::from_secs(60));
        assert_eq!(config.engine, EngineKind::External);
        assert_eq!(config.api_token(), Some("secret"));
    }

    #[test]
    fn builder_rejects_zero_capacity() {
        let result = ServiceConfig::builder().with_max_jobs(0usize).build();
        assert!(result.is_err());
    }

    #[test]
    fn blank_token_disables_authentication() {
        let config = ServiceConfig {
            api_token: Some("  ".to_owned()),
            ..ServiceConfig::default()
        };
        assert_eq!(config.api_token(), None);
    }

    #[test]
    fn engine_kind_parses() {
        assert_eq!("simulated".parse::<EngineKind>().unwrap(), EngineKind::Simulated);
        assert_eq!(EngineKind::External.to_string(), "external");
    }
}
