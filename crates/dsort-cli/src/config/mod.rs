//! CLI configuration management.
//!
//! ```text
//! Cli
//! ├── server: ServerConfig         # Host, port, shutdown
//! ├── middleware: MiddlewareConfig # CORS, OpenAPI, request timeout
//! ├── service: ServiceConfig       # Job store, retention, engine, token
//! └── log_format: LogFormat        # Pretty or JSON logs
//! ```
//!
//! All configuration can be provided via CLI arguments or environment variables.
//!
//! ```bash
//! dsort --port 8080 --engine simulated
//! PORT=8080 DSORT_ENGINE=simulated dsort
//! ```

mod middleware;
mod server;

use std::process;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use dsort_server::service::ServiceConfig;
use serde::{Deserialize, Serialize};

pub use self::middleware::MiddlewareConfig;
pub use self::server::ServerConfig;
use crate::{TRACING_TARGET_CONFIG, TRACING_TARGET_SERVER_STARTUP};

/// Output format of the log subscriber.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

/// Complete CLI configuration.
#[derive(Debug, Clone, Parser, Serialize, Deserialize)]
#[command(name = "dsort")]
#[command(about = "Distributed sort job gateway")]
#[command(version)]
pub struct Cli {
    /// Server network and lifecycle configuration.
    #[clap(flatten)]
    pub server: ServerConfig,

    /// HTTP middleware configuration.
    #[clap(flatten)]
    pub middleware: MiddlewareConfig,

    /// Job store, retention and engine configuration.
    #[clap(flatten)]
    pub service: ServiceConfig,

    /// Log output format.
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    #[serde(default)]
    pub log_format: LogFormat,
}

impl Cli {
    /// Loads `.env` (with the `dotenv` feature) and parses CLI arguments.
    pub fn init() -> Self {
        Self::load_dotenv();
        Self::parse()
    }

    #[cfg(feature = "dotenv")]
    fn load_dotenv() {
        if let Err(err) = dotenvy::dotenv()
            && !err.not_found()
        {
            eprintln!("Warning: failed to load .env file: {err}");
        }
    }

    #[cfg(not(feature = "dotenv"))]
    fn load_dotenv() {}

    /// Validates all configuration values.
    pub fn validate(&self) -> anyhow::Result<()> {
        self.server
            .validate()
            .context("invalid server configuration")?;
        self.middleware
            .recovery
            .validate()
            .map_err(anyhow::Error::msg)
            .context("invalid middleware configuration")?;
        ServiceConfig::builder()
            .with_max_jobs(self.service.max_jobs)
            .with_retention_secs(self.service.retention_secs)
            .with_sweep_interval_secs(self.service.sweep_interval_secs)
            .with_simulated_step_ms(self.service.simulated_step_ms)
            .with_event_capacity(self.service.event_capacity)
            .build()
            .context("invalid service configuration")?;
        Ok(())
    }

    /// Logs configuration at startup. The bearer token is never logged.
    pub fn log(&self) {
        Self::log_build_info();
        self.server.log();
        self.middleware.log();

        tracing::info!(
            target: TRACING_TARGET_CONFIG,
            max_jobs = self.service.max_jobs,
            retention_secs = self.service.retention_secs,
            sweep_interval_secs = self.service.sweep_interval_secs,
            engine = %self.service.engine,
            token_configured = self.service.api_token().is_some(),
            "Service configuration"
        );

        if self.service.api_token().is_none() {
            tracing::warn!(
                target: TRACING_TARGET_CONFIG,
                "No API token configured, sort and engine signal routes are open"
            );
        }
    }

    fn log_build_info() {
        tracing::debug!(
            target: TRACING_TARGET_SERVER_STARTUP,
            version = env!("CARGO_PKG_VERSION"),
            pid = process::id(),
            arch = std::env::consts::ARCH,
            os = std::env::consts::OS,
            features = ?Self::enabled_features(),
            "Build information"
        );
    }

    fn enabled_features() -> Vec<&'static str> {
        [cfg!(feature = "dotenv").then_some("dotenv")]
            .into_iter()
            .flatten()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use dsort_server::service::EngineKind;

    use super::*;

    #[test]
    fn defaults_parse_and_validate() {
        let cli = Cli::try_parse_from(["dsort"]).unwrap();
        assert_eq!(cli.server.port, 3000);
        assert_eq!(cli.service.engine, EngineKind::External);
        assert_eq!(cli.log_format, LogFormat::Pretty);
        assert!(cli.validate().is_ok());
    }

    #[test]
    fn arguments_override_defaults() {
        let cli = Cli::try_parse_from([
            "dsort",
            "--port",
            "8080",
            "--engine",
            "simulated",
            "--max-jobs",
            "5",
            "--log-format",
            "json",
        ])
        .unwrap();

        assert_eq!(cli.server.port, 8080);
        assert_eq!(cli.service.engine, EngineKind::Simulated);
        assert_eq!(cli.service.max_jobs, 5);
        assert_eq!(cli.log_format, LogFormat::Json);
    }

    #[test]
    fn zero_job_capacity_is_rejected() {
        let cli = Cli::try_parse_from(["dsort", "--max-jobs", "0"]).unwrap();
        assert!(cli.validate().is_err());
    }

    #[test]
    fn request_timeout_outside_bounds_is_rejected() {
        for timeout in ["0", "301"] {
            let cli = Cli::try_parse_from(["dsort", "--request-timeout", timeout]).unwrap();
            assert!(cli.validate().is_err(), "{timeout}");
        }

        let cli = Cli::try_parse_from(["dsort", "--request-timeout", "300"]).unwrap();
        assert!(cli.validate().is_ok());
    }
}
