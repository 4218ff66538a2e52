#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod config;
mod server;
mod telemetry;

use std::process;

use anyhow::Context;
use axum::Router;
use dsort_core::engine::event_channel;
use dsort_server::handler::routes;
use dsort_server::middleware::{
    RouterObservabilityExt, RouterOpenApiExt, RouterRecoveryExt, RouterSecurityExt,
};
use dsort_server::service::{EngineKind, ServiceState};
use dsort_server::worker::{EventPump, RetentionWorker};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::config::{Cli, MiddlewareConfig};
use crate::server::ServerError;

/// Tracing target for startup events.
pub const TRACING_TARGET_SERVER_STARTUP: &str = "dsort_cli::server::startup";

/// Tracing target for shutdown events.
pub const TRACING_TARGET_SERVER_SHUTDOWN: &str = "dsort_cli::server::shutdown";

/// Tracing target for configuration logging.
pub const TRACING_TARGET_CONFIG: &str = "dsort_cli::config";

#[tokio::main]
async fn main() {
    let Err(error) = run().await else {
        tracing::info!(
            target: TRACING_TARGET_SERVER_SHUTDOWN,
            "Application terminated successfully"
        );
        process::exit(0);
    };

    if tracing::enabled!(tracing::Level::ERROR) {
        match error.downcast_ref::<ServerError>() {
            Some(server_error) => tracing::error!(
                target: TRACING_TARGET_SERVER_SHUTDOWN,
                error = %error,
                context = ?server_error.context(),
                "Application terminated with error"
            ),
            None => tracing::error!(
                target: TRACING_TARGET_SERVER_SHUTDOWN,
                error = %error,
                "Application terminated with error"
            ),
        }
    } else {
        eprintln!("Error: {error:#}");
        if let Some(suggestion) = error
            .downcast_ref::<ServerError>()
            .and_then(ServerError::suggestion)
        {
            eprintln!("Hint: {suggestion}");
        }
    }

    process::exit(1);
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::init();
    telemetry::init_tracing(cli.log_format)?;

    tracing::info!(
        target: TRACING_TARGET_SERVER_STARTUP,
        version = env!("CARGO_PKG_VERSION"),
        "Starting dsort gateway"
    );

    cli.log();
    cli.validate()?;

    let shutdown = CancellationToken::new();
    let (events, receiver) = event_channel(cli.service.event_capacity);
    let state = ServiceState::from_config(&cli.service, events, shutdown.clone());

    let mut workers = JoinSet::new();
    let retention = RetentionWorker::new(
        state.controller().store().clone(),
        cli.service.retention(),
        cli.service.sweep_interval(),
    );
    workers.spawn({
        let shutdown = shutdown.clone();
        async move { retention.run(shutdown).await }
    });

    // Only the simulated engine reports through the channel.
    if cli.service.engine == EngineKind::Simulated {
        let pump = EventPump::new(state.controller().clone());
        workers.spawn({
            let shutdown = shutdown.clone();
            async move { pump.run(receiver, shutdown).await }
        });
    }

    let router = create_router(state, &cli.middleware);
    let served = server::serve_http(router, cli.server, shutdown.clone()).await;

    shutdown.cancel();
    while let Some(joined) = workers.join_next().await {
        if let Err(err) = joined {
            tracing::error!(
                target: TRACING_TARGET_SERVER_SHUTDOWN,
                error = %err,
                "Background worker panicked"
            );
        }
    }

    served.context("HTTP server failed")
}

/// Creates the router with all middleware layers applied.
///
/// Later layers wrap earlier ones: recovery is outermost, then
/// observability, then security around the routes.
fn create_router(state: ServiceState, middleware: &MiddlewareConfig) -> Router {
    routes(state.clone())
        .with_open_api(&middleware.openapi)
        .with_state(state)
        .with_security(&middleware.cors)
        .with_observability()
        .with_recovery(&middleware.recovery)
}
