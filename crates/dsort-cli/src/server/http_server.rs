//! HTTP server startup and lifecycle management.

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::config::ServerConfig;
use crate::server::{Result, ServerError, shutdown_signal};
use crate::{TRACING_TARGET_SERVER_SHUTDOWN, TRACING_TARGET_SERVER_STARTUP};

/// Runs `serve_fn`, logging readiness, uptime and failures.
async fn serve_with_shutdown<F>(
    server_config: &ServerConfig,
    serve_fn: impl FnOnce() -> F,
) -> Result<()>
where
    F: Future<Output = io::Result<()>>,
{
    let start_time = Instant::now();

    tracing::info!(
        target: TRACING_TARGET_SERVER_STARTUP,
        addr = %server_config.server_addr(),
        "Server is ready and listening for connections"
    );

    if server_config.binds_to_all_interfaces() {
        tracing::warn!(
            target: TRACING_TARGET_SERVER_STARTUP,
            "Server is bound to all interfaces. Ensure firewall rules are properly configured."
        );
    }

    serve_fn().await.map_err(|err| {
        tracing::error!(
            target: TRACING_TARGET_SERVER_SHUTDOWN,
            error = %err,
            kind = ?err.kind(),
            uptime_secs = start_time.elapsed().as_secs(),
            "Server encountered an error"
        );
        ServerError::Runtime(err)
    })?;

    tracing::info!(
        target: TRACING_TARGET_SERVER_SHUTDOWN,
        uptime_secs = start_time.elapsed().as_secs(),
        "Server shut down gracefully"
    );
    Ok(())
}

/// Waits for `shutdown`, then for the grace period to run out.
async fn shutdown_deadline(shutdown: CancellationToken, grace: Duration) {
    shutdown.cancelled().await;
    tokio::time::sleep(grace).await;
}

/// Serves `app` over HTTP until a shutdown signal arrives.
///
/// `shutdown` is cancelled once SIGINT or SIGTERM is received so that
/// background workers stop together with the server. Connections still open
/// after the shutdown timeout are dropped.
///
/// # Errors
///
/// Returns an error if the configuration is invalid, the address cannot be
/// bound or the server fails while running.
pub async fn serve_http(
    app: Router,
    server_config: ServerConfig,
    shutdown: CancellationToken,
) -> Result<()> {
    if let Err(validation_error) = server_config.validate() {
        tracing::error!(
            target: TRACING_TARGET_SERVER_STARTUP,
            error = %validation_error,
            "Invalid server configuration"
        );

        return Err(ServerError::InvalidConfig(validation_error.to_string()));
    }

    let server_addr = server_config.server_addr();
    let listener = TcpListener::bind(server_addr).await.map_err(|err| {
        tracing::error!(
            target: TRACING_TARGET_SERVER_STARTUP,
            addr = %server_addr,
            error = %err,
            "Failed to bind to address"
        );
        ServerError::bind_error(server_addr, err)
    })?;

    let grace = server_config.shutdown_timeout();
    let signal = {
        let shutdown = shutdown.clone();
        async move {
            tokio::select! {
                () = shutdown_signal(grace) => shutdown.cancel(),
                () = shutdown.cancelled() => {}
            }
        }
    };

    serve_with_shutdown(&server_config, || async move {
        let server = axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(signal);

        tokio::select! {
            result = async { server.await } => result,
            () = shutdown_deadline(shutdown, grace) => {
                tracing::warn!(
                    target: TRACING_TARGET_SERVER_SHUTDOWN,
                    timeout_secs = grace.as_secs(),
                    "Shutdown timeout elapsed, dropping open connections"
                );
                Ok(())
            }
        }
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn serve_with_shutdown_success() {
        let config = ServerConfig::default();
        let result = serve_with_shutdown(&config, || async { Ok(()) }).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn serve_with_shutdown_maps_runtime_errors() {
        let config = ServerConfig::default();
        let result =
            serve_with_shutdown(&config, || async { Err(io::Error::other("test error")) }).await;

        assert!(matches!(result, Err(ServerError::Runtime(_))));
    }

    #[tokio::test]
    async fn invalid_config_is_rejected_before_binding() {
        let config = ServerConfig {
            port: 80,
            ..Default::default()
        };

        let result = serve_http(Router::new(), config, CancellationToken::new()).await;
        assert!(matches!(result, Err(ServerError::InvalidConfig(_))));
    }
}
