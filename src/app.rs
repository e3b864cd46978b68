//! Composition root.
//!
//! [`Application`] wires configuration, logging, telemetry, the echo service
//! and the router together. [`RunningApplication`] owns shutdown ordering: the
//! HTTP server is fully stopped before telemetry is flushed, so nothing is
//! served after telemetry teardown begins.
use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum::Router;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::Dispatch;

use crate::{
    adapters::{
        http_server::{HttpServer, ServerError, ServerHandle, ServerState},
        router::build_router,
    },
    config::{AppConfig, LoadError},
    core::EchoService,
    ports::echo::Echo,
    telemetry::{TelemetryError, TelemetryProvider},
    tracing_setup,
    utils::graceful_shutdown::DEFAULT_DRAIN_TIMEOUT,
};

/// Failures that prevent the service from ever accepting traffic
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("Failed to load configuration")]
    Config(#[from] LoadError),

    #[error("Failed to initialize telemetry")]
    Telemetry(#[source] TelemetryError),

    #[error("Failed to initialize logging")]
    Logging(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),

    #[error("Failed to start HTTP server")]
    Server(#[source] ServerError),
}

/// Failures reported while tearing down; the teardown itself always completes
#[derive(Debug, thiserror::Error)]
pub enum ShutdownError {
    #[error("HTTP server did not stop cleanly")]
    Server(#[source] ServerError),

    #[error("Failed to flush telemetry")]
    Telemetry(#[source] TelemetryError),

    #[error("HTTP server did not stop cleanly ({server}) and telemetry flush failed ({telemetry})")]
    Both {
        server: ServerError,
        telemetry: TelemetryError,
    },
}

/// A fully wired service that has not bound its listener yet
pub struct Application {
    config: AppConfig,
    telemetry: TelemetryProvider,
    dispatch: Dispatch,
    router: Router,
}

impl Application {
    /// Build every component from `config`.
    ///
    /// Must run inside a Tokio runtime when telemetry is enabled.
    pub fn initialize(config: AppConfig) -> Result<Self, StartupError> {
        let telemetry =
            TelemetryProvider::setup(&config.telemetry).map_err(StartupError::Telemetry)?;

        let dispatch = tracing_setup::build_dispatch(&config.logging, telemetry.tracing_layer())
            .map_err(|e| StartupError::Logging(e.into()))?;

        // the service's span and the telemetry status belong to this subscriber
        // even before it is installed globally
        let echo: Arc<dyn Echo> = Arc::new(tracing::dispatcher::with_default(&dispatch, || {
            telemetry.log_status(&config.telemetry);
            EchoService::new()
        }));
        let router = build_router(echo, &config.server);

        Ok(Self {
            config,
            telemetry,
            dispatch,
            router,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Subscriber built for the configured level and format
    pub fn dispatch(&self) -> Dispatch {
        self.dispatch.clone()
    }

    /// Bind the listener and start serving.
    ///
    /// On a bind failure telemetry is flushed before the error is returned.
    pub async fn start(self) -> Result<RunningApplication, StartupError> {
        let server = HttpServer::new(self.config.server.clone(), self.router);

        let server = match server.start().await {
            Ok(handle) => handle,
            Err(e) => {
                if let Err(te) = self.telemetry.shutdown() {
                    tracing::error!(error = %te, "Failed to flush telemetry after startup failure");
                }
                return Err(StartupError::Server(e));
            }
        };

        tracing::info!(
            address = %server.local_addr(),
            service = %self.config.telemetry.service_name,
            version = %self.config.telemetry.service_version,
            "Application started"
        );

        Ok(RunningApplication {
            server,
            telemetry: self.telemetry,
            drain_timeout: DEFAULT_DRAIN_TIMEOUT,
        })
    }
}

/// A serving application waiting for its shutdown trigger
pub struct RunningApplication {
    server: ServerHandle,
    telemetry: TelemetryProvider,
    drain_timeout: Duration,
}

impl RunningApplication {
    pub fn local_addr(&self) -> SocketAddr {
        self.server.local_addr()
    }

    pub fn server_state(&self) -> watch::Receiver<ServerState> {
        self.server.subscribe()
    }

    /// Override the 30 second drain window
    pub fn with_drain_timeout(mut self, drain_timeout: Duration) -> Self {
        self.drain_timeout = drain_timeout;
        self
    }

    /// Serve until `shutdown` is cancelled or the server exits on its own,
    /// then stop the server and flush telemetry, in that order.
    pub async fn run_until(mut self, shutdown: CancellationToken) -> Result<(), ShutdownError> {
        let exited = tokio::select! {
            result = self.server.stopped() => Some(result),
            _ = shutdown.cancelled() => None,
        };

        let server_result = match exited {
            Some(result) => result,
            None => {
                tracing::info!("Shutdown requested");
                self.server.shutdown(self.drain_timeout).await
            }
        };

        let telemetry_result = self.telemetry.shutdown();

        match (server_result, telemetry_result) {
            (Ok(()), Ok(())) => {
                tracing::info!("Shutdown complete");
                Ok(())
            }
            (Err(server), Ok(())) => Err(ShutdownError::Server(server)),
            (Ok(()), Err(telemetry)) => {
                tracing::error!(error = %telemetry, "Failed to flush telemetry");
                Err(ShutdownError::Telemetry(telemetry))
            }
            (Err(server), Err(telemetry)) => {
                tracing::error!(error = %telemetry, "Failed to flush telemetry");
                Err(ShutdownError::Both { server, telemetry })
            }
        }
    }
}
