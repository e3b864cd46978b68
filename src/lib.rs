//! hello-echo - a small HTTP echo service.
//!
//! The service exposes liveness and readiness probes plus a single JSON echo
//! endpoint. It is built the same way larger services are: layered
//! configuration, structured logging, optional OpenTelemetry export and a
//! graceful shutdown with a bounded drain window.
//!
//! # Features
//! - `GET /healthz`, `GET /readyz` and `POST /v1/echo` over HTTP/1.1 and HTTP/2
//! - Embedded OpenAPI document at `GET /api/openapi.yaml`
//! - Request id propagation, real client IP extraction and panic recovery
//! - YAML configuration layers (`default`, `local`, `private`) with `APP_*`
//!   environment overrides
//! - JSON, text or pretty logs via `tracing`
//! - OTLP trace export when telemetry is enabled
//!
//! # Quick Example
//! ```no_run
//! use hello_echo::{Application, config::load_config};
//! use tokio_util::sync::CancellationToken;
//!
//! # #[tokio::main] async fn main() -> eyre::Result<()> {
//! let config = load_config("configs")?;
//! let running = Application::initialize(config)?.start().await?;
//!
//! let shutdown = CancellationToken::new();
//! // cancel `shutdown` from a signal handler to stop serving
//! running.run_until(shutdown).await?;
//! # Ok(()) }
//! ```
//!
//! # Architecture
//! The crate separates **ports** (traits) from **adapters** (HTTP, health
//! probe) while keeping the echo logic in `core`. `app` is the composition
//! root and owns shutdown ordering.
//!
//! # Error Handling
//! Library APIs return domain error types built with `thiserror`
//! ([`StartupError`], [`ShutdownError`], [`config::LoadError`], ...). The
//! binary reports them through `color_eyre` with added context.
pub mod api;
pub mod app;
pub mod config;
pub mod ports;
pub mod telemetry;
pub mod tracing_setup;
pub mod utils;

// These modules are implementation details and should not be directly used by users
pub mod adapters;
pub mod core;

// Re-export the specific types needed by the binary crate
pub use crate::{
    adapters::{HttpServer, ServerHandle, ServerState, build_router, check_health},
    app::{Application, RunningApplication, ShutdownError, StartupError},
    core::EchoService,
    ports::Echo,
    telemetry::TelemetryProvider,
    utils::{GracefulShutdown, ShutdownReason},
};
