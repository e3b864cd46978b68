//! Optional OpenTelemetry trace export.
//!
//! When enabled, spans produced through `tracing` are bridged into an SDK
//! tracer provider and exported over OTLP/gRPC with a batch processor. When
//! disabled, the provider is inert and its shutdown is a no-op.
use opentelemetry::{KeyValue, trace::TracerProvider as _};
use opentelemetry_otlp::{SpanExporter, WithExportConfig};
use opentelemetry_sdk::{Resource, trace::SdkTracerProvider};
use opentelemetry_semantic_conventions::resource::SERVICE_VERSION;
use tracing_subscriber::Layer;

use crate::{config::models::TelemetryConfig, tracing_setup::BoxedLayer};

/// Instrumentation scope name reported with every exported span
const TRACER_NAME: &str = env!("CARGO_PKG_NAME");

#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("Failed to build OTLP span exporter")]
    Exporter(#[source] opentelemetry_otlp::ExporterBuildError),

    #[error("Failed to shut down tracer provider")]
    Shutdown(#[source] opentelemetry_sdk::error::OTelSdkError),
}

/// Owns the tracer provider for the lifetime of the process
#[derive(Debug, Default)]
pub struct TelemetryProvider {
    tracer_provider: Option<SdkTracerProvider>,
}

impl TelemetryProvider {
    /// Build the provider described by `config`.
    ///
    /// Must be called from within a Tokio runtime when telemetry is enabled,
    /// since the gRPC channel is created lazily on the current runtime.
    /// Nothing is logged here: the subscriber is built from this provider, so
    /// call [`TelemetryProvider::log_status`] once it exists.
    pub fn setup(config: &TelemetryConfig) -> Result<Self, TelemetryError> {
        if !config.enabled {
            return Ok(Self::disabled());
        }

        let mut exporter = SpanExporter::builder().with_tonic();
        if let Some(endpoint) = &config.otlp_endpoint {
            exporter = exporter.with_endpoint(endpoint.clone());
        }
        let exporter = exporter.build().map_err(TelemetryError::Exporter)?;

        let resource = Resource::builder()
            .with_service_name(config.service_name.clone())
            .with_attribute(KeyValue::new(
                SERVICE_VERSION,
                config.service_version.clone(),
            ))
            .build();

        let tracer_provider = SdkTracerProvider::builder()
            .with_batch_exporter(exporter)
            .with_resource(resource)
            .build();

        Ok(Self {
            tracer_provider: Some(tracer_provider),
        })
    }

    /// A provider that exports nothing
    pub fn disabled() -> Self {
        Self {
            tracer_provider: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.tracer_provider.is_some()
    }

    /// Report whether spans are exported, to the current subscriber
    pub fn log_status(&self, config: &TelemetryConfig) {
        if self.is_enabled() {
            tracing::info!(
                service_name = %config.service_name,
                service_version = %config.service_version,
                endpoint = config.otlp_endpoint.as_deref().unwrap_or("default"),
                "Telemetry enabled with OTLP trace export"
            );
        } else {
            tracing::info!("Telemetry disabled, using no-op provider");
        }
    }

    /// Layer bridging `tracing` spans into the tracer provider, if enabled
    pub fn tracing_layer(&self) -> Option<BoxedLayer> {
        self.tracer_provider.as_ref().map(|provider| {
            tracing_opentelemetry::layer()
                .with_tracer(provider.tracer(TRACER_NAME))
                .boxed()
        })
    }

    /// Flush pending spans and stop the exporter
    pub fn shutdown(&self) -> Result<(), TelemetryError> {
        let Some(provider) = &self.tracer_provider else {
            return Ok(());
        };

        tracing::info!("Shutting down tracer provider");
        provider.shutdown().map_err(TelemetryError::Shutdown)
    }
}
