use eyre::{Result, WrapErr};
use tracing::Dispatch;
use tracing_subscriber::{EnvFilter, Layer, Registry, layer::SubscriberExt};

use crate::config::models::{LogFormat, LogLevel, LoggingConfig};

/// A type-erased layer stacked directly on the [`Registry`]
pub type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Dependencies whose own logs are clamped to `warn` unless the configured level is stricter
const NOISY_TARGETS: [&str; 7] = [
    "hyper",
    "h2",
    "tonic",
    "tower",
    "opentelemetry",
    "opentelemetry_sdk",
    "opentelemetry_otlp",
];

/// Build the filter directive for a configured level
pub fn filter_directive(level: LogLevel) -> String {
    let noisy = match level {
        LogLevel::Error => "error",
        _ => "warn",
    };

    let mut directive = level.as_str().to_string();
    for target in NOISY_TARGETS {
        directive.push_str(&format!(",{target}={noisy}"));
    }
    directive
}

/// Build the subscriber for the configured level and format.
///
/// The returned [`Dispatch`] is not installed; the binary decides whether it
/// becomes the process-wide default. `extra` carries additional layers such
/// as the OpenTelemetry bridge.
pub fn build_dispatch(config: &LoggingConfig, extra: Option<BoxedLayer>) -> Result<Dispatch> {
    let directive = filter_directive(config.level);
    let env_filter = EnvFilter::try_new(&directive)
        .wrap_err_with(|| format!("Invalid log filter: {directive}"))?;

    let fmt_layer: BoxedLayer = match config.format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(false)
            .with_span_list(true)
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        LogFormat::Text => tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_ansi(false)
            .boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer()
            .pretty()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
    };

    let mut layers = vec![fmt_layer];
    layers.extend(extra);

    let subscriber = Registry::default().with(layers).with(env_filter);
    Ok(Dispatch::new(subscriber))
}

/// Install `dispatch` as the process-wide default subscriber
pub fn install_global(dispatch: Dispatch) -> Result<()> {
    tracing::dispatcher::set_global_default(dispatch)
        .wrap_err("A global tracing subscriber is already installed")
}

/// Configure tracing for specific service components
pub fn configure_component_tracing(component: &str) -> tracing::Span {
    tracing::info_span!("component", name = component)
}

/// Create a request-scoped tracing span
pub fn create_request_span(method: &str, path: &str, request_id: &str) -> tracing::Span {
    tracing::info_span!(
        "request",
        http.method = method,
        http.path = path,
        request.id = request_id,
        client.ip = tracing::field::Empty,
        http.status_code = tracing::field::Empty,
        duration_ms = tracing::field::Empty,
    )
}
