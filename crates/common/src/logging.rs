use crate::config::Environment;
use tracing_subscriber::{
    EnvFilter, Layer, Registry,
    layer::{Layered, SubscriberExt},
    util::SubscriberInitExt,
};

/// ONNX Runtime logs every graph optimisation pass at info level.
const DEFAULT_DIRECTIVES: &str = "info,ort=warn";

/// Initialize tracing subscriber with pretty formatting for development
/// and JSON formatting for production.
///
/// Uses RUST_LOG environment variable for filtering (defaults to
/// `info,ort=warn` if not set).
///
/// The OpenTelemetry layer only exports if a global tracer provider has been
/// installed; use [`crate::TelemetryGuard::init`] to export over OTLP.
pub fn setup_logging(environment: Environment) {
    init_subscriber(environment, tracing_opentelemetry::layer());
}

pub(crate) fn init_subscriber<L>(environment: Environment, otel_layer: L)
where
    L: Layer<Layered<EnvFilter, Registry>> + Send + Sync + 'static,
{
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES));

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(otel_layer);

    match environment {
        Environment::Production => {
            registry
                .with(tracing_subscriber::fmt::layer().json().with_level(true))
                .init();
        }
        Environment::Development => {
            registry
                .with(tracing_subscriber::fmt::layer().pretty().with_ansi(true))
                .init();
        }
    }
}
