use crate::config::GatewayConfig;
use common::TelemetryGuard;

const SERVICE_NAME: &str = "constellation-gateway";

/// Install the global subscriber. With an OTLP endpoint configured, traces
/// and metrics are exported too, and the returned guard must be held until
/// shutdown.
pub fn setup_logging(config: &GatewayConfig) -> anyhow::Result<Option<TelemetryGuard>> {
    match &config.otel_endpoint {
        Some(endpoint) => {
            let guard = TelemetryGuard::init(SERVICE_NAME, endpoint, config.environment)?;
            Ok(Some(guard))
        }
        None => {
            common::setup_logging(config.environment);
            Ok(None)
        }
    }
}
