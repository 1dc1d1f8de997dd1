use crate::config::Config;
use common::TelemetryGuard;

/// Installs the global subscriber. With an OTLP endpoint configured, spans
/// and metrics are exported too; keep the returned guard alive until exit.
pub fn setup_logging(config: &Config) -> anyhow::Result<Option<TelemetryGuard>> {
    match &config.otel_endpoint {
        Some(endpoint) => Ok(Some(TelemetryGuard::init(
            "gateway",
            endpoint,
            config.environment,
        )?)),
        None => {
            common::setup_logging(config.environment);
            Ok(None)
        }
    }
}
