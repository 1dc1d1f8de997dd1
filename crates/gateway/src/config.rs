use common::Environment;
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub environment: Environment,
    pub bind_addr: String,
    /// Crops are written here; created on startup, never cleared.
    pub output_dir: PathBuf,
    pub max_upload_bytes: usize,
    /// OTLP collector endpoint. Plain logging only when unset.
    pub otel_endpoint: Option<String>,
}

pub fn get_configuration() -> Result<Config, config::ConfigError> {
    let config = config::Config::builder()
        .set_default("environment", "development")?
        .set_default("bind_addr", "0.0.0.0:8000")?
        .set_default("output_dir", "classroomouts")?
        .set_default("max_upload_bytes", 32_i64 * 1024 * 1024)?
        .add_source(
            config::Environment::with_prefix("GATEWAY")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    let config: Config = config.try_deserialize::<Config>()?;

    Ok(config)
}
