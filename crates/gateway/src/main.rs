use anyhow::Context;
use gateway::{AppState, app, config::get_configuration, logging::setup_logging};
use inference::{InferenceBackend, InferenceConfig};
use privacy::Pipeline;
use tokio::net::TcpListener;

#[cfg(not(feature = "ort-backend"))]
compile_error!("the gateway binary needs the `ort-backend` feature");

#[cfg(feature = "ort-backend")]
use inference::backend::ort::OrtBackend;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = get_configuration().context("Failed to load configuration")?;
    let _telemetry = setup_logging(&config)?;

    let inference_config = InferenceConfig::from_env()?;
    tracing::info!(
        model = %inference_config.model_path,
        confidence = inference_config.confidence_threshold,
        iou = inference_config.iou_threshold,
        "Loading detection model"
    );

    std::fs::create_dir_all(&config.output_dir).with_context(|| {
        format!(
            "Failed to create output directory {}",
            config.output_dir.display()
        )
    })?;

    let backend = OrtBackend::load_model(&inference_config)?;
    let state = AppState::new(Pipeline::new(backend), config.output_dir.clone());
    let router = app(state, config.max_upload_bytes);

    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
    tracing::info!(
        addr = %config.bind_addr,
        output_dir = %config.output_dir.display(),
        environment = config.environment.as_str(),
        "Gateway listening"
    );

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received");
}
