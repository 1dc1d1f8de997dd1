use crate::{error::ApiError, metrics::GatewayMetrics, sink::DirectorySink};
use inference::InferenceBackend;
use privacy::{Pipeline, ProcessReport};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// Shared handler state.
///
/// The pipeline sits behind one mutex: finding the last used index and writing
/// new ones happen under the same lock, so concurrent uploads never reuse an index.
pub struct AppState<B: InferenceBackend> {
    pipeline: Arc<Mutex<Pipeline<B>>>,
    output_dir: Arc<PathBuf>,
    pub metrics: GatewayMetrics,
}

impl<B: InferenceBackend> Clone for AppState<B> {
    fn clone(&self) -> Self {
        Self {
            pipeline: Arc::clone(&self.pipeline),
            output_dir: Arc::clone(&self.output_dir),
            metrics: self.metrics.clone(),
        }
    }
}

impl<B: InferenceBackend> AppState<B> {
    pub fn new(pipeline: Pipeline<B>, output_dir: PathBuf) -> Self {
        Self {
            pipeline: Arc::new(Mutex::new(pipeline)),
            output_dir: Arc::new(output_dir),
            metrics: GatewayMetrics::new("gateway"),
        }
    }

    pub fn output_dir(&self) -> &PathBuf {
        &self.output_dir
    }

    /// Decodes one upload and runs it through the pipeline. Blocking.
    pub fn process_upload(&self, bytes: &[u8]) -> Result<ProcessReport, ApiError> {
        let image = image::load_from_memory(bytes)
            .map_err(ApiError::Decode)?
            .to_rgb8();

        tracing::info!(
            width = image.width(),
            height = image.height(),
            "Received and decoded image"
        );

        let mut pipeline = self
            .pipeline
            .lock()
            .map_err(|_| anyhow::anyhow!("Pipeline mutex poisoned"))?;

        let mut sink = DirectorySink::new(self.output_dir.as_path());
        let start_index = sink.last_index()?;

        Ok(pipeline.process_image(&image, &mut sink, start_index)?)
    }
}
