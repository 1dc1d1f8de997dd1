use super::InferenceBackend;
use crate::{
    config::{ExecutionProvider, InferenceConfig},
    detection::Detection,
    processing::{PostProcessor, PreProcessor},
};
use image::RgbImage;
use ort::{
    session::{Session, builder::GraphOptimizationLevel},
    value::TensorRef,
};

/// YOLOv8-seg exported to ONNX: input `images`, outputs `output0` (boxes,
/// scores, mask coefficients) and `output1` (mask prototypes).
pub struct OrtBackend {
    session: Session,
    preprocessor: PreProcessor,
    postprocessor: PostProcessor,
}

impl OrtBackend {
    /// Load model with specified execution provider
    pub fn load_model_with_provider(
        config: &InferenceConfig,
        provider: ExecutionProvider,
    ) -> anyhow::Result<Self> {
        // Initialize ORT environment (idempotent)
        let _ = ort::init().commit();

        let mut builder = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(4)?;

        match provider {
            ExecutionProvider::Cuda => {
                tracing::info!("Initializing ONNX Runtime with CUDA execution provider");
                builder = builder.with_execution_providers([
                    ort::execution_providers::CUDAExecutionProvider::default()
                        .with_device_id(0)
                        .build()
                        .error_on_failure(),
                ])?;
            }
            ExecutionProvider::Cpu => {
                tracing::info!("Initializing ONNX Runtime with CPU execution provider");
            }
        }

        let session = builder.commit_from_file(&config.model_path)?;

        tracing::info!("Model loaded from {}", config.model_path);
        Ok(Self {
            session,
            preprocessor: PreProcessor::new(config.input_size),
            postprocessor: PostProcessor::new(
                config.confidence_threshold,
                config.iou_threshold,
                config.max_detections,
            ),
        })
    }
}

impl InferenceBackend for OrtBackend {
    fn load_model(config: &InferenceConfig) -> anyhow::Result<Self> {
        Self::load_model_with_provider(config, config.execution_provider)
    }

    fn infer(&mut self, image: &RgbImage) -> anyhow::Result<Vec<Detection>> {
        let (input, transform) = self.preprocessor.preprocess(image)?;

        let outputs = {
            let _infer_span = tracing::info_span!("model_inference").entered();
            self.session
                .run(ort::inputs!["images" => TensorRef::from_array_view(input.view())?])?
        };

        let preds = outputs["output0"].try_extract_array::<f32>()?;
        let protos = outputs["output1"].try_extract_array::<f32>()?;

        let detections = self
            .postprocessor
            .parse_detections(&preds, &protos, &transform)?;

        tracing::debug!(count = detections.len(), "Model returned detections");
        Ok(detections)
    }
}
