use std::env;

pub use common::Environment;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionProvider {
    Cpu,
    Cuda,
}

impl ExecutionProvider {
    fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "cuda" | "gpu" => ExecutionProvider::Cuda,
            _ => ExecutionProvider::Cpu,
        }
    }
}

#[derive(Debug, Clone)]
pub struct InferenceConfig {
    pub model_path: String,
    pub execution_provider: ExecutionProvider,
    pub input_size: (u32, u32),
    pub confidence_threshold: f32,
    pub iou_threshold: f32,
    pub max_detections: usize,
}

impl InferenceConfig {
    /// Load configuration from environment variables with sensible defaults
    pub fn from_env() -> anyhow::Result<Self> {
        let model_path = env::var("MODEL_PATH").unwrap_or_else(|_| "yolov8x-seg.onnx".to_string());

        let execution_provider = env::var("EXECUTION_PROVIDER")
            .map(|s| ExecutionProvider::parse(&s))
            .unwrap_or(ExecutionProvider::Cpu);

        let input_size = env::var("INPUT_SIZE")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(640);

        let confidence_threshold = env::var("CONFIDENCE_THRESHOLD")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(0.6);

        let iou_threshold = env::var("IOU_THRESHOLD")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(0.3);

        let max_detections = env::var("MAX_DETECTIONS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(300);

        if !(0.0..=1.0).contains(&confidence_threshold) {
            anyhow::bail!("CONFIDENCE_THRESHOLD must be within [0, 1], got {confidence_threshold}");
        }
        if !(0.0..=1.0).contains(&iou_threshold) {
            anyhow::bail!("IOU_THRESHOLD must be within [0, 1], got {iou_threshold}");
        }

        Ok(Self {
            model_path,
            execution_provider,
            input_size: (input_size, input_size),
            confidence_threshold,
            iou_threshold,
            max_detections,
        })
    }

    /// Create default configuration for testing
    pub fn test_default() -> Self {
        Self {
            model_path: "/models/yolov8x-seg.onnx".to_string(),
            execution_provider: ExecutionProvider::Cpu,
            input_size: (640, 640),
            confidence_threshold: 0.6,
            iou_threshold: 0.3,
            max_detections: 300,
        }
    }
}
