pub mod backend;
pub mod config;
pub mod detection;
pub mod processing;

// Re-export commonly used types for convenience
pub use backend::InferenceBackend;
pub use config::InferenceConfig;
pub use detection::{BoundingBox, Detection, Mask, PERSON_CLASS_ID};
