//! Per-detection privacy post-processing: blur everything but one person,
//! then cut a canonical square crop around them.

pub mod compositor;
pub mod errors;
pub mod geometry;
pub mod pipeline;
pub mod sink;

pub use compositor::{Compositor, composite};
pub use errors::{CropError, MaskError};
pub use geometry::{CropPadding, CropRegion, OUTPUT_SIZE, compute_crop, extract_and_resize};
pub use pipeline::{Pipeline, ProcessReport, process_detections};
pub use sink::{MemorySink, OutputSink};
