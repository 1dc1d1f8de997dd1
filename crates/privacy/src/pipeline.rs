use crate::{
    compositor::Compositor,
    errors::{CropError, MaskError},
    geometry::{CropPadding, compute_crop, extract_and_resize},
    sink::OutputSink,
};
use common::span;
use image::RgbImage;
use inference::{Detection, InferenceBackend};
use std::borrow::Cow;

/// What happened to one image.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ProcessReport {
    /// Person detections found; each consumed one output index.
    pub count: usize,
    /// Crops emitted without background blur because no usable mask existed.
    pub unblurred: usize,
    /// Detections whose crop region had zero area; no crop was emitted.
    pub skipped: usize,
}

/// Detection model plus crop policy. One value serves any number of images.
pub struct Pipeline<B: InferenceBackend> {
    backend: B,
    padding: CropPadding,
}

impl<B: InferenceBackend> Pipeline<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            padding: CropPadding::default(),
        }
    }

    pub fn with_padding(mut self, padding: CropPadding) -> Self {
        self.padding = padding;
        self
    }

    /// Detects people in `image` and emits one crop per person to `sink`,
    /// indexed from `start_index + 1`.
    pub fn process_image(
        &mut self,
        image: &RgbImage,
        sink: &mut dyn OutputSink,
        start_index: usize,
    ) -> anyhow::Result<ProcessReport> {
        let detections = {
            let _s = span!("detect");
            self.backend.infer(image)?
        };

        process_detections(image, &detections, sink, start_index, &self.padding)
    }
}

/// Runs compositing and cropping for already-detected instances.
///
/// Non-person detections are ignored. Mask problems never fail the image:
/// the affected crop is taken from the unblurred original instead. Only
/// sink or resampling errors are returned.
#[tracing::instrument(skip_all, fields(detections = detections.len(), start_index = start_index))]
pub fn process_detections(
    image: &RgbImage,
    detections: &[Detection],
    sink: &mut dyn OutputSink,
    start_index: usize,
    padding: &CropPadding,
) -> anyhow::Result<ProcessReport> {
    let people: Vec<&Detection> = detections.iter().filter(|d| d.is_person()).collect();
    let mut report = ProcessReport {
        count: people.len(),
        ..ProcessReport::default()
    };

    if people.is_empty() {
        return Ok(report);
    }

    let compositor = if people.iter().any(|d| d.mask.is_some()) {
        Some(Compositor::new(image))
    } else {
        tracing::warn!(
            people = people.len(),
            "No segmentation masks found for the detected objects. Saving unblurred images."
        );
        None
    };

    let (width, height) = image.dimensions();

    for (n, detection) in people.iter().enumerate() {
        let index = start_index + n + 1;

        let composited: Cow<'_, RgbImage> = match &compositor {
            None => {
                report.unblurred += 1;
                Cow::Borrowed(image)
            }
            Some(compositor) => match detection
                .mask
                .as_ref()
                .ok_or(MaskError::Missing)
                .and_then(|mask| compositor.composite(mask))
            {
                Ok(blended) => Cow::Owned(blended),
                Err(e) => {
                    tracing::warn!(
                        index,
                        error = %e,
                        "Failed to apply blur mask. Saving unblurred image."
                    );
                    report.unblurred += 1;
                    Cow::Borrowed(image)
                }
            },
        };

        let region = compute_crop(detection.bbox.to_pixels(), (height, width), padding);

        match extract_and_resize(&composited, &region) {
            Ok(crop) => {
                sink.accept(index, &crop)?;
                tracing::debug!(index, ?region, "Emitted student crop");
            }
            Err(CropError::Degenerate(region)) => {
                tracing::warn!(
                    index,
                    ?region,
                    bbox = ?detection.bbox,
                    "Crop region has zero area. Skipping detection."
                );
                report.skipped += 1;
            }
            Err(e) => return Err(e.into()),
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{geometry::OUTPUT_SIZE, sink::MemorySink};
    use image::Rgb;
    use inference::{BoundingBox, InferenceConfig, Mask, PERSON_CLASS_ID};
    use ndarray::Array2;

    const CHAIR_CLASS_ID: u32 = 56;

    struct MockBackend {
        detections: Vec<Detection>,
    }

    impl InferenceBackend for MockBackend {
        fn load_model(_config: &InferenceConfig) -> anyhow::Result<Self> {
            Ok(Self {
                detections: Vec::new(),
            })
        }

        fn infer(&mut self, _image: &RgbImage) -> anyhow::Result<Vec<Detection>> {
            Ok(self.detections.clone())
        }
    }

    struct FailingBackend;

    impl InferenceBackend for FailingBackend {
        fn load_model(_config: &InferenceConfig) -> anyhow::Result<Self> {
            Ok(Self)
        }

        fn infer(&mut self, _image: &RgbImage) -> anyhow::Result<Vec<Detection>> {
            anyhow::bail!("model exploded")
        }
    }

    fn detection(class_id: u32, bbox: (f32, f32, f32, f32), mask: Option<Mask>) -> Detection {
        Detection {
            bbox: BoundingBox::new(bbox.0, bbox.1, bbox.2, bbox.3),
            confidence: 0.9,
            class_id,
            mask,
        }
    }

    /// Full-resolution mask covering the box.
    fn box_mask(height: usize, width: usize, bbox: (usize, usize, usize, usize)) -> Mask {
        let mut mask = Array2::<f32>::zeros((height, width));
        mask.slice_mut(ndarray::s![bbox.1..bbox.3, bbox.0..bbox.2])
            .fill(1.0);
        mask
    }

    fn striped_image(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, ((x / 3 + y / 5) % 2 * 255) as u8])
        })
    }

    #[test]
    fn test_single_person_yields_one_canonical_crop() {
        let image = striped_image(640, 480);
        let backend = MockBackend {
            detections: vec![detection(
                PERSON_CLASS_ID,
                (100.0, 100.0, 200.0, 300.0),
                Some(box_mask(480, 640, (100, 100, 200, 300))),
            )],
        };
        let mut pipeline = Pipeline::new(backend);
        let mut sink = MemorySink::new();

        let report = pipeline.process_image(&image, &mut sink, 0).unwrap();

        assert_eq!(report.count, 1);
        assert_eq!(report.unblurred, 0);
        assert_eq!(sink.indices(), vec![1]);
        assert_eq!(sink.crops[0].1.dimensions(), (OUTPUT_SIZE, OUTPUT_SIZE));
    }

    #[test]
    fn test_crop_is_taken_from_composited_image() {
        let image = striped_image(640, 480);
        let mask = box_mask(480, 640, (100, 100, 200, 300));
        let people = [detection(
            PERSON_CLASS_ID,
            (100.0, 100.0, 200.0, 300.0),
            Some(mask.clone()),
        )];
        let mut sink = MemorySink::new();

        process_detections(&image, &people, &mut sink, 0, &CropPadding::default()).unwrap();

        let composited = Compositor::new(&image).composite(&mask).unwrap();
        let expected = extract_and_resize(
            &composited,
            &compute_crop((100, 100, 200, 300), (480, 640), &CropPadding::default()),
        )
        .unwrap();
        assert_eq!(sink.crops[0].1, expected);
    }

    #[test]
    fn test_indices_follow_start_index_and_detection_order() {
        let image = striped_image(320, 240);
        let detections = vec![
            detection(PERSON_CLASS_ID, (10.0, 10.0, 60.0, 100.0), None),
            detection(CHAIR_CLASS_ID, (70.0, 10.0, 120.0, 100.0), None),
            detection(PERSON_CLASS_ID, (130.0, 10.0, 180.0, 100.0), None),
            detection(PERSON_CLASS_ID, (190.0, 10.0, 240.0, 100.0), None),
        ];
        let mut sink = MemorySink::new();

        let report =
            process_detections(&image, &detections, &mut sink, 7, &CropPadding::default())
                .unwrap();

        assert_eq!(report.count, 3);
        assert_eq!(sink.indices(), vec![8, 9, 10]);
    }

    #[test]
    fn test_no_people_yields_no_crops() {
        let image = striped_image(320, 240);
        let detections = vec![detection(CHAIR_CLASS_ID, (10.0, 10.0, 60.0, 100.0), None)];
        let mut sink = MemorySink::new();

        let report =
            process_detections(&image, &detections, &mut sink, 3, &CropPadding::default())
                .unwrap();

        assert_eq!(report, ProcessReport::default());
        assert!(sink.crops.is_empty());
    }

    #[test]
    fn test_empty_detection_list() {
        let image = striped_image(64, 64);
        let mut pipeline = Pipeline::new(MockBackend {
            detections: Vec::new(),
        });
        let mut sink = MemorySink::new();

        let report = pipeline.process_image(&image, &mut sink, 0).unwrap();

        assert_eq!(report.count, 0);
        assert!(sink.crops.is_empty());
    }

    #[test]
    fn test_missing_masks_fall_back_to_unblurred_crops() {
        let image = striped_image(640, 480);
        let boxes = [(100.0, 100.0, 200.0, 300.0), (300.0, 50.0, 380.0, 200.0)];
        let detections: Vec<Detection> = boxes
            .iter()
            .map(|b| detection(PERSON_CLASS_ID, *b, None))
            .collect();
        let mut sink = MemorySink::new();

        let report =
            process_detections(&image, &detections, &mut sink, 0, &CropPadding::default())
                .unwrap();

        assert_eq!(report.count, 2);
        assert_eq!(report.unblurred, 2);
        for ((_, crop), detection) in sink.crops.iter().zip(&detections) {
            let region = compute_crop(
                detection.bbox.to_pixels(),
                (480, 640),
                &CropPadding::default(),
            );
            assert_eq!(crop, &extract_and_resize(&image, &region).unwrap());
        }
    }

    #[test]
    fn test_bad_mask_only_affects_its_detection() {
        let image = striped_image(640, 480);
        let mut broken = Array2::<f32>::zeros((4, 4));
        broken[[0, 0]] = f32::INFINITY;
        let detections = vec![
            detection(PERSON_CLASS_ID, (100.0, 100.0, 200.0, 300.0), Some(broken)),
            detection(
                PERSON_CLASS_ID,
                (300.0, 50.0, 380.0, 200.0),
                Some(box_mask(480, 640, (300, 50, 380, 200))),
            ),
            detection(PERSON_CLASS_ID, (400.0, 50.0, 480.0, 200.0), None),
        ];
        let mut sink = MemorySink::new();

        let report =
            process_detections(&image, &detections, &mut sink, 0, &CropPadding::default())
                .unwrap();

        assert_eq!(report.count, 3);
        assert_eq!(report.unblurred, 2);
        assert_eq!(sink.indices(), vec![1, 2, 3]);

        let region = compute_crop((100, 100, 200, 300), (480, 640), &CropPadding::default());
        assert_eq!(sink.crops[0].1, extract_and_resize(&image, &region).unwrap());
    }

    #[test]
    fn test_degenerate_region_is_counted_but_skipped() {
        let image = striped_image(64, 64);
        let detections = vec![
            detection(PERSON_CLASS_ID, (100.0, 10.0, 120.0, 40.0), None),
            detection(PERSON_CLASS_ID, (10.0, 10.0, 30.0, 40.0), None),
        ];
        let mut sink = MemorySink::new();

        let report =
            process_detections(&image, &detections, &mut sink, 0, &CropPadding::default())
                .unwrap();

        assert_eq!(report.count, 2);
        assert_eq!(report.skipped, 1);
        assert_eq!(sink.indices(), vec![2]);
    }

    #[test]
    fn test_backend_failure_propagates() {
        let image = striped_image(64, 64);
        let mut pipeline = Pipeline::new(FailingBackend);
        let mut sink = MemorySink::new();

        let err = pipeline.process_image(&image, &mut sink, 0).unwrap_err();
        assert!(err.to_string().contains("model exploded"));
        assert!(sink.crops.is_empty());
    }

    #[test]
    fn test_sink_failure_propagates() {
        struct RejectingSink;
        impl OutputSink for RejectingSink {
            fn accept(&mut self, _index: usize, _crop: &RgbImage) -> anyhow::Result<()> {
                anyhow::bail!("disk full")
            }
        }

        let image = striped_image(64, 64);
        let detections = vec![detection(PERSON_CLASS_ID, (10.0, 10.0, 30.0, 40.0), None)];

        let err = process_detections(
            &image,
            &detections,
            &mut RejectingSink,
            0,
            &CropPadding::default(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("disk full"));
    }
}
