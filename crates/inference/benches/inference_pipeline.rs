use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use image::{Rgb, RgbImage};
use inference::processing::{PostProcessor, PreProcessor, TransformParams};
use ndarray::{Array, IxDyn};

const NUM_CLASSES: usize = 80;
const NUM_MASKS: usize = 32;
const NUM_ANCHORS: usize = 8400;

/// Create mock YOLOv8-seg output with N high-confidence, non-overlapping people
fn create_mock_seg_output(num_detections: usize) -> (Array<f32, IxDyn>, Array<f32, IxDyn>) {
    let channels = 4 + NUM_CLASSES + NUM_MASKS;
    let mut preds = Array::zeros(IxDyn(&[1, channels, NUM_ANCHORS]));
    for i in 0..num_detections.min(NUM_ANCHORS) {
        preds[[0, 0, i]] = 20.0 + (i % 20) as f32 * 30.0;
        preds[[0, 1, i]] = 20.0 + (i / 20) as f32 * 30.0;
        preds[[0, 2, i]] = 20.0;
        preds[[0, 3, i]] = 20.0;
        preds[[0, 4, i]] = 0.9;
        preds[[0, 4 + NUM_CLASSES, i]] = 1.0;
    }
    let protos = Array::from_elem(IxDyn(&[1, NUM_MASKS, 160, 160]), 0.5f32);
    (preds, protos)
}

fn benchmark_preprocessing(c: &mut Criterion) {
    let mut group = c.benchmark_group("preprocessing");

    let resolutions = [(640, 480), (1280, 720), (1920, 1080)];

    for (width, height) in resolutions.iter() {
        let image = RgbImage::from_pixel(*width, *height, Rgb([128, 128, 128]));
        let mut preprocessor = PreProcessor::new((640, 640));

        group.bench_with_input(
            BenchmarkId::new("letterbox", format!("{}x{}", width, height)),
            &image,
            |b, image| b.iter(|| preprocessor.preprocess(black_box(image)).unwrap()),
        );
    }

    group.finish();
}

fn benchmark_postprocessing(c: &mut Criterion) {
    let mut group = c.benchmark_group("postprocessing");
    let post_processor = PostProcessor::new(0.6, 0.3, 300);
    let transform = TransformParams {
        orig_width: 1920,
        orig_height: 1080,
        input_width: 640,
        input_height: 640,
        resized_width: 640,
        resized_height: 360,
        scale: 1.0 / 3.0,
        offset_x: 0.0,
        offset_y: 140.0,
    };

    for num_detections in [0, 5, 20, 50].iter() {
        let (preds, protos) = create_mock_seg_output(*num_detections);

        group.bench_with_input(
            BenchmarkId::new("parse_detections", num_detections),
            &(preds, protos),
            |b, (preds, protos)| {
                b.iter(|| {
                    post_processor
                        .parse_detections(
                            black_box(&preds.view()),
                            black_box(&protos.view()),
                            black_box(&transform),
                        )
                        .unwrap()
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, benchmark_preprocessing, benchmark_postprocessing);
criterion_main!(benches);
