use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use image::{Rgb, RgbImage};
use inference::{BoundingBox, Detection, PERSON_CLASS_ID};
use ndarray::Array2;
use privacy::{
    Compositor, CropPadding, MemorySink, compute_crop, extract_and_resize, process_detections,
};

fn classroom_image(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, ((x ^ y) % 256) as u8])
    })
}

fn person(x: f32) -> Detection {
    let mut mask = Array2::<f32>::zeros((120, 160));
    mask.slice_mut(ndarray::s![20..100, 30..60]).fill(1.0);
    Detection {
        bbox: BoundingBox::new(x, 80.0, x + 120.0, 400.0),
        confidence: 0.9,
        class_id: PERSON_CLASS_ID,
        mask: Some(mask),
    }
}

fn benchmark_compositing(c: &mut Criterion) {
    let mut group = c.benchmark_group("compositing");
    group.sample_size(10);

    for (width, height) in [(640, 480), (1280, 720)] {
        let image = classroom_image(width, height);
        let mask = person(100.0).mask.unwrap();

        group.bench_with_input(
            BenchmarkId::new("blur_background", format!("{}x{}", width, height)),
            &image,
            |b, image| b.iter(|| Compositor::new(black_box(image))),
        );

        let compositor = Compositor::new(&image);
        group.bench_with_input(
            BenchmarkId::new("apply_mask", format!("{}x{}", width, height)),
            &mask,
            |b, mask| b.iter(|| compositor.composite(black_box(mask)).unwrap()),
        );
    }

    group.finish();
}

fn benchmark_cropping(c: &mut Criterion) {
    let mut group = c.benchmark_group("cropping");
    let image = classroom_image(1280, 720);

    for box_width in [40u32, 200, 600] {
        let region = compute_crop((100, 50, 100 + box_width, 700), (720, 1280), &CropPadding::default());
        group.bench_with_input(
            BenchmarkId::new("extract_and_resize", box_width),
            &region,
            |b, region| b.iter(|| extract_and_resize(black_box(&image), black_box(region)).unwrap()),
        );
    }

    group.finish();
}

fn benchmark_full_image(c: &mut Criterion) {
    let mut group = c.benchmark_group("process_detections");
    group.sample_size(10);
    let image = classroom_image(1280, 720);

    for people in [1usize, 5, 10] {
        let detections: Vec<Detection> = (0..people).map(|i| person(i as f32 * 110.0)).collect();
        group.bench_with_input(BenchmarkId::from_parameter(people), &detections, |b, detections| {
            b.iter(|| {
                let mut sink = MemorySink::new();
                process_detections(&image, detections, &mut sink, 0, &CropPadding::default())
                    .unwrap()
            })
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_compositing, benchmark_cropping, benchmark_full_image);
criterion_main!(benches);
