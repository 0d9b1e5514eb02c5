// Presentation Benchmarks
// Performance of the per-frame path on the software renderer

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use crt_pipeline::display::{
    DirectColorSurface, IndexedSurface, Palette, Pipeline, Resolution, SoftwareBackend,
};
use crt_pipeline::VideoConfig;
use std::hint::black_box;

/// Benchmark palette resolution of a full logical frame
/// This runs on the CPU every frame regardless of backend
fn bench_palette_resolve(c: &mut Criterion) {
    let mut group = c.benchmark_group("palette_resolve");

    for (width, height) in [(320usize, 200usize), (640, 400)] {
        let palette = Palette::grayscale().into_shared();
        let mut logical = IndexedSurface::with_palette(width, height, palette);
        logical.test_pattern();
        let mut direct = DirectColorSurface::new(width, height);

        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}x{}", width, height)),
            &(),
            |b, _| {
                b.iter(|| {
                    logical.resolve_into(&mut direct).unwrap();
                    black_box(direct.pixels());
                });
            },
        );
    }

    group.finish();
}

/// Benchmark a whole frame: resolve, upload and three scaling passes
fn bench_present_frame(c: &mut Criterion) {
    let mut group = c.benchmark_group("present_frame");
    group.sample_size(20); // Full-HD software scaling is slow

    for output in [Resolution::new(640, 480), Resolution::new(1920, 1080)] {
        let backend = SoftwareBackend::new(output);
        let mut pipeline = Pipeline::init(backend, &VideoConfig::default()).unwrap();
        pipeline.set_palette(Palette::grayscale().colors());
        pipeline.logical_mut().gradient_pattern();

        group.bench_with_input(BenchmarkId::from_parameter(output), &(), |b, _| {
            b.iter(|| {
                pipeline.present_frame().unwrap();
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_palette_resolve, bench_present_frame);
criterion_main!(benches);
