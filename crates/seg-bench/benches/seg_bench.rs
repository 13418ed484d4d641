//! Benchmarks for label propagation.
//!
//! Run with: `cargo bench` (add `--features wgpu` for the GPU surface)

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};

use seg_compute::reference;
use seg_compute::{BufferStrategy, CpuSurface, EngineConfig, KernelParams, LabelEngine};
use seg_core::{GrayImage, LabelPalette};

/// Blocky test image: 8x8 tiles with four intensity levels.
fn tiles(size: u32) -> GrayImage {
    GrayImage::from_fn(size, size, |x, y| (((x / 8) * 7 + (y / 8) * 13) % 4) as u8)
}

/// Benchmark a single propagation step on the reference kernel.
fn bench_propagate(c: &mut Criterion) {
    let mut group = c.benchmark_group("propagate");

    for size in [256u32, 512, 1024] {
        let image = tiles(size);
        let params = KernelParams::default();
        let mut src = vec![0u32; image.pixel_count()];
        reference::init_labels(size, &mut src);
        let mut dst = vec![0u32; image.pixel_count()];

        group.throughput(Throughput::Elements(image.pixel_count() as u64));
        group.bench_with_input(BenchmarkId::new("reference", size), &image, |b, img| {
            b.iter(|| {
                reference::propagate_min_label(img.as_slice(), size, size, &params, black_box(&src), &mut dst)
            })
        });
    }

    group.finish();
}

/// Benchmark full runs to convergence.
fn bench_segment(c: &mut Criterion) {
    let mut group = c.benchmark_group("segment");
    group.sample_size(10);

    for size in [128u32, 256] {
        let image = tiles(size);
        group.throughput(Throughput::Elements(image.pixel_count() as u64));

        for (name, strategy) in [("cpu_swap", BufferStrategy::Swap), ("cpu_copy_back", BufferStrategy::CopyBack)] {
            let mut engine =
                LabelEngine::with_config(CpuSurface::new(), EngineConfig::default().with_strategy(strategy));
            group.bench_with_input(BenchmarkId::new(name, size), &image, |b, img| {
                b.iter(|| engine.run(black_box(img)).unwrap())
            });
        }

        #[cfg(feature = "wgpu")]
        {
            if let Ok(surface) = seg_compute::WgpuSurface::new() {
                let mut engine = LabelEngine::new(surface);
                group.bench_with_input(BenchmarkId::new("wgpu", size), &image, |b, img| {
                    b.iter(|| engine.run(black_box(img)).unwrap())
                });
            }
        }
    }

    group.finish();
}

/// Benchmark label colourisation.
fn bench_colorize(c: &mut Criterion) {
    let image = tiles(1024);
    let labels = LabelEngine::new(CpuSurface::new()).run(&image).unwrap().labels;
    let palette = LabelPalette::new(42);

    c.bench_function("colorize_1024", |b| b.iter(|| palette.colorize(black_box(&labels))));
}

criterion_group!(benches, bench_propagate, bench_segment, bench_colorize);
criterion_main!(benches);
