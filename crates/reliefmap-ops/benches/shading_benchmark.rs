//! Cost of shading a mega tile and drawing contours over it.
//!
//! ```bash
//! cargo bench -p reliefmap-ops
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use image::{Rgba, RgbaImage};
use reliefmap_grid::{Grid, ParallelRowExecutor};
use reliefmap_ops::{ContourParams, GridOperator, IlluminatedContours, Shader, Slope};

/// A 768x768 mega tile of rolling hills.
fn mega_tile() -> Grid {
    let size = 768;
    let cells = (0..size * size)
        .map(|i| {
            let (c, r) = ((i % size) as f32, (i / size) as f32);
            (c * 0.02).sin() * 400.0 + (r * 0.015).cos() * 300.0 + 600.0
        })
        .collect();
    Grid::from_vec(size, size, 150.0, cells).expect("valid grid")
}

fn bench_shader(c: &mut Criterion) {
    let dem = mega_tile();
    let shader = Shader::default();
    let mut group = c.benchmark_group("shader_768");
    for threads in [1usize, 4] {
        let executor = ParallelRowExecutor::new(threads).expect("pool");
        group.bench_with_input(BenchmarkId::from_parameter(threads), &threads, |b, _| {
            b.iter(|| black_box(shader.operate(&executor, &dem).expect("shade")))
        });
    }
    group.finish();
}

fn bench_contours(c: &mut Criterion) {
    let dem = mega_tile();
    let executor = ParallelRowExecutor::new(4).expect("pool");
    let slope = Slope.operate(&executor, &dem).expect("slope");
    let contours = IlluminatedContours::new(ContourParams::default()).expect("params");

    let mut group = c.benchmark_group("contours_768");
    group.sample_size(10);
    for scale in [1u32, 2] {
        group.bench_with_input(BenchmarkId::new("supersample", scale), &scale, |b, &scale| {
            b.iter(|| {
                let side = dem.cols() as u32 * scale;
                let mut canvas = RgbaImage::from_pixel(side, side, Rgba([128, 128, 128, 255]));
                contours
                    .render(&executor, &mut canvas, &dem, &slope, None)
                    .expect("contours");
                black_box(canvas)
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_shader, bench_contours);
criterion_main!(benches);
