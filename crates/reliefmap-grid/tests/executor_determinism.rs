//! The executor must produce the same cells whatever the pool size.

use reliefmap_grid::{Grid, Interpolation, ParallelRowExecutor};

fn rough_terrain() -> Grid {
    let cols = 37;
    let rows = 53;
    let cells = (0..cols * rows)
        .map(|i| {
            let (c, r) = ((i % cols) as f32, (i / cols) as f32);
            if (c as usize + r as usize) % 17 == 0 {
                f32::NAN
            } else {
                (c * 0.7).sin() * 40.0 + (r * 0.4).cos() * 25.0 + c * r * 0.01
            }
        })
        .collect();
    Grid::from_vec(cols, rows, 12.5, cells)
        .expect("valid grid")
        .with_origin(1000.0, 2000.0)
}

fn resample(executor: &ParallelRowExecutor, src: &Grid) -> Grid {
    executor.map_grid(src, |rows, chunk| {
        let cols = src.cols();
        for (i, row) in rows.enumerate() {
            for col in 0..cols {
                let x = src.west() + (col as f64 + 0.25) * src.cell_size();
                let y = src.north() - (row as f64 + 0.75) * src.cell_size();
                chunk[i * cols + col] =
                    src.sample(x, y, Interpolation::Bicubic) + src.slope(col, row) as f32;
            }
        }
    })
}

#[test]
fn test_output_is_invariant_to_pool_size() {
    let src = rough_terrain();
    let reference = resample(&ParallelRowExecutor::sequential().expect("pool"), &src);

    for threads in [2, 3, 8, 64] {
        let executor = ParallelRowExecutor::new(threads).expect("pool");
        let out = resample(&executor, &src);
        let same = reference
            .cells()
            .iter()
            .zip(out.cells())
            .all(|(a, b)| a.to_bits() == b.to_bits());
        assert!(same, "{} workers changed the output", threads);
    }
}

#[test]
fn test_more_workers_than_rows() {
    let src = Grid::filled(4, 2, 1.0, 3.0).expect("valid grid");
    let executor = ParallelRowExecutor::new(16).expect("pool");
    let out = executor.map_grid(&src, |rows, chunk| {
        assert_eq!(rows.len(), 1, "two rows over sixteen workers gives one row per chunk");
        chunk.fill(rows.start as f32);
    });
    assert_eq!(out.row(0), &[0.0; 4]);
    assert_eq!(out.row(1), &[1.0; 4]);
}
