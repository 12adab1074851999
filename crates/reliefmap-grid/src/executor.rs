//! Row-chunked parallel execution.
//!
//! Every raster transform in the workspace goes through
//! [`ParallelRowExecutor::for_each_row_chunk`]: the destination buffer is
//! split into contiguous, disjoint row ranges, one task per range runs on a
//! fixed-size worker pool, and the call returns only after every task has
//! finished. Each task can only see its own rows of the destination, so the
//! result does not depend on the number of workers or on scheduling order.

use crate::{Grid, Result};
use std::ops::Range;
use tracing::trace;

/// Fixed-size worker pool that runs one task per row chunk.
pub struct ParallelRowExecutor {
    pool: rayon::ThreadPool,
    threads: usize,
}

impl std::fmt::Debug for ParallelRowExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParallelRowExecutor")
            .field("threads", &self.threads)
            .finish()
    }
}

impl ParallelRowExecutor {
    /// Create an executor with `threads` workers. Zero means one worker per
    /// available CPU.
    pub fn new(threads: usize) -> Result<Self> {
        let threads = if threads == 0 {
            available_parallelism()
        } else {
            threads
        };
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("reliefmap-rows-{}", i))
            .build()?;
        Ok(Self { pool, threads })
    }

    /// Create an executor with a single worker.
    pub fn sequential() -> Result<Self> {
        Self::new(1)
    }

    /// Number of workers in the pool.
    pub fn threads(&self) -> usize {
        self.threads
    }

    /// Run `f` once per row chunk of `dst` and wait for all chunks.
    ///
    /// `dst` holds `dst.len() / row_len` rows of `row_len` elements. `f`
    /// receives the row range it owns and the matching slice of `dst`.
    pub fn for_each_row_chunk<T, F>(&self, dst: &mut [T], row_len: usize, f: F)
    where
        T: Send,
        F: Fn(Range<usize>, &mut [T]) + Sync,
    {
        if row_len == 0 {
            return;
        }
        debug_assert_eq!(dst.len() % row_len, 0, "destination is not a whole number of rows");
        let rows = dst.len() / row_len;
        let ranges = partition_rows(rows, self.threads);
        trace!(rows, chunks = ranges.len(), "running row chunks");

        if ranges.len() == 1 {
            f(0..rows, dst);
            return;
        }

        let f = &f;
        let mut rest = dst;
        self.pool.scope(|scope| {
            for range in ranges {
                let (chunk, tail) = std::mem::take(&mut rest).split_at_mut(range.len() * row_len);
                rest = tail;
                scope.spawn(move |_| f(range, chunk));
            }
        });
    }

    /// Allocate a grid with the georeference of `src` and fill it row chunk by
    /// row chunk. Cells that `f` does not write stay NaN.
    pub fn map_grid<F>(&self, src: &Grid, f: F) -> Grid
    where
        F: Fn(Range<usize>, &mut [f32]) + Sync,
    {
        let mut dst = Grid::like(src, f32::NAN);
        let cols = dst.cols();
        self.for_each_row_chunk(dst.cells_mut(), cols, f);
        dst
    }
}

/// Split `rows` into `min(chunks, rows)` contiguous ranges whose lengths
/// differ by at most one. Always returns at least one range.
pub fn partition_rows(rows: usize, chunks: usize) -> Vec<Range<usize>> {
    let count = chunks.min(rows).max(1);
    let base = rows / count;
    let extra = rows % count;
    let mut start = 0;
    (0..count)
        .map(|i| {
            let len = base + usize::from(i < extra);
            let range = start..start + len;
            start += len;
            range
        })
        .collect()
}

/// Number of CPUs the process may use, at least one.
pub fn available_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partition_covers_all_rows() {
        let ranges = partition_rows(10, 4);
        assert_eq!(ranges, vec![0..3, 3..6, 6..8, 8..10]);
    }

    #[test]
    fn test_partition_never_empty() {
        assert_eq!(partition_rows(1, 8), vec![0..1]);
        assert_eq!(partition_rows(0, 8), vec![0..0]);
        assert_eq!(partition_rows(5, 0), vec![0..5]);
    }

    #[test]
    fn test_each_chunk_sees_only_its_rows() {
        let executor = ParallelRowExecutor::new(3).expect("pool");
        let mut dst = vec![0usize; 7 * 4];
        executor.for_each_row_chunk(&mut dst, 4, |rows, chunk| {
            assert_eq!(chunk.len(), rows.len() * 4);
            for (i, row) in rows.enumerate() {
                chunk[i * 4..(i + 1) * 4].fill(row);
            }
        });
        for row in 0..7 {
            assert!(dst[row * 4..(row + 1) * 4].iter().all(|&v| v == row));
        }
    }

    #[test]
    fn test_map_grid_keeps_georeference() {
        let src = Grid::new(3, 5, 2.0).unwrap().with_origin(10.0, 20.0);
        let executor = ParallelRowExecutor::new(2).unwrap();
        let dst = executor.map_grid(&src, |rows, chunk| {
            for (i, row) in rows.enumerate() {
                chunk[i * 3..(i + 1) * 3].fill(row as f32);
            }
        });
        assert!(dst.has_same_georeference(&src));
        assert_eq!(dst.value(2, 4), 4.0);
    }
}
