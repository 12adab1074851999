//! Separable Gaussian low-pass filter.

use crate::GridOperator;
use reliefmap_grid::{Grid, ParallelRowExecutor, Result};
use std::ops::Range;

/// Normalized 1D Gaussian kernel with half-width `ceil(3 * sigma)`, capped
/// at `max_half_width`.
///
/// A kernel wider than the grid it runs over adds no support, so callers
/// pass the grid's larger dimension. An infinite `sigma` gives a flat kernel.
pub fn gaussian_kernel(sigma: f64, max_half_width: usize) -> Vec<f64> {
    let reach = (3.0 * sigma).ceil();
    let half = if reach >= max_half_width as f64 {
        max_half_width
    } else {
        reach.max(0.0) as usize
    };
    let denom = 2.0 * sigma * sigma;
    let mut kernel: Vec<f64> = (0..2 * half + 1)
        .map(|i| {
            let x = i as f64 - half as f64;
            (-x * x / denom).exp()
        })
        .collect();
    let sum: f64 = kernel.iter().sum();
    for w in &mut kernel {
        *w /= sum;
    }
    kernel
}

/// Gaussian blur with standard deviation `sigma`, in cells.
///
/// Void cells stay void and are left out of their neighbors' weighted
/// averages, so the filter does not spread holes. A `sigma` of zero or less
/// copies the grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GaussianLowPass {
    /// Standard deviation in cells.
    pub sigma: f64,
}

impl GaussianLowPass {
    /// Create a filter.
    pub fn new(sigma: f64) -> Self {
        Self { sigma }
    }

    fn is_identity(&self) -> bool {
        self.sigma.is_nan() || self.sigma <= 0.0
    }
}

/// One pass of the separable filter along rows or columns.
struct Pass<'k> {
    kernel: &'k [f64],
    horizontal: bool,
}

impl Pass<'_> {
    fn run_rows(&self, src: &Grid, rows: Range<usize>, dst: &mut [f32]) {
        let cols = src.cols();
        let half = (self.kernel.len() / 2) as isize;
        for (i, row) in rows.enumerate() {
            for col in 0..cols {
                let out = &mut dst[i * cols + col];
                if src.value(col, row).is_nan() {
                    *out = f32::NAN;
                    continue;
                }
                let mut sum = 0.0;
                let mut weight = 0.0;
                for (k, &w) in self.kernel.iter().enumerate() {
                    let offset = k as isize - half;
                    let (c, r) = if self.horizontal {
                        (col as isize + offset, row as isize)
                    } else {
                        (col as isize, row as isize + offset)
                    };
                    if c < 0 || r < 0 || c >= cols as isize || r >= src.rows() as isize {
                        continue;
                    }
                    let v = src.value(c as usize, r as usize);
                    if !v.is_nan() {
                        sum += w * v as f64;
                        weight += w;
                    }
                }
                *out = if weight > 0.0 { (sum / weight) as f32 } else { f32::NAN };
            }
        }
    }
}

impl GridOperator for GaussianLowPass {
    fn name(&self) -> &'static str {
        "Gaussian Low Pass"
    }

    /// Runs both passes over the requested rows only. The column pass needs
    /// the full horizontal result, so this recomputes it for the rows within
    /// reach of the kernel.
    fn operate_rows(&self, src: &Grid, rows: Range<usize>, dst: &mut [f32]) {
        let cols = src.cols();
        if self.is_identity() {
            dst.copy_from_slice(&src.cells()[rows.start * cols..rows.end * cols]);
            return;
        }
        let kernel = gaussian_kernel(self.sigma, src.cols().max(src.rows()));
        let half = kernel.len() / 2;
        let from = rows.start.saturating_sub(half);
        let to = (rows.end + half).min(src.rows());

        let mut horizontal = Grid::like(src, f32::NAN);
        let row_pass = Pass { kernel: &kernel, horizontal: true };
        row_pass.run_rows(src, from..to, &mut horizontal.cells_mut()[from * cols..to * cols]);

        let col_pass = Pass { kernel: &kernel, horizontal: false };
        col_pass.run_rows(&horizontal, rows, dst);
    }

    fn operate(&self, executor: &ParallelRowExecutor, src: &Grid) -> Result<Grid> {
        if self.is_identity() {
            return Ok(src.clone());
        }
        let kernel = gaussian_kernel(self.sigma, src.cols().max(src.rows()));
        let row_pass = Pass { kernel: &kernel, horizontal: true };
        let horizontal = executor.map_grid(src, |rows, dst| row_pass.run_rows(src, rows, dst));
        let col_pass = Pass { kernel: &kernel, horizontal: false };
        Ok(executor.map_grid(&horizontal, |rows, dst| col_pass.run_rows(&horizontal, rows, dst)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_kernel_is_normalized_and_symmetric() {
        let k = gaussian_kernel(1.5, 100);
        assert_eq!(k.len(), 11);
        assert_relative_eq!(k.iter().sum::<f64>(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(k[0], k[10]);
        assert!(k[5] > k[4]);
    }

    #[test]
    fn test_kernel_half_width_is_capped() {
        assert_eq!(gaussian_kernel(1.5, 2).len(), 5);
        assert_eq!(gaussian_kernel(1e300, 4).len(), 9);
        let flat = gaussian_kernel(f64::INFINITY, 3);
        assert_eq!(flat.len(), 7);
        for &w in &flat {
            assert_relative_eq!(w, 1.0 / 7.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_huge_sigma_averages_the_grid() {
        let cells = (0..16).map(|i| i as f32).collect();
        let grid = Grid::from_vec(4, 4, 1.0, cells).unwrap();
        let executor = ParallelRowExecutor::sequential().unwrap();
        for sigma in [f64::INFINITY, 1e12] {
            let out = GaussianLowPass::new(sigma).operate(&executor, &grid).unwrap();
            for &v in out.cells() {
                assert_relative_eq!(v, 7.5, epsilon = 1e-3);
            }
        }
    }

    #[test]
    fn test_constant_grid_is_unchanged() {
        let grid = Grid::filled(9, 7, 1.0, 42.0).unwrap();
        let executor = ParallelRowExecutor::new(3).unwrap();
        let out = GaussianLowPass::new(2.0).operate(&executor, &grid).unwrap();
        for &v in out.cells() {
            assert_relative_eq!(v, 42.0, epsilon = 1e-4);
        }
    }

    #[test]
    fn test_spike_is_spread() {
        let mut grid = Grid::new(9, 9, 1.0).unwrap();
        grid.set_value(4, 4, 100.0);
        let executor = ParallelRowExecutor::sequential().unwrap();
        let out = GaussianLowPass::new(1.0).operate(&executor, &grid).unwrap();
        assert!(out.value(4, 4) < 100.0);
        assert!(out.value(5, 4) > 0.0);
        assert_relative_eq!(out.value(5, 4), out.value(4, 3), epsilon = 1e-4);
        assert_relative_eq!(out.cells().iter().sum::<f32>(), 100.0, epsilon = 1e-2);
    }

    #[test]
    fn test_void_does_not_spread() {
        let mut grid = Grid::filled(5, 5, 1.0, 7.0).unwrap();
        grid.set_value(2, 2, f32::NAN);
        let executor = ParallelRowExecutor::sequential().unwrap();
        let out = GaussianLowPass::new(1.0).operate(&executor, &grid).unwrap();
        assert!(out.value(2, 2).is_nan());
        assert_relative_eq!(out.value(1, 2), 7.0, epsilon = 1e-4);
    }

    #[test]
    fn test_row_blocks_match_whole_grid() {
        let cells = (0..64).map(|i| ((i * 37) % 11) as f32).collect();
        let grid = Grid::from_vec(8, 8, 1.0, cells).unwrap();
        let filter = GaussianLowPass::new(1.0);
        let executor = ParallelRowExecutor::sequential().unwrap();
        let whole = filter.operate(&executor, &grid).unwrap();
        let mut block = vec![0.0f32; 3 * 8];
        filter.operate_rows(&grid, 2..5, &mut block);
        assert_eq!(&block[..], &whole.cells()[2 * 8..5 * 8]);
    }

    #[test]
    fn test_zero_sigma_copies() {
        let grid = Grid::filled(3, 3, 1.0, 1.0).unwrap();
        let executor = ParallelRowExecutor::sequential().unwrap();
        assert_eq!(GaussianLowPass::new(0.0).operate(&executor, &grid).unwrap(), grid);
    }
}
