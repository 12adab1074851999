//! # reliefmap-ops
//!
//! Raster operators that turn elevation grids into relief imagery. Every
//! operator runs on a [`ParallelRowExecutor`], one chunk of rows at a time.
//!
//! - [`Shader`]: hillshading from quadrant-sum surface normals.
//! - [`IlluminatedContours`]: Tanaka-style contours whose width and tone
//!   follow the illumination.
//! - [`Colorizer`]: gray, exposition and hypsometric tints from a
//!   [`ColorRamp`].
//! - [`GaussianLowPass`], [`Slope`] and the pointwise operators
//!   ([`AddOffset`], [`ScaleBy`], [`ScaleToRange`], [`Binarize`], [`CopyGrid`]).
//!
//! ```
//! use reliefmap_grid::{Grid, ParallelRowExecutor};
//! use reliefmap_ops::{GridOperator, Shader};
//!
//! let dem = Grid::filled(16, 16, 25.0, 300.0)?;
//! let executor = ParallelRowExecutor::new(2)?;
//! let shading = Shader::default().operate(&executor, &dem)?;
//! let flat = ((45f64.to_radians().cos() + 1.0) / 2.0 * 255.0) as f32;
//! assert!((shading.value(8, 8) - flat).abs() < 1e-3);
//! # Ok::<(), reliefmap_grid::GridError>(())
//! ```

mod colorizer;
mod contours;
mod pointwise;
mod shader;
mod smooth;
mod vector;

pub use colorizer::{ColorRamp, ColorStop, ColorVisualization, Colorizer, RampColor, DEFAULT_ELEVATION_RANGE};
pub use contours::{ContourParams, IlluminatedContours};
pub use pointwise::{AddOffset, Binarize, CopyGrid, ScaleBy, ScaleToRange, Slope};
pub use shader::{planar_cell_size, Shader, EARTH_RADIUS_M};
pub use smooth::{gaussian_kernel, GaussianLowPass};
pub use vector::Vector3;

use reliefmap_grid::{Grid, ParallelRowExecutor, Result};
use std::ops::Range;

/// A transform from one grid to a new grid of the same georeference.
///
/// Implementors only describe how to fill a block of destination rows;
/// [`operate`](GridOperator::operate) handles allocation and runs the
/// blocks concurrently.
pub trait GridOperator: Sync {
    /// Human-readable operator name, used in logs.
    fn name(&self) -> &'static str;

    /// Fill destination rows `rows` into `dst`, which holds exactly those
    /// rows of `src.cols()` cells each.
    fn operate_rows(&self, src: &Grid, rows: Range<usize>, dst: &mut [f32]);

    /// Run the operator over the whole grid.
    fn operate(&self, executor: &ParallelRowExecutor, src: &Grid) -> Result<Grid> {
        tracing::trace!(operator = self.name(), cols = src.cols(), rows = src.rows(), "operate");
        Ok(executor.map_grid(src, |rows, dst| self.operate_rows(src, rows, dst)))
    }
}
