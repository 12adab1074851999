//! # reliefmap-grid
//!
//! In-memory terrain rasters and the parallel machinery that transforms them.
//!
//! - [`Grid`]: a row-major `f32` raster with a linear georeference, point
//!   sampling (nearest, bilinear, bicubic), slope/aspect derivatives,
//!   statistics and cropping. Void cells are NaN.
//! - [`ParallelRowExecutor`]: splits a destination buffer into contiguous row
//!   chunks and runs them on a fixed-size worker pool, joining before it
//!   returns.
//! - [`CancellationToken`]: polled by long renders between rows.
//! - [`raster`]: the headerless 256x256 little-endian float tile format.
//!
//! ## Example
//!
//! ```
//! use reliefmap_grid::{Grid, ParallelRowExecutor};
//!
//! let dem = Grid::filled(64, 64, 30.0, 120.0)?.with_origin(500_000.0, 4_200_000.0);
//! let executor = ParallelRowExecutor::new(4)?;
//!
//! // Add 10 m to every cell, four row chunks at a time.
//! let raised = executor.map_grid(&dem, |rows, chunk| {
//!     let cols = dem.cols();
//!     for (i, row) in rows.enumerate() {
//!         for (dst, src) in chunk[i * cols..(i + 1) * cols].iter_mut().zip(dem.row(row)) {
//!             *dst = src + 10.0;
//!         }
//!     }
//! });
//! assert_eq!(raised.min_max(), (130.0, 130.0));
//! # Ok::<(), reliefmap_grid::GridError>(())
//! ```

mod cancel;
mod error;
mod executor;
mod grid;
pub mod raster;

pub use cancel::CancellationToken;
pub use error::GridError;
pub use executor::{available_parallelism, partition_rows, ParallelRowExecutor};
pub use grid::{Grid, GridStatistics, Interpolation};

/// Result type for grid operations.
pub type Result<T> = std::result::Result<T, GridError>;
