//! Error types for the grid crate.

use thiserror::Error;

/// Errors that can occur when building or transforming grids.
#[derive(Debug, Error)]
pub enum GridError {
    /// A grid needs at least two rows and two columns.
    #[error("Invalid grid dimensions {cols}x{rows} (need at least 2x2)")]
    InvalidDimensions {
        /// Requested number of columns.
        cols: usize,
        /// Requested number of rows.
        rows: usize,
    },

    /// Cell size must be finite and positive.
    #[error("Invalid cell size {0}")]
    InvalidCellSize(f64),

    /// The cell buffer does not match the declared dimensions.
    #[error("Expected {expected} cells, got {actual}")]
    CellCountMismatch {
        /// Number of cells implied by the dimensions.
        expected: usize,
        /// Number of cells supplied.
        actual: usize,
    },

    /// A crop window exceeds the grid extent.
    #[error("Window rows {row_offset}..{row_end}, cols {col_offset}..{col_end} is outside the {cols}x{rows} grid")]
    OutOfBounds {
        /// First requested row.
        row_offset: usize,
        /// One past the last requested row.
        row_end: usize,
        /// First requested column.
        col_offset: usize,
        /// One past the last requested column.
        col_end: usize,
        /// Columns in the source grid.
        cols: usize,
        /// Rows in the source grid.
        rows: usize,
    },

    /// Two rasters that must line up do not.
    #[error("Size mismatch: {0}")]
    SizeMismatch(String),

    /// An operator parameter is outside its valid range.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// A cooperative cancellation was observed mid-render.
    #[error("Render cancelled")]
    Cancelled,

    /// A binary raster tile did not have the expected length.
    #[error("Malformed raster tile: expected {expected} bytes, got {actual}")]
    MalformedRaster {
        /// Required byte count.
        expected: usize,
        /// Bytes actually available.
        actual: usize,
    },

    /// The worker pool could not be started.
    #[error("Failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    /// I/O error reading or writing raster data.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
