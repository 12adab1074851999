//! Error types for tile addressing, fetching and caching.

use reliefmap_grid::GridError;
use thiserror::Error;

/// Errors that can occur when addressing, fetching or caching tiles.
#[derive(Debug, Error)]
pub enum TileError {
    /// A tile index is outside `[0, 2^zoom)` or the zoom is too large.
    #[error("Malformed tile coordinate z={zoom} x={x} y={y}")]
    MalformedCoordinate {
        /// Zoom level.
        zoom: u32,
        /// Column.
        x: i64,
        /// Row.
        y: i64,
    },

    /// Zoom level above [`MAX_ZOOM`](crate::MAX_ZOOM).
    #[error("Invalid zoom level {0} (must be 0-{max})", max = crate::MAX_ZOOM)]
    InvalidZoomLevel(u32),

    /// A location outside the Web Mercator domain.
    #[error("Location ({lat}, {lon}) is outside the Web Mercator domain")]
    InvalidLocation {
        /// Latitude in degrees.
        lat: f64,
        /// Longitude in degrees.
        lon: f64,
    },

    /// An empty or inverted bounding box or zoom range.
    #[error("Invalid bounds: {0}")]
    InvalidBounds(String),

    /// The URL template is missing a token or is not URL-shaped.
    #[error("Invalid URL template '{0}'")]
    InvalidTemplate(String),

    /// A tile's bytes could not be read or decoded.
    #[error("Failed to fetch tile {key}: {reason}")]
    FetchFailure {
        /// Resolved URL of the tile.
        key: String,
        /// Reason for failure.
        reason: String,
    },

    /// No fetcher handles the URL's scheme.
    #[error("Unsupported URL scheme in '{0}'")]
    UnsupportedScheme(String),

    /// A persisted cache blob could not be decoded.
    #[error("Corrupt cache blob: {0}")]
    CorruptBlob(String),

    /// Grid construction or raster decoding error.
    #[error("Grid error: {0}")]
    Grid(#[from] GridError),

    /// Image decoding or encoding error.
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// HTTP request error.
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The prefetch worker pool could not be started.
    #[error("Failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}
