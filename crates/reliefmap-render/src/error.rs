//! Error types for rendering and tile generation.

use reliefmap_grid::GridError;
use reliefmap_tiles::TileError;
use thiserror::Error;

/// Errors that can occur while configuring or running the renderer.
#[derive(Debug, Error)]
pub enum RenderError {
    /// A tile could not be addressed or fetched.
    #[error("Tile error: {0}")]
    Tile(#[from] TileError),

    /// A raster operator failed.
    #[error("Grid error: {0}")]
    Grid(GridError),

    /// The configuration file is not valid YAML for a [`RenderConfig`](crate::RenderConfig).
    #[error("Failed to parse configuration: {0}")]
    Config(#[from] serde_yaml::Error),

    /// The configuration parsed but is inconsistent.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The render was cancelled; any partial output must be discarded.
    #[error("Render cancelled")]
    Cancelled,

    /// I/O error reading configuration or writing tiles.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A rendered tile could not be encoded.
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// The Ctrl-C handler could not be installed.
    #[error("Failed to install signal handler: {0}")]
    Signal(#[from] ctrlc::Error),
}

impl From<GridError> for RenderError {
    fn from(err: GridError) -> Self {
        match err {
            GridError::Cancelled => RenderError::Cancelled,
            other => RenderError::Grid(other),
        }
    }
}

/// Result type for rendering operations.
pub type Result<T> = std::result::Result<T, RenderError>;
