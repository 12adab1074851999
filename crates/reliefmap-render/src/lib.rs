//! # reliefmap-render
//!
//! Renders shaded, colorized and contoured relief tiles from a terrain tile
//! source, one tile at a time ([`TileRenderer`]) or as a PNG pyramid on disk
//! ([`TileGenerator`]). Everything is driven by a YAML [`RenderConfig`].
//!
//! ```no_run
//! use reliefmap_render::{RenderConfig, TileRenderer};
//!
//! let config = RenderConfig::load("config/relief.yaml")?;
//! let renderer = TileRenderer::new(&config)?;
//! let tile = renderer.render(12, 656, 1430)?;
//! tile.save("relief.png")?;
//! # Ok::<(), reliefmap_render::RenderError>(())
//! ```

pub mod config;
mod error;
mod generator;
mod renderer;

pub use config::{parse_bounds, CacheConfig, CacheStrategy, RenderConfig, SourceConfig};
pub use error::{RenderError, Result};
pub use generator::{write_png, GenerationSummary, TileGenerator};
pub use renderer::TileRenderer;
