//! # reliefmap-tiles
//!
//! Web Mercator tile addressing and tile sources for the relief renderer.
//!
//! - [`TileCoord`], [`AxisConvention`] and [`Direction`]: tile indices in
//!   north-down (Google/OSM) or south-up (TMS) numbering and their neighbors.
//! - [`TileIterator`]: every tile covering a bounding box over a zoom range.
//! - [`TileSet`]: tiles behind a [`UrlTemplate`], created once per key and
//!   shared through a [`TileCache`] ([`NoOpCache`], [`MemoryCache`],
//!   [`DiskCache`]).
//! - [`Tile`]: a lazily fetched, memoized payload ([`TileData`]).
//! - [`mosaic`]: 3x3 mega tiles for neighborhood operators.
//!
//! ## Example
//!
//! ```no_run
//! use reliefmap_tiles::{MemoryCache, SchemeFetcher, TileCoord, TileSet, UrlTemplate, DEFAULT_TIMEOUT};
//! use std::sync::Arc;
//!
//! let template = UrlTemplate::new("https://tiles.example.com/terrain/{z}/{x}/{y}.bin")?;
//! let tiles = TileSet::new(
//!     template,
//!     Arc::new(MemoryCache::default()),
//!     Arc::new(SchemeFetcher::new(DEFAULT_TIMEOUT)?),
//! );
//!
//! let grid = reliefmap_tiles::mosaic::compose_mega_grid(&tiles, &TileCoord::new(10, 163, 357))?;
//! assert_eq!(grid.cols(), 768);
//! # Ok::<(), reliefmap_tiles::TileError>(())
//! ```

pub mod cache;
mod coord;
mod error;
mod fetch;
mod iter;
pub mod mosaic;
mod prefetch;
mod template;
mod tile;
mod tileset;

pub use cache::{DiskCache, MemoryCache, NoOpCache, TileCache};
pub use coord::{
    lat_lon_to_meters, lat_lon_to_pixels, meters_to_lat_lon, meters_to_pixels, pixels_to_lat_lon,
    pixels_to_meters, resolution, tiles_per_side, AxisConvention, Direction, LatLonBounds,
    MercatorBounds, TileCoord, EARTH_RADIUS, INITIAL_RESOLUTION, MAX_LATITUDE, MAX_ZOOM,
    ORIGIN_SHIFT, TILE_SIZE,
};
pub use error::TileError;
pub use fetch::{ByteFetcher, FileFetcher, HttpFetcher, SchemeFetcher, DEFAULT_TIMEOUT};
pub use iter::TileIterator;
pub use prefetch::{prefetch_region, PrefetchSummary, ProgressCallback};
pub use template::UrlTemplate;
pub use tile::{Tile, TileData, TileKind};
pub use tileset::TileSet;

/// Result type for tile operations.
pub type Result<T> = std::result::Result<T, TileError>;
