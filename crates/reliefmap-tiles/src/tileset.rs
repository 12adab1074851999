//! A source of tiles addressed through a URL template.

use crate::cache::TileCache;
use crate::coord::{AxisConvention, Direction, LatLonBounds, TileCoord};
use crate::fetch::ByteFetcher;
use crate::iter::TileIterator;
use crate::template::UrlTemplate;
use crate::tile::{Tile, TileData, TileKind, TileSource};
use crate::Result;
use std::ops::RangeInclusive;
use std::sync::Arc;
use tracing::trace;

/// Tiles behind one URL template, shared through a cache.
///
/// Coordinates passed to a tile set are always north-down. If the source
/// numbers its rows from the south, the row is flipped when the URL is
/// resolved.
pub struct TileSet {
    template: UrlTemplate,
    convention: AxisConvention,
    cache: Arc<dyn TileCache>,
    fetcher: Arc<dyn ByteFetcher>,
}

impl TileSet {
    /// Create a tile set for a north-down source.
    pub fn new(template: UrlTemplate, cache: Arc<dyn TileCache>, fetcher: Arc<dyn ByteFetcher>) -> Self {
        Self {
            template,
            convention: AxisConvention::NorthDown,
            cache,
            fetcher,
        }
    }

    /// Mark the source as numbering rows from the bottom (TMS).
    pub fn with_south_up(mut self, south_up: bool) -> Self {
        self.convention = AxisConvention::from_south_up(south_up);
        self
    }

    /// The URL template.
    pub fn template(&self) -> &UrlTemplate {
        &self.template
    }

    /// Payload kind of every tile in the set.
    pub fn kind(&self) -> TileKind {
        self.template.kind()
    }

    /// Row numbering used by the source.
    pub fn source_convention(&self) -> AxisConvention {
        self.convention
    }

    /// The shared cache.
    pub fn cache(&self) -> &Arc<dyn TileCache> {
        &self.cache
    }

    /// Resolved URL of a north-down coordinate. This is the cache key.
    pub fn url_for(&self, coord: &TileCoord) -> Result<String> {
        let coord = coord.validate()?;
        let source = coord.to_convention(AxisConvention::NorthDown, self.convention);
        Ok(self.template.resolve(&source))
    }

    /// The tile at `coord`, from the cache or newly created and cached.
    ///
    /// Lookup and creation are one step inside the cache, so concurrent
    /// callers asking for the same key receive the same tile, even through
    /// different tile sets sharing the cache. Nothing is fetched here.
    pub fn get(&self, coord: &TileCoord) -> Result<Arc<Tile>> {
        let key = self.url_for(coord)?;
        let mut created = false;
        let tile = self.cache.get_or_insert_with(&key, &mut || {
            created = true;
            let source = TileSource {
                fetcher: self.fetcher.clone(),
                cache: Arc::downgrade(&self.cache),
            };
            Arc::new(Tile::new(*coord, key.clone(), self.kind(), source))
        })?;
        trace!(%coord, cache = self.cache.name(), created, "Resolved tile");
        Ok(tile)
    }

    /// Get and fetch the tile at `coord`.
    pub fn fetch(&self, coord: &TileCoord) -> Result<TileData> {
        self.get(coord)?.fetch()
    }

    /// The tile adjacent to `coord` in `direction`.
    pub fn neighbor(&self, coord: &TileCoord, direction: Direction) -> Result<Arc<Tile>> {
        self.get(&coord.neighbor(direction, AxisConvention::NorthDown))
    }

    /// North-down coordinates of the tiles covering `bounds` over `zooms`.
    pub fn tiles_in(&self, bounds: LatLonBounds, zooms: RangeInclusive<u32>) -> Result<TileIterator> {
        TileIterator::new(bounds, zooms, AxisConvention::NorthDown)
    }
}

impl std::fmt::Debug for TileSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TileSet")
            .field("template", &self.template.as_str())
            .field("convention", &self.convention)
            .field("cache", &self.cache.name())
            .finish()
    }
}
