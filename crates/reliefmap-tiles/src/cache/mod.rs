//! Interchangeable tile caches.
//!
//! Caches are constructed once and shared by handle (`Arc<dyn TileCache>`)
//! with every [`TileSet`](crate::TileSet) that uses them. All of them are
//! internally synchronized.

mod disk;
mod memory;
mod noop;

pub use disk::DiskCache;
pub use memory::{MemoryCache, DEFAULT_CAPACITY};
pub use noop::NoOpCache;

use crate::{Result, Tile};
use std::sync::Arc;

/// Storage for tiles keyed by their resolved URL.
pub trait TileCache: Send + Sync {
    /// Short name used in logs and metric labels.
    fn name(&self) -> &'static str;

    /// Insert or refresh a tile, replacing whatever `tile.key()` mapped to.
    fn put(&self, tile: &Arc<Tile>) -> Result<()>;

    /// Store a tile whose payload was just fetched. If its key now maps to a
    /// different tile, that entry is kept and nothing is stored.
    fn put_fetched(&self, tile: &Arc<Tile>) -> Result<()>;

    /// The tile stored under `key`, if any.
    fn get(&self, key: &str) -> Option<Arc<Tile>>;

    /// The tile stored under `key`, or the one returned by `create`, which is
    /// stored before returning. Lookup and insertion are one atomic step, so
    /// every caller sharing the cache receives the same tile for a key.
    fn get_or_insert_with(&self, key: &str, create: &mut dyn FnMut() -> Arc<Tile>) -> Result<Arc<Tile>>;
}

fn record_lookup(cache: &'static str, hit: bool) {
    use reliefmap_metrics::metric_defs::{CACHE_HITS, CACHE_MISSES};
    let name = if hit { CACHE_HITS.name } else { CACHE_MISSES.name };
    metrics::counter!(name, "cache" => cache).increment(1);
}
