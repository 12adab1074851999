use super::TileCache;
use crate::{Result, Tile};
use parking_lot::Mutex;
use reliefmap_metrics::metric_defs;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::trace;

/// Default number of tiles held by a [`MemoryCache`].
pub const DEFAULT_CAPACITY: usize = 5000;

/// Entries plus their access order. Each access stamps the entry with a new
/// tick; the smallest tick is the least recently used.
struct Lru {
    entries: HashMap<String, (Arc<Tile>, u64)>,
    order: BTreeMap<u64, String>,
    tick: u64,
}

impl Lru {
    fn touch(&mut self, key: &str) -> Option<Arc<Tile>> {
        self.tick += 1;
        let tick = self.tick;
        let (tile, stamp) = self.entries.get_mut(key)?;
        let old = std::mem::replace(stamp, tick);
        let tile = tile.clone();
        if let Some(key) = self.order.remove(&old) {
            self.order.insert(tick, key);
        }
        Some(tile)
    }

    fn insert(&mut self, tile: &Arc<Tile>) {
        self.tick += 1;
        let key = tile.key().to_string();
        if let Some((_, old)) = self.entries.insert(key.clone(), (tile.clone(), self.tick)) {
            self.order.remove(&old);
        }
        self.order.insert(self.tick, key);
    }

    fn evict_oldest(&mut self) -> Option<String> {
        let (_, key) = self.order.pop_first()?;
        self.entries.remove(&key);
        Some(key)
    }
}

/// Bounded in-memory cache evicting the least recently used tile once its
/// capacity is exceeded.
pub struct MemoryCache {
    capacity: usize,
    inner: Mutex<Lru>,
}

impl MemoryCache {
    /// Create a cache holding at most `capacity` tiles (at least one).
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            inner: Mutex::new(Lru {
                entries: HashMap::new(),
                order: BTreeMap::new(),
                tick: 0,
            }),
        }
    }

    /// Maximum number of tiles held.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of tiles currently held.
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    /// True if no tiles are held.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn store(&self, lru: &mut Lru, tile: &Arc<Tile>) {
        lru.insert(tile);
        while lru.entries.len() > self.capacity {
            if let Some(key) = lru.evict_oldest() {
                trace!(key = %key, "Evicted tile");
                metrics::counter!(metric_defs::CACHE_EVICTIONS.name).increment(1);
            }
        }
        metrics::gauge!(metric_defs::CACHE_ENTRIES.name, "cache" => self.name())
            .set(lru.entries.len() as f64);
    }

    /// Drop every tile.
    pub fn clear(&self) {
        let mut lru = self.inner.lock();
        lru.entries.clear();
        lru.order.clear();
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl std::fmt::Debug for MemoryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryCache")
            .field("capacity", &self.capacity)
            .field("len", &self.len())
            .finish()
    }
}

impl TileCache for MemoryCache {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn put(&self, tile: &Arc<Tile>) -> Result<()> {
        self.store(&mut self.inner.lock(), tile);
        Ok(())
    }

    fn put_fetched(&self, tile: &Arc<Tile>) -> Result<()> {
        let mut lru = self.inner.lock();
        if let Some((current, _)) = lru.entries.get(tile.key()) {
            if !Arc::ptr_eq(current, tile) {
                trace!(key = tile.key(), "Keeping newer tile");
                return Ok(());
            }
        }
        self.store(&mut lru, tile);
        Ok(())
    }

    fn get(&self, key: &str) -> Option<Arc<Tile>> {
        let tile = self.inner.lock().touch(key);
        super::record_lookup(self.name(), tile.is_some());
        tile
    }

    fn get_or_insert_with(&self, key: &str, create: &mut dyn FnMut() -> Arc<Tile>) -> Result<Arc<Tile>> {
        let mut lru = self.inner.lock();
        if let Some(tile) = lru.touch(key) {
            super::record_lookup(self.name(), true);
            return Ok(tile);
        }
        super::record_lookup(self.name(), false);
        let tile = create();
        self.store(&mut lru, &tile);
        Ok(tile)
    }
}
