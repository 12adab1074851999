use super::TileCache;
use crate::{Result, Tile};
use std::sync::Arc;

/// A cache that stores nothing. Every tile set lookup creates a new tile.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpCache;

impl TileCache for NoOpCache {
    fn name(&self) -> &'static str {
        "none"
    }

    fn put(&self, _tile: &Arc<Tile>) -> Result<()> {
        Ok(())
    }

    fn put_fetched(&self, _tile: &Arc<Tile>) -> Result<()> {
        Ok(())
    }

    fn get(&self, _key: &str) -> Option<Arc<Tile>> {
        super::record_lookup(self.name(), false);
        None
    }

    fn get_or_insert_with(&self, _key: &str, create: &mut dyn FnMut() -> Arc<Tile>) -> Result<Arc<Tile>> {
        super::record_lookup(self.name(), false);
        Ok(create())
    }
}
