use super::TileCache;
use crate::{Result, Tile};
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, warn};

/// Persistent cache storing each fetched tile as a blob file named after the
/// SHA-256 of its key, so tiles survive process restarts.
///
/// Tiles handed out during this process are also tracked weakly, so a key
/// keeps resolving to the same [`Tile`] for as long as anyone holds it.
pub struct DiskCache {
    dir: PathBuf,
    live: Mutex<HashMap<String, Weak<Tile>>>,
    temp_counter: AtomicU64,
}

impl DiskCache {
    /// Open (creating if needed) a cache rooted at `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            live: Mutex::new(HashMap::new()),
            temp_counter: AtomicU64::new(0),
        })
    }

    /// Root directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Blob path for a key.
    pub fn path_for(&self, key: &str) -> PathBuf {
        let digest = Sha256::digest(key.as_bytes());
        self.dir.join(format!("{}.tile", hex::encode(digest)))
    }

    /// Write to a temporary file and rename it into place, so readers never
    /// see a partial blob.
    fn write_atomic(&self, path: &Path, blob: &[u8]) -> Result<()> {
        let n = self.temp_counter.fetch_add(1, Ordering::Relaxed);
        let temp = path.with_extension(format!("tmp.{}.{}", std::process::id(), n));
        fs::write(&temp, blob)?;
        if let Err(err) = fs::rename(&temp, path) {
            let _ = fs::remove_file(&temp);
            return Err(err.into());
        }
        Ok(())
    }

    fn write_blob(&self, tile: &Arc<Tile>) -> Result<()> {
        if let Some(blob) = tile.to_blob()? {
            let path = self.path_for(tile.key());
            self.write_atomic(&path, &blob)?;
            debug!(key = tile.key(), path = %path.display(), bytes = blob.len(), "Stored tile");
        }
        Ok(())
    }

    /// The tile handed out for `key`, if anyone still holds it.
    fn live_tile(&self, key: &str) -> Option<Arc<Tile>> {
        self.live.lock().get(key).and_then(Weak::upgrade)
    }

    /// Reads and decodes a blob. Runs without holding the live index.
    fn load(&self, key: &str) -> Option<Tile> {
        let path = self.path_for(key);
        let blob = match fs::read(&path) {
            Ok(blob) => blob,
            Err(err) if err.kind() == ErrorKind::NotFound => return None,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "Failed to read cached tile");
                return None;
            }
        };
        match Tile::from_blob(&blob) {
            Ok(tile) if tile.key() == key => Some(tile),
            Ok(tile) => {
                warn!(path = %path.display(), expected = key, found = tile.key(), "Cached tile key mismatch");
                None
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "Ignoring corrupt cached tile");
                None
            }
        }
    }
}

impl std::fmt::Debug for DiskCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiskCache").field("dir", &self.dir).finish()
    }
}

impl TileCache for DiskCache {
    fn name(&self) -> &'static str {
        "disk"
    }

    fn put(&self, tile: &Arc<Tile>) -> Result<()> {
        track(&mut self.live.lock(), tile);
        self.write_blob(tile)
    }

    fn put_fetched(&self, tile: &Arc<Tile>) -> Result<()> {
        {
            let mut live = self.live.lock();
            match live.get(tile.key()).and_then(Weak::upgrade) {
                Some(current) if !Arc::ptr_eq(&current, tile) => {
                    debug!(key = tile.key(), "Keeping newer tile");
                    return Ok(());
                }
                Some(_) => {}
                None => track(&mut live, tile),
            }
        }
        self.write_blob(tile)
    }

    fn get(&self, key: &str) -> Option<Arc<Tile>> {
        if let Some(tile) = self.live_tile(key) {
            super::record_lookup(self.name(), true);
            return Some(tile);
        }
        let tile = self.load(key).map(|loaded| {
            let loaded = Arc::new(loaded);
            let mut live = self.live.lock();
            // Another caller may have registered the key while we read.
            match live.get(key).and_then(Weak::upgrade) {
                Some(current) => current,
                None => {
                    track(&mut live, &loaded);
                    loaded
                }
            }
        });
        super::record_lookup(self.name(), tile.is_some());
        tile
    }

    fn get_or_insert_with(&self, key: &str, create: &mut dyn FnMut() -> Arc<Tile>) -> Result<Arc<Tile>> {
        if let Some(tile) = self.live_tile(key) {
            super::record_lookup(self.name(), true);
            return Ok(tile);
        }
        let loaded = self.load(key).map(Arc::new);
        super::record_lookup(self.name(), loaded.is_some());
        let mut live = self.live.lock();
        if let Some(current) = live.get(key).and_then(Weak::upgrade) {
            return Ok(current);
        }
        let tile = loaded.unwrap_or_else(|| create());
        track(&mut live, &tile);
        Ok(tile)
    }
}

/// Registers `tile` in the live index, pruning entries nobody holds.
fn track(live: &mut HashMap<String, Weak<Tile>>, tile: &Arc<Tile>) {
    live.retain(|_, t| t.strong_count() > 0);
    live.insert(tile.key().to_string(), Arc::downgrade(tile));
}
