//! Tiles and their lazily fetched payloads.

use crate::cache::TileCache;
use crate::coord::{AxisConvention, TileCoord};
use crate::fetch::ByteFetcher;
use crate::{Result, TileError};
use bytes::{Buf, BufMut};
use image::{ImageFormat, RgbaImage};
use parking_lot::Mutex;
use reliefmap_grid::raster::{decode_raster_tile, RASTER_TILE_SIZE};
use reliefmap_grid::Grid;
use reliefmap_metrics::metric_defs;
use std::fmt;
use std::io::Cursor;
use std::sync::{Arc, Weak};
use tracing::{debug, warn};

const BLOB_MAGIC: &[u8; 4] = b"RMT1";

/// What a tile's bytes decode to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TileKind {
    /// 256x256 little-endian float elevations.
    Raster,
    /// A PNG or JPEG image.
    Image,
}

impl TileKind {
    /// Lowercase name, used as a metric label.
    pub fn as_str(&self) -> &'static str {
        match self {
            TileKind::Raster => "raster",
            TileKind::Image => "image",
        }
    }

    fn tag(self) -> u8 {
        match self {
            TileKind::Raster => 0,
            TileKind::Image => 1,
        }
    }
}

/// A materialized tile payload. Cloning shares the underlying data.
#[derive(Debug, Clone, PartialEq)]
pub enum TileData {
    /// Elevations georeferenced in Web Mercator meters.
    Grid(Arc<Grid>),
    /// Decoded RGBA pixels.
    Image(Arc<RgbaImage>),
}

impl TileData {
    /// Kind of the payload.
    pub fn kind(&self) -> TileKind {
        match self {
            TileData::Grid(_) => TileKind::Raster,
            TileData::Image(_) => TileKind::Image,
        }
    }

    /// The grid, if this is a raster payload.
    pub fn as_grid(&self) -> Option<&Arc<Grid>> {
        match self {
            TileData::Grid(grid) => Some(grid),
            TileData::Image(_) => None,
        }
    }

    /// The image, if this is an image payload.
    pub fn as_image(&self) -> Option<&Arc<RgbaImage>> {
        match self {
            TileData::Image(image) => Some(image),
            TileData::Grid(_) => None,
        }
    }
}

/// Where a tile's bytes come from and which cache to notify once loaded.
pub(crate) struct TileSource {
    pub(crate) fetcher: Arc<dyn ByteFetcher>,
    pub(crate) cache: Weak<dyn TileCache>,
}

/// One tile of a tile set.
///
/// The payload is fetched on the first call to [`fetch`](Self::fetch) and
/// memoized. Concurrent callers on the same tile wait for that single fetch.
/// A failed fetch is not memoized; the next call tries again.
pub struct Tile {
    coord: TileCoord,
    key: String,
    kind: TileKind,
    source: Option<TileSource>,
    payload: Mutex<Option<TileData>>,
}

impl Tile {
    pub(crate) fn new(coord: TileCoord, key: String, kind: TileKind, source: TileSource) -> Self {
        Self {
            coord,
            key,
            kind,
            source: Some(source),
            payload: Mutex::new(None),
        }
    }

    /// A tile whose payload is already known. It has no source to fetch from.
    pub fn with_payload(coord: TileCoord, key: impl Into<String>, data: TileData) -> Self {
        Self {
            coord,
            key: key.into(),
            kind: data.kind(),
            source: None,
            payload: Mutex::new(Some(data)),
        }
    }

    /// Coordinate in north-down numbering.
    pub fn coord(&self) -> TileCoord {
        self.coord
    }

    /// Cache key: the resolved URL.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Payload kind.
    pub fn kind(&self) -> TileKind {
        self.kind
    }

    /// True once the payload has been fetched.
    pub fn is_loaded(&self) -> bool {
        self.payload.lock().is_some()
    }

    /// The payload, if already fetched. Never triggers I/O.
    pub fn payload(&self) -> Option<TileData> {
        self.payload.lock().clone()
    }

    /// Fetch and decode the payload, or return the memoized one.
    ///
    /// After a successful load the tile is handed back to its cache so that
    /// persistent caches can store the payload. A tile evicted and replaced in
    /// the meantime does not displace its replacement. Every failure is reported as
    /// [`TileError::FetchFailure`].
    pub fn fetch(self: &Arc<Self>) -> Result<TileData> {
        let mut payload = self.payload.lock();
        if let Some(data) = payload.as_ref() {
            return Ok(data.clone());
        }
        let Some(source) = self.source.as_ref() else {
            return Err(self.failure("tile has no source"));
        };

        let data = match self.load(source.fetcher.as_ref()) {
            Ok(data) => data,
            Err(err) => {
                metrics::counter!(metric_defs::FETCH_FAILURES.name).increment(1);
                return Err(match err {
                    TileError::FetchFailure { .. } => err,
                    other => self.failure(other),
                });
            }
        };
        *payload = Some(data.clone());
        drop(payload);

        metrics::counter!(metric_defs::TILES_FETCHED.name, "kind" => self.kind.as_str()).increment(1);
        if let Some(cache) = source.cache.upgrade() {
            if let Err(err) = cache.put_fetched(self) {
                warn!(key = %self.key, cache = cache.name(), error = %err, "Failed to store fetched tile");
            }
        }
        Ok(data)
    }

    fn load(&self, fetcher: &dyn ByteFetcher) -> Result<TileData> {
        let bytes = fetcher.fetch(&self.key)?;
        metrics::counter!(metric_defs::BYTES_FETCHED.name).increment(bytes.len() as u64);
        debug!(
            zoom = self.coord.zoom,
            x = self.coord.x,
            y = self.coord.y,
            bytes = bytes.len(),
            "Fetched tile"
        );
        decode_payload(self.kind, &self.coord, &bytes)
    }

    fn failure(&self, reason: impl fmt::Display) -> TileError {
        TileError::FetchFailure {
            key: self.key.clone(),
            reason: reason.to_string(),
        }
    }

    /// Serialize the tile for a persistent cache. `None` if not yet fetched.
    ///
    /// Layout (little-endian): magic `RMT1`, key length and UTF-8 key, zoom
    /// (u32), x and y (i64), kind (u8); then for rasters cols and rows (u32),
    /// cell size, west and north (f64) and the cells (f32); for images the
    /// length (u32) and PNG bytes.
    pub fn to_blob(&self) -> Result<Option<Vec<u8>>> {
        let Some(data) = self.payload() else {
            return Ok(None);
        };
        let mut out = Vec::new();
        out.put_slice(BLOB_MAGIC);
        out.put_u32_le(self.key.len() as u32);
        out.put_slice(self.key.as_bytes());
        out.put_u32_le(self.coord.zoom);
        out.put_i64_le(self.coord.x);
        out.put_i64_le(self.coord.y);
        out.put_u8(data.kind().tag());
        match &data {
            TileData::Grid(grid) => {
                out.reserve(36 + grid.cells().len() * 4);
                out.put_u32_le(grid.cols() as u32);
                out.put_u32_le(grid.rows() as u32);
                out.put_f64_le(grid.cell_size());
                out.put_f64_le(grid.west());
                out.put_f64_le(grid.north());
                for &v in grid.cells() {
                    out.put_f32_le(v);
                }
            }
            TileData::Image(image) => {
                let mut png = Vec::new();
                image.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;
                out.put_u32_le(png.len() as u32);
                out.put_slice(&png);
            }
        }
        Ok(Some(out))
    }

    /// Restore a tile written by [`to_blob`](Self::to_blob).
    pub fn from_blob(blob: &[u8]) -> Result<Self> {
        let mut buf = blob;
        take(&mut buf, 4, "magic")?;
        if &blob[..4] != BLOB_MAGIC {
            return Err(TileError::CorruptBlob("bad magic".into()));
        }
        let key_len = read_u32(&mut buf, "key length")? as usize;
        let key = String::from_utf8(take(&mut buf, key_len, "key")?.to_vec())
            .map_err(|_| TileError::CorruptBlob("key is not UTF-8".into()))?;
        need(buf, 21, "coordinate")?;
        let coord = TileCoord::new(buf.get_u32_le(), buf.get_i64_le(), buf.get_i64_le());
        let data = match buf.get_u8() {
            0 => {
                need(buf, 32, "grid header")?;
                let cols = buf.get_u32_le() as usize;
                let rows = buf.get_u32_le() as usize;
                let cell_size = buf.get_f64_le();
                let west = buf.get_f64_le();
                let north = buf.get_f64_le();
                let count = cols.checked_mul(rows).ok_or_else(|| {
                    TileError::CorruptBlob(format!("grid size {}x{} overflows", cols, rows))
                })?;
                need(buf, count.saturating_mul(4), "grid cells")?;
                let cells = (0..count).map(|_| buf.get_f32_le()).collect();
                let grid = Grid::from_vec(cols, rows, cell_size, cells)?.with_origin(west, north);
                TileData::Grid(Arc::new(grid))
            }
            1 => {
                let len = read_u32(&mut buf, "image length")? as usize;
                let png = take(&mut buf, len, "image")?;
                let image = image::load_from_memory_with_format(png, ImageFormat::Png)?.to_rgba8();
                TileData::Image(Arc::new(image))
            }
            tag => return Err(TileError::CorruptBlob(format!("unknown kind {}", tag))),
        };
        Ok(Self::with_payload(coord, key, data))
    }
}

impl fmt::Debug for Tile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tile")
            .field("coord", &self.coord)
            .field("key", &self.key)
            .field("kind", &self.kind)
            .field("loaded", &self.is_loaded())
            .finish()
    }
}

/// Decode fetched bytes. Raster tiles are georeferenced in Web Mercator
/// meters from the tile's north-down coordinate.
pub(crate) fn decode_payload(kind: TileKind, coord: &TileCoord, bytes: &[u8]) -> Result<TileData> {
    match kind {
        TileKind::Raster => {
            let bounds = coord.mercator_bounds(AxisConvention::NorthDown);
            let cell_size = (bounds.east - bounds.west) / RASTER_TILE_SIZE as f64;
            let grid = decode_raster_tile(bytes)?
                .with_cell_size(cell_size)?
                .with_origin(bounds.west + cell_size / 2.0, bounds.north - cell_size / 2.0);
            Ok(TileData::Grid(Arc::new(grid)))
        }
        TileKind::Image => {
            let image = image::load_from_memory(bytes)?.to_rgba8();
            Ok(TileData::Image(Arc::new(image)))
        }
    }
}

fn need(buf: &[u8], len: usize, what: &str) -> Result<()> {
    if buf.remaining() < len {
        return Err(TileError::CorruptBlob(format!(
            "truncated {}: need {} bytes, have {}",
            what,
            len,
            buf.remaining()
        )));
    }
    Ok(())
}

fn take<'a>(buf: &mut &'a [u8], len: usize, what: &str) -> Result<&'a [u8]> {
    need(*buf, len, what)?;
    let (head, tail) = buf.split_at(len);
    *buf = tail;
    Ok(head)
}

fn read_u32(buf: &mut &[u8], what: &str) -> Result<u32> {
    need(*buf, 4, what)?;
    Ok(buf.get_u32_le())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid_tile() -> Tile {
        let grid = Grid::from_vec(2, 2, 30.0, vec![1.0, 2.0, f32::NAN, 4.0])
            .unwrap()
            .with_origin(100.0, 200.0);
        Tile::with_payload(TileCoord::new(3, 1, 2), "file:///t/3/1/2.bin", TileData::Grid(Arc::new(grid)))
    }

    #[test]
    fn test_grid_blob_round_trip() {
        let tile = grid_tile();
        let blob = tile.to_blob().unwrap().unwrap();
        let restored = Tile::from_blob(&blob).unwrap();
        assert_eq!(restored.coord(), tile.coord());
        assert_eq!(restored.key(), tile.key());
        assert_eq!(restored.kind(), TileKind::Raster);
        let grid = restored.payload().unwrap();
        let grid = grid.as_grid().unwrap();
        assert_eq!(grid.west(), 100.0);
        assert_eq!(grid.north(), 200.0);
        assert_eq!(grid.value(1, 1), 4.0);
        assert!(grid.value(0, 1).is_nan());
    }

    #[test]
    fn test_image_blob_round_trip() {
        let image = RgbaImage::from_pixel(3, 2, image::Rgba([10, 20, 30, 255]));
        let tile = Tile::with_payload(TileCoord::new(1, 0, 1), "k", TileData::Image(Arc::new(image.clone())));
        let restored = Tile::from_blob(&tile.to_blob().unwrap().unwrap()).unwrap();
        assert_eq!(restored.payload(), Some(TileData::Image(Arc::new(image))));
    }

    #[test]
    fn test_corrupt_blobs() {
        let blob = grid_tile().to_blob().unwrap().unwrap();
        assert!(matches!(Tile::from_blob(&blob[..blob.len() - 1]), Err(TileError::CorruptBlob(_))));
        assert!(matches!(Tile::from_blob(b"RMT"), Err(TileError::CorruptBlob(_))));
        let mut bad = blob.clone();
        bad[0] = b'X';
        assert!(matches!(Tile::from_blob(&bad), Err(TileError::CorruptBlob(_))));
    }

    #[test]
    fn test_raster_payload_is_georeferenced() {
        let bytes = vec![0u8; reliefmap_grid::raster::RASTER_TILE_BYTES];
        let data = decode_payload(TileKind::Raster, &TileCoord::new(1, 0, 0), &bytes).unwrap();
        let grid = data.as_grid().unwrap();
        let half_world = crate::coord::ORIGIN_SHIFT;
        let cell = half_world / 256.0;
        assert!((grid.cell_size() - cell).abs() < 1e-6);
        assert!((grid.west() - (-half_world + cell / 2.0)).abs() < 1e-6);
        assert!((grid.north() - (half_world - cell / 2.0)).abs() < 1e-6);
    }

    #[test]
    fn test_unsourced_tile_fails_fetch() {
        let tile = Arc::new(Tile {
            coord: TileCoord::new(0, 0, 0),
            key: "k".into(),
            kind: TileKind::Raster,
            source: None,
            payload: Mutex::new(None),
        });
        assert!(matches!(tile.fetch(), Err(TileError::FetchFailure { .. })));
    }
}
