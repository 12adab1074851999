//! A file-backed tile pyramid for end-to-end renders.

#![allow(dead_code)]

use reliefmap_grid::raster::encode_raster_tile;
use reliefmap_grid::Grid;
use reliefmap_render::{CacheStrategy, RenderConfig};
use reliefmap_tiles::{tiles_per_side, UrlTemplate, TILE_SIZE};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Elevation gained per cell towards the east.
pub const RISE_PER_CELL: f32 = 2.0;

/// Write every tile of `zooms` as a plane rising eastward, continuous across
/// tile edges. Returns the directory holding the pyramid.
pub fn plane_pyramid(zooms: &[u32]) -> TempDir {
    let dir = TempDir::new().unwrap();
    for &zoom in zooms {
        let n = tiles_per_side(zoom);
        for x in 0..n {
            for y in 0..n {
                write_plane_tile(dir.path(), zoom, x, y);
            }
        }
    }
    dir
}

pub fn write_plane_tile(root: &Path, zoom: u32, x: i64, y: i64) {
    let size = TILE_SIZE as usize;
    let cells = (0..size * size)
        .map(|i| (x as usize * size + i % size) as f32 * RISE_PER_CELL)
        .collect();
    let grid = Grid::from_vec(size, size, 1.0, cells).unwrap();
    let path = tile_path(root, zoom, x, y);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, encode_raster_tile(&grid).unwrap()).unwrap();
}

pub fn tile_path(root: &Path, zoom: u32, x: i64, y: i64) -> std::path::PathBuf {
    root.join(zoom.to_string()).join(x.to_string()).join(format!("{}.bin", y))
}

/// Gray-shading configuration over a pyramid, without caching.
pub fn config_for(root: &Path) -> RenderConfig {
    let template = UrlTemplate::for_directory(root, "bin").unwrap();
    let mut config = RenderConfig::for_template(template.as_str());
    config.cache.strategy = CacheStrategy::None;
    config.threads = 2;
    config
}
