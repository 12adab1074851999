//! Mega tiles: a tile together with its eight neighbors.
//!
//! Neighborhood operators (shading, smoothing, contours) need data beyond a
//! tile's edges. A mega tile is a canvas three tiles wide and high with the
//! requested tile in the middle. A neighbor that cannot be fetched is filled
//! with a background value; a center tile that cannot be fetched fails the
//! whole composition.

use crate::coord::{Direction, TileCoord};
use crate::tile::TileData;
use crate::tileset::TileSet;
use crate::{Result, TileError};
use image::{imageops, Rgba, RgbaImage};
use rayon::prelude::*;
use reliefmap_grid::Grid;
use reliefmap_metrics::metric_defs;
use tracing::warn;

/// Tiles along each side of a mega tile.
pub const MEGA_TILE_FACTOR: usize = 3;

/// Background of missing neighbors in an image mega tile.
pub const IMAGE_BACKGROUND: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Background of missing neighbors in a grid mega tile: void.
pub const GRID_BACKGROUND: f32 = f32::NAN;

/// Fetch the eight neighbors in parallel. A failed neighbor is logged and
/// comes back as `None`.
fn fetch_neighbors(tileset: &TileSet, center: &TileCoord) -> Vec<(Direction, Option<TileData>)> {
    Direction::ALL
        .par_iter()
        .map(|&direction| {
            let data = tileset
                .neighbor(center, direction)
                .and_then(|tile| tile.fetch())
                .map_err(|err| {
                    warn!(%center, ?direction, error = %err, "Neighbor tile unavailable, using background");
                    metrics::counter!(metric_defs::MOSAIC_GAPS.name).increment(1);
                })
                .ok();
            (direction, data)
        })
        .collect()
}

fn unexpected_kind(tileset: &TileSet, center: &TileCoord, expected: &str) -> TileError {
    TileError::FetchFailure {
        key: tileset.url_for(center).unwrap_or_else(|_| center.to_string()),
        reason: format!("expected {} payload", expected),
    }
}

/// Compose a grid mega tile around `center`.
///
/// The result is georeferenced so the center tile's cells keep their
/// coordinates. Missing neighbors, and neighbors whose size differs from the
/// center's, are left void.
pub fn compose_mega_grid(tileset: &TileSet, center: &TileCoord) -> Result<Grid> {
    let center_data = tileset.fetch(center)?;
    let Some(center_grid) = center_data.as_grid() else {
        return Err(unexpected_kind(tileset, center, "grid"));
    };
    let (cols, rows) = (center_grid.cols(), center_grid.rows());
    let cs = center_grid.cell_size();
    let mut canvas = Grid::filled(
        cols * MEGA_TILE_FACTOR,
        rows * MEGA_TILE_FACTOR,
        cs,
        GRID_BACKGROUND,
    )?
    .with_origin(
        center_grid.west() - cols as f64 * cs,
        center_grid.north() + rows as f64 * cs,
    );

    let mut blit = |grid: &Grid, block_col: usize, block_row: usize| {
        for r in 0..rows {
            let dst = &mut canvas.row_mut(block_row * rows + r)[block_col * cols..(block_col + 1) * cols];
            dst.copy_from_slice(grid.row(r));
        }
    };
    blit(center_grid.as_ref(), 1, 1);

    for (direction, data) in fetch_neighbors(tileset, center) {
        let Some(grid) = data.as_ref().and_then(TileData::as_grid) else {
            continue;
        };
        if grid.cols() != cols || grid.rows() != rows {
            warn!(%center, ?direction, "Neighbor tile size differs from center, using background");
            continue;
        }
        let (dx, dy) = direction.screen_offset();
        blit(grid.as_ref(), (dx + 1) as usize, (dy + 1) as usize);
    }
    Ok(canvas)
}

/// Compose an image mega tile around `center`. Missing neighbors are white.
pub fn compose_mega_image(tileset: &TileSet, center: &TileCoord) -> Result<RgbaImage> {
    let center_data = tileset.fetch(center)?;
    let Some(center_image) = center_data.as_image() else {
        return Err(unexpected_kind(tileset, center, "image"));
    };
    let (w, h) = center_image.dimensions();
    let factor = MEGA_TILE_FACTOR as u32;
    let mut canvas = RgbaImage::from_pixel(w * factor, h * factor, IMAGE_BACKGROUND);
    imageops::replace(&mut canvas, center_image.as_ref(), w as i64, h as i64);

    for (direction, data) in fetch_neighbors(tileset, center) {
        let Some(image) = data.as_ref().and_then(TileData::as_image) else {
            continue;
        };
        let (dx, dy) = direction.screen_offset();
        let x = (dx + 1) * w as i64;
        let y = (dy + 1) * h as i64;
        imageops::replace(&mut canvas, image.as_ref(), x, y);
    }
    Ok(canvas)
}
