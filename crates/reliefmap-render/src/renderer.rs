//! Rendering relief tiles.
//!
//! A raster tile is rendered from its mega tile so that shading and
//! contours are continuous across tile edges:
//!
//! 1. compose the 3x3 mega grid around the tile,
//! 2. shade it and colorize shading and elevation,
//! 3. scale the canvas by the supersampling factor and draw illuminated
//!    contours over it,
//! 4. crop the center tile.
//!
//! Image tile sets are passed through unchanged.

use crate::config::RenderConfig;
use crate::Result;
use image::imageops::{self, FilterType};
use image::RgbaImage;
use reliefmap_grid::{CancellationToken, Grid, ParallelRowExecutor};
use reliefmap_metrics::metric_defs;
use reliefmap_ops::{Colorizer, GridOperator, IlluminatedContours, Shader, Slope};
use reliefmap_tiles::mosaic::{compose_mega_grid, MEGA_TILE_FACTOR};
use reliefmap_tiles::{LatLonBounds, TileCoord, TileError, TileKind, TileSet};
use std::ops::RangeInclusive;
use std::time::Instant;
use tracing::debug;

/// Renders tiles of one tile set with one styling.
pub struct TileRenderer {
    tiles: TileSet,
    executor: ParallelRowExecutor,
    shader: Shader,
    colorizer: Colorizer,
    contours: Option<IlluminatedContours>,
    supersample: u32,
    cancel: Option<CancellationToken>,
}

impl TileRenderer {
    /// Create a renderer over the source and cache described by `config`.
    pub fn new(config: &RenderConfig) -> Result<Self> {
        let tiles = config.build_tileset()?;
        Self::with_tileset(config, tiles)
    }

    /// Create a renderer over an existing tile set, styled by `config`.
    pub fn with_tileset(config: &RenderConfig, tiles: TileSet) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            tiles,
            executor: ParallelRowExecutor::new(config.threads)?,
            shader: config.shading,
            colorizer: config.colorizer(),
            contours: config.contours()?,
            supersample: config.supersample,
            cancel: None,
        })
    }

    /// Poll `token` before each tile and during contour rendering.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// The tile set rendered from.
    pub fn tileset(&self) -> &TileSet {
        &self.tiles
    }

    /// Output scale factor.
    pub fn supersample(&self) -> u32 {
        self.supersample
    }

    /// Render the north-down tile `zoom/x/y`.
    pub fn render(&self, zoom: u32, x: i64, y: i64) -> Result<RgbaImage> {
        self.render_tile(&TileCoord::new(zoom, x, y))
    }

    /// Render one tile. Coordinates outside the pyramid are rejected before
    /// anything is fetched.
    pub fn render_tile(&self, coord: &TileCoord) -> Result<RgbaImage> {
        let coord = coord.validate()?;
        if let Some(cancel) = &self.cancel {
            cancel.check()?;
        }
        let start = Instant::now();
        let image = match self.tiles.kind() {
            TileKind::Raster => self.render_relief(&coord)?,
            TileKind::Image => self.pass_through(&coord)?,
        };
        let elapsed = start.elapsed();
        metrics::counter!(metric_defs::TILES_RENDERED.name).increment(1);
        metrics::histogram!(metric_defs::RENDER_DURATION.name).record(elapsed.as_secs_f64());
        debug!(
            zoom = coord.zoom,
            x = coord.x,
            y = coord.y,
            elapsed_ms = elapsed.as_millis() as u64,
            "Rendered tile"
        );
        Ok(image)
    }

    /// Lazily render every tile covering `bounds` over `zooms`, north row
    /// first. A failed tile does not end the iteration.
    pub fn render_region(
        &self,
        bounds: LatLonBounds,
        zooms: RangeInclusive<u32>,
    ) -> Result<impl Iterator<Item = (TileCoord, Result<RgbaImage>)> + '_> {
        let coords = self.tiles.tiles_in(bounds, zooms)?;
        Ok(coords.map(move |coord| (coord, self.render_tile(&coord))))
    }

    fn pass_through(&self, coord: &TileCoord) -> Result<RgbaImage> {
        let data = self.tiles.fetch(coord)?;
        let image = data.as_image().ok_or_else(|| TileError::FetchFailure {
            key: coord.to_string(),
            reason: "expected image payload".into(),
        })?;
        Ok(image.as_ref().clone())
    }

    fn render_relief(&self, coord: &TileCoord) -> Result<RgbaImage> {
        let dem = compose_mega_grid(&self.tiles, coord)?;
        let shading = if self.colorizer.visualization.uses_shading() {
            self.shader.operate(&self.executor, &dem)?
        } else {
            Grid::like(&dem, f32::NAN)
        };
        let mut canvas = self.colorizer.colorize(&self.executor, &shading, &dem)?;

        let scale = self.supersample;
        if scale > 1 {
            canvas = imageops::resize(&canvas, canvas.width() * scale, canvas.height() * scale, FilterType::CatmullRom);
        }
        if let Some(contours) = &self.contours {
            let slope = Slope.operate(&self.executor, &dem)?;
            contours.render(&self.executor, &mut canvas, &dem, &slope, self.cancel.as_ref())?;
        }

        let width = (dem.cols() / MEGA_TILE_FACTOR) as u32 * scale;
        let height = (dem.rows() / MEGA_TILE_FACTOR) as u32 * scale;
        Ok(imageops::crop_imm(&canvas, width, height, width, height).to_image())
    }
}

impl std::fmt::Debug for TileRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TileRenderer")
            .field("tiles", &self.tiles)
            .field("threads", &self.executor.threads())
            .field("visualization", &self.colorizer.visualization)
            .field("contours", &self.contours.is_some())
            .field("supersample", &self.supersample)
            .finish()
    }
}
