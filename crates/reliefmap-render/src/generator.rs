//! Writing rendered tiles to a directory pyramid.

use crate::renderer::TileRenderer;
use crate::{RenderError, Result};
use image::{ImageFormat, RgbaImage};
use reliefmap_grid::CancellationToken;
use reliefmap_metrics::metric_defs;
use reliefmap_tiles::{LatLonBounds, ProgressCallback, TileCoord};
use std::fs;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Progress is reported every this many tiles.
const PROGRESS_INTERVAL: usize = 100;

/// Outcome of [`TileGenerator::generate`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GenerationSummary {
    /// Tiles in the region.
    pub requested: usize,
    /// Tiles rendered and written.
    pub rendered: usize,
    /// Tiles left alone because their file already existed.
    pub skipped: usize,
    /// Tiles that failed to render.
    pub failed: usize,
    /// Generation stopped early on cancellation.
    pub cancelled: bool,
}

/// Renders a region into `out/{z}/{x}/{y}.png`.
pub struct TileGenerator {
    renderer: TileRenderer,
    out_dir: PathBuf,
    overwrite: bool,
    cancel: CancellationToken,
    callback: Option<ProgressCallback>,
}

impl TileGenerator {
    /// Create a generator writing under `out_dir`.
    pub fn new(renderer: TileRenderer, out_dir: impl Into<PathBuf>) -> Self {
        let cancel = CancellationToken::new();
        Self {
            renderer: renderer.with_cancellation(cancel.clone()),
            out_dir: out_dir.into(),
            overwrite: false,
            cancel,
            callback: None,
        }
    }

    /// Re-render tiles whose file already exists.
    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// Stop when `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.renderer = self.renderer.with_cancellation(token.clone());
        self.cancel = token;
        self
    }

    /// Receive progress messages.
    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.callback = Some(callback);
        self
    }

    /// The renderer.
    pub fn renderer(&self) -> &TileRenderer {
        &self.renderer
    }

    /// Output path of a tile.
    pub fn path_for(&self, coord: &TileCoord) -> PathBuf {
        self.out_dir
            .join(coord.zoom.to_string())
            .join(coord.x.to_string())
            .join(format!("{}.png", coord.y))
    }

    fn report(&self, message: &str) {
        if let Some(cb) = &self.callback {
            cb(message);
        }
    }

    /// Render every tile covering `bounds` over `zooms`.
    ///
    /// Render failures are logged and counted. Write failures and
    /// configuration errors end the run. On cancellation the tiles written so
    /// far are kept and the summary is marked cancelled.
    pub fn generate(&self, bounds: LatLonBounds, zooms: RangeInclusive<u32>) -> Result<GenerationSummary> {
        let coords: Vec<TileCoord> = self.renderer.tileset().tiles_in(bounds, zooms)?.collect();
        let mut summary = GenerationSummary {
            requested: coords.len(),
            ..GenerationSummary::default()
        };
        self.report(&format!(
            "Generating {} tiles into {}",
            coords.len(),
            self.out_dir.display()
        ));

        for (i, coord) in coords.iter().enumerate() {
            if self.cancel.is_cancelled() {
                summary.cancelled = true;
                break;
            }
            let path = self.path_for(coord);
            if !self.overwrite && path.exists() {
                summary.skipped += 1;
                metrics::counter!(metric_defs::TILES_SKIPPED.name).increment(1);
                continue;
            }
            match self.renderer.render_tile(coord) {
                Ok(image) => {
                    write_png(&path, &image)?;
                    summary.rendered += 1;
                }
                Err(RenderError::Cancelled) => {
                    summary.cancelled = true;
                    break;
                }
                Err(err) => {
                    warn!(%coord, error = %err, "Failed to render tile");
                    summary.failed += 1;
                }
            }
            if (i + 1) % PROGRESS_INTERVAL == 0 {
                self.report(&format!("{}/{} tiles", i + 1, coords.len()));
            }
        }

        info!(
            requested = summary.requested,
            rendered = summary.rendered,
            skipped = summary.skipped,
            failed = summary.failed,
            cancelled = summary.cancelled,
            "Generation finished"
        );
        self.report(&format!(
            "Generation {}: {} rendered, {} skipped, {} failed",
            if summary.cancelled { "cancelled" } else { "complete" },
            summary.rendered,
            summary.skipped,
            summary.failed
        ));
        Ok(summary)
    }
}

/// Write a PNG next to its final path and rename it into place.
pub fn write_png(path: &Path, image: &RgbaImage) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let temp = path.with_extension("png.tmp");
    image.save_with_format(&temp, ImageFormat::Png)?;
    if let Err(err) = fs::rename(&temp, path) {
        let _ = fs::remove_file(&temp);
        return Err(err.into());
    }
    Ok(())
}
