//! Illuminated (Tanaka) contour lines.
//!
//! Contour lines facing the light are drawn light, lines facing away are
//! drawn dark, and lines in between fade across a gradient band. Line width
//! grows with slope so that lines keep a constant horizontal width, and in
//! Tanaka mode also shrinks where the terrain faces across the light.
//!
//! Aspect is taken from a Gaussian-smoothed copy of the terrain so that
//! small bumps do not make the tone flicker along a line.

use crate::{GaussianLowPass, GridOperator};
use image::RgbaImage;
use reliefmap_grid::{CancellationToken, Grid, GridError, ParallelRowExecutor, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Parameters of the illuminated contour renderer.
///
/// Widths are multiplied by slope (radians) and cell size, so they are
/// roughly in cells on steep terrain. Angles are in degrees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ContourParams {
    /// Draw the lit side of the terrain. When false, only shadowed lines
    /// are drawn.
    pub illuminated: bool,
    /// Width of lines on the shadowed side.
    pub shadow_width: f64,
    /// Width of lines on the lit side.
    pub illuminated_width: f64,
    /// Lower bound for any line width.
    pub min_width: f64,
    /// Narrow lines that run parallel to the light.
    pub tanaka: bool,
    /// Light direction, clockwise from north.
    pub azimuth: f64,
    /// Elevation difference between contour lines.
    pub interval: f64,
    /// Half-width of the band fading from lit to shadowed tone.
    pub gradient_angle: f64,
    /// Gray value of lit lines.
    pub illuminated_gray: u8,
    /// Standard deviation, in cells, of the blur used for aspect.
    pub aspect_gauss_blur: f64,
    /// Angle between light and aspect where lines switch from lit to
    /// shadowed.
    pub transition_angle: f64,
}

impl Default for ContourParams {
    fn default() -> Self {
        Self {
            illuminated: true,
            shadow_width: 2.0,
            illuminated_width: 1.0,
            min_width: 0.3,
            tanaka: true,
            azimuth: 315.0,
            interval: 100.0,
            gradient_angle: 10.0,
            illuminated_gray: 255,
            aspect_gauss_blur: 2.0,
            transition_angle: 90.0,
        }
    }
}

/// Largest accepted aspect blur, in cells. A tile is 256 cells wide.
pub const MAX_ASPECT_BLUR: f64 = 256.0;

/// Smallest difference between two angles in degrees, in `[0, 180]`.
fn smallest_angle_diff(a: f64, b: f64) -> f64 {
    let d = (a - b).abs() % 360.0;
    if d > 180.0 {
        360.0 - d
    } else {
        d
    }
}

/// Renders illuminated contours into an RGBA image.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct IlluminatedContours {
    params: ContourParams,
}

impl IlluminatedContours {
    /// Create a renderer. The contour interval must be positive and the
    /// aspect blur finite and at most [`MAX_ASPECT_BLUR`].
    pub fn new(params: ContourParams) -> Result<Self> {
        if params.interval.is_nan() || params.interval <= 0.0 {
            return Err(GridError::InvalidParameter(format!(
                "contour interval must be positive, got {}",
                params.interval
            )));
        }
        if !(0.0..=MAX_ASPECT_BLUR).contains(&params.aspect_gauss_blur) {
            return Err(GridError::InvalidParameter(format!(
                "aspect_gauss_blur must be between 0 and {}, got {}",
                MAX_ASPECT_BLUR, params.aspect_gauss_blur
            )));
        }
        Ok(Self { params })
    }

    /// The renderer's parameters.
    pub fn params(&self) -> &ContourParams {
        &self.params
    }

    /// Gray value of a contour point, or `None` if the point is off every
    /// contour line.
    ///
    /// `aspect` is in degrees counterclockwise from east, `slope` in radians.
    pub fn compute_gray(&self, elevation: f64, aspect: f64, slope: f64, cell_size: f64) -> Option<u8> {
        let p = &self.params;
        // Azimuth is clockwise from north, aspect counterclockwise from east.
        let illumination = 90.0 - p.azimuth;
        let angle_diff = smallest_angle_diff(illumination, aspect);

        let width = if angle_diff > p.transition_angle {
            p.shadow_width
        } else {
            p.illuminated_width
        };
        let mut a = width * slope * cell_size;
        if p.tanaka {
            a *= angle_diff.to_radians().cos().abs();
        }
        a = a.max(p.min_width * slope * cell_size);

        let mut dist = elevation.abs() % p.interval;
        if dist > a {
            dist = p.interval - dist;
        }
        // Void elevation or slope never lands on a line.
        if a.is_nan() || dist.is_nan() || a <= dist {
            return None;
        }

        if angle_diff >= p.transition_angle + p.gradient_angle {
            Some(0)
        } else if angle_diff <= p.transition_angle - p.gradient_angle {
            p.illuminated.then_some(p.illuminated_gray)
        } else {
            // Fades from black to the lit tone across the band.
            let d = p.transition_angle + p.gradient_angle - angle_diff;
            Some((d / (2.0 * p.gradient_angle) * p.illuminated_gray as f64) as u8)
        }
    }

    /// Draw contour pixels of `grid` over `image`.
    ///
    /// The image must be an integer multiple `scale` of the grid in both
    /// directions. With `scale > 1`, each cell is split into `scale x scale`
    /// sub-samples whose elevation and slope are bilinearly interpolated.
    /// `slope` holds per-cell slope in radians, as produced by
    /// [`Slope`](crate::Slope). Off-contour pixels are left untouched.
    ///
    /// The cancellation token is polled once per source row. A cancelled
    /// render returns [`GridError::Cancelled`] and the image must be
    /// discarded.
    pub fn render(
        &self,
        executor: &ParallelRowExecutor,
        image: &mut RgbaImage,
        grid: &Grid,
        slope: &Grid,
        cancel: Option<&CancellationToken>,
    ) -> Result<()> {
        if !grid.has_same_georeference(slope) {
            return Err(GridError::SizeMismatch("slope grid does not match elevation grid".into()));
        }
        let (width, height) = (image.width() as usize, image.height() as usize);
        let scale = width / grid.cols();
        if scale == 0 || width != grid.cols() * scale || height != grid.rows() * scale {
            return Err(GridError::SizeMismatch(format!(
                "{}x{} image is not a multiple of the {}x{} grid",
                width,
                height,
                grid.cols(),
                grid.rows()
            )));
        }

        let smooth = GaussianLowPass::new(self.params.aspect_gauss_blur).operate(executor, grid)?;
        debug!(scale, cols = grid.cols(), rows = grid.rows(), "rendering illuminated contours");

        let frame = Frame {
            grid,
            slope,
            smooth: &smooth,
            scale,
            width,
        };
        executor.for_each_row_chunk(&mut **image, width * 4 * scale, |rows, chunk| {
            let first = rows.start;
            for row in rows {
                if cancel.is_some_and(|c| c.is_cancelled()) {
                    return;
                }
                if row == 0 || row + 1 >= grid.rows() {
                    continue;
                }
                for col in 1..grid.cols() - 1 {
                    self.render_cell(&frame, col, row, row - first, chunk);
                }
            }
        });

        match cancel {
            Some(c) => c.check(),
            None => Ok(()),
        }
    }

    fn render_cell(&self, frame: &Frame<'_>, col: usize, row: usize, local_row: usize, chunk: &mut [u8]) {
        let Frame { grid, slope, smooth, scale, width } = *frame;
        let cell_size = grid.cell_size();
        let spacing = cell_size / scale as f64;

        for r in 0..scale {
            for c in 0..scale {
                let x = grid.west() + (col as f64 + c as f64 / scale as f64) * cell_size;
                let y = grid.north() - (row as f64 + r as f64 / scale as f64) * cell_size;
                let (elevation, slope_value) = if scale == 1 {
                    (grid.value(col, row) as f64, slope.value(col, row) as f64)
                } else {
                    (grid.bilinear(x, y) as f64, slope.bilinear(x, y) as f64)
                };
                let aspect = smooth.aspect_with_spacing(x, y, spacing);
                let aspect = (aspect + std::f64::consts::PI).to_degrees();

                if let Some(g) = self.compute_gray(elevation, aspect, slope_value, cell_size) {
                    let at = ((local_row * scale + r) * width + col * scale + c) * 4;
                    chunk[at..at + 4].copy_from_slice(&[g, g, g, 255]);
                }
            }
        }
    }
}

/// Read-only inputs shared by every row chunk.
#[derive(Clone, Copy)]
struct Frame<'a> {
    grid: &'a Grid,
    slope: &'a Grid,
    smooth: &'a Grid,
    scale: usize,
    width: usize,
}
