//! Color ramps and the colorizer that turns shading and elevation into RGBA.

use image::{Rgba, RgbaImage};
use reliefmap_grid::{Grid, GridError, ParallelRowExecutor, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Elevation range used by the global hypsometric modes when none is set.
pub const DEFAULT_ELEVATION_RANGE: (f32, f32) = (0.0, 4000.0);

/// Fully transparent pixel written for void cells.
const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// Gray used by [`ColorVisualization::Continuous`].
const CONTINUOUS_TONE: u8 = 128;

/// How shading and elevation are combined into a pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorVisualization {
    /// Shading only, as gray.
    #[default]
    GrayShading,
    /// Shading value looked up in the color ramp.
    Exposition,
    /// Elevation tint over a fixed range, darkened by shading.
    HypsometricShading,
    /// Elevation tint over a fixed range.
    Hypsometric,
    /// Elevation tint over the grid's own range, darkened by shading.
    LocalHypsometricShading,
    /// Elevation tint over the grid's own range.
    LocalHypsometric,
    /// Uniform mid-gray backdrop for illuminated contours.
    Continuous,
}

impl ColorVisualization {
    /// True for modes that need a shading grid.
    pub fn uses_shading(self) -> bool {
        matches!(
            self,
            Self::GrayShading | Self::Exposition | Self::HypsometricShading | Self::LocalHypsometricShading
        )
    }

    /// True for modes that normalize elevation by the grid's min/max.
    pub fn is_local(self) -> bool {
        matches!(self, Self::LocalHypsometricShading | Self::LocalHypsometric)
    }
}

/// An RGB color, written as `"#rrggbb"` in configuration files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RampColor(pub [u8; 3]);

impl RampColor {
    /// Parse `"#rrggbb"` or `"rrggbb"`.
    pub fn parse(s: &str) -> Result<Self> {
        let digits = s.trim().trim_start_matches('#');
        let bytes = hex::decode(digits)
            .map_err(|e| GridError::InvalidParameter(format!("invalid color '{}': {}", s, e)))?;
        let rgb: [u8; 3] = bytes
            .try_into()
            .map_err(|_| GridError::InvalidParameter(format!("color '{}' must have 6 hex digits", s)))?;
        Ok(Self(rgb))
    }
}

impl fmt::Display for RampColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", hex::encode(self.0))
    }
}

impl Serialize for RampColor {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for RampColor {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        RampColor::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// One stop of a color ramp.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ColorStop {
    /// Relative position in `[0, 1]`.
    pub position: f32,
    /// Color at this position.
    pub color: RampColor,
}

/// Piecewise-linear color ramp over `[0, 1]`.
///
/// Positions are sorted and inside `[0, 1]`; values past either end take
/// the color of the nearest stop.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ColorRamp {
    stops: Vec<ColorStop>,
}

impl ColorRamp {
    /// Build a ramp, checking that it has stops and that they are sorted.
    pub fn new(stops: Vec<ColorStop>) -> Result<Self> {
        if stops.is_empty() {
            return Err(GridError::InvalidParameter("color ramp has no stops".into()));
        }
        if stops.iter().any(|s| !(0.0..=1.0).contains(&s.position)) {
            return Err(GridError::InvalidParameter("color ramp positions must be in [0, 1]".into()));
        }
        if stops.windows(2).any(|w| w[1].position < w[0].position) {
            return Err(GridError::InvalidParameter("color ramp positions must be sorted".into()));
        }
        Ok(Self { stops })
    }

    /// The ramp's stops.
    pub fn stops(&self) -> &[ColorStop] {
        &self.stops
    }

    /// Color at relative position `t`, interpolated channel by channel.
    pub fn color_at(&self, t: f32) -> [u8; 3] {
        let first = &self.stops[0];
        let last = &self.stops[self.stops.len() - 1];
        if t.is_nan() || t <= first.position {
            return first.color.0;
        }
        if t >= last.position {
            return last.color.0;
        }
        let upper = self.stops.partition_point(|s| s.position <= t);
        let (a, b) = (&self.stops[upper - 1], &self.stops[upper]);
        let w = (t - a.position) / (b.position - a.position);
        std::array::from_fn(|i| {
            let (ca, cb) = (a.color.0[i] as f32, b.color.0[i] as f32);
            (ca + (cb - ca) * w).round() as u8
        })
    }
}

impl Default for ColorRamp {
    /// Lowland green through brown to snow white.
    fn default() -> Self {
        let stop = |position, rgb| ColorStop {
            position,
            color: RampColor(rgb),
        };
        Self {
            stops: vec![
                stop(0.0, [112, 153, 89]),
                stop(0.25, [158, 184, 120]),
                stop(0.5, [222, 214, 163]),
                stop(0.75, [181, 150, 117]),
                stop(1.0, [255, 255, 255]),
            ],
        }
    }
}

impl<'de> Deserialize<'de> for ColorRamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let stops = Vec::<ColorStop>::deserialize(deserializer)?;
        ColorRamp::new(stops).map_err(serde::de::Error::custom)
    }
}

/// Turns a shading grid and an elevation grid into an RGBA image.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Colorizer {
    /// Combination mode.
    pub visualization: ColorVisualization,
    /// Ramp used by the tinted modes.
    pub ramp: ColorRamp,
    /// Elevation range of the global hypsometric modes.
    pub elevation_range: Option<(f32, f32)>,
}

impl Colorizer {
    /// Create a colorizer with the default ramp.
    pub fn new(visualization: ColorVisualization) -> Self {
        Self {
            visualization,
            ..Self::default()
        }
    }

    /// Pixel for one cell. `gray` is in `[0, 255]`; `min`/`max` bound the
    /// elevation normalization.
    pub fn pixel(&self, gray: f32, elevation: f32, min: f32, max: f32) -> Rgba<u8> {
        use ColorVisualization::*;

        let shaded = self.visualization.uses_shading();
        if (shaded && gray.is_nan()) || (!shaded && elevation.is_nan()) {
            return TRANSPARENT;
        }
        let multiplier = if matches!(self.visualization, HypsometricShading | LocalHypsometricShading) {
            (gray / 255.0).clamp(0.0, 1.0)
        } else {
            1.0
        };
        let rgb = match self.visualization {
            GrayShading => {
                let g = gray.clamp(0.0, 255.0).round() as u8;
                [g, g, g]
            }
            Exposition => self.ramp.color_at(gray / 255.0),
            HypsometricShading | Hypsometric | LocalHypsometricShading | LocalHypsometric => {
                if elevation.is_nan() {
                    return TRANSPARENT;
                }
                let range = max - min;
                let t = if range > 0.0 { (elevation - min) / range } else { 0.0 };
                self.ramp.color_at(t)
            }
            Continuous => [CONTINUOUS_TONE; 3],
        };
        let [r, g, b] = rgb.map(|c| (c as f32 * multiplier).round() as u8);
        Rgba([r, g, b, 255])
    }

    /// Colorize a whole grid pair. Both grids must have the same size.
    pub fn colorize(&self, executor: &ParallelRowExecutor, shading: &Grid, elevation: &Grid) -> Result<RgbaImage> {
        if shading.cols() != elevation.cols() || shading.rows() != elevation.rows() {
            return Err(GridError::SizeMismatch(format!(
                "shading is {}x{}, elevation is {}x{}",
                shading.cols(),
                shading.rows(),
                elevation.cols(),
                elevation.rows()
            )));
        }
        let (min, max) = if self.visualization.is_local() {
            elevation.min_max()
        } else {
            self.elevation_range.unwrap_or(DEFAULT_ELEVATION_RANGE)
        };

        let cols = shading.cols();
        let mut image = RgbaImage::new(cols as u32, shading.rows() as u32);
        executor.for_each_row_chunk(&mut *image, cols * 4, |rows, chunk| {
            for (i, row) in rows.enumerate() {
                for col in 0..cols {
                    let px = self.pixel(shading.value(col, row), elevation.value(col, row), min, max);
                    let at = (i * cols + col) * 4;
                    chunk[at..at + 4].copy_from_slice(&px.0);
                }
            }
        });
        Ok(image)
    }
}
