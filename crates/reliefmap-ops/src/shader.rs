//! Hillshading from terrain normals.

use crate::{GridOperator, Vector3};
use reliefmap_grid::Grid;
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Mean Earth radius used to turn geographic cell sizes into meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Cell sizes below this are taken to be in degrees rather than meters.
const GEOGRAPHIC_CELL_SIZE_LIMIT: f64 = 0.1;

/// Cell size in planar units. Sizes below 0.1 are treated as degrees on a
/// sphere and converted to meters.
pub fn planar_cell_size(cell_size: f64) -> f64 {
    if cell_size < GEOGRAPHIC_CELL_SIZE_LIMIT {
        cell_size.to_radians() * EARTH_RADIUS_M
    } else {
        cell_size
    }
}

/// Hillshade operator.
///
/// Each output cell is `(dot(normal, light) + 1) / 2 * 255`, where the
/// normal is the normalized sum of the cross products of the four quadrants
/// around the cell. Border cells are shaded as level ground; void cells stay
/// void.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Shader {
    /// Direction of the light, clockwise from north in degrees.
    pub azimuth: f64,
    /// Angle between the light and the vertical in degrees.
    pub zenith: f64,
    /// Factor applied to elevation differences before shading.
    pub vertical_exaggeration: f64,
}

impl Default for Shader {
    fn default() -> Self {
        Self {
            azimuth: 315.0,
            zenith: 45.0,
            vertical_exaggeration: 1.0,
        }
    }
}

impl Shader {
    /// Unit vector toward the light.
    pub fn light(&self) -> Vector3 {
        Vector3::from_azimuth_zenith(self.azimuth, self.zenith)
    }

    /// Terrain normal of a cell. `cell_size` must already be planar.
    pub fn normal(&self, grid: &Grid, col: usize, row: usize, cell_size: f64) -> Vector3 {
        let center = grid.value(col, row);
        if col == 0 || row == 0 || col + 1 >= grid.cols() || row + 1 >= grid.rows() {
            let z = if center.is_nan() { f64::NAN } else { 1.0 };
            return Vector3::new(0.0, 0.0, z);
        }

        let center = center as f64;
        let ve = self.vertical_exaggeration;
        let s = (grid.value(col, row + 1) as f64 - center) * ve;
        let e = (grid.value(col + 1, row) as f64 - center) * ve;
        let n = (grid.value(col, row - 1) as f64 - center) * ve;
        let w = (grid.value(col - 1, row) as f64 - center) * ve;
        let cs = cell_size;

        // south x east + east x north + north x west + west x south
        let x = -cs * e - e * cs + cs * w + w * cs;
        let y = s * cs - cs * n - n * cs + cs * s;
        let z = 4.0 * cs * cs;
        Vector3::new(x, y, z).normalized()
    }

    /// Gray value in `[0, 255]` for a unit normal.
    pub fn gray(&self, normal: &Vector3, light: &Vector3) -> f32 {
        ((normal.dot(light) + 1.0) / 2.0 * 255.0) as f32
    }
}

impl GridOperator for Shader {
    fn name(&self) -> &'static str {
        "Shading"
    }

    fn operate_rows(&self, src: &Grid, rows: Range<usize>, dst: &mut [f32]) {
        let light = self.light();
        let cell_size = planar_cell_size(src.cell_size());
        let cols = src.cols();
        for (i, row) in rows.enumerate() {
            let out = &mut dst[i * cols..(i + 1) * cols];
            for (col, cell) in out.iter_mut().enumerate() {
                let normal = self.normal(src, col, row, cell_size);
                *cell = self.gray(&normal, &light);
            }
        }
    }
}
