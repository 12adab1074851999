//! Cell-by-cell operators and slope.

use crate::GridOperator;
use reliefmap_grid::{Grid, GridError, ParallelRowExecutor, Result};
use std::ops::Range;
use std::str::FromStr;

/// Apply `f` to every source cell of the given rows.
fn map_cells(src: &Grid, rows: Range<usize>, dst: &mut [f32], f: impl Fn(f32) -> f32) {
    let cols = src.cols();
    let cells = &src.cells()[rows.start * cols..rows.end * cols];
    for (out, &v) in dst.iter_mut().zip(cells) {
        *out = f(v);
    }
}

/// Adds a constant to every cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AddOffset {
    /// Value added to each cell.
    pub offset: f32,
}

impl GridOperator for AddOffset {
    fn name(&self) -> &'static str {
        "Vertical Offset"
    }

    fn operate_rows(&self, src: &Grid, rows: Range<usize>, dst: &mut [f32]) {
        map_cells(src, rows, dst, |v| v + self.offset);
    }
}

/// Multiplies every cell by a constant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleBy {
    /// Factor applied to each cell.
    pub factor: f32,
}

impl GridOperator for ScaleBy {
    fn name(&self) -> &'static str {
        "Scale"
    }

    fn operate_rows(&self, src: &Grid, rows: Range<usize>, dst: &mut [f32]) {
        map_cells(src, rows, dst, |v| v * self.factor);
    }
}

/// Linearly maps the source value range onto `[min, max]`.
///
/// If either the source range or the target range is empty or inverted,
/// every cell is set to `min`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleToRange {
    /// New minimum.
    pub min: f32,
    /// New maximum.
    pub max: f32,
}

impl ScaleToRange {
    fn scale_rows(&self, src: &Grid, rows: Range<usize>, dst: &mut [f32], src_min: f32, src_max: f32) {
        let src_range = src_max - src_min;
        let dst_range = self.max - self.min;
        // A NaN range (all-void source) also lands here.
        if !(src_range > 0.0 && dst_range > 0.0) {
            dst.fill(self.min);
            return;
        }
        let f = dst_range / src_range;
        map_cells(src, rows, dst, |v| (v - src_min) * f + self.min);
    }
}

impl GridOperator for ScaleToRange {
    fn name(&self) -> &'static str {
        "Scale To Range"
    }

    fn operate_rows(&self, src: &Grid, rows: Range<usize>, dst: &mut [f32]) {
        let (lo, hi) = src.min_max();
        self.scale_rows(src, rows, dst, lo, hi);
    }

    fn operate(&self, executor: &ParallelRowExecutor, src: &Grid) -> Result<Grid> {
        let (lo, hi) = src.min_max();
        Ok(executor.map_grid(src, |rows, dst| self.scale_rows(src, rows, dst, lo, hi)))
    }
}

/// Folds -0.0 onto 0.0 so both match the same mask entry.
fn unsigned_zero(v: f32) -> f32 {
    if v == 0.0 {
        0.0
    } else {
        v
    }
}

/// Sets cells found in a mask list to 1 and all others to 0. Void cells
/// stay void.
#[derive(Debug, Clone, PartialEq)]
pub struct Binarize {
    mask: Vec<f32>,
}

impl Binarize {
    /// Create an operator from mask values in any order.
    pub fn new(mut mask: Vec<f32>) -> Self {
        mask.retain(|v| !v.is_nan());
        for v in &mut mask {
            *v = unsigned_zero(*v);
        }
        mask.sort_by(f32::total_cmp);
        mask.dedup();
        Self { mask }
    }

    /// Sorted mask values.
    pub fn mask(&self) -> &[f32] {
        &self.mask
    }

    fn is_masked(&self, v: f32) -> bool {
        let v = unsigned_zero(v);
        self.mask.binary_search_by(|m| m.total_cmp(&v)).is_ok()
    }
}

impl Default for Binarize {
    fn default() -> Self {
        Self::new(vec![0.0])
    }
}

impl FromStr for Binarize {
    type Err = GridError;

    /// Parses values separated by commas and/or spaces, e.g. `"1, 2 3"`.
    fn from_str(s: &str) -> Result<Self> {
        let mask = s
            .split([',', ' '])
            .filter(|t| !t.is_empty())
            .map(|t| {
                t.parse::<f32>()
                    .map_err(|_| GridError::InvalidParameter(format!("invalid mask value '{}'", t)))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(mask))
    }
}

impl GridOperator for Binarize {
    fn name(&self) -> &'static str {
        "Binarize"
    }

    fn operate_rows(&self, src: &Grid, rows: Range<usize>, dst: &mut [f32]) {
        map_cells(src, rows, dst, |v| {
            if v.is_nan() {
                v
            } else if self.is_masked(v) {
                1.0
            } else {
                0.0
            }
        });
    }
}

/// Copies the source grid.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CopyGrid;

impl GridOperator for CopyGrid {
    fn name(&self) -> &'static str {
        "Copy"
    }

    fn operate_rows(&self, src: &Grid, rows: Range<usize>, dst: &mut [f32]) {
        let cols = src.cols();
        dst.copy_from_slice(&src.cells()[rows.start * cols..rows.end * cols]);
    }
}

/// Slope in radians of each cell, NaN on the border.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Slope;

impl GridOperator for Slope {
    fn name(&self) -> &'static str {
        "Slope"
    }

    fn operate_rows(&self, src: &Grid, rows: Range<usize>, dst: &mut [f32]) {
        let cols = src.cols();
        for (i, row) in rows.enumerate() {
            for col in 0..cols {
                dst[i * cols + col] = src.slope(col, row) as f32;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sample() -> Grid {
        Grid::from_vec(3, 2, 1.0, vec![0.0, 1.0, 2.0, 3.0, f32::NAN, 5.0]).unwrap()
    }

    fn executor() -> ParallelRowExecutor {
        ParallelRowExecutor::new(2).unwrap()
    }

    #[test]
    fn test_add_and_scale() {
        let out = AddOffset { offset: 10.0 }.operate(&executor(), &sample()).unwrap();
        assert_eq!(out.row(0), &[10.0, 11.0, 12.0]);
        assert!(out.value(1, 1).is_nan());

        let out = ScaleBy { factor: -2.0 }.operate(&executor(), &sample()).unwrap();
        assert_eq!(out.row(1)[2], -10.0);
    }

    #[test]
    fn test_scale_to_range() {
        let op = ScaleToRange { min: 100.0, max: 200.0 };
        let out = op.operate(&executor(), &sample()).unwrap();
        assert_relative_eq!(out.value(0, 0), 100.0);
        assert_relative_eq!(out.value(2, 1), 200.0);
        assert_relative_eq!(out.value(1, 0), 120.0);

        let mut block = vec![0.0; 3];
        op.operate_rows(&sample(), 1..2, &mut block);
        assert_relative_eq!(block[0], 160.0);
    }

    #[test]
    fn test_scale_to_range_degenerate_fills_min() {
        let flat = Grid::filled(2, 2, 1.0, 4.0).unwrap();
        let out = ScaleToRange { min: -1.0, max: 1.0 }.operate(&executor(), &flat).unwrap();
        assert!(out.cells().iter().all(|&v| v == -1.0));

        let inverted = ScaleToRange { min: 5.0, max: 1.0 }.operate(&executor(), &sample()).unwrap();
        assert!(inverted.cells().iter().all(|&v| v == 5.0));
    }

    #[test]
    fn test_binarize_parses_mask() {
        let op: Binarize = "5, 1 3,,".parse().unwrap();
        assert_eq!(op.mask(), &[1.0, 3.0, 5.0]);
        let out = op.operate(&executor(), &sample()).unwrap();
        assert_eq!(out.row(0), &[0.0, 1.0, 0.0]);
        assert_eq!(out.value(0, 1), 1.0);
        assert!(out.value(1, 1).is_nan());
        assert_eq!(out.value(2, 1), 1.0);

        assert!("1, x".parse::<Binarize>().is_err());
        assert_eq!(Binarize::default().mask(), &[0.0]);
    }

    #[test]
    fn test_binarize_matches_either_signed_zero() {
        let grid = Grid::from_vec(3, 1, 1.0, vec![-0.0, 0.0, 1.0]).unwrap();
        let out = Binarize::new(vec![0.0]).operate(&executor(), &grid).unwrap();
        assert_eq!(out.row(0), &[1.0, 1.0, 0.0]);

        let negative = Binarize::new(vec![-0.0, 0.0]);
        assert_eq!(negative.mask().len(), 1);
        let out = negative.operate(&executor(), &grid).unwrap();
        assert_eq!(out.row(0), &[1.0, 1.0, 0.0]);
    }

    #[test]
    fn test_copy() {
        let src = sample();
        let out = CopyGrid.operate(&executor(), &src).unwrap();
        assert_eq!(out.row(0), src.row(0));
        assert!(out.has_same_georeference(&src));
    }

    #[test]
    fn test_slope_operator() {
        let cells = (0..16).map(|i| (i % 4) as f32).collect();
        let grid = Grid::from_vec(4, 4, 1.0, cells).unwrap();
        let out = Slope.operate(&executor(), &grid).unwrap();
        assert!(out.value(0, 0).is_nan());
        assert_relative_eq!(out.value(1, 1), std::f32::consts::FRAC_PI_4, epsilon = 1e-6);
    }
}
