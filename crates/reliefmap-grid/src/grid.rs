//! Georeferenced float raster.

use crate::{GridError, Result};
use std::fmt;

/// Point sampling mode for [`Grid::sample`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Interpolation {
    /// Value of the closest cell.
    Nearest,
    /// Weighted average of the four surrounding cells.
    #[default]
    Bilinear,
    /// Catmull-Rom interpolation over the surrounding 4x4 cells.
    Bicubic,
}

/// A 2D raster of `f32` cells with a linear georeference.
///
/// Cells are stored row-major, north to south and west to east. The origin
/// (`west`, `north`) is the position of the top-left cell center, so that
/// `south = north - (rows - 1) * cell_size` and
/// `east = west + (cols - 1) * cell_size`.
///
/// Void cells are NaN. They poison interpolation results and are skipped by
/// statistics.
#[derive(Clone, PartialEq)]
pub struct Grid {
    cells: Vec<f32>,
    cols: usize,
    rows: usize,
    cell_size: f64,
    west: f64,
    north: f64,
}

/// Summary statistics over the non-void cells of a grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridStatistics {
    /// Smallest finite value, NaN if the grid is entirely void.
    pub min: f32,
    /// Largest finite value, NaN if the grid is entirely void.
    pub max: f32,
    /// Mean of the finite values, NaN if the grid is entirely void.
    pub mean: f64,
    /// Number of NaN or infinite cells.
    pub void_count: usize,
}

impl Grid {
    /// Create a grid of zeros with its origin at (0, 0).
    pub fn new(cols: usize, rows: usize, cell_size: f64) -> Result<Self> {
        Self::filled(cols, rows, cell_size, 0.0)
    }

    /// Create a grid where every cell holds `value`.
    pub fn filled(cols: usize, rows: usize, cell_size: f64, value: f32) -> Result<Self> {
        Self::validate_shape(cols, rows, cell_size)?;
        Ok(Self {
            cells: vec![value; cols * rows],
            cols,
            rows,
            cell_size,
            west: 0.0,
            north: 0.0,
        })
    }

    /// Create a grid from row-major cells.
    pub fn from_vec(cols: usize, rows: usize, cell_size: f64, cells: Vec<f32>) -> Result<Self> {
        Self::validate_shape(cols, rows, cell_size)?;
        if cells.len() != cols * rows {
            return Err(GridError::CellCountMismatch {
                expected: cols * rows,
                actual: cells.len(),
            });
        }
        Ok(Self {
            cells,
            cols,
            rows,
            cell_size,
            west: 0.0,
            north: 0.0,
        })
    }

    /// Set the position of the top-left cell center.
    pub fn with_origin(mut self, west: f64, north: f64) -> Self {
        self.west = west;
        self.north = north;
        self
    }

    /// Replace the cell size, keeping the origin.
    pub fn with_cell_size(mut self, cell_size: f64) -> Result<Self> {
        Self::validate_shape(self.cols, self.rows, cell_size)?;
        self.cell_size = cell_size;
        Ok(self)
    }

    /// Create a grid of the same size and georeference filled with `value`.
    pub fn like(other: &Grid, value: f32) -> Self {
        Self {
            cells: vec![value; other.cells.len()],
            ..*other
        }
    }

    fn validate_shape(cols: usize, rows: usize, cell_size: f64) -> Result<()> {
        if cols < 2 || rows < 2 {
            return Err(GridError::InvalidDimensions { cols, rows });
        }
        if !cell_size.is_finite() || cell_size <= 0.0 {
            return Err(GridError::InvalidCellSize(cell_size));
        }
        Ok(())
    }

    /// Number of columns.
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Number of rows.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Distance between neighboring cell centers.
    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    /// X coordinate of the westernmost column.
    pub fn west(&self) -> f64 {
        self.west
    }

    /// Y coordinate of the northernmost row.
    pub fn north(&self) -> f64 {
        self.north
    }

    /// Y coordinate of the southernmost row.
    pub fn south(&self) -> f64 {
        self.north - (self.rows - 1) as f64 * self.cell_size
    }

    /// X coordinate of the easternmost column.
    pub fn east(&self) -> f64 {
        self.west + (self.cols - 1) as f64 * self.cell_size
    }

    /// True if both grids have the same size, cell size and origin.
    pub fn has_same_georeference(&self, other: &Grid) -> bool {
        self.cols == other.cols
            && self.rows == other.rows
            && self.cell_size == other.cell_size
            && self.west == other.west
            && self.north == other.north
    }

    /// All cells, row-major.
    pub fn cells(&self) -> &[f32] {
        &self.cells
    }

    /// All cells, row-major, mutable.
    pub fn cells_mut(&mut self) -> &mut [f32] {
        &mut self.cells
    }

    /// One row of cells.
    ///
    /// # Panics
    /// Panics if `row` is out of range.
    pub fn row(&self, row: usize) -> &[f32] {
        &self.cells[row * self.cols..(row + 1) * self.cols]
    }

    /// One row of cells, mutable.
    ///
    /// # Panics
    /// Panics if `row` is out of range.
    pub fn row_mut(&mut self, row: usize) -> &mut [f32] {
        &mut self.cells[row * self.cols..(row + 1) * self.cols]
    }

    /// Value of a cell.
    ///
    /// # Panics
    /// Panics if the cell is out of range.
    #[inline]
    pub fn value(&self, col: usize, row: usize) -> f32 {
        self.cells[row * self.cols + col]
    }

    /// Overwrite a cell.
    ///
    /// # Panics
    /// Panics if the cell is out of range.
    #[inline]
    pub fn set_value(&mut self, col: usize, row: usize, value: f32) {
        self.cells[row * self.cols + col] = value;
    }

    /// Fractional column index of an x coordinate.
    pub fn column_for_x(&self, x: f64) -> f64 {
        (x - self.west) / self.cell_size
    }

    /// Fractional row index of a y coordinate.
    pub fn row_for_y(&self, y: f64) -> f64 {
        (self.north - y) / self.cell_size
    }

    /// Sample the grid at a georeferenced point.
    pub fn sample(&self, x: f64, y: f64, mode: Interpolation) -> f32 {
        match mode {
            Interpolation::Nearest => self.nearest(x, y),
            Interpolation::Bilinear => self.bilinear(x, y),
            Interpolation::Bicubic => self.bicubic(x, y),
        }
    }

    /// Value of the cell closest to (x, y), NaN outside the grid.
    pub fn nearest(&self, x: f64, y: f64) -> f32 {
        let col = self.column_for_x(x).round();
        let row = self.row_for_y(y).round();
        if col < 0.0 || row < 0.0 || col >= self.cols as f64 || row >= self.rows as f64 {
            return f32::NAN;
        }
        self.value(col as usize, row as usize)
    }

    /// Locate the top-left cell of the interpolation window and the offset
    /// inside it. Points exactly on the east or south edge use the last
    /// window, so every node can be sampled.
    fn cell_window(&self, x: f64, y: f64) -> Option<(usize, usize, f64, f64)> {
        let tx = self.column_for_x(x);
        let ty = self.row_for_y(y);
        if !(tx >= 0.0 && ty >= 0.0) {
            return None;
        }
        let max_col = (self.cols - 1) as f64;
        let max_row = (self.rows - 1) as f64;
        if tx > max_col || ty > max_row {
            return None;
        }
        let col = (tx.floor() as usize).min(self.cols - 2);
        let row = (ty.floor() as usize).min(self.rows - 2);
        Some((col, row, tx - col as f64, ty - row as f64))
    }

    /// Bilinear interpolation at (x, y).
    ///
    /// Returns NaN outside the grid extent or if any of the four support
    /// cells is void.
    pub fn bilinear(&self, x: f64, y: f64) -> f32 {
        let Some((col, row, dx, dy)) = self.cell_window(x, y) else {
            return f32::NAN;
        };
        let h1 = self.value(col, row) as f64;
        let h2 = self.value(col + 1, row) as f64;
        let h3 = self.value(col, row + 1) as f64;
        let h4 = self.value(col + 1, row + 1) as f64;
        let top = h1 + (h2 - h1) * dx;
        let bottom = h3 + (h4 - h3) * dx;
        (top + (bottom - top) * dy) as f32
    }

    /// Bicubic (Catmull-Rom) interpolation at (x, y).
    ///
    /// The two extra support rows and columns needed at the border are
    /// mirrored across the edge. Returns NaN outside the grid extent.
    pub fn bicubic(&self, x: f64, y: f64) -> f32 {
        let tx = self.column_for_x(x);
        let ty = self.row_for_y(y);
        if !(tx >= 0.0 && ty >= 0.0) || tx > (self.cols - 1) as f64 || ty > (self.rows - 1) as f64 {
            return f32::NAN;
        }
        let col1 = tx.floor() as i64;
        let row1 = ty.floor() as i64;
        let u = tx - col1 as f64;
        let v = ty - row1 as f64;

        let cols: [usize; 4] = std::array::from_fn(|i| mirror(col1 - 1 + i as i64, self.cols));
        let rows: [usize; 4] = std::array::from_fn(|i| mirror(row1 - 1 + i as i64, self.rows));

        let mut columns = [0.0f64; 4];
        for (slot, &r) in columns.iter_mut().zip(rows.iter()) {
            *slot = cubic(
                u,
                self.value(cols[0], r) as f64,
                self.value(cols[1], r) as f64,
                self.value(cols[2], r) as f64,
                self.value(cols[3], r) as f64,
            );
        }
        cubic(v, columns[0], columns[1], columns[2], columns[3]) as f32
    }

    /// Slope of a cell in radians from central differences of its four
    /// orthogonal neighbors. NaN on the border.
    pub fn slope(&self, col: usize, row: usize) -> f64 {
        if col == 0 || row == 0 || col + 1 >= self.cols || row + 1 >= self.rows {
            return f64::NAN;
        }
        let w = self.value(col - 1, row) as f64;
        let e = self.value(col + 1, row) as f64;
        let s = self.value(col, row + 1) as f64;
        let n = self.value(col, row - 1) as f64;
        ((e - w).hypot(n - s) / (2.0 * self.cell_size)).atan()
    }

    /// Slope in radians at a georeferenced point, from bilinear samples one
    /// cell away in each direction.
    pub fn slope_at(&self, x: f64, y: f64) -> f64 {
        let d = self.cell_size;
        let w = self.bilinear(x - d, y) as f64;
        let e = self.bilinear(x + d, y) as f64;
        let s = self.bilinear(x, y - d) as f64;
        let n = self.bilinear(x, y + d) as f64;
        ((e - w).hypot(n - s) / (2.0 * d)).atan()
    }

    /// Aspect in radians at a georeferenced point, `atan2(dz_y, dz_x)` from
    /// bilinear samples one cell away.
    pub fn aspect(&self, x: f64, y: f64) -> f64 {
        self.aspect_with_spacing(x, y, self.cell_size)
    }

    /// Aspect in radians using samples `spacing` units away. Supersampled
    /// rendering passes a fraction of the cell size here.
    pub fn aspect_with_spacing(&self, x: f64, y: f64, spacing: f64) -> f64 {
        let w = self.bilinear(x - spacing, y) as f64;
        let e = self.bilinear(x + spacing, y) as f64;
        let s = self.bilinear(x, y - spacing) as f64;
        let n = self.bilinear(x, y + spacing) as f64;
        (n - s).atan2(e - w)
    }

    /// Smallest and largest finite values. `(NaN, NaN)` if every cell is void.
    pub fn min_max(&self) -> (f32, f32) {
        let stats = self.statistics();
        (stats.min, stats.max)
    }

    /// Minimum, maximum, mean and void count in one pass.
    pub fn statistics(&self) -> GridStatistics {
        let mut min = f32::INFINITY;
        let mut max = f32::NEG_INFINITY;
        let mut sum = 0.0f64;
        let mut valid = 0usize;
        for &v in &self.cells {
            if !v.is_finite() {
                continue;
            }
            min = min.min(v);
            max = max.max(v);
            sum += v as f64;
            valid += 1;
        }
        if valid == 0 {
            return GridStatistics {
                min: f32::NAN,
                max: f32::NAN,
                mean: f64::NAN,
                void_count: self.cells.len(),
            };
        }
        GridStatistics {
            min,
            max,
            mean: sum / valid as f64,
            void_count: self.cells.len() - valid,
        }
    }

    /// Shrink the grid in place to a window and move the origin accordingly.
    pub fn crop(&mut self, row_offset: usize, col_offset: usize, rows: usize, cols: usize) -> Result<()> {
        *self = self.cropped(row_offset, col_offset, rows, cols)?;
        Ok(())
    }

    /// Copy of a window of this grid.
    pub fn cropped(&self, row_offset: usize, col_offset: usize, rows: usize, cols: usize) -> Result<Grid> {
        let row_end = row_offset.saturating_add(rows);
        let col_end = col_offset.saturating_add(cols);
        if row_end > self.rows || col_end > self.cols {
            return Err(GridError::OutOfBounds {
                row_offset,
                row_end,
                col_offset,
                col_end,
                cols: self.cols,
                rows: self.rows,
            });
        }
        Self::validate_shape(cols, rows, self.cell_size)?;

        let mut cells = Vec::with_capacity(rows * cols);
        for r in row_offset..row_end {
            cells.extend_from_slice(&self.row(r)[col_offset..col_end]);
        }
        Ok(Grid {
            cells,
            cols,
            rows,
            cell_size: self.cell_size,
            west: self.west + col_offset as f64 * self.cell_size,
            north: self.north - row_offset as f64 * self.cell_size,
        })
    }
}

/// Reflect an index that falls one or two cells outside `[0, n)` back inside.
fn mirror(i: i64, n: usize) -> usize {
    let last = n as i64 - 1;
    let reflected = if i < 0 {
        -i
    } else if i > last {
        2 * last - i
    } else {
        i
    };
    reflected.clamp(0, last) as usize
}

/// Catmull-Rom cubic through c1 (u = 0) and c2 (u = 1).
fn cubic(u: f64, c0: f64, c1: f64, c2: f64, c3: f64) -> f64 {
    (u * (u * (u * (c3 - 3.0 * c2 + 3.0 * c1 - c0) + (-c3 + 4.0 * c2 - 5.0 * c1 + 2.0 * c0))
        + (c2 - c0))
        + 2.0 * c1)
        / 2.0
}

impl fmt::Debug for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Grid")
            .field("cols", &self.cols)
            .field("rows", &self.rows)
            .field("cell_size", &self.cell_size)
            .field("west", &self.west)
            .field("north", &self.north)
            .finish()
    }
}

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (min, max) = self.min_max();
        write!(
            f,
            "{}x{} cells of {} from ({}, {}) to ({}, {}), values {}..{}",
            self.cols,
            self.rows,
            self.cell_size,
            self.west,
            self.north,
            self.east(),
            self.south(),
            min,
            max
        )
    }
}
