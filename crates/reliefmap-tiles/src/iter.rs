//! Enumerating the tiles covering a bounding box over a zoom range.

use crate::coord::{AxisConvention, LatLonBounds, TileCoord, MAX_ZOOM};
use crate::{Result, TileError};
use std::ops::RangeInclusive;

/// The rectangle of tile indices covering the box at one zoom level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ZoomSpan {
    zoom: u32,
    min_x: i64,
    width: i64,
    /// Row of the northernmost tiles.
    first_y: i64,
    /// +1 when rows grow southward, -1 when they grow northward.
    y_step: i64,
    height: i64,
}

impl ZoomSpan {
    fn resolve(bounds: &LatLonBounds, zoom: u32, convention: AxisConvention) -> Result<Self> {
        let sw = TileCoord::for_lat_lon(bounds.min_lat, bounds.min_lon, zoom, convention)?;
        let ne = TileCoord::for_lat_lon(bounds.max_lat, bounds.max_lon, zoom, convention)?;
        // North-down numbering puts the north-east corner on a smaller row
        // than the south-west corner; south-up numbering the reverse.
        let y_step = if ne.y <= sw.y { 1 } else { -1 };
        Ok(Self {
            zoom,
            min_x: sw.x,
            width: ne.x - sw.x + 1,
            first_y: ne.y,
            y_step,
            height: (sw.y - ne.y).abs() + 1,
        })
    }

    fn len(&self) -> usize {
        (self.width * self.height) as usize
    }

    fn coord(&self, index: usize) -> TileCoord {
        let index = index as i64;
        let row = index / self.width;
        let col = index % self.width;
        TileCoord::new(self.zoom, self.min_x + col, self.first_y + row * self.y_step)
    }
}

/// Iterator over every tile touching a bounding box, zoom by zoom.
///
/// Index bounds are resolved at each zoom separately, since reprojection is
/// not linear across zoom levels. Within a zoom, tiles come row by row from
/// the north, west to east.
///
/// ```
/// use reliefmap_tiles::{AxisConvention, LatLonBounds, TileIterator};
///
/// let world = LatLonBounds::new(-85.0, -180.0, 85.0, 180.0)?;
/// let tiles = TileIterator::new(world, 0..=2, AxisConvention::NorthDown)?;
/// assert_eq!(tiles.len(), 1 + 4 + 16);
/// # Ok::<(), reliefmap_tiles::TileError>(())
/// ```
#[derive(Debug, Clone)]
pub struct TileIterator {
    spans: Vec<ZoomSpan>,
    span: usize,
    index: usize,
    remaining: usize,
}

impl TileIterator {
    /// Tiles covering `bounds` at every zoom in `zooms`.
    ///
    /// Latitudes beyond the projection's limits are clamped to them.
    pub fn new(
        bounds: LatLonBounds,
        zooms: RangeInclusive<u32>,
        convention: AxisConvention,
    ) -> Result<Self> {
        if zooms.is_empty() {
            return Err(TileError::InvalidBounds(format!(
                "empty zoom range {}..={}",
                zooms.start(),
                zooms.end()
            )));
        }
        if *zooms.end() > MAX_ZOOM {
            return Err(TileError::InvalidZoomLevel(*zooms.end()));
        }
        let bounds = bounds.clamped_to_mercator();
        let spans = zooms
            .map(|zoom| ZoomSpan::resolve(&bounds, zoom, convention))
            .collect::<Result<Vec<_>>>()?;
        let remaining = spans.iter().map(ZoomSpan::len).sum();
        Ok(Self {
            spans,
            span: 0,
            index: 0,
            remaining,
        })
    }
}

impl Iterator for TileIterator {
    type Item = TileCoord;

    fn next(&mut self) -> Option<TileCoord> {
        let span = self.spans.get(self.span)?;
        let coord = span.coord(self.index);
        self.index += 1;
        if self.index == span.len() {
            self.span += 1;
            self.index = 0;
        }
        self.remaining -= 1;
        Some(coord)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for TileIterator {}

#[cfg(test)]
mod tests {
    use super::*;

    fn world() -> LatLonBounds {
        LatLonBounds::new(-85.0, -180.0, 85.0, 180.0).unwrap()
    }

    #[test]
    fn test_world_counts() {
        for zoom in 0..=4 {
            let tiles: Vec<_> = TileIterator::new(world(), zoom..=zoom, AxisConvention::NorthDown)
                .unwrap()
                .collect();
            assert_eq!(tiles.len(), 4usize.pow(zoom));
            assert!(tiles.iter().all(TileCoord::is_valid));
        }
    }

    #[test]
    fn test_row_major_from_north() {
        let tiles: Vec<_> = TileIterator::new(world(), 1..=1, AxisConvention::NorthDown)
            .unwrap()
            .map(|c| (c.x, c.y))
            .collect();
        assert_eq!(tiles, vec![(0, 0), (1, 0), (0, 1), (1, 1)]);

        let tms: Vec<_> = TileIterator::new(world(), 1..=1, AxisConvention::SouthUp)
            .unwrap()
            .map(|c| (c.x, c.y))
            .collect();
        assert_eq!(tms, vec![(0, 1), (1, 1), (0, 0), (1, 0)]);
    }

    #[test]
    fn test_small_box() {
        // A box around Seattle spans a couple of tiles at zoom 10.
        let bounds = LatLonBounds::new(47.4, -122.5, 47.8, -122.1).unwrap();
        let north_down: Vec<_> = TileIterator::new(bounds, 10..=10, AxisConvention::NorthDown)
            .unwrap()
            .collect();
        let south_up: Vec<_> = TileIterator::new(bounds, 10..=10, AxisConvention::SouthUp)
            .unwrap()
            .collect();
        assert_eq!(north_down.len(), south_up.len());
        for (a, b) in north_down.iter().zip(&south_up) {
            assert_eq!(a.flip_y(), *b);
        }
        let first = north_down[0].lat_lon_bounds(AxisConvention::NorthDown);
        assert!(first.max_lat >= 47.8);
    }

    #[test]
    fn test_exact_size() {
        let mut it = TileIterator::new(world(), 0..=2, AxisConvention::NorthDown).unwrap();
        assert_eq!(it.len(), 21);
        assert_eq!(it.next(), Some(TileCoord::new(0, 0, 0)));
        assert_eq!(it.len(), 20);
        assert_eq!(it.by_ref().count(), 20);
        assert_eq!(it.next(), None);
    }

    #[test]
    fn test_rejects_bad_zooms() {
        #[allow(clippy::reversed_empty_ranges)]
        let empty = 3..=2;
        assert!(TileIterator::new(world(), empty, AxisConvention::NorthDown).is_err());
        assert!(TileIterator::new(world(), 0..=31, AxisConvention::NorthDown).is_err());
    }
}
