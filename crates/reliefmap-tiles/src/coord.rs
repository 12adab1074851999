//! Web Mercator tile addressing.
//!
//! Locations are projected to spherical Web Mercator meters, then to pixels
//! at a zoom level (`resolution = INITIAL_RESOLUTION / 2^zoom`), then to a
//! tile index with `ceil(pixels / 256) - 1`. The projection counts pixel rows
//! from the south; [`AxisConvention`] says whether tile rows are numbered from
//! the north (Google/OSM, the internal convention) or from the south (TMS).

use crate::{Result, TileError};
use std::f64::consts::PI;
use std::fmt;

/// Pixels along each side of a tile.
pub const TILE_SIZE: u32 = 256;

/// WGS84 semi-major axis in meters.
pub const EARTH_RADIUS: f64 = 6_378_137.0;

/// Meters per pixel at zoom 0.
pub const INITIAL_RESOLUTION: f64 = 2.0 * PI * EARTH_RADIUS / TILE_SIZE as f64;

/// Half the projected world width in meters.
pub const ORIGIN_SHIFT: f64 = PI * EARTH_RADIUS;

/// Latitude of the projection's north and south edges, `atan(sinh(pi))`.
pub const MAX_LATITUDE: f64 = 85.051_128_779_806_59;

/// Largest supported zoom level.
pub const MAX_ZOOM: u32 = 30;

/// Meters per pixel at `zoom`.
pub fn resolution(zoom: u32) -> f64 {
    INITIAL_RESOLUTION / (1u64 << zoom) as f64
}

/// Number of tiles along each axis at `zoom`.
pub fn tiles_per_side(zoom: u32) -> i64 {
    1i64 << zoom
}

/// Project a location to Web Mercator meters.
pub fn lat_lon_to_meters(lat: f64, lon: f64) -> (f64, f64) {
    let mx = lon * ORIGIN_SHIFT / 180.0;
    let my = ((90.0 + lat) * PI / 360.0).tan().ln() / (PI / 180.0);
    (mx, my * ORIGIN_SHIFT / 180.0)
}

/// Inverse of [`lat_lon_to_meters`].
pub fn meters_to_lat_lon(mx: f64, my: f64) -> (f64, f64) {
    let lon = mx / ORIGIN_SHIFT * 180.0;
    let lat = my / ORIGIN_SHIFT * 180.0;
    let lat = 180.0 / PI * (2.0 * (lat * PI / 180.0).exp().atan() - PI / 2.0);
    (lat, lon)
}

/// Web Mercator meters to pixels at `zoom`. Pixel rows count from the south.
pub fn meters_to_pixels(mx: f64, my: f64, zoom: u32) -> (f64, f64) {
    let res = resolution(zoom);
    ((mx + ORIGIN_SHIFT) / res, (my + ORIGIN_SHIFT) / res)
}

/// Inverse of [`meters_to_pixels`].
pub fn pixels_to_meters(px: f64, py: f64, zoom: u32) -> (f64, f64) {
    let res = resolution(zoom);
    (px * res - ORIGIN_SHIFT, py * res - ORIGIN_SHIFT)
}

/// Project a location to pixels at `zoom`.
pub fn lat_lon_to_pixels(lat: f64, lon: f64, zoom: u32) -> Result<(f64, f64)> {
    check_zoom(zoom)?;
    check_location(lat, lon)?;
    let (mx, my) = lat_lon_to_meters(lat, lon);
    Ok(meters_to_pixels(mx, my, zoom))
}

/// Inverse of [`lat_lon_to_pixels`].
pub fn pixels_to_lat_lon(px: f64, py: f64, zoom: u32) -> (f64, f64) {
    let (mx, my) = pixels_to_meters(px, py, zoom);
    meters_to_lat_lon(mx, my)
}

fn check_zoom(zoom: u32) -> Result<()> {
    if zoom > MAX_ZOOM {
        return Err(TileError::InvalidZoomLevel(zoom));
    }
    Ok(())
}

fn check_location(lat: f64, lon: f64) -> Result<()> {
    if !(lat.abs() <= MAX_LATITUDE && lon.abs() <= 180.0) {
        return Err(TileError::InvalidLocation { lat, lon });
    }
    Ok(())
}

/// How tile rows are numbered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AxisConvention {
    /// Row 0 is the northernmost row (Google, OSM, XYZ).
    #[default]
    NorthDown,
    /// Row 0 is the southernmost row (TMS).
    SouthUp,
}

impl AxisConvention {
    /// Convention for a source flagged as numbering rows from the bottom.
    pub fn from_south_up(south_up: bool) -> Self {
        if south_up {
            AxisConvention::SouthUp
        } else {
            AxisConvention::NorthDown
        }
    }
}

/// One of the eight neighbors of a tile, as seen on a north-up map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    TopLeft,
    Top,
    TopRight,
    Left,
    Right,
    BottomLeft,
    Bottom,
    BottomRight,
}

impl Direction {
    /// All eight directions, row by row from the top left.
    pub const ALL: [Direction; 8] = [
        Direction::TopLeft,
        Direction::Top,
        Direction::TopRight,
        Direction::Left,
        Direction::Right,
        Direction::BottomLeft,
        Direction::Bottom,
        Direction::BottomRight,
    ];

    /// Column and row step on a north-up map.
    pub fn screen_offset(self) -> (i64, i64) {
        match self {
            Direction::TopLeft => (-1, -1),
            Direction::Top => (0, -1),
            Direction::TopRight => (1, -1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
            Direction::BottomLeft => (-1, 1),
            Direction::Bottom => (0, 1),
            Direction::BottomRight => (1, 1),
        }
    }

    /// Step in tile indices. Moving up decreases `y` in
    /// [`AxisConvention::NorthDown`] and increases it in
    /// [`AxisConvention::SouthUp`].
    pub fn offset(self, convention: AxisConvention) -> (i64, i64) {
        let (dx, dy) = self.screen_offset();
        match convention {
            AxisConvention::NorthDown => (dx, dy),
            AxisConvention::SouthUp => (dx, -dy),
        }
    }
}

/// A geographic bounding box in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatLonBounds {
    pub min_lat: f64,
    pub min_lon: f64,
    pub max_lat: f64,
    pub max_lon: f64,
}

impl LatLonBounds {
    /// Create a bounding box. Fails if a corner is not a valid location or
    /// the box is inverted.
    pub fn new(min_lat: f64, min_lon: f64, max_lat: f64, max_lon: f64) -> Result<Self> {
        for (lat, lon) in [(min_lat, min_lon), (max_lat, max_lon)] {
            if !(lat.abs() <= 90.0 && lon.abs() <= 180.0) {
                return Err(TileError::InvalidLocation { lat, lon });
            }
        }
        if min_lat > max_lat {
            return Err(TileError::InvalidBounds(format!(
                "min_lat {} is greater than max_lat {}",
                min_lat, max_lat
            )));
        }
        if min_lon > max_lon {
            return Err(TileError::InvalidBounds(format!(
                "min_lon {} is greater than max_lon {}",
                min_lon, max_lon
            )));
        }
        Ok(Self {
            min_lat,
            min_lon,
            max_lat,
            max_lon,
        })
    }

    /// True if the location is inside or on the edge of the box.
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        lat >= self.min_lat && lat <= self.max_lat && lon >= self.min_lon && lon <= self.max_lon
    }

    /// The box with latitudes limited to the projection's domain.
    pub fn clamped_to_mercator(&self) -> Self {
        Self {
            min_lat: self.min_lat.clamp(-MAX_LATITUDE, MAX_LATITUDE),
            max_lat: self.max_lat.clamp(-MAX_LATITUDE, MAX_LATITUDE),
            ..*self
        }
    }
}

/// Extent of a tile in Web Mercator meters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MercatorBounds {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

/// A tile index at a zoom level.
///
/// Coordinates are signed so that neighbors of edge tiles can be expressed;
/// [`validate`](Self::validate) rejects anything outside `[0, 2^zoom)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileCoord {
    /// Zoom level.
    pub zoom: u32,
    /// Column, increasing eastward from the antimeridian.
    pub x: i64,
    /// Row, in whichever [`AxisConvention`] the caller uses.
    pub y: i64,
}

impl TileCoord {
    /// Create a coordinate without checking it.
    pub const fn new(zoom: u32, x: i64, y: i64) -> Self {
        Self { zoom, x, y }
    }

    /// True if the zoom is supported and both indices are in range.
    pub fn is_valid(&self) -> bool {
        if self.zoom > MAX_ZOOM {
            return false;
        }
        let n = tiles_per_side(self.zoom);
        (0..n).contains(&self.x) && (0..n).contains(&self.y)
    }

    /// The coordinate itself, or `MalformedCoordinate`.
    pub fn validate(self) -> Result<Self> {
        if self.is_valid() {
            Ok(self)
        } else {
            Err(TileError::MalformedCoordinate {
                zoom: self.zoom,
                x: self.x,
                y: self.y,
            })
        }
    }

    /// Tile containing a location.
    ///
    /// `ceil(p / 256) - 1` maps a location exactly on the western or southern
    /// edge of the world to index -1; such indices are clamped into range.
    pub fn for_lat_lon(lat: f64, lon: f64, zoom: u32, convention: AxisConvention) -> Result<Self> {
        let (px, py) = lat_lon_to_pixels(lat, lon, zoom)?;
        let last = tiles_per_side(zoom) - 1;
        let tx = ((px / TILE_SIZE as f64).ceil() as i64 - 1).clamp(0, last);
        let ty = ((py / TILE_SIZE as f64).ceil() as i64 - 1).clamp(0, last);
        let coord = Self::new(zoom, tx, ty);
        Ok(coord.to_convention(AxisConvention::SouthUp, convention))
    }

    /// Mirror the row index: `2^zoom - 1 - y`.
    pub fn flip_y(self) -> Self {
        Self {
            y: tiles_per_side(self.zoom) - 1 - self.y,
            ..self
        }
    }

    /// Re-express a coordinate numbered in `from` in the `to` convention.
    pub fn to_convention(self, from: AxisConvention, to: AxisConvention) -> Self {
        if from == to {
            self
        } else {
            self.flip_y()
        }
    }

    /// The adjacent tile in `direction`. The result may be out of range.
    pub fn neighbor(self, direction: Direction, convention: AxisConvention) -> Self {
        let (dx, dy) = direction.offset(convention);
        Self {
            x: self.x + dx,
            y: self.y + dy,
            ..self
        }
    }

    /// Extent in Web Mercator meters.
    pub fn mercator_bounds(&self, convention: AxisConvention) -> MercatorBounds {
        let tms = self.to_convention(convention, AxisConvention::SouthUp);
        let size = TILE_SIZE as f64 * resolution(self.zoom);
        let west = tms.x as f64 * size - ORIGIN_SHIFT;
        let south = tms.y as f64 * size - ORIGIN_SHIFT;
        MercatorBounds {
            west,
            south,
            east: west + size,
            north: south + size,
        }
    }

    /// Extent in degrees.
    pub fn lat_lon_bounds(&self, convention: AxisConvention) -> LatLonBounds {
        let m = self.mercator_bounds(convention);
        let (min_lat, min_lon) = meters_to_lat_lon(m.west, m.south);
        let (max_lat, max_lon) = meters_to_lat_lon(m.east, m.north);
        LatLonBounds {
            min_lat,
            min_lon,
            max_lat,
            max_lon,
        }
    }
}

impl fmt::Display for TileCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.zoom, self.x, self.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_constants() {
        assert_relative_eq!(INITIAL_RESOLUTION, 156_543.033_928, epsilon = 1e-5);
        assert_relative_eq!(ORIGIN_SHIFT, 20_037_508.342_789, epsilon = 1e-5);
        assert_relative_eq!(resolution(1), INITIAL_RESOLUTION / 2.0);
    }

    #[test]
    fn test_meters_round_trip() {
        let (mx, my) = lat_lon_to_meters(47.6062, -122.3321);
        let (lat, lon) = meters_to_lat_lon(mx, my);
        assert_relative_eq!(lat, 47.6062, epsilon = 1e-9);
        assert_relative_eq!(lon, -122.3321, epsilon = 1e-9);

        let (_, top) = lat_lon_to_meters(MAX_LATITUDE, 0.0);
        assert_relative_eq!(top, ORIGIN_SHIFT, epsilon = 1e-3);
    }

    #[test]
    fn test_tile_for_lat_lon_conventions() {
        // Seattle at zoom 12.
        let google = TileCoord::for_lat_lon(47.6062, -122.3321, 12, AxisConvention::NorthDown).unwrap();
        let tms = TileCoord::for_lat_lon(47.6062, -122.3321, 12, AxisConvention::SouthUp).unwrap();
        assert_eq!(google.x, 656);
        assert_eq!(google.y, 1430);
        assert_eq!(tms.y, 4095 - 1430);
        assert_eq!(google.flip_y(), tms);

        let bounds = google.lat_lon_bounds(AxisConvention::NorthDown);
        assert!(bounds.contains(47.6062, -122.3321), "{:?}", bounds);
        assert_eq!(tms.lat_lon_bounds(AxisConvention::SouthUp), bounds);
    }

    #[test]
    fn test_world_edges_clamp_into_range() {
        let sw = TileCoord::for_lat_lon(-MAX_LATITUDE, -180.0, 3, AxisConvention::SouthUp).unwrap();
        assert_eq!((sw.x, sw.y), (0, 0));
        let ne = TileCoord::for_lat_lon(MAX_LATITUDE, 180.0, 3, AxisConvention::SouthUp).unwrap();
        assert_eq!((ne.x, ne.y), (7, 7));
    }

    #[test]
    fn test_invalid_inputs() {
        assert!(matches!(
            TileCoord::for_lat_lon(86.0, 0.0, 1, AxisConvention::NorthDown),
            Err(TileError::InvalidLocation { .. })
        ));
        assert!(TileCoord::for_lat_lon(f64::NAN, 0.0, 1, AxisConvention::NorthDown).is_err());
        assert!(matches!(
            lat_lon_to_pixels(0.0, 0.0, MAX_ZOOM + 1),
            Err(TileError::InvalidZoomLevel(31))
        ));
        assert!(matches!(
            TileCoord::new(2, 4, 0).validate(),
            Err(TileError::MalformedCoordinate { zoom: 2, x: 4, y: 0 })
        ));
        assert!(TileCoord::new(2, 0, -1).validate().is_err());
        assert!(TileCoord::new(2, 3, 3).validate().is_ok());
    }

    #[test]
    fn test_up_depends_on_convention() {
        let c = TileCoord::new(4, 5, 5);
        assert_eq!(c.neighbor(Direction::Top, AxisConvention::NorthDown).y, 4);
        assert_eq!(c.neighbor(Direction::Top, AxisConvention::SouthUp).y, 6);
        assert_eq!(c.neighbor(Direction::BottomRight, AxisConvention::NorthDown), TileCoord::new(4, 6, 6));

        // The same geographic neighbor in either numbering.
        let up = c.neighbor(Direction::TopLeft, AxisConvention::NorthDown);
        let flipped = c
            .flip_y()
            .neighbor(Direction::TopLeft, AxisConvention::SouthUp)
            .flip_y();
        assert_eq!(up, flipped);
    }

    #[test]
    fn test_mercator_bounds_tile_the_world() {
        let b = TileCoord::new(0, 0, 0).mercator_bounds(AxisConvention::NorthDown);
        assert_relative_eq!(b.west, -ORIGIN_SHIFT);
        assert_relative_eq!(b.north, ORIGIN_SHIFT, epsilon = 1e-6);

        let nw = TileCoord::new(1, 0, 0).mercator_bounds(AxisConvention::NorthDown);
        assert_relative_eq!(nw.south, 0.0, epsilon = 1e-6);
        assert_relative_eq!(nw.east, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_bounds_validation() {
        assert!(LatLonBounds::new(10.0, 0.0, 5.0, 1.0).is_err());
        assert!(LatLonBounds::new(0.0, 2.0, 1.0, 1.0).is_err());
        assert!(LatLonBounds::new(-91.0, 0.0, 1.0, 1.0).is_err());
        let b = LatLonBounds::new(-90.0, -180.0, 90.0, 180.0).unwrap().clamped_to_mercator();
        assert_eq!(b.max_lat, MAX_LATITUDE);
    }

    #[test]
    fn test_display() {
        assert_eq!(TileCoord::new(3, 1, 2).to_string(), "3/1/2");
    }
}
