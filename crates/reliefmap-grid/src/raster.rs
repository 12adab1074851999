//! Headerless binary raster tiles.
//!
//! A raster tile is a 256x256 grid of little-endian `f32` values, row-major
//! from the north-west corner, with no header: exactly 262,144 bytes.

use crate::{Grid, GridError, Result};
use bytes::{Buf, BufMut};
use std::io::Read;

/// Cells along each side of a raster tile.
pub const RASTER_TILE_SIZE: usize = 256;

/// Byte length of an encoded raster tile.
pub const RASTER_TILE_BYTES: usize = RASTER_TILE_SIZE * RASTER_TILE_SIZE * 4;

/// Decode a raster tile. The result has a cell size of 1 and its origin at
/// (0, 0); callers georeference it with [`Grid::with_origin`] and
/// [`Grid::with_cell_size`].
pub fn decode_raster_tile(bytes: &[u8]) -> Result<Grid> {
    if bytes.len() != RASTER_TILE_BYTES {
        return Err(GridError::MalformedRaster {
            expected: RASTER_TILE_BYTES,
            actual: bytes.len(),
        });
    }
    let mut buf = bytes;
    let mut cells = Vec::with_capacity(RASTER_TILE_SIZE * RASTER_TILE_SIZE);
    while buf.has_remaining() {
        cells.push(buf.get_f32_le());
    }
    Grid::from_vec(RASTER_TILE_SIZE, RASTER_TILE_SIZE, 1.0, cells)
}

/// Read one raster tile from a stream. Fails if the stream ends early.
pub fn read_raster_tile<R: Read>(reader: R) -> Result<Grid> {
    let mut bytes = Vec::with_capacity(RASTER_TILE_BYTES);
    reader.take(RASTER_TILE_BYTES as u64).read_to_end(&mut bytes)?;
    decode_raster_tile(&bytes)
}

/// Encode a 256x256 grid as a raster tile.
pub fn encode_raster_tile(grid: &Grid) -> Result<Vec<u8>> {
    if grid.cols() != RASTER_TILE_SIZE || grid.rows() != RASTER_TILE_SIZE {
        return Err(GridError::SizeMismatch(format!(
            "raster tiles are {0}x{0}, grid is {1}x{2}",
            RASTER_TILE_SIZE,
            grid.cols(),
            grid.rows()
        )));
    }
    let mut out = Vec::with_capacity(RASTER_TILE_BYTES);
    for &v in grid.cells() {
        out.put_f32_le(v);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_bytes() -> Vec<u8> {
        let mut out = Vec::with_capacity(RASTER_TILE_BYTES);
        for i in 0..RASTER_TILE_SIZE * RASTER_TILE_SIZE {
            out.put_f32_le(i as f32 * 0.5);
        }
        out
    }

    #[test]
    fn test_decode_layout() {
        let grid = decode_raster_tile(&sample_bytes()).expect("decode");
        assert_eq!(grid.cols(), 256);
        assert_eq!(grid.value(1, 0), 0.5);
        assert_eq!(grid.value(0, 1), 128.0);
        assert_eq!(grid.cell_size(), 1.0);
    }

    #[test]
    fn test_short_input_fails() {
        let bytes = sample_bytes();
        let err = decode_raster_tile(&bytes[..RASTER_TILE_BYTES - 4]).unwrap_err();
        assert!(matches!(
            err,
            GridError::MalformedRaster { actual, .. } if actual == RASTER_TILE_BYTES - 4
        ));
        assert!(read_raster_tile(&bytes[..1000]).is_err());
    }

    #[test]
    fn test_stream_reads_exactly_one_tile() {
        let mut bytes = sample_bytes();
        bytes.extend_from_slice(&[0xff; 16]);
        let grid = read_raster_tile(bytes.as_slice()).expect("read");
        assert_eq!(grid.value(255, 255), 65535.0 * 0.5);
    }

    #[test]
    fn test_encode_requires_tile_shape() {
        let grid = Grid::new(4, 4, 1.0).unwrap();
        assert!(matches!(encode_raster_tile(&grid), Err(GridError::SizeMismatch(_))));
        let tile = decode_raster_tile(&sample_bytes()).unwrap();
        assert_eq!(encode_raster_tile(&tile).unwrap(), sample_bytes());
    }
}
