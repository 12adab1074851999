//! Shared test doubles.

#![allow(dead_code)]

use image::{ImageFormat, Rgba, RgbaImage};
use reliefmap_grid::raster::encode_raster_tile;
use reliefmap_grid::Grid;
use reliefmap_tiles::{ByteFetcher, Result, TileCoord, TileError};
use std::collections::HashMap;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

pub const RASTER_TEMPLATE: &str = "https://mock.tiles/{z}/{x}/{y}.bin";
pub const IMAGE_TEMPLATE: &str = "https://mock.tiles/{z}/{x}/{y}.png";

/// Serves canned payloads by URL and counts every request.
#[derive(Default)]
pub struct MockFetcher {
    payloads: Mutex<HashMap<String, Vec<u8>>>,
    calls: AtomicUsize,
    delay: Option<Duration>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn insert(&self, url: impl Into<String>, bytes: Vec<u8>) {
        self.payloads.lock().unwrap().insert(url.into(), bytes);
    }

    pub fn remove(&self, url: &str) {
        self.payloads.lock().unwrap().remove(url);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ByteFetcher for MockFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            thread::sleep(delay);
        }
        self.payloads
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| TileError::FetchFailure {
                key: url.to_string(),
                reason: "HTTP 404 Not Found".into(),
            })
    }
}

/// URL of a north-down coordinate under a template.
pub fn url(template: &str, coord: &TileCoord) -> String {
    template
        .replace("{z}", &coord.zoom.to_string())
        .replace("{x}", &coord.x.to_string())
        .replace("{y}", &coord.y.to_string())
}

/// A raster tile with every cell set to `value`.
pub fn flat_raster(value: f32) -> Vec<u8> {
    let grid = Grid::filled(256, 256, 1.0, value).unwrap();
    encode_raster_tile(&grid).unwrap()
}

/// A 256x256 PNG filled with one color.
pub fn flat_png(color: [u8; 4]) -> Vec<u8> {
    let image = RgbaImage::from_pixel(256, 256, Rgba(color));
    let mut bytes = Vec::new();
    image.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png).unwrap();
    bytes
}

/// The 3x3 block of coordinates around `center`, row by row from the top left.
pub fn neighborhood(center: TileCoord) -> Vec<TileCoord> {
    let mut coords = Vec::with_capacity(9);
    for dy in -1..=1 {
        for dx in -1..=1 {
            coords.push(TileCoord::new(center.zoom, center.x + dx, center.y + dy));
        }
    }
    coords
}
