//! Warming a cache with every tile of a region.

use crate::coord::LatLonBounds;
use crate::tileset::TileSet;
use crate::Result;
use rayon::prelude::*;
use std::ops::RangeInclusive;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{info, warn};

/// Callback receiving human-readable progress messages.
pub type ProgressCallback = Box<dyn Fn(&str) + Send + Sync>;

/// Outcome of [`prefetch_region`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PrefetchSummary {
    /// Tiles in the region.
    pub requested: usize,
    /// Tiles whose payload is now available.
    pub fetched: usize,
    /// Tiles that could not be fetched.
    pub failed: usize,
}

/// Fetch every tile covering `bounds` over `zooms` on `threads` workers
/// (0 for one per core), so later renders find them in the cache.
///
/// Individual failures are counted, not returned.
pub fn prefetch_region(
    tileset: &TileSet,
    bounds: LatLonBounds,
    zooms: RangeInclusive<u32>,
    threads: usize,
    callback: Option<&ProgressCallback>,
) -> Result<PrefetchSummary> {
    let coords: Vec<_> = tileset.tiles_in(bounds, zooms)?.collect();
    if let Some(cb) = callback {
        cb(&format!("Prefetching {} tiles...", coords.len()));
    }

    let pool = rayon::ThreadPoolBuilder::new().num_threads(threads).build()?;
    let fetched = AtomicUsize::new(0);
    let failed = AtomicUsize::new(0);
    pool.install(|| {
        coords.par_iter().for_each(|coord| match tileset.fetch(coord) {
            Ok(_) => {
                fetched.fetch_add(1, Ordering::Relaxed);
            }
            Err(err) => {
                warn!(%coord, error = %err, "Prefetch failed");
                failed.fetch_add(1, Ordering::Relaxed);
            }
        });
    });

    let summary = PrefetchSummary {
        requested: coords.len(),
        fetched: fetched.into_inner(),
        failed: failed.into_inner(),
    };
    info!(
        requested = summary.requested,
        fetched = summary.fetched,
        failed = summary.failed,
        "Prefetch complete"
    );
    if let Some(cb) = callback {
        cb(&format!(
            "Prefetch complete: {} tiles fetched, {} failed",
            summary.fetched, summary.failed
        ));
    }
    Ok(summary)
}
