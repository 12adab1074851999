//! Metric declarations for the relief tile pipeline.
//!
//! Every metric recorded by the tile and render crates is declared once here,
//! so names cannot drift between the recording site and exporters.
//!
//! ```rust
//! use reliefmap_metrics::metric_defs;
//!
//! metrics::counter!(metric_defs::CACHE_HITS.name, "cache" => "memory").increment(1);
//! ```

pub use metrics;

use metrics::{describe_counter, describe_gauge, describe_histogram, Unit};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Counter,
    Gauge,
    Histogram,
}

/// A metric name with what exporters need to describe it.
#[derive(Debug, Clone, Copy)]
pub struct Metric {
    pub name: &'static str,
    pub kind: MetricKind,
    pub unit: Unit,
    pub description: &'static str,
}

impl Metric {
    /// Register the description with the installed recorder.
    pub fn describe(&self) {
        match self.kind {
            MetricKind::Counter => describe_counter!(self.name, self.unit, self.description),
            MetricKind::Gauge => describe_gauge!(self.name, self.unit, self.description),
            MetricKind::Histogram => describe_histogram!(self.name, self.unit, self.description),
        }
    }
}

const fn counter(name: &'static str, unit: Unit, description: &'static str) -> Metric {
    Metric {
        name,
        kind: MetricKind::Counter,
        unit,
        description,
    }
}

/// All metrics recorded by the pipeline.
pub mod metric_defs {
    use super::{counter, Metric, MetricKind};
    use metrics::Unit;

    // Caches, labelled by cache name unless noted.

    pub const CACHE_HITS: Metric = counter("reliefmap.cache.hits", Unit::Count, "Tile lookups answered from the cache");
    pub const CACHE_MISSES: Metric =
        counter("reliefmap.cache.misses", Unit::Count, "Tile lookups missing from the cache");
    /// Unlabelled.
    pub const CACHE_EVICTIONS: Metric =
        counter("reliefmap.cache.evictions", Unit::Count, "Tiles evicted from the in-memory cache");
    pub const CACHE_ENTRIES: Metric = Metric {
        name: "reliefmap.cache.entries",
        kind: MetricKind::Gauge,
        unit: Unit::Count,
        description: "Tiles currently held by the cache",
    };

    // Fetching

    /// Labelled by payload kind.
    pub const TILES_FETCHED: Metric = counter("reliefmap.fetch.tiles", Unit::Count, "Tiles fetched from their source");
    pub const FETCH_FAILURES: Metric = counter("reliefmap.fetch.failures", Unit::Count, "Tile fetches that failed");
    pub const BYTES_FETCHED: Metric =
        counter("reliefmap.fetch.bytes", Unit::Bytes, "Payload bytes read from tile sources");
    pub const MOSAIC_GAPS: Metric =
        counter("reliefmap.mosaic.gaps", Unit::Count, "Mega-tile neighbors filled with background");

    // Rendering

    pub const TILES_RENDERED: Metric = counter("reliefmap.render.tiles", Unit::Count, "Output tiles rendered");
    pub const RENDER_DURATION: Metric = Metric {
        name: "reliefmap.render.duration_seconds",
        kind: MetricKind::Histogram,
        unit: Unit::Seconds,
        description: "Time to render one output tile in seconds",
    };
    pub const TILES_SKIPPED: Metric = counter(
        "reliefmap.render.skipped",
        Unit::Count,
        "Output tiles skipped because they already exist",
    );

    pub const ALL: &[&Metric] = &[
        &CACHE_HITS,
        &CACHE_MISSES,
        &CACHE_EVICTIONS,
        &CACHE_ENTRIES,
        &TILES_FETCHED,
        &FETCH_FAILURES,
        &BYTES_FETCHED,
        &MOSAIC_GAPS,
        &TILES_RENDERED,
        &RENDER_DURATION,
        &TILES_SKIPPED,
    ];
}

/// Register descriptions for every metric in [`metric_defs::ALL`].
///
/// Call once after installing a recorder.
pub fn describe_metrics() {
    for metric in metric_defs::ALL {
        metric.describe();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_names_are_unique_and_prefixed() {
        let mut seen = HashSet::new();
        for metric in metric_defs::ALL {
            assert!(metric.name.starts_with("reliefmap."), "{}", metric.name);
            assert!(seen.insert(metric.name), "duplicate {}", metric.name);
            assert!(!metric.description.is_empty());
        }
    }

    #[test]
    fn test_kinds() {
        assert_eq!(metric_defs::CACHE_ENTRIES.kind, MetricKind::Gauge);
        assert_eq!(metric_defs::RENDER_DURATION.kind, MetricKind::Histogram);
        assert_eq!(metric_defs::RENDER_DURATION.unit, Unit::Seconds);
        let counters = metric_defs::ALL.iter().filter(|m| m.kind == MetricKind::Counter).count();
        assert_eq!(counters, metric_defs::ALL.len() - 2);
    }

    #[test]
    fn test_describe_without_recorder() {
        describe_metrics();
    }
}
