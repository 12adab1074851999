//! YAML render configuration.
//!
//! ```yaml
//! source:
//!   url_template: "https://tiles.example.com/terrain/{z}/{x}/{y}.bin"
//!   south_up: false
//! cache:
//!   strategy: disk
//!   path: ./tile-cache
//! shading:
//!   azimuth: 315
//!   zenith: 45
//! visualization: hypsometric_shading
//! elevation_range: [0, 3000]
//! contours:
//!   interval: 50
//! supersample: 2
//! ```

use crate::{RenderError, Result};
use reliefmap_ops::{ColorRamp, ColorVisualization, Colorizer, ContourParams, IlluminatedContours, Shader};
use reliefmap_tiles::cache::DEFAULT_CAPACITY;
use reliefmap_tiles::{
    DiskCache, LatLonBounds, MemoryCache, NoOpCache, SchemeFetcher, TileCache, TileSet, UrlTemplate,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Largest accepted supersampling factor.
pub const MAX_SUPERSAMPLE: u32 = 8;

fn default_timeout_secs() -> u64 {
    reliefmap_tiles::DEFAULT_TIMEOUT.as_secs()
}

fn default_capacity() -> usize {
    DEFAULT_CAPACITY
}

fn default_supersample() -> u32 {
    1
}

/// Where tiles come from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceConfig {
    /// Template with `{z}`, `{x}` and `{y}` tokens. `http(s)://` and
    /// `file://` are supported.
    pub url_template: String,
    /// The source numbers rows from the south (TMS).
    #[serde(default)]
    pub south_up: bool,
    /// HTTP request timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Cache strategy names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheStrategy {
    /// Never store tiles.
    None,
    /// Bounded in-memory LRU.
    #[default]
    Memory,
    /// Blobs on disk that survive restarts.
    Disk,
}

/// Tile cache settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheConfig {
    #[serde(default)]
    pub strategy: CacheStrategy,
    /// Entries kept by the memory cache.
    #[serde(default = "default_capacity")]
    pub capacity: usize,
    /// Directory of the disk cache.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            strategy: CacheStrategy::default(),
            capacity: DEFAULT_CAPACITY,
            path: None,
        }
    }
}

impl CacheConfig {
    /// Build the configured cache.
    pub fn build(&self) -> Result<Arc<dyn TileCache>> {
        Ok(match self.strategy {
            CacheStrategy::None => Arc::new(NoOpCache),
            CacheStrategy::Memory => Arc::new(MemoryCache::new(self.capacity)),
            CacheStrategy::Disk => {
                let path = self
                    .path
                    .as_ref()
                    .ok_or_else(|| RenderError::InvalidConfig("disk cache needs a path".into()))?;
                Arc::new(DiskCache::new(path)?)
            }
        })
    }
}

/// Everything needed to render relief tiles from one source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RenderConfig {
    pub source: SourceConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    /// Row executor workers; 0 for one per CPU.
    #[serde(default)]
    pub threads: usize,
    #[serde(default)]
    pub shading: Shader,
    #[serde(default)]
    pub visualization: ColorVisualization,
    #[serde(default)]
    pub color_ramp: ColorRamp,
    /// `[min, max]` elevation of the global hypsometric modes.
    #[serde(default)]
    pub elevation_range: Option<(f32, f32)>,
    /// Illuminated contours drawn over the colored relief.
    #[serde(default)]
    pub contours: Option<ContourParams>,
    /// Output scale factor; tiles are `256 * supersample` pixels wide.
    #[serde(default = "default_supersample")]
    pub supersample: u32,
}

impl RenderConfig {
    /// A configuration with defaults for everything but the source.
    pub fn for_template(url_template: impl Into<String>) -> Self {
        Self {
            source: SourceConfig {
                url_template: url_template.into(),
                south_up: false,
                timeout_secs: default_timeout_secs(),
            },
            cache: CacheConfig::default(),
            threads: 0,
            shading: Shader::default(),
            visualization: ColorVisualization::default(),
            color_ramp: ColorRamp::default(),
            elevation_range: None,
            contours: None,
            supersample: default_supersample(),
        }
    }

    /// Parse and validate a YAML document.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: RenderConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_yaml_str(&fs::read_to_string(path)?)
    }

    /// Check the settings that serde cannot.
    pub fn validate(&self) -> Result<()> {
        self.template()?;
        if self.supersample == 0 || self.supersample > MAX_SUPERSAMPLE {
            return Err(RenderError::InvalidConfig(format!(
                "supersample must be between 1 and {}, got {}",
                MAX_SUPERSAMPLE, self.supersample
            )));
        }
        if let Some((min, max)) = self.elevation_range {
            if !(min < max) {
                return Err(RenderError::InvalidConfig(format!(
                    "elevation_range minimum {} must be below maximum {}",
                    min, max
                )));
            }
        }
        if self.cache.strategy == CacheStrategy::Disk && self.cache.path.is_none() {
            return Err(RenderError::InvalidConfig("disk cache needs a path".into()));
        }
        self.contours()?;
        Ok(())
    }

    /// The parsed URL template.
    pub fn template(&self) -> Result<UrlTemplate> {
        Ok(UrlTemplate::new(&self.source.url_template)?)
    }

    /// A tile set over the configured source and cache.
    pub fn build_tileset(&self) -> Result<TileSet> {
        let fetcher = SchemeFetcher::new(Duration::from_secs(self.source.timeout_secs))?;
        Ok(TileSet::new(self.template()?, self.cache.build()?, Arc::new(fetcher)).with_south_up(self.source.south_up))
    }

    /// The configured colorizer.
    pub fn colorizer(&self) -> Colorizer {
        Colorizer {
            visualization: self.visualization,
            ramp: self.color_ramp.clone(),
            elevation_range: self.elevation_range,
        }
    }

    /// The configured contour renderer, if contours are enabled.
    pub fn contours(&self) -> Result<Option<IlluminatedContours>> {
        self.contours
            .clone()
            .map(IlluminatedContours::new)
            .transpose()
            .map_err(RenderError::from)
    }
}

/// Parse `min_lat,min_lon,max_lat,max_lon`.
pub fn parse_bounds(s: &str) -> Result<LatLonBounds> {
    let parts = s
        .split(',')
        .map(|p| p.trim().parse::<f64>())
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| RenderError::InvalidConfig(format!("bad bounds '{}': {}", s, e)))?;
    match parts[..] {
        [min_lat, min_lon, max_lat, max_lon] => Ok(LatLonBounds::new(min_lat, min_lon, max_lat, max_lon)?),
        _ => Err(RenderError::InvalidConfig(format!(
            "bounds need four values min_lat,min_lon,max_lat,max_lon, got '{}'",
            s
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
source:
  url_template: "https://tiles.example.com/{z}/{x}/{y}.bin"
"#;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = RenderConfig::from_yaml_str(MINIMAL).unwrap();
        assert_eq!(config, RenderConfig::for_template("https://tiles.example.com/{z}/{x}/{y}.bin"));
        assert_eq!(config.cache.capacity, 5000);
        assert_eq!(config.shading.azimuth, 315.0);
        assert_eq!(config.source.timeout_secs, 60);
        assert!(config.contours().unwrap().is_none());
    }

    #[test]
    fn test_full_config() {
        let yaml = r##"
source:
  url_template: "file:///srv/dem/{z}/{x}/{y}.bin"
  south_up: true
cache:
  strategy: none
threads: 2
shading:
  azimuth: 270
visualization: local_hypsometric
color_ramp:
  - { position: 0.0, color: "#000000" }
  - { position: 1.0, color: "#ffffff" }
elevation_range: [100, 900]
contours:
  interval: 50
  tanaka: false
supersample: 3
"##;
        let config = RenderConfig::from_yaml_str(yaml).unwrap();
        assert!(config.source.south_up);
        assert_eq!(config.cache.strategy, CacheStrategy::None);
        assert_eq!(config.shading.azimuth, 270.0);
        assert_eq!(config.shading.zenith, 45.0);
        assert_eq!(config.visualization, ColorVisualization::LocalHypsometric);
        assert_eq!(config.color_ramp.stops().len(), 2);
        assert_eq!(config.elevation_range, Some((100.0, 900.0)));
        let contours = config.contours().unwrap().unwrap();
        assert_eq!(contours.params().interval, 50.0);
        assert!(!contours.params().tanaka);
        assert_eq!(config.supersample, 3);
        assert_eq!(config.colorizer().ramp.color_at(0.5), [128, 128, 128]);
    }

    #[test]
    fn test_unknown_fields_are_rejected() {
        let yaml = format!("{}\nshadows: true\n", MINIMAL);
        assert!(matches!(RenderConfig::from_yaml_str(&yaml), Err(RenderError::Config(_))));
    }

    #[test]
    fn test_invalid_settings() {
        let mut config = RenderConfig::for_template("https://tiles.example.com/{z}/{x}/{y}.bin");
        config.supersample = 0;
        assert!(matches!(config.validate(), Err(RenderError::InvalidConfig(_))));

        let mut config = RenderConfig::for_template("https://tiles.example.com/{z}/{x}.bin");
        assert!(matches!(config.validate(), Err(RenderError::Tile(_))));

        config.source.url_template = "https://tiles.example.com/{z}/{x}/{y}.bin".into();
        config.elevation_range = Some((10.0, 10.0));
        assert!(config.validate().is_err());

        config.elevation_range = None;
        config.cache.strategy = CacheStrategy::Disk;
        assert!(config.validate().is_err());

        config.cache.strategy = CacheStrategy::Memory;
        config.contours = Some(ContourParams {
            interval: 0.0,
            ..ContourParams::default()
        });
        assert!(matches!(config.validate(), Err(RenderError::Grid(_))));
    }

    #[test]
    fn test_unbounded_contour_blur_is_rejected() {
        let yaml = format!("{}contours:\n  aspect_gauss_blur: .inf\n", MINIMAL);
        assert!(matches!(RenderConfig::from_yaml_str(&yaml), Err(RenderError::Grid(_))));

        let yaml = format!("{}contours:\n  aspect_gauss_blur: 1.0e12\n", MINIMAL);
        assert!(matches!(RenderConfig::from_yaml_str(&yaml), Err(RenderError::Grid(_))));
    }

    #[test]
    fn test_parse_bounds() {
        let bounds = parse_bounds("45.5, -123.0, 46,-122.5").unwrap();
        assert_eq!(bounds.min_lat, 45.5);
        assert_eq!(bounds.max_lon, -122.5);
        assert!(parse_bounds("1,2,3").is_err());
        assert!(parse_bounds("a,b,c,d").is_err());
        assert!(parse_bounds("46,-123,45,-122").is_err());
    }
}
