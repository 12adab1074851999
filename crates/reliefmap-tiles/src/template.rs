//! URL templates with `{z}`, `{x}` and `{y}` tokens.

use crate::coord::TileCoord;
use crate::tile::TileKind;
use crate::{Result, TileError};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// A validated tile URL template such as
/// `https://example.com/terrain/{z}/{x}/{y}.bin`.
///
/// The payload kind is inferred from the file extension: `.png`, `.jpg` and
/// `.jpeg` address images, anything else addresses binary raster tiles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlTemplate {
    template: String,
    kind: TileKind,
}

impl UrlTemplate {
    /// Parse and validate a template.
    pub fn new(template: impl Into<String>) -> Result<Self> {
        let template = template.into();
        let valid = ["{z}", "{x}", "{y}", "//", "."]
            .iter()
            .all(|part| template.contains(part))
            && !template.contains(' ');
        if !valid {
            return Err(TileError::InvalidTemplate(template));
        }
        let kind = infer_kind(&template);
        Ok(Self { template, kind })
    }

    /// A `file://` template for a `{z}/{x}/{y}.<extension>` directory tree.
    pub fn for_directory(dir: impl AsRef<Path>, extension: &str) -> Result<Self> {
        let dir = dir.as_ref().to_string_lossy();
        let dir = dir.trim_end_matches(['/', '\\']);
        Self::new(format!("file://{}/{{z}}/{{x}}/{{y}}.{}", dir, extension))
    }

    /// The template string.
    pub fn as_str(&self) -> &str {
        &self.template
    }

    /// Payload kind addressed by the template.
    pub fn kind(&self) -> TileKind {
        self.kind
    }

    /// Substitute a coordinate, already in the source's row numbering.
    pub fn resolve(&self, coord: &TileCoord) -> String {
        self.template
            .replace("{z}", &coord.zoom.to_string())
            .replace("{x}", &coord.x.to_string())
            .replace("{y}", &coord.y.to_string())
    }
}

fn infer_kind(template: &str) -> TileKind {
    let path = template.split(['?', '#']).next().unwrap_or(template);
    let file = path.rsplit('/').next().unwrap_or(path);
    let extension = file.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase());
    match extension.as_deref() {
        Some("png" | "jpg" | "jpeg") => TileKind::Image,
        _ => TileKind::Raster,
    }
}

impl FromStr for UrlTemplate {
    type Err = TileError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl fmt::Display for UrlTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.template)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation() {
        assert!(UrlTemplate::new("https://a.tile/{z}/{x}/{y}.png").is_ok());
        for bad in [
            "https://a.tile/{z}/{x}.png",
            "https://a.tile/{z}/{y}.png",
            "a.tile/{z}/{x}/{y}.png",
            "https://tile/{z}/{x}/{y}",
            "https://a.tile/{z}/{x}/{y} .png",
        ] {
            assert!(
                matches!(UrlTemplate::new(bad), Err(TileError::InvalidTemplate(_))),
                "{}",
                bad
            );
        }
    }

    #[test]
    fn test_kind_inference() {
        let kind = |s: &str| UrlTemplate::new(s).unwrap().kind();
        assert_eq!(kind("https://a.tile/{z}/{x}/{y}.png"), TileKind::Image);
        assert_eq!(kind("https://a.tile/{z}/{x}/{y}.JPG?key=1"), TileKind::Image);
        assert_eq!(kind("https://a.tile/{z}/{x}/{y}.bin"), TileKind::Raster);
        assert_eq!(kind("https://a.png.tile/{z}/{x}/{y}"), TileKind::Raster);
    }

    #[test]
    fn test_resolve() {
        let t: UrlTemplate = "https://a.tile/{z}/{x}/{y}.png".parse().unwrap();
        assert_eq!(t.resolve(&TileCoord::new(3, 1, 7)), "https://a.tile/3/1/7.png");
    }

    #[test]
    fn test_for_directory() {
        let t = UrlTemplate::for_directory("/data/tiles/", "bin").unwrap();
        assert_eq!(t.as_str(), "file:///data/tiles/{z}/{x}/{y}.bin");
        assert_eq!(t.kind(), TileKind::Raster);
    }
}
