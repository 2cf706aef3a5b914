//! Viewer options file loaded by the CLI

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::types::Rgb;
use crate::view::Orientation;
use crate::viewer::{DEFAULT_RENDER_QUALITY, MAX_RENDER_QUALITY, MIN_RENDER_QUALITY};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewerOptions {
    /// Render quality in percent; clamped to the supported range on use
    #[serde(default = "default_quality")]
    pub render_quality: u16,

    /// Background fill as `RRGGBB` hex
    #[serde(default = "default_background")]
    pub background: String,

    #[serde(default)]
    pub orientation: Orientation,

    #[serde(default)]
    pub snap_enabled: bool,
}

fn default_quality() -> u16 {
    DEFAULT_RENDER_QUALITY
}

fn default_background() -> String {
    "ffffff".to_string()
}

impl Default for ViewerOptions {
    fn default() -> Self {
        Self {
            render_quality: default_quality(),
            background: default_background(),
            orientation: Orientation::default(),
            snap_enabled: false,
        }
    }
}

impl ViewerOptions {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read options file {path:?}"))?;
        let options = toml::from_str(&raw)
            .with_context(|| format!("Failed to parse options file {path:?}"))?;
        Ok(options)
    }

    #[must_use]
    pub fn clamped_quality(&self) -> u16 {
        self.render_quality
            .clamp(MIN_RENDER_QUALITY, MAX_RENDER_QUALITY)
    }

    /// Parsed background color, falling back to white on bad hex
    #[must_use]
    pub fn background_rgb(&self) -> Rgb {
        Rgb::from_hex(&self.background).unwrap_or(Rgb::WHITE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let options: ViewerOptions = toml::from_str("").unwrap();
        assert_eq!(options.render_quality, 100);
        assert_eq!(options.orientation, Orientation::Vertical);
        assert!(!options.snap_enabled);
        assert_eq!(options.background_rgb(), Rgb::WHITE);
    }

    #[test]
    fn full_file_parses() {
        let options: ViewerOptions = toml::from_str(
            r#"
            render_quality = 200
            background = "102030"
            orientation = "horizontal"
            snap_enabled = true
            "#,
        )
        .unwrap();

        assert_eq!(options.render_quality, 200);
        assert_eq!(options.orientation, Orientation::Horizontal);
        assert!(options.snap_enabled);
        assert_eq!(options.background_rgb(), Rgb::new(0x10, 0x20, 0x30));
    }

    #[test]
    fn out_of_range_quality_is_clamped_on_use() {
        let options: ViewerOptions = toml::from_str("render_quality = 9000").unwrap();
        assert_eq!(options.clamped_quality(), MAX_RENDER_QUALITY);
    }

    #[test]
    fn bad_background_hex_falls_back_to_white() {
        let options: ViewerOptions = toml::from_str(r#"background = "nope""#).unwrap();
        assert_eq!(options.background_rgb(), Rgb::WHITE);
    }
}
