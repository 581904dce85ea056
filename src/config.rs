use std::{collections::BTreeMap, fs, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::health::{GrowthStage, GrowthTable};

/// Tunable parameters for one analysis run. Every field has a default, so an
/// empty JSON object is a valid configuration file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Ground distance per pixel after resampling, in meters.
    pub target_gsd: f64,
    /// Maximum centroid distance (m) for two trees to share a proximity edge.
    pub buffer_distance: f64,
    /// Minimum distance (m) for a tree to count as well spaced.
    pub well_spacing_distance: f64,
    /// Number of highest elevation samples averaged into a tree height.
    pub top_height_samples: usize,
    /// Label of tree shapes in the per-image label files.
    pub tree_label: String,
    pub growth_table: GrowthTable,
    pub palette: Palette,
    pub line_classes: LineClasses,
    pub height_buckets: HeightBuckets,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            target_gsd: 0.02,
            buffer_distance: 3.0,
            well_spacing_distance: 1.0,
            top_height_samples: 10,
            tree_label: "0".to_string(),
            growth_table: GrowthTable::default(),
            palette: Palette::default(),
            line_classes: LineClasses::default(),
            height_buckets: HeightBuckets::default(),
        }
    }
}

impl AnalysisConfig {
    /// Read a configuration from a JSON file and validate it.
    pub fn from_path(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("[config::from_path] Failed to read {}", path.display()))?;
        let config: Self = serde_json::from_str(&text)
            .with_context(|| format!("[config::from_path] Failed to parse {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject parameter combinations that would make scoring or spacing meaningless.
    pub fn validate(&self) -> crate::Result<()> {
        use crate::Error;

        if !(self.target_gsd.is_finite() && self.target_gsd > 0.0) {
            return Err(Error::config(format!("target_gsd must be positive, got {}", self.target_gsd)));
        }
        if !(self.buffer_distance.is_finite() && self.buffer_distance > 0.0) {
            return Err(Error::config(format!("buffer_distance must be positive, got {}", self.buffer_distance)));
        }
        if !(self.well_spacing_distance.is_finite() && self.well_spacing_distance > 0.0) {
            return Err(Error::config(format!(
                "well_spacing_distance must be positive, got {}", self.well_spacing_distance
            )));
        }
        if self.top_height_samples == 0 {
            return Err(Error::config("top_height_samples must be at least 1"));
        }
        if self.line_classes.close > self.line_classes.near {
            return Err(Error::config("line_classes.close must not exceed line_classes.near"));
        }
        if self.height_buckets.short > self.height_buckets.tall {
            return Err(Error::config("height_buckets.short must not exceed height_buckets.tall"));
        }
        GrowthTable::new(self.growth_table.stages().to_vec()).map(|_| ())
    }

    /// Growth table stages as configured.
    #[inline] pub fn stages(&self) -> &[GrowthStage] { self.growth_table.stages() }
}

/// Colours used by downstream renderers, keyed by class label.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Palette {
    pub health: BTreeMap<u8, String>,
    pub lines: BTreeMap<u8, String>,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            health: BTreeMap::from([
                (0, "#E3412B".to_string()),
                (1, "#FBAA35".to_string()),
                (2, "#30C876".to_string()),
                (3, "#1E8C4D".to_string()),
            ]),
            lines: BTreeMap::from([
                (0, "#3EBCA1".to_string()),
                (1, "#D9D9D9".to_string()),
                (2, "#FD3E3E".to_string()),
            ]),
        }
    }
}

impl Palette {
    /// Fill colour for a health class, if one is configured.
    #[inline] pub fn health_color(&self, class: u8) -> Option<&str> { self.health.get(&class).map(String::as_str) }

    /// Stroke colour for a connection-line class, if one is configured.
    #[inline] pub fn line_color(&self, class: u8) -> Option<&str> { self.lines.get(&class).map(String::as_str) }
}

/// Distance thresholds (m) that classify connection lines between neighbouring trees.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LineClasses {
    /// Below this distance a pair is class 2 (too close).
    pub close: f64,
    /// At or below this distance a pair is class 1; beyond it class 0.
    pub near: f64,
}

impl Default for LineClasses {
    fn default() -> Self { Self { close: 1.0, near: 2.0 } }
}

impl LineClasses {
    /// Classify a centroid distance.
    pub fn classify(&self, distance: f64) -> u8 {
        if distance < self.close { 2 }
        else if distance <= self.near { 1 }
        else { 0 }
    }
}

/// Height thresholds (m) used for the per-image height histogram.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct HeightBuckets {
    pub short: f64,
    pub tall: f64,
}

impl Default for HeightBuckets {
    fn default() -> Self { Self { short: 1.5, tall: 2.5 } }
}

impl HeightBuckets {
    /// Count heights below `short`, in `[short, tall)`, and at or above `tall`.
    pub fn count(&self, heights: impl IntoIterator<Item = f64>) -> [usize; 3] {
        heights.into_iter().fold([0; 3], |mut acc, h| {
            if h < self.short { acc[0] += 1 }
            else if h < self.tall { acc[1] += 1 }
            else { acc[2] += 1 }
            acc
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = AnalysisConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.stages().len(), 5);
    }

    #[test]
    fn empty_json_object_yields_defaults() {
        let config: AnalysisConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.target_gsd, 0.02);
        assert_eq!(config.buffer_distance, 3.0);
        assert_eq!(config.well_spacing_distance, 1.0);
        assert_eq!(config.top_height_samples, 10);
        assert_eq!(config.tree_label, "0");
    }

    #[test]
    fn partial_json_overrides_only_given_fields() {
        let config: AnalysisConfig = serde_json::from_str(r#"{"well_spacing_distance": 1.5}"#).unwrap();
        assert_eq!(config.well_spacing_distance, 1.5);
        assert_eq!(config.buffer_distance, 3.0);
    }

    #[test]
    fn non_monotonic_growth_table_is_rejected_on_parse() {
        let json = r#"{"growth_table": [
            {"age": 5, "height": 8, "canopy_area": 3},
            {"age": 10, "height": 3, "canopy_area": 12}
        ]}"#;
        assert!(serde_json::from_str::<AnalysisConfig>(json).is_err());
    }

    #[test]
    fn validate_rejects_non_positive_gsd() {
        let config = AnalysisConfig { target_gsd: 0.0, ..Default::default() };
        assert!(matches!(config.validate(), Err(crate::Error::Configuration(_))));
    }

    #[test]
    fn validate_rejects_inverted_line_classes() {
        let config = AnalysisConfig {
            line_classes: LineClasses { close: 3.0, near: 2.0 },
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn line_classes_follow_thresholds() {
        let lines = LineClasses::default();
        assert_eq!(lines.classify(0.5), 2);
        assert_eq!(lines.classify(1.0), 1);
        assert_eq!(lines.classify(2.0), 1);
        assert_eq!(lines.classify(2.5), 0);
    }

    #[test]
    fn height_buckets_are_half_open() {
        let buckets = HeightBuckets::default();
        assert_eq!(buckets.count([1.0, 1.5, 2.4, 2.5, 3.0]), [1, 2, 2]);
    }

    #[test]
    fn palette_lookups() {
        let palette = Palette::default();
        assert_eq!(palette.health_color(3), Some("#1E8C4D"));
        assert_eq!(palette.line_color(2), Some("#FD3E3E"));
        assert_eq!(palette.health_color(9), None);
    }
}
