use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use puzzlecut_core::DEFAULT_MAX_PIECE_COUNT;

pub const TAB_DEPTH_CAP_MAX: f64 = 0.30;
pub const MIN_PIECE_AREA_RATIO_DEFAULT: f64 = 0.10;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("config parse failed: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShapeSettings {
    pub tab_width: f64,
    pub tab_depth: f64,
    pub tab_size_scale: f64,
    pub tab_size_min: f64,
    pub tab_size_max: f64,
    pub jitter_strength: f64,
    pub jitter_len_bias: f64,
    pub skew_range: f64,
    pub variation: f64,
}

impl Default for ShapeSettings {
    fn default() -> Self {
        Self {
            tab_width: 0.43,
            tab_depth: 0.98,
            tab_size_scale: 0.25,
            tab_size_min: 0.04,
            tab_size_max: 0.14,
            jitter_strength: 0.13,
            jitter_len_bias: 0.4,
            skew_range: 0.18,
            variation: 0.16,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub max_piece_count: u32,
    /// Deepest tab protrusion as a fraction of the smaller cell side.
    pub tab_depth_cap: f64,
    /// Smallest clipped piece, as a fraction of one cell's area.
    pub min_piece_area_ratio: f64,
    /// Fold undersized rim pieces into their largest neighbour. When off,
    /// any undersized piece rejects the layout.
    pub merge_slivers: bool,
    pub flatten_steps: usize,
    pub circle_segments: usize,
    pub stroke_width_mm: f64,
    pub precision: usize,
    pub parallel: bool,
    pub shape: ShapeSettings,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            max_piece_count: DEFAULT_MAX_PIECE_COUNT,
            tab_depth_cap: 0.25,
            min_piece_area_ratio: MIN_PIECE_AREA_RATIO_DEFAULT,
            merge_slivers: true,
            flatten_steps: 16,
            circle_segments: 256,
            stroke_width_mm: 0.1,
            precision: 3,
            parallel: true,
            shape: ShapeSettings::default(),
        }
    }
}

impl GeneratorConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: GeneratorConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_piece_count == 0 {
            return Err(ConfigError::Invalid("max_piece_count must be positive".into()));
        }
        if !(self.tab_depth_cap > 0.0 && self.tab_depth_cap <= TAB_DEPTH_CAP_MAX) {
            return Err(ConfigError::Invalid(format!(
                "tab_depth_cap must be in (0, {TAB_DEPTH_CAP_MAX}], got {}",
                self.tab_depth_cap
            )));
        }
        if !(self.min_piece_area_ratio >= 0.0 && self.min_piece_area_ratio < 1.0) {
            return Err(ConfigError::Invalid(format!(
                "min_piece_area_ratio must be in [0, 1), got {}",
                self.min_piece_area_ratio
            )));
        }
        if self.flatten_steps == 0 {
            return Err(ConfigError::Invalid("flatten_steps must be positive".into()));
        }
        if self.circle_segments < 16 {
            return Err(ConfigError::Invalid(format!(
                "circle_segments must be at least 16, got {}",
                self.circle_segments
            )));
        }
        if !(self.stroke_width_mm > 0.0 && self.stroke_width_mm.is_finite()) {
            return Err(ConfigError::Invalid("stroke_width_mm must be positive".into()));
        }
        if self.precision > 6 {
            return Err(ConfigError::Invalid(format!(
                "precision must be at most 6, got {}",
                self.precision
            )));
        }
        let shape = &self.shape;
        if shape.tab_size_min > shape.tab_size_max {
            return Err(ConfigError::Invalid(
                "shape.tab_size_min exceeds shape.tab_size_max".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let config = GeneratorConfig::from_toml_str("").expect("config");
        assert_eq!(config, GeneratorConfig::default());
    }

    #[test]
    fn partial_override_keeps_other_defaults() {
        let config = GeneratorConfig::from_toml_str(
            "min_piece_area_ratio = 0.2\n[shape]\nvariation = 0.5\n",
        )
        .expect("config");
        assert_eq!(config.min_piece_area_ratio, 0.2);
        assert_eq!(config.shape.variation, 0.5);
        assert_eq!(config.shape.tab_width, ShapeSettings::default().tab_width);
        assert_eq!(config.flatten_steps, 16);
    }

    #[test]
    fn slivers_merge_unless_disabled() {
        assert!(GeneratorConfig::default().merge_slivers);
        let strict = GeneratorConfig::from_toml_str("merge_slivers = false").expect("config");
        assert!(!strict.merge_slivers);
    }

    #[test]
    fn rejects_deep_tabs() {
        let err = GeneratorConfig::from_toml_str("tab_depth_cap = 0.45").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)), "{err}");
    }

    #[test]
    fn rejects_unknown_types() {
        assert!(matches!(
            GeneratorConfig::from_toml_str("parallel = \"yes\""),
            Err(ConfigError::Parse(_))
        ));
    }
}
