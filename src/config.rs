use std::fs;
use std::path::Path;

/// Zoom and pan limits applied by [`crate::ViewportController`].
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ViewportConfig {
    /// Smallest viewport size as a fraction of the full extent.
    pub min_zoom_fraction: f64,
    /// How far the viewport may overshoot an edge, as a fraction of its own size.
    pub edge_allowance: f64,
    /// Zoom factor applied by a double tap on an unzoomed map.
    pub double_tap_zoom: f64,
    /// A double tap resets once the viewport is narrower than this fraction.
    pub reset_threshold: f64,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            min_zoom_fraction: 0.15,
            edge_allowance: 0.1,
            double_tap_zoom: 0.4,
            reset_threshold: 0.5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct GestureConfig {
    /// Movement in surface pixels below which a touch still counts as a tap.
    pub tap_slop_px: f64,
    /// Maximum delay between two taps of a double tap.
    pub double_tap_ms: f64,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            tap_slop_px: 8.0,
            double_tap_ms: 300.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct QuizTuning {
    pub distractor_count: usize,
    /// Duration of the transient correct/wrong highlight.
    pub feedback_ms: u32,
    /// Best score (percent) at which a scope counts as mastered.
    pub mastery_threshold: u32,
}

impl Default for QuizTuning {
    fn default() -> Self {
        Self {
            distractor_count: 3,
            feedback_ms: 600,
            mastery_threshold: 80,
        }
    }
}

/// Locations of the on-demand boundary files.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub base_url: String,
    pub geojson_dir: String,
    pub oaza_dir: String,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            base_url: "/data".to_string(),
            geojson_dir: "geojson".to_string(),
            oaza_dir: "oaza".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub viewport: ViewportConfig,
    pub gesture: GestureConfig,
    pub quiz: QuizTuning,
    pub data: DataConfig,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file at {path}: {source}")]
    ReadError {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    ParseError(#[from] serde_json::Error),
}

impl EngineConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let data = fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
            path: path.display().to_string(),
            source,
        })?;

        Self::from_json(&data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config = EngineConfig::from_json("{}").expect("empty config should parse");
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.viewport.min_zoom_fraction, 0.15);
        assert_eq!(config.quiz.mastery_threshold, 80);
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let config = EngineConfig::from_json(
            r#"{ "gesture": { "tap_slop_px": 12.0 }, "data": { "base_url": "https://cdn.example/data" }, "unknown": 1 }"#,
        )
        .expect("partial config should parse");

        assert_eq!(config.gesture.tap_slop_px, 12.0);
        assert_eq!(config.gesture.double_tap_ms, 300.0);
        assert_eq!(config.data.base_url, "https://cdn.example/data");
        assert_eq!(config.data.oaza_dir, "oaza");
    }

    #[test]
    fn loads_from_file() {
        let dir = tempfile::tempdir().expect("temporary directory should be created");
        let path = dir.path().join("engine.json");
        fs::write(&path, r#"{ "quiz": { "feedback_ms": 900 } }"#).expect("config should be written");

        let config = EngineConfig::from_path(&path).expect("config file should load");
        assert_eq!(config.quiz.feedback_ms, 900);
        assert_eq!(config.quiz.distractor_count, 3);
    }

    #[test]
    fn reports_missing_file() {
        let error = EngineConfig::from_path("/nonexistent/engine.json").expect_err("missing file");
        assert!(matches!(error, ConfigError::ReadError { .. }));
    }
}
