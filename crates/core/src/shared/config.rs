use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::shared::constants::{
    APP_DIR_NAME, CLASSIFIER_MODEL_NAME, DEFAULT_MIN_DETECTION_CONFIDENCE,
    DEFAULT_MIN_TRACKING_CONFIDENCE, LANDMARK_MODEL_NAME, PALM_MODEL_NAME,
};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("{field} must be between 0.0 and 1.0, got {value}")]
    OutOfRange { field: &'static str, value: f32 },
    #[error("model name for {0} must not be empty")]
    EmptyModelName(&'static str),
}

/// Where to find one model file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSource {
    /// File name looked up in the cache and bundled directories.
    pub name: String,
    /// Explicit location; bypasses the lookup when set.
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Download location used when no local copy exists.
    #[serde(default)]
    pub url: Option<String>,
}

impl ModelSource {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            path: None,
            url: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognizerConfig {
    pub classifier_model: ModelSource,
    pub landmark_model: ModelSource,
    /// Palm detector that finds new hands. `null` searches the letterboxed
    /// frame with the landmark model alone.
    pub palm_model: Option<ModelSource>,
    pub bundled_model_dir: Option<PathBuf>,
    pub static_image_mode: bool,
    pub min_detection_confidence: f32,
    pub min_tracking_confidence: f32,
}

impl Default for RecognizerConfig {
    fn default() -> Self {
        Self {
            classifier_model: ModelSource::named(CLASSIFIER_MODEL_NAME),
            landmark_model: ModelSource::named(LANDMARK_MODEL_NAME),
            palm_model: Some(ModelSource::named(PALM_MODEL_NAME)),
            bundled_model_dir: None,
            static_image_mode: false,
            min_detection_confidence: DEFAULT_MIN_DETECTION_CONFIDENCE,
            min_tracking_confidence: DEFAULT_MIN_TRACKING_CONFIDENCE,
        }
    }
}

impl RecognizerConfig {
    /// Default location: `<config dir>/gesturecam/config.json`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(APP_DIR_NAME).join("config.json"))
    }

    /// Parse and validate a JSON config file. Missing fields keep defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: Self = serde_json::from_str(&json).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` if given, else from the default location if a file
    /// exists there, else defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = path {
            return Self::load(path);
        }
        match Self::default_path() {
            Some(default) if default.exists() => {
                log::debug!("Loading config from {}", default.display());
                Self::load(&default)
            }
            _ => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check_unit("min_detection_confidence", self.min_detection_confidence)?;
        check_unit("min_tracking_confidence", self.min_tracking_confidence)?;
        if self.classifier_model.name.trim().is_empty() {
            return Err(ConfigError::EmptyModelName("classifier_model"));
        }
        if self.landmark_model.name.trim().is_empty() {
            return Err(ConfigError::EmptyModelName("landmark_model"));
        }
        if let Some(palm) = &self.palm_model {
            if palm.name.trim().is_empty() {
                return Err(ConfigError::EmptyModelName("palm_model"));
            }
        }
        Ok(())
    }
}

fn check_unit(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange { field, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_match_detector_settings() {
        let config = RecognizerConfig::default();
        assert_eq!(config.min_detection_confidence, 0.7);
        assert!(!config.static_image_mode);
        assert_eq!(config.classifier_model.name, CLASSIFIER_MODEL_NAME);
        assert_eq!(config.landmark_model.name, LANDMARK_MODEL_NAME);
        assert_eq!(
            config.palm_model.clone().map(|m| m.name),
            Some(PALM_MODEL_NAME.to_string())
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_partial_file_keeps_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.json");
        fs::write(&path, r#"{ "static_image_mode": true }"#).unwrap();

        let config = RecognizerConfig::load(&path).unwrap();
        assert!(config.static_image_mode);
        assert_eq!(config.min_detection_confidence, 0.7);
        assert_eq!(config.landmark_model.name, LANDMARK_MODEL_NAME);
    }

    #[test]
    fn test_load_model_source_fields() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.json");
        fs::write(
            &path,
            r#"{ "classifier_model": { "name": "custom.onnx", "path": "/models/custom.onnx" } }"#,
        )
        .unwrap();

        let config = RecognizerConfig::load(&path).unwrap();
        assert_eq!(config.classifier_model.name, "custom.onnx");
        assert_eq!(
            config.classifier_model.path,
            Some(PathBuf::from("/models/custom.onnx"))
        );
        assert!(config.classifier_model.url.is_none());
    }

    #[test]
    fn test_load_missing_file_is_read_error() {
        let result = RecognizerConfig::load(Path::new("/nonexistent/config.json"));
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }

    #[test]
    fn test_load_malformed_json_is_parse_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();
        let result = RecognizerConfig::load(&path);
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }

    #[rstest]
    #[case(-0.1)]
    #[case(1.5)]
    fn test_validate_rejects_out_of_range_detection(#[case] value: f32) {
        let config = RecognizerConfig {
            min_detection_confidence: value,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::OutOfRange {
                field: "min_detection_confidence",
                ..
            })
        ));
    }

    #[test]
    fn test_validate_rejects_empty_model_name() {
        let config = RecognizerConfig {
            landmark_model: ModelSource::named("  "),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::EmptyModelName("landmark_model"))
        ));
    }

    #[test]
    fn test_null_palm_model_disables_palm_detection() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.json");
        fs::write(&path, r#"{ "palm_model": null }"#).unwrap();
        let config = RecognizerConfig::load(&path).unwrap();
        assert!(config.palm_model.is_none());
    }

    #[test]
    fn test_validate_rejects_empty_palm_model_name() {
        let config = RecognizerConfig {
            palm_model: Some(ModelSource::named("")),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::EmptyModelName("palm_model"))
        ));
    }

    #[test]
    fn test_load_or_default_with_explicit_path() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.json");
        fs::write(&path, r#"{ "min_tracking_confidence": 0.9 }"#).unwrap();
        let config = RecognizerConfig::load_or_default(Some(&path)).unwrap();
        assert_eq!(config.min_tracking_confidence, 0.9);
    }
}
