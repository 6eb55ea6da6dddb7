use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::shared::constants::{
    AGE_MODEL_NAME, DEFAULT_BLUR_LEVEL, DEFAULT_CONFIDENCE, DETECTOR_MODEL_NAME,
    GENDER_MODEL_NAME, LABEL_FONT_NAME, PROGRESS_INTERVAL,
};
use crate::shared::model_resolver::{self, ModelResolveError};

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
    #[error("confidence must be between 0.0 and 1.0, got {0}")]
    InvalidConfidence(f64),
    #[error("progress interval must be at least 1")]
    InvalidProgressInterval,
}

/// Everything a pipeline run needs to know up front.
///
/// Built once per run and handed to constructors; nothing reads
/// configuration from globals. Every field has a default so a partial JSON
/// file is valid.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FaceCloakConfig {
    /// Root of the recursive model search. `None` means the platform default.
    pub models_dir: Option<PathBuf>,
    pub progress_interval: usize,
    pub detector: DetectorConfig,
    pub anonymizer: AnonymizerConfig,
    pub annotator: AnnotatorConfig,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    pub model_file: String,
    pub confidence: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnonymizerConfig {
    /// Requested blur intensity; any integer is accepted and sanitized.
    pub blur_level: i64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnotatorConfig {
    pub age_model_file: String,
    pub gender_model_file: String,
    /// Either a path to a TrueType font or a file name searched for under
    /// the models directory.
    pub font_file: String,
    pub hair_guess: bool,
}

impl Default for FaceCloakConfig {
    fn default() -> Self {
        Self {
            models_dir: None,
            progress_interval: PROGRESS_INTERVAL,
            detector: DetectorConfig::default(),
            anonymizer: AnonymizerConfig::default(),
            annotator: AnnotatorConfig::default(),
        }
    }
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            model_file: DETECTOR_MODEL_NAME.to_string(),
            confidence: DEFAULT_CONFIDENCE,
        }
    }
}

impl Default for AnonymizerConfig {
    fn default() -> Self {
        Self {
            blur_level: DEFAULT_BLUR_LEVEL,
        }
    }
}

impl Default for AnnotatorConfig {
    fn default() -> Self {
        Self {
            age_model_file: AGE_MODEL_NAME.to_string(),
            gender_model_file: GENDER_MODEL_NAME.to_string(),
            font_file: LABEL_FONT_NAME.to_string(),
            hair_guess: false,
        }
    }
}

impl FaceCloakConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&json).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.detector.confidence) {
            return Err(ConfigError::InvalidConfidence(self.detector.confidence));
        }
        if self.progress_interval == 0 {
            return Err(ConfigError::InvalidProgressInterval);
        }
        Ok(())
    }

    pub fn resolved_models_dir(&self) -> Result<PathBuf, ModelResolveError> {
        match &self.models_dir {
            Some(dir) => Ok(dir.clone()),
            None => model_resolver::default_models_dir(),
        }
    }
}
