// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Plate reader configuration
//!
//! Sources, lowest precedence first:
//! 1. built-in defaults
//! 2. optional TOML file
//! 3. `.env` file (loaded into the process environment)
//! 4. `PLATE_*` environment variables
//! 5. command-line flags (applied by the CLI)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

use crate::vision::plate::{DetectorConfig, PipelineSettings};

pub const ENV_DETECTOR_MODEL: &str = "PLATE_DETECTOR_MODEL";
pub const ENV_CONFIDENCE_THRESHOLD: &str = "PLATE_CONFIDENCE_THRESHOLD";
pub const ENV_IOU_THRESHOLD: &str = "PLATE_IOU_THRESHOLD";
pub const ENV_OCR_MODEL: &str = "PLATE_OCR_MODEL";
pub const ENV_OCR_DICT: &str = "PLATE_OCR_DICT";
pub const ENV_MODEL_REPO: &str = "PLATE_MODEL_REPO";
pub const ENV_MODEL_FILE: &str = "PLATE_MODEL_FILE";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("{name} must be within [0, 1], got {value}")]
    ThresholdOutOfRange { name: &'static str, value: f32 },

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("{0} must not be empty")]
    EmptyPath(&'static str),
}

/// Where to fetch a model artifact from when the configured file is missing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BootstrapSource {
    /// Hugging Face repository id
    pub repo_id: String,
    /// File inside the repository
    pub filename: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<String>,
}

impl BootstrapSource {
    pub fn new(repo_id: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            repo_id: repo_id.into(),
            filename: filename.into(),
            revision: None,
        }
    }
}

/// Bootstrap sources per artifact; `None` means the file must already exist
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BootstrapConfig {
    pub detector: Option<BootstrapSource>,
    pub recognizer: Option<BootstrapSource>,
    pub dictionary: Option<BootstrapSource>,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            // generic pretrained YOLOv8n export, replaced by a plate-trained
            // model through the config file or PLATE_MODEL_REPO/PLATE_MODEL_FILE
            detector: Some(BootstrapSource::new("Ultralytics/YOLOv8", "yolov8n.onnx")),
            recognizer: None,
            dictionary: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlateConfig {
    pub detector_model_path: PathBuf,
    pub confidence_threshold: f32,
    pub iou_threshold: f32,
    pub detector_input_size: u32,
    pub recognizer_model_path: PathBuf,
    pub recognizer_dict_path: PathBuf,
    pub bootstrap: BootstrapConfig,
    /// Pixels added around the selected box before cropping
    pub padding: u32,
    pub min_fragment_confidence: f32,
    pub min_plate_length: usize,
    pub min_enhanced_width: u32,
    /// ONNX Runtime intra-op threads per session
    pub intra_threads: usize,
}

impl Default for PlateConfig {
    fn default() -> Self {
        Self {
            detector_model_path: PathBuf::from("./models/license_plate_detection.onnx"),
            confidence_threshold: 0.5,
            iou_threshold: 0.5,
            detector_input_size: 640,
            recognizer_model_path: PathBuf::from("./models/plate-ocr/rec_model.onnx"),
            recognizer_dict_path: PathBuf::from("./models/plate-ocr/dict.txt"),
            bootstrap: BootstrapConfig::default(),
            padding: 5,
            min_fragment_confidence: 0.3,
            min_plate_length: 4,
            min_enhanced_width: 100,
            intra_threads: 4,
        }
    }
}

impl PlateConfig {
    /// Parse a TOML file; keys that are absent keep their defaults
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Defaults, then the optional file, then `.env` and `PLATE_*` variables
    pub fn load(config_file: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match config_file {
            Some(path) => {
                debug!("Loading config from {}", path.display());
                Self::from_file(path)?
            }
            None => Self::default(),
        };

        dotenv::dotenv().ok();
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Override fields from the process environment
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Override fields from an arbitrary variable lookup
    pub fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup(ENV_DETECTOR_MODEL) {
            self.detector_model_path = PathBuf::from(path);
        }
        if let Some(value) = parse_var(&lookup, ENV_CONFIDENCE_THRESHOLD) {
            self.confidence_threshold = value;
        }
        if let Some(value) = parse_var(&lookup, ENV_IOU_THRESHOLD) {
            self.iou_threshold = value;
        }
        if let Some(path) = lookup(ENV_OCR_MODEL) {
            self.recognizer_model_path = PathBuf::from(path);
        }
        if let Some(path) = lookup(ENV_OCR_DICT) {
            self.recognizer_dict_path = PathBuf::from(path);
        }

        match (lookup(ENV_MODEL_REPO), lookup(ENV_MODEL_FILE)) {
            (Some(repo_id), Some(filename)) => {
                self.bootstrap.detector = Some(BootstrapSource::new(repo_id, filename));
            }
            (Some(repo_id), None) => {
                let filename = self
                    .bootstrap
                    .detector
                    .as_ref()
                    .map(|s| s.filename.clone())
                    .unwrap_or_else(|| "model.onnx".to_string());
                self.bootstrap.detector = Some(BootstrapSource::new(repo_id, filename));
            }
            (None, Some(filename)) => match self.bootstrap.detector.as_mut() {
                Some(source) => source.filename = filename,
                None => warn!("{} set without {}, ignoring", ENV_MODEL_FILE, ENV_MODEL_REPO),
            },
            (None, None) => {}
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check_unit("confidence_threshold", self.confidence_threshold)?;
        check_unit("iou_threshold", self.iou_threshold)?;
        check_unit("min_fragment_confidence", self.min_fragment_confidence)?;

        if self.detector_input_size == 0 {
            return Err(ConfigError::Zero("detector_input_size"));
        }
        if self.intra_threads == 0 {
            return Err(ConfigError::Zero("intra_threads"));
        }
        if self.detector_model_path.as_os_str().is_empty() {
            return Err(ConfigError::EmptyPath("detector_model_path"));
        }
        if self.recognizer_model_path.as_os_str().is_empty() {
            return Err(ConfigError::EmptyPath("recognizer_model_path"));
        }
        if self.recognizer_dict_path.as_os_str().is_empty() {
            return Err(ConfigError::EmptyPath("recognizer_dict_path"));
        }
        Ok(())
    }

    pub fn detector_config(&self) -> DetectorConfig {
        DetectorConfig {
            confidence_threshold: self.confidence_threshold,
            iou_threshold: self.iou_threshold,
            input_size: self.detector_input_size,
            intra_threads: self.intra_threads,
        }
    }

    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            confidence_threshold: self.confidence_threshold,
            padding: self.padding,
            min_fragment_confidence: self.min_fragment_confidence,
            min_plate_length: self.min_plate_length,
            min_enhanced_width: self.min_enhanced_width,
        }
    }
}

fn parse_var<F>(lookup: &F, key: &str) -> Option<f32>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().parse::<f32>() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("Ignoring {}={:?}: not a number", key, raw);
            None
        }
    }
}

fn check_unit(name: &'static str, value: f32) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::ThresholdOutOfRange { name, value })
    }
}
