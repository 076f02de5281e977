// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Plate model manager: bootstraps artifacts and loads the engines once

use anyhow::Context;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::{BootstrapSource, PlateConfig};
use crate::vision::plate::{
    OnnxPlateDetector, OnnxTextRecognizer, PlateError, PlateRecognitionPipeline,
};

/// Information about a loaded model
#[derive(Debug, Clone, Serialize)]
pub struct PlateModelInfo {
    /// Model name
    pub name: String,
    /// Model type (detection, recognition)
    pub model_type: String,
    pub path: PathBuf,
    /// Whether the model file is still present on disk
    pub available: bool,
}

impl PlateModelInfo {
    pub fn new(name: &str, model_type: &str, path: &Path) -> Self {
        Self {
            name: name.to_string(),
            model_type: model_type.to_string(),
            path: path.to_path_buf(),
            available: path.is_file(),
        }
    }
}

/// Owns the detector and recognizer for the lifetime of the process.
///
/// Models are loaded once in [`PlateModelManager::new`]; every pipeline
/// handed out afterwards shares them.
pub struct PlateModelManager {
    detector: Arc<OnnxPlateDetector>,
    recognizer: Arc<OnnxTextRecognizer>,
    pipeline: PlateRecognitionPipeline,
}

impl PlateModelManager {
    /// Bootstrap any missing artifacts and load both engines
    ///
    /// # Errors
    /// `PlateError::ModelUnavailable` when an artifact is missing and cannot
    /// be fetched, or an engine fails to initialize.
    pub async fn new(config: &PlateConfig) -> Result<Self, PlateError> {
        let paths = fetch_models(config).await?;

        let detector = OnnxPlateDetector::new(&paths.detector, config.detector_config()).await?;
        let recognizer =
            OnnxTextRecognizer::new(&paths.recognizer, &paths.dictionary, config.intra_threads)
                .await?;

        let detector = Arc::new(detector);
        let recognizer = Arc::new(recognizer);
        let pipeline = PlateRecognitionPipeline::with_settings(
            detector.clone(),
            recognizer.clone(),
            config.pipeline_settings(),
        );

        info!("✅ Plate models ready");

        Ok(Self {
            detector,
            recognizer,
            pipeline,
        })
    }

    /// A pipeline sharing the loaded models
    pub fn pipeline(&self) -> PlateRecognitionPipeline {
        self.pipeline.clone()
    }

    /// List the managed models
    pub fn list_models(&self) -> Vec<PlateModelInfo> {
        vec![
            PlateModelInfo::new("plate-detector", "detection", self.detector.model_path()),
            PlateModelInfo::new("plate-recognizer", "recognition", self.recognizer.model_path()),
        ]
    }
}

/// Local paths of every artifact the engines need
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelPaths {
    pub detector: PathBuf,
    pub recognizer: PathBuf,
    pub dictionary: PathBuf,
}

/// Make sure every configured artifact exists locally, downloading as needed
pub async fn fetch_models(config: &PlateConfig) -> Result<ModelPaths, PlateError> {
    Ok(ModelPaths {
        detector: ensure_artifact(
            &config.detector_model_path,
            config.bootstrap.detector.as_ref(),
        )
        .await?,
        recognizer: ensure_artifact(
            &config.recognizer_model_path,
            config.bootstrap.recognizer.as_ref(),
        )
        .await?,
        dictionary: ensure_artifact(
            &config.recognizer_dict_path,
            config.bootstrap.dictionary.as_ref(),
        )
        .await?,
    })
}

/// Return `path` if it exists, otherwise fetch it from `source` and persist
/// it at `path` so later runs skip the download.
pub async fn ensure_artifact(
    path: &Path,
    source: Option<&BootstrapSource>,
) -> Result<PathBuf, PlateError> {
    if path.exists() {
        return Ok(path.to_path_buf());
    }

    let Some(source) = source else {
        return Err(PlateError::ModelUnavailable(format!(
            "{} not found and no download source configured",
            path.display()
        )));
    };

    warn!(
        "{} not found, downloading {} from {}",
        path.display(),
        source.filename,
        source.repo_id
    );

    let downloaded = download_from_hub(source)
        .await
        .map_err(|e| PlateError::ModelUnavailable(format!("{:#}", e)))?;

    persist_artifact(&downloaded, path)
        .await
        .map_err(|e| PlateError::ModelUnavailable(format!("{:#}", e)))?;

    info!("Saved {} to {}", source.filename, path.display());
    Ok(path.to_path_buf())
}

async fn download_from_hub(source: &BootstrapSource) -> anyhow::Result<PathBuf> {
    let api = hf_hub::api::tokio::Api::new().context("Failed to create Hugging Face API client")?;

    let repo = match &source.revision {
        Some(revision) => hf_hub::Repo::with_revision(
            source.repo_id.clone(),
            hf_hub::RepoType::Model,
            revision.clone(),
        ),
        None => hf_hub::Repo::model(source.repo_id.clone()),
    };

    api.repo(repo)
        .get(&source.filename)
        .await
        .with_context(|| format!("Failed to download {} from {}", source.filename, source.repo_id))
}

/// Copy a cached file to its configured location, creating parent dirs
async fn persist_artifact(from: &Path, to: &Path) -> anyhow::Result<()> {
    if let Some(parent) = to.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    tokio::fs::copy(from, to)
        .await
        .with_context(|| format!("Failed to copy {} to {}", from.display(), to.display()))?;
    Ok(())
}
