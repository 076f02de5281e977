// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Batch recognition over a directory of photographs with a JSON report

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{info, warn};

use crate::vision::image_utils::is_supported_extension;
use crate::vision::plate::{BoundingBox, PlateOutcome, PlateRecognitionPipeline, PlateResult};

/// Default number of images processed at the same time
pub const DEFAULT_CONCURRENCY: usize = 4;

/// One line of the batch report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchRecord {
    pub file: String,
    pub bbox: Option<BoundingBox>,
    pub detection_confidence: f32,
    pub plate_text: String,
    pub ocr_confidence: f32,
    /// Missing when the file could not be processed at all
    pub outcome: Option<PlateOutcome>,
    pub error: Option<String>,
}

impl BatchRecord {
    pub fn from_result(file: impl Into<String>, result: &PlateResult) -> Self {
        Self {
            file: file.into(),
            bbox: result.bbox,
            detection_confidence: result.confidence,
            plate_text: result.text.clone(),
            ocr_confidence: result.ocr_confidence,
            outcome: Some(result.outcome),
            error: None,
        }
    }

    pub fn from_error(file: impl Into<String>, error: impl ToString) -> Self {
        Self {
            file: file.into(),
            bbox: None,
            detection_confidence: 0.0,
            plate_text: String::new(),
            ocr_confidence: 0.0,
            outcome: None,
            error: Some(error.to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub directory: String,
    pub generated_at: DateTime<Utc>,
    pub total: usize,
    pub recognized: usize,
    pub failed: usize,
    pub records: Vec<BatchRecord>,
}

impl BatchReport {
    fn new(directory: &Path, records: Vec<BatchRecord>) -> Self {
        let recognized = records
            .iter()
            .filter(|r| r.outcome == Some(PlateOutcome::Recognized))
            .count();
        let failed = records.iter().filter(|r| r.error.is_some()).count();

        Self {
            directory: directory.display().to_string(),
            generated_at: Utc::now(),
            total: records.len(),
            recognized,
            failed,
            records,
        }
    }

    /// Write the report as pretty-printed JSON
    pub async fn write_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self).context("Failed to serialize batch report")?;
        tokio::fs::write(path, json)
            .await
            .with_context(|| format!("Failed to write batch report to {}", path.display()))?;
        info!("Batch report written to {}", path.display());
        Ok(())
    }
}

/// `.jpg`, `.jpeg` and `.png` files directly inside `dir`, sorted by name
pub fn list_images<P: AsRef<Path>>(dir: P) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    let mut files = Vec::new();

    for entry in std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read directory {}", dir.display()))?
    {
        let path = entry?.path();
        if path.is_file() && is_supported_extension(&path) {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}

/// Recognize one file; failures become a record with `error` set
pub fn process_file(pipeline: &PlateRecognitionPipeline, path: &Path) -> BatchRecord {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    match pipeline.recognize_path(path) {
        Ok(result) => BatchRecord::from_result(name, &result),
        Err(e) => {
            warn!("Skipping {}: {}", path.display(), e);
            BatchRecord::from_error(name, e)
        }
    }
}

/// Run the pipeline over every image in `dir`.
///
/// Up to `concurrency` files are processed at once on the blocking pool,
/// all sharing the pipeline's loaded models. Records keep file-name order.
pub async fn process_directory<P: AsRef<Path>>(
    pipeline: &PlateRecognitionPipeline,
    dir: P,
    concurrency: usize,
) -> Result<BatchReport> {
    let dir = dir.as_ref();
    let files = list_images(dir)?;
    info!("Processing {} image(s) from {}", files.len(), dir.display());

    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut handles = Vec::with_capacity(files.len());

    for path in files {
        let permit = semaphore
            .clone()
            .acquire_owned()
            .await
            .context("Batch semaphore closed")?;
        let pipeline = pipeline.clone();

        handles.push(tokio::task::spawn_blocking(move || {
            let _permit = permit;
            process_file(&pipeline, &path)
        }));
    }

    let mut records = Vec::with_capacity(handles.len());
    for handle in handles {
        records.push(handle.await.context("Batch worker panicked")?);
    }

    let report = BatchReport::new(dir, records);
    info!(
        "Batch finished: {} recognized, {} failed, {} total",
        report.recognized, report.failed, report.total
    );
    Ok(report)
}
