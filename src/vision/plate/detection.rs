// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! License plate detection
//!
//! [`PlateDetector`] is the seam the pipeline talks to. [`OnnxPlateDetector`]
//! runs a single-class YOLOv8 export through ONNX Runtime on CPU.

use anyhow::Context;
use image::DynamicImage;
use ndarray::{ArrayViewD, Axis, Ix2};
use ort::execution_providers::CPUExecutionProvider;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

use super::error::DetectionError;
use super::preprocessing::{preprocess_for_detection, LetterboxInfo, DETECTOR_INPUT_SIZE};
use super::types::{BoundingBox, Detection};

/// Finds candidate plate regions in a photograph.
///
/// Implementations must be safe to share between concurrent pipeline runs.
#[cfg_attr(test, mockall::automock)]
pub trait PlateDetector: Send + Sync {
    /// Return every candidate box with its score, in original image pixels
    fn detect(&self, image: &DynamicImage) -> Result<Vec<Detection>, DetectionError>;
}

/// Tunables for [`OnnxPlateDetector`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectorConfig {
    /// Minimum class score kept from the raw model output
    pub confidence_threshold: f32,
    /// Overlap above which the weaker of two boxes is suppressed
    pub iou_threshold: f32,
    /// Square model input side
    pub input_size: u32,
    /// ONNX Runtime intra-op threads
    pub intra_threads: usize,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.5,
            iou_threshold: 0.5,
            input_size: DETECTOR_INPUT_SIZE,
            intra_threads: 4,
        }
    }
}

/// YOLOv8 plate detector backed by ONNX Runtime (CPU only)
#[derive(Clone)]
pub struct OnnxPlateDetector {
    /// ONNX Runtime session (thread-safe)
    session: Arc<Mutex<Session>>,
    input_name: String,
    config: DetectorConfig,
    model_path: PathBuf,
}

impl std::fmt::Debug for OnnxPlateDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxPlateDetector")
            .field("input_name", &self.input_name)
            .field("config", &self.config)
            .field("model_path", &self.model_path)
            .finish_non_exhaustive()
    }
}

impl OnnxPlateDetector {
    /// Load the detector from an ONNX file
    ///
    /// # Errors
    /// `DetectionError::ModelUnavailable` if the file is missing or ONNX
    /// Runtime cannot build a session from it.
    pub async fn new<P: AsRef<Path>>(
        model_path: P,
        config: DetectorConfig,
    ) -> Result<Self, DetectionError> {
        let model_path = model_path.as_ref();

        if !model_path.exists() {
            return Err(DetectionError::ModelUnavailable(format!(
                "plate detection model not found: {}",
                model_path.display()
            )));
        }

        info!("Loading plate detection model from {}", model_path.display());

        let session = build_session(model_path, config.intra_threads)
            .map_err(|e| DetectionError::ModelUnavailable(format!("{:#}", e)))?;

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .unwrap_or_else(|| "images".to_string());

        if let Some(output) = session.outputs.first() {
            debug!(
                "Detection model loaded - input: {}, output: {} ({:?})",
                input_name, output.name, output.output_type
            );
        }

        info!(
            "✅ Plate detection model loaded (confidence {:.2}, iou {:.2}, input {})",
            config.confidence_threshold, config.iou_threshold, config.input_size
        );

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            input_name,
            config,
            model_path: model_path.to_path_buf(),
        })
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    pub fn model_path(&self) -> &Path {
        &self.model_path
    }
}

impl PlateDetector for OnnxPlateDetector {
    fn detect(&self, image: &DynamicImage) -> Result<Vec<Detection>, DetectionError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(DetectionError::Decode("image has no pixels".to_string()));
        }

        let (input, letterbox) = preprocess_for_detection(image, self.config.input_size);
        let input_value = Value::from_array(input)
            .map_err(|e| DetectionError::Inference(format!("failed to create input tensor: {}", e)))?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| DetectionError::Inference("detection session lock poisoned".to_string()))?;

        let outputs = session
            .run(ort::inputs![&self.input_name => input_value])
            .map_err(|e| DetectionError::Inference(e.to_string()))?;

        let output = outputs[0]
            .try_extract_array::<f32>()
            .map_err(|e| DetectionError::Inference(format!("failed to extract output tensor: {}", e)))?;

        let candidates = decode_yolo_output(output, &letterbox, self.config.confidence_threshold)?;
        let kept = nms(candidates, self.config.iou_threshold);

        debug!(
            "Plate detector kept {} box(es), best score {:.3}",
            kept.len(),
            kept.first().map(|d| d.confidence).unwrap_or(0.0)
        );

        Ok(kept)
    }
}

fn build_session(model_path: &Path, intra_threads: usize) -> anyhow::Result<Session> {
    let session = Session::builder()
        .context("Failed to create session builder")?
        .with_execution_providers([CPUExecutionProvider::default().build()])
        .context("Failed to set CPU execution provider")?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .context("Failed to set optimization level")?
        .with_intra_threads(intra_threads.max(1))
        .context("Failed to set intra threads")?
        .commit_from_file(model_path)
        .context(format!(
            "Failed to load plate detection model from {}",
            model_path.display()
        ))?;
    Ok(session)
}

/// Turn a raw YOLOv8 output into scored boxes in original image pixels.
///
/// Accepts `[1, 4 + C, N]` and the transposed `[1, N, 4 + C]`; the smaller
/// of the two trailing axes is taken as the attribute axis. Each anchor's
/// score is its best class score.
pub fn decode_yolo_output(
    output: ArrayViewD<'_, f32>,
    letterbox: &LetterboxInfo,
    confidence_threshold: f32,
) -> Result<Vec<Detection>, DetectionError> {
    let shape = output.shape().to_vec();
    let table = match shape.len() {
        3 => output.index_axis_move(Axis(0), 0),
        2 => output,
        _ => {
            return Err(DetectionError::Inference(format!(
                "unexpected detection output shape: {:?}",
                shape
            )))
        }
    };
    let table = table
        .into_dimensionality::<Ix2>()
        .map_err(|e| DetectionError::Inference(e.to_string()))?;

    // attributes x anchors
    let table = if table.nrows() <= table.ncols() {
        table
    } else {
        table.reversed_axes()
    };

    if table.nrows() < 5 {
        return Err(DetectionError::Inference(format!(
            "detection output has {} attributes, expected at least 5",
            table.nrows()
        )));
    }

    let mut detections = Vec::new();
    for anchor in table.columns() {
        let score = anchor
            .iter()
            .skip(4)
            .copied()
            .fold(f32::NEG_INFINITY, f32::max);

        if score.is_nan() || score < confidence_threshold {
            continue;
        }

        let (cx, cy, w, h) = (anchor[0], anchor[1], anchor[2], anchor[3]);
        let (x1, y1) = letterbox.map_to_original(cx - w / 2.0, cy - h / 2.0);
        let (x2, y2) = letterbox.map_to_original(cx + w / 2.0, cy + h / 2.0);

        let bbox = BoundingBox::new(
            x1.round() as i32,
            y1.round() as i32,
            x2.round() as i32,
            y2.round() as i32,
        )
        .and_then(|b| b.clamp_to(letterbox.original_width, letterbox.original_height));

        if let Some(bbox) = bbox {
            detections.push(Detection::new(bbox, score.min(1.0)));
        }
    }

    Ok(detections)
}

/// Greedy non-maximum suppression.
///
/// Boxes are visited from highest to lowest score (stable for equal scores)
/// and dropped when their IoU with an already kept box exceeds `iou_threshold`.
pub fn nms(mut detections: Vec<Detection>, iou_threshold: f32) -> Vec<Detection> {
    detections.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut kept: Vec<Detection> = Vec::with_capacity(detections.len());
    for candidate in detections {
        if kept
            .iter()
            .all(|k| k.bbox.iou(&candidate.bbox) <= iou_threshold)
        {
            kept.push(candidate);
        }
    }
    kept
}
