// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Detect -> extract -> enhance -> recognize -> assemble
//!
//! A single pass with no retries. Every stage failure ends in a terminal
//! [`PlateResult`]; only unreadable input and unusable models come back as
//! [`PlateError`].

use image::DynamicImage;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use super::assembly::{TextAssembler, DEFAULT_MIN_FRAGMENT_CONFIDENCE, DEFAULT_MIN_PLATE_LENGTH};
use super::detection::PlateDetector;
use super::enhance::{EnhanceConfig, PlateEnhancer};
use super::error::{DetectionError, PlateError, RecognitionError};
use super::recognition::TextRecognizer;
use super::region::{extract_region, select_best, DEFAULT_PADDING};
use super::types::{PlateOutcome, PlateResult};
use crate::vision::image_utils::{load_image, ImageError};

/// Decision thresholds used by the pipeline itself
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelineSettings {
    /// Detections below this score are ignored when selecting the plate
    pub confidence_threshold: f32,
    /// Pixels added around the selected box before cropping
    pub padding: u32,
    pub min_fragment_confidence: f32,
    pub min_plate_length: usize,
    pub min_enhanced_width: u32,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.5,
            padding: DEFAULT_PADDING,
            min_fragment_confidence: DEFAULT_MIN_FRAGMENT_CONFIDENCE,
            min_plate_length: DEFAULT_MIN_PLATE_LENGTH,
            min_enhanced_width: EnhanceConfig::default().min_width,
        }
    }
}

/// License plate recognition pipeline
///
/// Cloning is cheap: the detector and recognizer are shared, so one loaded
/// pair of models can serve any number of concurrent callers.
#[derive(Clone)]
pub struct PlateRecognitionPipeline {
    detector: Arc<dyn PlateDetector>,
    recognizer: Arc<dyn TextRecognizer>,
    enhancer: PlateEnhancer,
    assembler: TextAssembler,
    settings: PipelineSettings,
}

impl std::fmt::Debug for PlateRecognitionPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlateRecognitionPipeline")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl PlateRecognitionPipeline {
    pub fn new(detector: Arc<dyn PlateDetector>, recognizer: Arc<dyn TextRecognizer>) -> Self {
        Self::with_settings(detector, recognizer, PipelineSettings::default())
    }

    pub fn with_settings(
        detector: Arc<dyn PlateDetector>,
        recognizer: Arc<dyn TextRecognizer>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            detector,
            recognizer,
            enhancer: PlateEnhancer::default().with_min_width(settings.min_enhanced_width),
            assembler: TextAssembler::new(
                settings.min_fragment_confidence,
                settings.min_plate_length,
            ),
            settings,
        }
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Read the image at `path` and recognize its plate.
    ///
    /// The file is never modified or removed.
    ///
    /// # Errors
    /// - `PlateError::Decode` when the file is missing, unreadable or corrupt
    /// - `PlateError::ModelUnavailable` when an engine cannot run at all
    pub fn recognize_path<P: AsRef<Path>>(&self, path: P) -> Result<PlateResult, PlateError> {
        let path = path.as_ref();
        let (image, info) = load_image(path)?;
        debug!(
            "Loaded {} ({}x{}, {:?}, {} bytes)",
            path.display(),
            info.width,
            info.height,
            info.format,
            info.size_bytes
        );
        self.recognize_image(&image)
    }

    /// Recognize the plate in an already decoded image
    pub fn recognize_image(&self, image: &DynamicImage) -> Result<PlateResult, PlateError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(PlateError::Decode(ImageError::EmptyImage));
        }

        let started = Instant::now();
        let result = self.run_stages(image)?;

        info!(
            "Plate recognition finished: {:?} text='{}' confidence={:.3} ocr_confidence={:.3} ({} ms)",
            result.outcome,
            result.text,
            result.confidence,
            result.ocr_confidence,
            started.elapsed().as_millis()
        );

        Ok(result)
    }

    fn run_stages(&self, image: &DynamicImage) -> Result<PlateResult, PlateError> {
        let detections = match self.detector.detect(image) {
            Ok(detections) => detections,
            Err(DetectionError::Inference(msg)) => {
                warn!("Plate detection failed, treating as no plate: {}", msg);
                return Ok(PlateResult::not_found());
            }
            Err(e) => return Err(e.into()),
        };

        debug!("Detector returned {} candidate(s)", detections.len());

        let Some(best) = select_best(&detections, self.settings.confidence_threshold) else {
            return Ok(PlateResult::not_found());
        };
        let best = *best;

        let Some(region) = extract_region(image, &best.bbox, self.settings.padding) else {
            debug!("Selected box {:?} has no area inside the image", best.bbox);
            return Ok(PlateResult::not_found());
        };

        let mut result = PlateResult {
            text: String::new(),
            confidence: best.confidence,
            ocr_confidence: 0.0,
            bbox: Some(best.bbox),
            outcome: PlateOutcome::EnhancementFailed,
            plate_image: None,
        };

        let Some(enhanced) = self.enhancer.enhance(&region.image) else {
            warn!("Enhancement failed for region {:?}", region.bbox);
            result.plate_image = Some(region.image);
            return Ok(result);
        };
        result.plate_image = Some(region.image);

        let fragments = match self.recognizer.recognize(&enhanced) {
            Ok(fragments) => fragments,
            Err(RecognitionError::Inference(msg)) => {
                warn!("Text recognition failed, treating as unreadable: {}", msg);
                Vec::new()
            }
            Err(e) => return Err(e.into()),
        };

        let assembled = self.assembler.assemble(&fragments);
        if assembled.is_empty() {
            result.outcome = PlateOutcome::TextUnreadable;
            return Ok(result);
        }

        result.text = assembled.text;
        result.ocr_confidence = assembled.confidence;
        result.outcome = PlateOutcome::Recognized;
        Ok(result)
    }
}
