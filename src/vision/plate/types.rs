// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Value types flowing through the plate recognition pipeline

use image::DynamicImage;
use serde::{Deserialize, Serialize};

/// Axis-aligned box in integer pixel coordinates.
///
/// `x2`/`y2` are exclusive, so a box covering the whole image is
/// `(0, 0, width, height)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl BoundingBox {
    /// Build a box, returning `None` unless `x1 < x2` and `y1 < y2`
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Option<Self> {
        if x1 < x2 && y1 < y2 {
            Some(Self { x1, y1, x2, y2 })
        } else {
            None
        }
    }

    pub fn width(&self) -> i32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> i32 {
        self.y2 - self.y1
    }

    pub fn area(&self) -> i64 {
        self.width().max(0) as i64 * self.height().max(0) as i64
    }

    /// Grow the box by `padding` pixels on every side (no clamping)
    pub fn expand(&self, padding: u32) -> Self {
        let p = padding.min(i32::MAX as u32) as i32;
        Self {
            x1: self.x1.saturating_sub(p),
            y1: self.y1.saturating_sub(p),
            x2: self.x2.saturating_add(p),
            y2: self.y2.saturating_add(p),
        }
    }

    /// Clamp to `[0, width) x [0, height)`.
    ///
    /// Returns `None` when nothing of the box is left inside the image.
    pub fn clamp_to(&self, width: u32, height: u32) -> Option<Self> {
        let w = width.min(i32::MAX as u32) as i32;
        let h = height.min(i32::MAX as u32) as i32;
        Self::new(
            self.x1.clamp(0, w),
            self.y1.clamp(0, h),
            self.x2.clamp(0, w),
            self.y2.clamp(0, h),
        )
    }

    /// Intersection over union with another box
    pub fn iou(&self, other: &BoundingBox) -> f32 {
        let x1 = self.x1.max(other.x1);
        let y1 = self.y1.max(other.y1);
        let x2 = self.x2.min(other.x2);
        let y2 = self.y2.min(other.y2);

        let intersection = if x2 > x1 && y2 > y1 {
            (x2 - x1) as i64 * (y2 - y1) as i64
        } else {
            0
        };

        let union = self.area() + other.area() - intersection;
        if union > 0 {
            intersection as f32 / union as f32
        } else {
            0.0
        }
    }
}

/// A candidate plate region reported by a detector
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub bbox: BoundingBox,
    /// Detector score (0.0-1.0)
    pub confidence: f32,
}

impl Detection {
    pub fn new(bbox: BoundingBox, confidence: f32) -> Self {
        Self { bbox, confidence }
    }
}

/// A piece of text returned by a recognizer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextFragment {
    pub text: String,
    /// Recognizer score (0.0-1.0)
    pub confidence: f32,
}

impl TextFragment {
    pub fn new(text: impl Into<String>, confidence: f32) -> Self {
        Self {
            text: text.into(),
            confidence,
        }
    }
}

/// Terminal state of one pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlateOutcome {
    /// Plate found and a plausible registration number was read
    Recognized,
    /// No detection at or above the confidence threshold, or the region was empty
    NoPlateFound,
    /// The cropped region could not be enhanced
    EnhancementFailed,
    /// Plate located but the recognized text was rejected
    TextUnreadable,
}

impl PlateOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, PlateOutcome::Recognized)
    }

    /// Guidance shown to the officer entering the violation
    pub fn user_message(&self) -> &'static str {
        match self {
            PlateOutcome::Recognized => "License plate recognized.",
            PlateOutcome::NoPlateFound => {
                "No license plate detected in the image. Please ensure the image contains a clear view of the license plate."
            }
            PlateOutcome::EnhancementFailed => {
                "Failed to process the detected license plate region. Please try with a clearer image."
            }
            PlateOutcome::TextUnreadable => {
                "License plate detected but text could not be read. Please ensure the plate is clearly visible and well-lit, or enter the number manually."
            }
        }
    }
}

/// Result handed back to the caller for every terminal state
#[derive(Debug, Clone, Serialize)]
pub struct PlateResult {
    /// Recognized registration number, empty unless `outcome` is `Recognized`
    pub text: String,
    /// Detection-stage confidence of the selected box, 0 when nothing was found
    pub confidence: f32,
    /// Mean confidence of the fragments used to build `text`, 0 when rejected
    pub ocr_confidence: f32,
    /// Selected detection box (as reported by the detector)
    pub bbox: Option<BoundingBox>,
    pub outcome: PlateOutcome,
    /// Padded and clamped crop of the plate region
    #[serde(skip)]
    pub plate_image: Option<DynamicImage>,
}

impl PlateResult {
    /// Nothing plate-like was found
    pub fn not_found() -> Self {
        Self {
            text: String::new(),
            confidence: 0.0,
            ocr_confidence: 0.0,
            bbox: None,
            outcome: PlateOutcome::NoPlateFound,
            plate_image: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcome.is_success()
    }
}
