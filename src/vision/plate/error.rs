// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Error types for plate detection and recognition

use thiserror::Error;

use crate::vision::image_utils::ImageError;

/// Errors surfaced to callers of the pipeline.
///
/// Every other stage failure ends in a `PlateResult` instead.
#[derive(Debug, Error)]
pub enum PlateError {
    #[error("Failed to decode image: {0}")]
    Decode(#[from] ImageError),

    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),
}

/// Errors raised by a plate detector
#[derive(Debug, Error)]
pub enum DetectionError {
    #[error("Failed to decode image: {0}")]
    Decode(String),

    #[error("Detection model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Detection inference failed: {0}")]
    Inference(String),
}

/// Errors raised by a text recognizer
#[derive(Debug, Error)]
pub enum RecognitionError {
    #[error("Recognition model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Invalid character dictionary: {0}")]
    Dictionary(String),

    #[error("Recognition inference failed: {0}")]
    Inference(String),
}

impl From<DetectionError> for PlateError {
    fn from(err: DetectionError) -> Self {
        match err {
            DetectionError::Decode(msg) => PlateError::Decode(ImageError::DecodeFailed(msg)),
            other => PlateError::ModelUnavailable(other.to_string()),
        }
    }
}

impl From<RecognitionError> for PlateError {
    fn from(err: RecognitionError) -> Self {
        PlateError::ModelUnavailable(err.to_string())
    }
}
