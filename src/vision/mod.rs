// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Vision processing for license plate recognition
//!
//! This module provides:
//! - the plate pipeline (detection, enhancement, OCR, validation)
//! - model bootstrap and loading
//! - annotated output and directory batch reports
//!
//! Inference runs on CPU through ONNX Runtime.

pub mod annotate;
pub mod batch;
pub mod image_utils;
pub mod model_manager;
pub mod plate;

pub use annotate::{annotate, draw_detection};
pub use batch::{process_directory, BatchRecord, BatchReport};
pub use image_utils::{decode_image_bytes, detect_format, load_image, ImageError, ImageInfo};
pub use model_manager::{ensure_artifact, fetch_models, ModelPaths, PlateModelInfo, PlateModelManager};
pub use plate::{PlateError, PlateOutcome, PlateRecognitionPipeline, PlateResult};
