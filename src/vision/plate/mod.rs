// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! License plate detection and recognition
//!
//! Components (leaves first):
//! - `detection` - plate detector trait and the ONNX YOLO engine
//! - `region` - best-detection selection and padded cropping
//! - `enhance` - deterministic binarization of the plate crop
//! - `recognition` - text recognizer trait and the ONNX CTC engine
//! - `assembly` - fragment cleanup, confidence floor and length check
//! - `pipeline` - the orchestrator tying the stages together

pub mod assembly;
pub mod detection;
pub mod enhance;
pub mod error;
pub mod pipeline;
pub mod preprocessing;
pub mod recognition;
pub mod region;
pub mod types;

pub use assembly::{AssembledText, TextAssembler};
pub use detection::{nms, DetectorConfig, OnnxPlateDetector, PlateDetector};
pub use enhance::{EnhanceConfig, PlateEnhancer};
pub use error::{DetectionError, PlateError, RecognitionError};
pub use pipeline::{PipelineSettings, PlateRecognitionPipeline};
pub use recognition::{CharDictionary, OnnxTextRecognizer, TextRecognizer};
pub use region::{extract_region, select_best, PlateRegion};
pub use types::{BoundingBox, Detection, PlateOutcome, PlateResult, TextFragment};
