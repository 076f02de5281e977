// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod cli;
pub mod config;
pub mod vision;

// Re-export main types
pub use config::{BootstrapSource, PlateConfig};
pub use vision::plate::{
    BoundingBox, Detection, PlateDetector, PlateError, PlateOutcome, PlateRecognitionPipeline,
    PlateResult, TextFragment, TextRecognizer,
};
pub use vision::PlateModelManager;
