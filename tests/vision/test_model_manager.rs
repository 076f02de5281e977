// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Plate model manager tests
//!
//! These tests verify that the model manager:
//! - Reuses artifacts that already exist at the configured paths
//! - Fails fast with ModelUnavailable when nothing can be loaded
//! - Loads real models and lists them (ignored without model files)

use plate_reader::config::PlateConfig;
use plate_reader::vision::model_manager::{ensure_artifact, fetch_models, PlateModelManager};
use plate_reader::vision::plate::PlateError;
use std::path::Path;

// Model paths (downloaded by fetch-models)
const DETECTOR_MODEL: &str = "./models/license_plate_detection.onnx";
const RECOGNIZER_MODEL: &str = "./models/plate-ocr/rec_model.onnx";
const RECOGNIZER_DICT: &str = "./models/plate-ocr/dict.txt";

fn offline_config(dir: &Path) -> PlateConfig {
    let mut config = PlateConfig::default();
    config.detector_model_path = dir.join("det.onnx");
    config.recognizer_model_path = dir.join("rec.onnx");
    config.recognizer_dict_path = dir.join("dict.txt");
    config.bootstrap.detector = None;
    config.bootstrap.recognizer = None;
    config.bootstrap.dictionary = None;
    config
}

#[cfg(test)]
mod model_manager_tests {
    use super::*;

    #[tokio::test]
    async fn test_fetch_models_uses_existing_files() {
        let dir = tempfile::tempdir().unwrap();
        let config = offline_config(dir.path());
        for path in [
            &config.detector_model_path,
            &config.recognizer_model_path,
            &config.recognizer_dict_path,
        ] {
            std::fs::write(path, b"placeholder").unwrap();
        }

        let paths = fetch_models(&config).await.unwrap();
        assert_eq!(paths.detector, config.detector_model_path);
        assert_eq!(paths.recognizer, config.recognizer_model_path);
        assert_eq!(paths.dictionary, config.recognizer_dict_path);
    }

    #[tokio::test]
    async fn test_fetch_models_reports_first_missing_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let config = offline_config(dir.path());
        std::fs::write(&config.detector_model_path, b"placeholder").unwrap();

        let err = fetch_models(&config).await.unwrap_err();
        assert!(matches!(err, PlateError::ModelUnavailable(_)));
        assert!(err.to_string().contains("rec.onnx"));
    }

    #[tokio::test]
    async fn test_ensure_artifact_does_not_touch_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("det.onnx");
        std::fs::write(&path, b"v1").unwrap();

        ensure_artifact(&path, None).await.unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"v1");
    }

    #[tokio::test]
    async fn test_invalid_model_file_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let config = offline_config(dir.path());
        std::fs::write(&config.detector_model_path, b"not an onnx graph").unwrap();
        std::fs::write(&config.recognizer_model_path, b"not an onnx graph").unwrap();
        std::fs::write(&config.recognizer_dict_path, "A\nB\n").unwrap();

        let result = PlateModelManager::new(&config).await;
        assert!(matches!(result, Err(PlateError::ModelUnavailable(_))));
    }

    #[tokio::test]
    #[ignore] // Only run if model files are downloaded
    async fn test_manager_loads_and_lists_models() {
        let mut config = PlateConfig::default();
        config.detector_model_path = DETECTOR_MODEL.into();
        config.recognizer_model_path = RECOGNIZER_MODEL.into();
        config.recognizer_dict_path = RECOGNIZER_DICT.into();

        let manager = match PlateModelManager::new(&config).await {
            Ok(m) => m,
            Err(_) => return, // Skip if models not available
        };

        let models = manager.list_models();
        assert_eq!(models.len(), 2);
        assert!(models.iter().all(|m| m.available));
        assert!(models.iter().any(|m| m.model_type == "detection"));
        assert!(models.iter().any(|m| m.model_type == "recognition"));

        // pipelines share the loaded engines
        let a = manager.pipeline();
        let b = manager.pipeline();
        let blank = image::DynamicImage::new_rgb8(320, 240);
        assert!(a.recognize_image(&blank).is_ok());
        assert!(b.recognize_image(&blank).is_ok());
    }
}
