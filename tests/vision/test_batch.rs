// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Directory batch processing and JSON report

use plate_reader::vision::batch::process_directory;
use plate_reader::vision::plate::{PlateOutcome, TextFragment};
use std::sync::atomic::Ordering;

use super::common::{detection, pipeline_with, street_photo, write_image};

#[cfg(test)]
mod batch_tests {
    use super::*;

    #[tokio::test]
    async fn test_batch_processes_images_and_records_failures() {
        let dir = tempfile::tempdir().unwrap();
        let photo = street_photo(320, 240, (100, 150, 220, 180));
        write_image(dir.path(), "a_front.png", &photo);
        write_image(dir.path(), "b_rear.jpg", &photo);
        std::fs::write(dir.path().join("c_broken.png"), b"garbage").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"skip me").unwrap();

        let (pipeline, detector, _) = pipeline_with(
            vec![detection(100, 150, 220, 180, 0.85)],
            vec![TextFragment::new("KL07BQ2200", 0.9)],
        );

        let report = process_directory(&pipeline, dir.path(), 2).await.unwrap();

        assert_eq!(report.total, 3);
        assert_eq!(report.recognized, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(detector.calls.load(Ordering::SeqCst), 2);

        let files: Vec<_> = report.records.iter().map(|r| r.file.as_str()).collect();
        assert_eq!(files, vec!["a_front.png", "b_rear.jpg", "c_broken.png"]);

        let first = &report.records[0];
        assert_eq!(first.plate_text, "KL07BQ2200");
        assert_eq!(first.detection_confidence, 0.85);
        assert_eq!(first.outcome, Some(PlateOutcome::Recognized));
        assert!(first.error.is_none());

        let broken = &report.records[2];
        assert!(broken.outcome.is_none());
        assert!(broken.error.is_some());
    }

    #[tokio::test]
    async fn test_batch_report_written_as_json() {
        let dir = tempfile::tempdir().unwrap();
        let photos = dir.path().join("photos");
        std::fs::create_dir(&photos).unwrap();
        write_image(&photos, "car.png", &street_photo(160, 120, (0, 0, 0, 0)));

        let (pipeline, _, _) = pipeline_with(Vec::new(), Vec::new());
        let report = process_directory(&pipeline, &photos, 1).await.unwrap();

        let out = dir.path().join("report.json");
        report.write_json(&out).await.unwrap();

        let parsed: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
        assert_eq!(parsed["total"], 1);
        assert_eq!(parsed["records"][0]["file"], "car.png");
        assert_eq!(parsed["records"][0]["outcome"], "no_plate_found");
        assert_eq!(parsed["records"][0]["plate_text"], "");
        assert!(parsed["records"][0]["bbox"].is_null());
    }

    #[tokio::test]
    async fn test_batch_empty_directory() {
        let dir = tempfile::tempdir().unwrap();
        let (pipeline, _, _) = pipeline_with(Vec::new(), Vec::new());

        let report = process_directory(&pipeline, dir.path(), 4).await.unwrap();
        assert_eq!(report.total, 0);
        assert!(report.records.is_empty());
    }

    #[tokio::test]
    async fn test_batch_missing_directory_is_error() {
        let (pipeline, _, _) = pipeline_with(Vec::new(), Vec::new());
        assert!(process_directory(&pipeline, "/nonexistent/photos", 2).await.is_err());
    }
}
