// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Annotated detection output

use image::Rgb;
use plate_reader::vision::annotate::{annotate, BOX_COLOR};
use plate_reader::vision::plate::TextFragment;

use super::common::{detection, pipeline_with, street_photo, write_image};

#[cfg(test)]
mod annotate_tests {
    use super::*;

    #[test]
    fn test_annotate_writes_outlined_copy() {
        let dir = tempfile::tempdir().unwrap();
        let photo = street_photo(320, 240, (100, 150, 220, 180));
        let input = write_image(dir.path(), "car.png", &photo);
        let output = dir.path().join("car_annotated.png");

        let (pipeline, _, _) = pipeline_with(
            vec![detection(100, 150, 220, 180, 0.8)],
            vec![TextFragment::new("AP28CD1234", 0.9)],
        );

        let (result, written) = annotate(&pipeline, &input, &output).unwrap();
        assert!(written);
        assert!(result.is_success());

        let saved = image::open(&output).unwrap().to_rgb8();
        assert_eq!(saved.dimensions(), (320, 240));
        assert_eq!(*saved.get_pixel(100, 150), BOX_COLOR);
        assert_eq!(*saved.get_pixel(101, 151), BOX_COLOR);
        assert_eq!(*saved.get_pixel(10, 10), Rgb([90, 95, 100]));

        // plate label sits in the band just above the box
        let source = photo.to_rgb8();
        let label_pixels = (110..150u32)
            .flat_map(|y| (100..320u32).map(move |x| (x, y)))
            .filter(|&(x, y)| saved.get_pixel(x, y) != source.get_pixel(x, y))
            .count();
        assert!(label_pixels > 0);

        // the original upload is untouched
        let original = image::open(&input).unwrap().to_rgb8();
        assert_ne!(*original.get_pixel(100, 150), BOX_COLOR);
    }

    #[test]
    fn test_annotate_skips_when_no_plate() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_image(dir.path(), "empty.png", &street_photo(64, 48, (0, 0, 0, 0)));
        let output = dir.path().join("out.png");

        let (pipeline, _, _) = pipeline_with(Vec::new(), Vec::new());
        let (_, written) = annotate(&pipeline, &input, &output).unwrap();

        assert!(!written);
        assert!(!output.exists());
    }

    #[test]
    fn test_annotate_draws_even_when_text_unreadable() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_image(
            dir.path(),
            "car.png",
            &street_photo(320, 240, (100, 150, 220, 180)),
        );
        let output = dir.path().join("out.png");

        let (pipeline, _, _) = pipeline_with(vec![detection(100, 150, 220, 180, 0.8)], Vec::new());
        let (result, written) = annotate(&pipeline, &input, &output).unwrap();

        assert!(written);
        assert!(!result.is_success());
        assert!(output.exists());
    }
}
