// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Region extraction bounds and best-detection selection

use image::DynamicImage;
use plate_reader::vision::plate::{extract_region, select_best, BoundingBox};

use super::common::detection;

#[cfg(test)]
mod region_tests {
    use super::*;

    /// Boxes touching, crossing and lying outside every edge
    fn awkward_boxes(width: i32, height: i32) -> Vec<BoundingBox> {
        let coords = [-50, -1, 0, 1, 7, width / 2, width - 1, width, width + 30];
        let mut boxes = Vec::new();
        for &x1 in &coords {
            for &x2 in &coords {
                for (y1, y2) in [(-20, 3), (0, height), (height / 3, height + 9), (2, 5)] {
                    if let Some(b) = BoundingBox::new(x1, y1, x2, y2) {
                        boxes.push(b);
                    }
                }
            }
        }
        boxes
    }

    #[test]
    fn test_extract_never_leaves_image() {
        let (width, height) = (64u32, 40u32);
        let image = DynamicImage::new_rgb8(width, height);

        for bbox in awkward_boxes(width as i32, height as i32) {
            for padding in [0u32, 1, 5, 100] {
                if let Some(region) = extract_region(&image, &bbox, padding) {
                    let r = region.bbox;
                    assert!(r.x1 >= 0 && r.y1 >= 0, "{:?} padded {}", bbox, padding);
                    assert!(r.x2 <= width as i32 && r.y2 <= height as i32, "{:?}", bbox);
                    assert!(r.x1 < r.x2 && r.y1 < r.y2);
                    assert_eq!(region.image.width(), r.width() as u32);
                    assert_eq!(region.image.height(), r.height() as u32);
                }
            }
        }
    }

    #[test]
    fn test_extract_box_covering_whole_image() {
        let image = DynamicImage::new_rgb8(30, 20);
        let bbox = BoundingBox::new(0, 0, 30, 20).unwrap();
        let region = extract_region(&image, &bbox, 5).unwrap();
        assert_eq!(region.bbox, bbox);
    }

    #[test]
    fn test_extract_box_just_outside_becomes_visible_with_padding() {
        let image = DynamicImage::new_rgb8(30, 20);
        // starts 3px right of the image; padding 5 pulls 2px back in
        let bbox = BoundingBox::new(33, 5, 40, 10).unwrap();
        assert!(extract_region(&image, &bbox, 0).is_none());
        let region = extract_region(&image, &bbox, 5).unwrap();
        assert_eq!(region.bbox, BoundingBox::new(28, 0, 30, 15).unwrap());
    }

    #[test]
    fn test_select_best_ignores_nan_scores() {
        let detections = vec![
            detection(0, 0, 10, 10, f32::NAN),
            detection(5, 5, 15, 15, 0.55),
        ];
        assert_eq!(select_best(&detections, 0.5).unwrap().confidence, 0.55);
    }

    #[test]
    fn test_select_best_prefers_first_on_tie() {
        let detections = vec![
            detection(0, 0, 10, 10, 0.4),
            detection(20, 0, 30, 10, 0.8),
            detection(40, 0, 50, 10, 0.8),
        ];
        assert_eq!(select_best(&detections, 0.5).unwrap().bbox.x1, 20);
    }
}
