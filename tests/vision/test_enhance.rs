// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Plate enhancement determinism and output shape

use image::{DynamicImage, GrayImage, Luma};
use plate_reader::vision::plate::enhance::{EnhanceConfig, PlateEnhancer};

use super::common::street_photo;

#[cfg(test)]
mod enhance_tests {
    use super::*;

    #[test]
    fn test_enhance_is_bit_identical_across_runs() {
        let photo = street_photo(180, 60, (10, 10, 170, 50));
        let enhancer = PlateEnhancer::default();

        let first = enhancer.enhance(&photo).unwrap();
        for _ in 0..3 {
            assert_eq!(enhancer.enhance(&photo).unwrap().as_raw(), first.as_raw());
        }
    }

    #[test]
    fn test_enhance_output_is_binary() {
        let photo = street_photo(180, 60, (10, 10, 170, 50));
        let out = PlateEnhancer::default().enhance(&photo).unwrap();
        assert!(out.pixels().all(|p| p[0] == 0 || p[0] == 255));
        // glyph bars survive as ink
        assert!(out.pixels().any(|p| p[0] == 0));
    }

    #[test]
    fn test_enhance_accepts_grayscale_and_rgba() {
        let enhancer = PlateEnhancer::default();

        let gray = DynamicImage::ImageLuma8(GrayImage::from_pixel(120, 30, Luma([128])));
        assert_eq!(enhancer.enhance(&gray).unwrap().dimensions(), (120, 30));

        let rgba = DynamicImage::new_rgba8(40, 10);
        assert_eq!(enhancer.enhance(&rgba).unwrap().dimensions(), (100, 25));
    }

    #[test]
    fn test_min_width_is_configurable() {
        let enhancer = PlateEnhancer::new(EnhanceConfig {
            min_width: 200,
            ..EnhanceConfig::default()
        });
        let out = enhancer.enhance(&DynamicImage::new_rgb8(100, 30)).unwrap();
        assert_eq!(out.dimensions(), (200, 60));
    }

    #[test]
    fn test_enhance_empty_image() {
        assert!(PlateEnhancer::default()
            .enhance(&DynamicImage::new_luma8(0, 5))
            .is_none());
    }
}
