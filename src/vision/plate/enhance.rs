// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Plate crop enhancement ahead of text recognition
//!
//! The crop goes through a fixed, deterministic chain:
//! 1. grayscale
//! 2. bilateral filter (edge-preserving smoothing)
//! 3. Gaussian adaptive threshold (binarize under uneven lighting)
//! 4. morphological closing with a small square kernel
//! 5. cubic upscale when narrower than the minimum width
//!
//! No step uses randomness, so the same crop always yields the same bytes.

use image::{imageops::FilterType, DynamicImage, GrayImage, Luma};
use imageproc::distance_transform::Norm;
use imageproc::{filter, morphology};
use tracing::debug;

/// Parameters for [`PlateEnhancer`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnhanceConfig {
    /// Bilateral neighbourhood diameter in pixels
    pub bilateral_diameter: u32,
    /// Bilateral range sigma (intensity units)
    pub bilateral_sigma_color: f32,
    /// Bilateral spatial sigma (pixels)
    pub bilateral_sigma_space: f32,
    /// Adaptive threshold block size (odd)
    pub threshold_block_size: u32,
    /// Constant subtracted from the local weighted mean
    pub threshold_c: i32,
    /// Side of the square closing kernel (odd)
    pub closing_kernel: u32,
    /// Crops narrower than this are upscaled
    pub min_width: u32,
}

impl Default for EnhanceConfig {
    fn default() -> Self {
        Self {
            bilateral_diameter: 11,
            bilateral_sigma_color: 17.0,
            bilateral_sigma_space: 17.0,
            threshold_block_size: 11,
            threshold_c: 2,
            closing_kernel: 3,
            min_width: 100,
        }
    }
}

/// Turns a raw plate crop into a clean binary image for OCR
#[derive(Debug, Clone, Default)]
pub struct PlateEnhancer {
    config: EnhanceConfig,
}

impl PlateEnhancer {
    pub fn new(config: EnhanceConfig) -> Self {
        Self { config }
    }

    /// Override the minimum output width
    pub fn with_min_width(mut self, min_width: u32) -> Self {
        self.config.min_width = min_width;
        self
    }

    pub fn config(&self) -> &EnhanceConfig {
        &self.config
    }

    /// Run the enhancement chain.
    ///
    /// Returns `None` for an image with no pixels. Any other input is
    /// processed best-effort and never panics.
    pub fn enhance(&self, image: &DynamicImage) -> Option<GrayImage> {
        if image.width() == 0 || image.height() == 0 {
            return None;
        }

        let gray = image.to_luma8();
        let smoothed = bilateral_filter(
            &gray,
            self.config.bilateral_diameter,
            self.config.bilateral_sigma_color,
            self.config.bilateral_sigma_space,
        );
        let binary = adaptive_threshold_gaussian(
            &smoothed,
            self.config.threshold_block_size,
            self.config.threshold_c,
        );
        let closed = close_square(&binary, self.config.closing_kernel);
        let output = upscale_to_min_width(closed, self.config.min_width);

        debug!(
            "Enhanced plate crop {}x{} -> {}x{}",
            image.width(),
            image.height(),
            output.width(),
            output.height()
        );

        Some(output)
    }
}

/// Edge-preserving bilateral filter, borders replicate the edge pixel
pub fn bilateral_filter(
    image: &GrayImage,
    diameter: u32,
    sigma_color: f32,
    sigma_space: f32,
) -> GrayImage {
    if image.width() == 0 || image.height() == 0 {
        return image.clone();
    }
    filter::bilateral_filter(
        image,
        diameter.max(1),
        sigma_color.max(f32::EPSILON),
        sigma_space.max(f32::EPSILON),
    )
}

/// Normalised 1-D Gaussian kernel, sigma derived from the size the same
/// way OpenCV does when none is given
fn gaussian_kernel(size: u32) -> Vec<f32> {
    let size = size.max(1) | 1;
    let sigma = 0.3 * ((size as f32 - 1.0) * 0.5 - 1.0) + 0.8;
    let half = (size / 2) as i32;

    let raw: Vec<f32> = (-half..=half)
        .map(|i| (-((i * i) as f32) / (2.0 * sigma * sigma)).exp())
        .collect();
    let total: f32 = raw.iter().sum();
    raw.into_iter().map(|v| v / total).collect()
}

/// Gaussian-weighted local mean, separable and edge-replicated
fn gaussian_local_mean(image: &GrayImage, block_size: u32) -> GrayImage {
    filter::separable_filter_equal(image, &gaussian_kernel(block_size))
}

/// Binarize against a Gaussian-weighted neighbourhood mean.
///
/// A pixel becomes 255 when it is brighter than `mean - c`, 0 otherwise.
pub fn adaptive_threshold_gaussian(image: &GrayImage, block_size: u32, c: i32) -> GrayImage {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return image.clone();
    }

    let mean = gaussian_local_mean(image, block_size);

    GrayImage::from_fn(width, height, |x, y| {
        let src = image.get_pixel(x, y)[0] as i32;
        let local = mean.get_pixel(x, y)[0] as i32;
        if src > local - c {
            Luma([255u8])
        } else {
            Luma([0u8])
        }
    })
}

/// Morphological closing (dilate then erode) with a `kernel x kernel` square
pub fn close_square(image: &GrayImage, kernel: u32) -> GrayImage {
    let radius = (kernel / 2).min(u8::MAX as u32) as u8;
    if radius == 0 || image.width() == 0 || image.height() == 0 {
        return image.clone();
    }
    morphology::close(image, Norm::LInf, radius)
}

/// Cubic upscale so the width reaches `min_width`, keeping the aspect ratio
pub fn upscale_to_min_width(image: GrayImage, min_width: u32) -> GrayImage {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 || width >= min_width {
        return image;
    }

    let scale = min_width as f32 / width as f32;
    let new_height = ((height as f32 * scale).round() as u32).max(1);
    image::imageops::resize(&image, min_width, new_height, FilterType::CatmullRom)
}
