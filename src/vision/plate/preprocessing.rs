// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Tensor preparation for the plate detector and text recognizer

use image::{imageops::FilterType, DynamicImage, GenericImageView, GrayImage, Rgb, RgbImage};
use ndarray::Array4;

/// Default square input size for the YOLO-style plate detector
pub const DETECTOR_INPUT_SIZE: u32 = 640;

/// Padding colour used by the letterbox (YOLO convention)
pub const LETTERBOX_FILL: u8 = 114;

/// Recognition model input height
pub const REC_INPUT_HEIGHT: u32 = 48;

/// Maximum width for recognition model input
pub const REC_MAX_WIDTH: u32 = 320;

/// Minimum width for recognition model input
pub const REC_MIN_WIDTH: u32 = 4;

/// Scale and offsets applied by [`letterbox`], used to map detector boxes
/// back onto the original photograph
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LetterboxInfo {
    /// Scale factor applied
    pub scale: f32,
    /// X offset from padding
    pub offset_x: u32,
    /// Y offset from padding
    pub offset_y: u32,
    /// Original image width
    pub original_width: u32,
    /// Original image height
    pub original_height: u32,
}

impl LetterboxInfo {
    /// Calculate letterbox parameters for an image
    pub fn new(original_width: u32, original_height: u32, target_size: u32) -> Self {
        if original_width == 0 || original_height == 0 {
            return Self {
                scale: 1.0,
                offset_x: 0,
                offset_y: 0,
                original_width,
                original_height,
            };
        }

        let scale = (target_size as f32 / original_width as f32)
            .min(target_size as f32 / original_height as f32);
        let new_w = ((original_width as f32 * scale).round() as u32).clamp(1, target_size);
        let new_h = ((original_height as f32 * scale).round() as u32).clamp(1, target_size);

        Self {
            scale,
            offset_x: (target_size - new_w) / 2,
            offset_y: (target_size - new_h) / 2,
            original_width,
            original_height,
        }
    }

    /// Size of the resized image inside the padded square
    pub fn scaled_size(&self) -> (u32, u32) {
        let w = (self.original_width as f32 * self.scale).round().max(1.0) as u32;
        let h = (self.original_height as f32 * self.scale).round().max(1.0) as u32;
        (w, h)
    }

    /// Map a coordinate from letterboxed space back to original image space
    pub fn map_to_original(&self, x: f32, y: f32) -> (f32, f32) {
        let orig_x = (x - self.offset_x as f32) / self.scale;
        let orig_y = (y - self.offset_y as f32) / self.scale;
        (orig_x, orig_y)
    }
}

/// Resize with aspect ratio preserved and pad to a `target_size` square
pub fn letterbox(image: &DynamicImage, target_size: u32) -> (RgbImage, LetterboxInfo) {
    let (orig_w, orig_h) = image.dimensions();
    let info = LetterboxInfo::new(orig_w, orig_h, target_size);

    let fill = Rgb([LETTERBOX_FILL, LETTERBOX_FILL, LETTERBOX_FILL]);
    let mut output = RgbImage::from_pixel(target_size, target_size, fill);

    if orig_w == 0 || orig_h == 0 {
        return (output, info);
    }

    let (new_w, new_h) = info.scaled_size();
    let resized = image
        .resize_exact(new_w.min(target_size), new_h.min(target_size), FilterType::Triangle)
        .to_rgb8();

    image::imageops::replace(
        &mut output,
        &resized,
        info.offset_x as i64,
        info.offset_y as i64,
    );

    (output, info)
}

/// Letterbox an image into an NCHW tensor `[1, 3, S, S]` scaled to `[0, 1]`
pub fn preprocess_for_detection(image: &DynamicImage, target_size: u32) -> (Array4<f32>, LetterboxInfo) {
    let (rgb, info) = letterbox(image, target_size);
    let size = target_size as usize;
    let mut tensor = Array4::zeros((1, 3, size, size));

    for (x, y, pixel) in rgb.enumerate_pixels() {
        for c in 0..3 {
            tensor[[0, c, y as usize, x as usize]] = pixel[c] as f32 / 255.0;
        }
    }

    (tensor, info)
}

/// Prepare one grayscale text line for recognition
///
/// Steps:
/// 1. Resize to height 48, dynamic width (aspect preserved, 4..=320)
/// 2. Normalize `(v / 255 - 0.5) / 0.5`
/// 3. Replicate into three channels, NCHW `[1, 3, 48, W]`
pub fn preprocess_for_recognition(line: &GrayImage) -> Array4<f32> {
    let (orig_w, orig_h) = line.dimensions();

    let scale = REC_INPUT_HEIGHT as f32 / orig_h.max(1) as f32;
    let new_width = ((orig_w as f32 * scale).round() as u32).clamp(REC_MIN_WIDTH, REC_MAX_WIDTH);

    let resized = image::imageops::resize(line, new_width, REC_INPUT_HEIGHT, FilterType::Triangle);

    let width = new_width as usize;
    let mut tensor = Array4::zeros((1, 3, REC_INPUT_HEIGHT as usize, width));

    for (x, y, pixel) in resized.enumerate_pixels() {
        let normalized = (pixel[0] as f32 / 255.0 - 0.5) / 0.5;
        for c in 0..3 {
            tensor[[0, c, y as usize, x as usize]] = normalized;
        }
    }

    tensor
}
