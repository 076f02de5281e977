// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Plate region selection and cropping

use image::DynamicImage;
use tracing::debug;

use super::types::{BoundingBox, Detection};

/// Padding added around the selected detection before cropping
pub const DEFAULT_PADDING: u32 = 5;

/// Pick the single highest-confidence detection at or above `threshold`.
///
/// Ties keep the first detection encountered. That order comes from the
/// detector, so it is not guaranteed across detector implementations.
pub fn select_best(detections: &[Detection], threshold: f32) -> Option<&Detection> {
    let mut best: Option<&Detection> = None;

    for detection in detections {
        if detection.confidence.is_nan() || detection.confidence < threshold {
            continue;
        }
        match best {
            Some(current) if detection.confidence <= current.confidence => {}
            _ => best = Some(detection),
        }
    }

    best
}

/// A cropped plate region and the clamped box it was cut from
#[derive(Debug, Clone)]
pub struct PlateRegion {
    pub image: DynamicImage,
    pub bbox: BoundingBox,
}

/// Crop `bbox` grown by `padding`, clamped to the image bounds.
///
/// Returns `None` ("no region") when the clamped box has zero area.
pub fn extract_region(image: &DynamicImage, bbox: &BoundingBox, padding: u32) -> Option<PlateRegion> {
    let clamped = bbox.expand(padding).clamp_to(image.width(), image.height())?;

    debug!(
        "Extracting plate region ({}, {}) - ({}, {}) from {}x{} image",
        clamped.x1,
        clamped.y1,
        clamped.x2,
        clamped.y2,
        image.width(),
        image.height()
    );

    let crop = image.crop_imm(
        clamped.x1 as u32,
        clamped.y1 as u32,
        clamped.width() as u32,
        clamped.height() as u32,
    );

    Some(PlateRegion {
        image: crop,
        bbox: clamped,
    })
}
