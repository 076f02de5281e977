// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Draw the detected plate box and its label onto a copy of the photograph

use ab_glyph::{FontRef, PxScale};
use anyhow::{Context, Result};
use image::{DynamicImage, Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;
use std::path::Path;
use tracing::{info, warn};

use crate::vision::image_utils::load_image;
use crate::vision::plate::{BoundingBox, PlateRecognitionPipeline, PlateResult};

pub const BOX_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
pub const BOX_THICKNESS: u32 = 2;

const LABEL_FONT: &[u8] = include_bytes!("../../assets/DejaVuSansMono.ttf");
const LABEL_FONT_SIZE: f32 = 18.0;
/// Gap between the label's bottom edge and the box
const LABEL_GAP: i32 = 4;

/// Label text drawn above the box, e.g. `Plate: AB12CD3456 (0.87)`
pub fn plate_label(result: &PlateResult) -> String {
    let text = if result.text.is_empty() {
        "?"
    } else {
        result.text.as_str()
    };
    format!("Plate: {} ({:.2})", text, result.confidence)
}

/// Copy of `image` with the selected box outlined in green (2px) and the
/// plate label above it. Returns a plain copy when `result` has no box.
pub fn draw_detection(image: &DynamicImage, result: &PlateResult) -> RgbImage {
    let mut canvas = image.to_rgb8();
    let Some(bbox) = result.bbox else {
        return canvas;
    };

    draw_box(&mut canvas, &bbox);

    match FontRef::try_from_slice(LABEL_FONT) {
        Ok(font) => draw_label(&mut canvas, &bbox, &plate_label(result), &font),
        Err(e) => warn!("Label font unavailable, drawing box only: {}", e),
    }

    canvas
}

fn draw_box(canvas: &mut RgbImage, bbox: &BoundingBox) {
    for inset in 0..BOX_THICKNESS as i32 {
        let width = bbox.width() - 2 * inset;
        let height = bbox.height() - 2 * inset;
        if width <= 0 || height <= 0 {
            break;
        }
        let rect = Rect::at(bbox.x1 + inset, bbox.y1 + inset).of_size(width as u32, height as u32);
        draw_hollow_rect_mut(canvas, rect, BOX_COLOR);
    }
}

/// Place the label just above the box; a box touching the top edge keeps
/// its label at row 0
fn draw_label(canvas: &mut RgbImage, bbox: &BoundingBox, label: &str, font: &FontRef<'_>) {
    let scale = PxScale::from(LABEL_FONT_SIZE);
    let (_, text_height) = text_size(scale, font, label);

    let x = bbox.x1.max(0);
    let y = (bbox.y1 - text_height as i32 - LABEL_GAP).max(0);
    draw_text_mut(canvas, BOX_COLOR, x, y, scale, font, label);
}

/// Run the pipeline on `image_path` and save an annotated copy to
/// `output_path` (format chosen by extension).
///
/// Returns the pipeline result and whether a file was written; nothing is
/// written when no plate was located.
pub fn annotate<P: AsRef<Path>, Q: AsRef<Path>>(
    pipeline: &PlateRecognitionPipeline,
    image_path: P,
    output_path: Q,
) -> Result<(PlateResult, bool)> {
    let image_path = image_path.as_ref();
    let output_path = output_path.as_ref();

    let (image, _) = load_image(image_path)?;
    let result = pipeline.recognize_image(&image)?;

    if result.bbox.is_none() {
        return Ok((result, false));
    }

    draw_detection(&image, &result)
        .save(output_path)
        .with_context(|| format!("Failed to save annotated image to {}", output_path.display()))?;

    info!("Annotated detection saved to {}", output_path.display());
    Ok((result, true))
}
