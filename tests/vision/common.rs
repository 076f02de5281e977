// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Stub engines and image helpers shared by the vision tests

use image::{DynamicImage, GrayImage, ImageFormat, Rgb, RgbImage};
use plate_reader::vision::plate::{
    BoundingBox, Detection, DetectionError, PlateDetector, PlateRecognitionPipeline,
    RecognitionError, TextFragment, TextRecognizer,
};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Detector returning a fixed list of boxes
pub struct StubDetector {
    detections: Vec<Detection>,
    pub calls: AtomicUsize,
}

impl StubDetector {
    pub fn new(detections: Vec<Detection>) -> Self {
        Self {
            detections,
            calls: AtomicUsize::new(0),
        }
    }
}

impl PlateDetector for StubDetector {
    fn detect(&self, _image: &DynamicImage) -> Result<Vec<Detection>, DetectionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.detections.clone())
    }
}

/// Recognizer returning fixed fragments and remembering image sizes
pub struct StubRecognizer {
    fragments: Vec<TextFragment>,
    pub seen: Mutex<Vec<(u32, u32)>>,
}

impl StubRecognizer {
    pub fn new(fragments: Vec<TextFragment>) -> Self {
        Self {
            fragments,
            seen: Mutex::new(Vec::new()),
        }
    }
}

impl TextRecognizer for StubRecognizer {
    fn recognize(&self, image: &GrayImage) -> Result<Vec<TextFragment>, RecognitionError> {
        self.seen.lock().unwrap().push(image.dimensions());
        Ok(self.fragments.clone())
    }
}

pub fn detection(x1: i32, y1: i32, x2: i32, y2: i32, confidence: f32) -> Detection {
    Detection::new(BoundingBox::new(x1, y1, x2, y2).unwrap(), confidence)
}

pub fn pipeline_with(
    detections: Vec<Detection>,
    fragments: Vec<TextFragment>,
) -> (PlateRecognitionPipeline, Arc<StubDetector>, Arc<StubRecognizer>) {
    let detector = Arc::new(StubDetector::new(detections));
    let recognizer = Arc::new(StubRecognizer::new(fragments));
    let pipeline = PlateRecognitionPipeline::new(detector.clone(), recognizer.clone());
    (pipeline, detector, recognizer)
}

/// Grey street scene with a light plate holding dark glyph bars
pub fn street_photo(width: u32, height: u32, plate: (u32, u32, u32, u32)) -> DynamicImage {
    let (px1, py1, px2, py2) = plate;
    let img = RgbImage::from_fn(width, height, |x, y| {
        let in_plate = x >= px1 && x < px2 && y >= py1 && y < py2;
        if !in_plate {
            return Rgb([90, 95, 100]);
        }
        let glyph = (x - px1) % 8 >= 4 && y > py1 + 3 && y + 3 < py2;
        if glyph {
            Rgb([15, 15, 15])
        } else {
            Rgb([235, 235, 225])
        }
    });
    DynamicImage::ImageRgb8(img)
}

pub fn write_image(dir: &Path, name: &str, image: &DynamicImage) -> PathBuf {
    let path = dir.join(name);
    let format = if name.ends_with(".png") {
        ImageFormat::Png
    } else {
        ImageFormat::Jpeg
    };
    image.to_rgb8().save_with_format(&path, format).unwrap();
    path
}
