// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Plate text recognition
//!
//! [`TextRecognizer`] is the seam the pipeline talks to.
//! [`OnnxTextRecognizer`] runs a CTC recognition model (PaddleOCR style)
//! over each text line of the enhanced plate and restricts the decoded
//! alphabet to `A-Z0-9`.

use anyhow::Context;
use image::{imageops, GrayImage};
use ndarray::{ArrayView2, ArrayViewD, Axis, Ix2};
use ort::execution_providers::CPUExecutionProvider;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

use super::error::RecognitionError;
use super::preprocessing::preprocess_for_recognition;
use super::types::TextFragment;

/// Reads text from an enhanced plate image.
///
/// An empty image or one with no legible text yields an empty list.
#[cfg_attr(test, mockall::automock)]
pub trait TextRecognizer: Send + Sync {
    /// Fragments in reading order (top-to-bottom, left-to-right)
    fn recognize(&self, image: &GrayImage) -> Result<Vec<TextFragment>, RecognitionError>;
}

/// Characters a plate may contain
pub fn is_plate_char(c: char) -> bool {
    c.is_ascii_uppercase() || c.is_ascii_digit()
}

/// CTC character table with the plate allowlist applied
#[derive(Debug, Clone)]
pub struct CharDictionary {
    /// Index 0 is the CTC blank
    chars: Vec<char>,
    allowed: Vec<bool>,
}

impl CharDictionary {
    /// Build from the characters of a dictionary file (blank excluded)
    pub fn from_chars<I: IntoIterator<Item = char>>(chars: I) -> Result<Self, RecognitionError> {
        let mut table = vec![' '];
        table.extend(chars);

        if table.len() == 1 {
            return Err(RecognitionError::Dictionary(
                "dictionary contains no characters".to_string(),
            ));
        }

        // PaddleOCR exports append a space class after the file entries
        if !table[1..].contains(&' ') {
            table.push(' ');
        }

        let allowed = table
            .iter()
            .enumerate()
            .map(|(i, c)| i != 0 && is_plate_char(*c))
            .collect();

        Ok(Self {
            chars: table,
            allowed,
        })
    }

    /// One character per line; blank lines are skipped
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self, RecognitionError> {
        let mut chars = Vec::new();
        for line in reader.lines() {
            let line = line.map_err(|e| RecognitionError::Dictionary(e.to_string()))?;
            if let Some(ch) = line.chars().next() {
                chars.push(ch);
            }
        }
        Self::from_chars(chars)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, RecognitionError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            RecognitionError::Dictionary(format!("failed to open {}: {}", path.display(), e))
        })?;
        Self::from_reader(BufReader::new(file))
    }

    /// Number of classes including the blank
    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.len() <= 1
    }

    /// Number of classes the allowlist lets through
    pub fn allowed_count(&self) -> usize {
        self.allowed.iter().filter(|a| **a).count()
    }

    /// Greedy CTC decode of a `[T, C]` probability table.
    ///
    /// Only the blank and allowlisted classes compete for each timestep.
    /// Repeats collapse unless separated by a blank. Returns the text and
    /// each emitted character's probability.
    pub fn decode(&self, probs: ArrayView2<'_, f32>) -> (String, Vec<f32>) {
        let mut text = String::new();
        let mut char_probs = Vec::new();
        let mut prev: Option<usize> = None;

        for step in probs.rows() {
            let mut best_index = 0usize;
            let mut best_prob = f32::NEG_INFINITY;

            for (class, &prob) in step.iter().enumerate() {
                let candidate = class == 0 || self.allowed.get(class).copied().unwrap_or(false);
                if candidate && prob > best_prob {
                    best_prob = prob;
                    best_index = class;
                }
            }

            if best_index == 0 {
                prev = None;
                continue;
            }

            if prev != Some(best_index) {
                text.push(self.chars[best_index]);
                char_probs.push(best_prob);
            }
            prev = Some(best_index);
        }

        (text, char_probs)
    }
}

/// Split a binarized plate into horizontal text lines by ink projection.
///
/// Dark pixels are ink. A plate with one band of ink (or none that
/// qualifies) comes back whole; a blank plate yields no lines.
pub fn split_text_lines(image: &GrayImage) -> Vec<GrayImage> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Vec::new();
    }

    let row_ink: Vec<u32> = (0..height)
        .map(|y| (0..width).filter(|&x| image.get_pixel(x, y)[0] < 128).count() as u32)
        .collect();

    if row_ink.iter().all(|&n| n == 0) {
        return Vec::new();
    }

    let min_row_ink = (width / 50).max(1);
    let min_line_height = (height / 8).max(3);

    let mut bands: Vec<(u32, u32)> = Vec::new();
    let mut start: Option<u32> = None;
    for (y, &ink) in row_ink.iter().enumerate() {
        let y = y as u32;
        match (ink >= min_row_ink, start) {
            (true, None) => start = Some(y),
            (false, Some(s)) => {
                bands.push((s, y));
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        bands.push((s, height));
    }

    bands.retain(|(s, e)| e - s >= min_line_height);

    if bands.len() <= 1 {
        return vec![image.clone()];
    }

    const MARGIN: u32 = 2;
    bands
        .into_iter()
        .map(|(s, e)| {
            let top = s.saturating_sub(MARGIN);
            let bottom = (e + MARGIN).min(height);
            imageops::crop_imm(image, 0, top, width, bottom - top).to_image()
        })
        .collect()
}

/// CTC text recognizer backed by ONNX Runtime (CPU only)
#[derive(Clone)]
pub struct OnnxTextRecognizer {
    /// ONNX Runtime session (thread-safe)
    session: Arc<Mutex<Session>>,
    dictionary: Arc<CharDictionary>,
    input_name: String,
    model_path: PathBuf,
}

impl std::fmt::Debug for OnnxTextRecognizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxTextRecognizer")
            .field("dictionary_size", &self.dictionary.len())
            .field("input_name", &self.input_name)
            .field("model_path", &self.model_path)
            .finish_non_exhaustive()
    }
}

impl OnnxTextRecognizer {
    /// Load the recognition model and its character dictionary
    ///
    /// # Errors
    /// - `ModelUnavailable` if the model file is missing or fails to load
    /// - `Dictionary` if the dictionary is missing or empty
    pub async fn new<P: AsRef<Path>>(
        model_path: P,
        dict_path: P,
        intra_threads: usize,
    ) -> Result<Self, RecognitionError> {
        let model_path = model_path.as_ref();
        let dict_path = dict_path.as_ref();

        if !model_path.exists() {
            return Err(RecognitionError::ModelUnavailable(format!(
                "plate recognition model not found: {}",
                model_path.display()
            )));
        }

        let dictionary = CharDictionary::load(dict_path)?;
        info!(
            "Loaded character dictionary with {} classes ({} allowed for plates)",
            dictionary.len(),
            dictionary.allowed_count()
        );

        info!("Loading plate recognition model from {}", model_path.display());
        let session = build_session(model_path, intra_threads)
            .map_err(|e| RecognitionError::ModelUnavailable(format!("{:#}", e)))?;

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .unwrap_or_else(|| "x".to_string());

        if let Some(input) = session.inputs.first() {
            debug!("Recognition model expected input: {:?}", input.input_type);
        }

        info!("✅ Plate recognition model loaded (CPU-only)");

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            dictionary: Arc::new(dictionary),
            input_name,
            model_path: model_path.to_path_buf(),
        })
    }

    pub fn dictionary(&self) -> &CharDictionary {
        &self.dictionary
    }

    pub fn model_path(&self) -> &Path {
        &self.model_path
    }

    fn recognize_line(&self, line: &GrayImage) -> Result<Option<TextFragment>, RecognitionError> {
        let input = preprocess_for_recognition(line);
        let input_value = Value::from_array(input)
            .map_err(|e| RecognitionError::Inference(format!("failed to create input tensor: {}", e)))?;

        let mut session = self.session.lock().map_err(|_| {
            RecognitionError::Inference("recognition session lock poisoned".to_string())
        })?;

        let outputs = session
            .run(ort::inputs![&self.input_name => input_value])
            .map_err(|e| RecognitionError::Inference(e.to_string()))?;

        let output = outputs[0]
            .try_extract_array::<f32>()
            .map_err(|e| RecognitionError::Inference(format!("failed to extract output tensor: {}", e)))?;

        let probs = sequence_view(output)?;
        let (text, char_probs) = self.dictionary.decode(probs);

        if text.is_empty() {
            return Ok(None);
        }

        let confidence = char_probs.iter().sum::<f32>() / char_probs.len() as f32;
        Ok(Some(TextFragment::new(text, confidence)))
    }
}

impl TextRecognizer for OnnxTextRecognizer {
    fn recognize(&self, image: &GrayImage) -> Result<Vec<TextFragment>, RecognitionError> {
        let lines = split_text_lines(image);
        let mut fragments = Vec::with_capacity(lines.len());

        for line in &lines {
            if let Some(fragment) = self.recognize_line(line)? {
                fragments.push(fragment);
            }
        }

        debug!(
            "Recognized {} fragment(s) from {} line(s): {:?}",
            fragments.len(),
            lines.len(),
            fragments.iter().map(|f| f.text.as_str()).collect::<Vec<_>>()
        );

        Ok(fragments)
    }
}

/// `[1, T, C]` or `[T, C]` output as a `[T, C]` view
fn sequence_view(output: ArrayViewD<'_, f32>) -> Result<ArrayView2<'_, f32>, RecognitionError> {
    let view = match output.ndim() {
        3 => output.index_axis_move(Axis(0), 0),
        2 => output,
        _ => {
            return Err(RecognitionError::Inference(format!(
                "unexpected recognition output shape: {:?}",
                output.shape()
            )))
        }
    };
    view.into_dimensionality::<Ix2>()
        .map_err(|e| RecognitionError::Inference(e.to_string()))
}

fn build_session(model_path: &Path, intra_threads: usize) -> anyhow::Result<Session> {
    let session = Session::builder()
        .context("Failed to create session builder")?
        .with_execution_providers([CPUExecutionProvider::default().build()])
        .context("Failed to set CPU execution provider")?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .context("Failed to set optimization level")?
        .with_intra_threads(intra_threads.max(1))
        .context("Failed to set intra threads")?
        .commit_from_file(model_path)
        .context(format!(
            "Failed to load plate recognition model from {}",
            model_path.display()
        ))?;
    Ok(session)
}
