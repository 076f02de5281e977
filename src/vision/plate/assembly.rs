// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Assembly and validation of recognized text fragments

use tracing::debug;

use super::types::TextFragment;

/// Fragments scoring below this are discarded before assembly
pub const DEFAULT_MIN_FRAGMENT_CONFIDENCE: f32 = 0.3;

/// Assembled plates shorter than this are treated as noise
pub const DEFAULT_MIN_PLATE_LENGTH: usize = 4;

/// Output of [`TextAssembler::assemble`]
#[derive(Debug, Clone, PartialEq)]
pub struct AssembledText {
    /// Cleaned plate text, empty when rejected
    pub text: String,
    /// Mean confidence of the fragments that were used, 0 when rejected
    pub confidence: f32,
}

impl AssembledText {
    pub fn rejected() -> Self {
        Self {
            text: String::new(),
            confidence: 0.0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Merges recognizer fragments into a single plate string
#[derive(Debug, Clone, Copy)]
pub struct TextAssembler {
    min_fragment_confidence: f32,
    min_length: usize,
}

impl Default for TextAssembler {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_FRAGMENT_CONFIDENCE, DEFAULT_MIN_PLATE_LENGTH)
    }
}

impl TextAssembler {
    pub fn new(min_fragment_confidence: f32, min_length: usize) -> Self {
        Self {
            min_fragment_confidence,
            min_length,
        }
    }

    pub fn min_fragment_confidence(&self) -> f32 {
        self.min_fragment_confidence
    }

    pub fn min_length(&self) -> usize {
        self.min_length
    }

    /// Clean, filter and concatenate fragments in recognizer order.
    ///
    /// A fragment is used when its confidence is at or above the floor and it
    /// still has characters after cleaning. The confidence is the mean over
    /// the used fragments only.
    pub fn assemble(&self, fragments: &[TextFragment]) -> AssembledText {
        let mut text = String::new();
        let mut confidence_sum = 0.0f32;
        let mut used = 0usize;

        for fragment in fragments {
            if fragment.confidence.is_nan() || fragment.confidence < self.min_fragment_confidence {
                debug!(
                    "Dropping fragment '{}' (confidence {:.3})",
                    fragment.text, fragment.confidence
                );
                continue;
            }

            let cleaned = clean_fragment(&fragment.text);
            if cleaned.is_empty() {
                continue;
            }

            text.push_str(&cleaned);
            confidence_sum += fragment.confidence;
            used += 1;
        }

        if used == 0 {
            return AssembledText::rejected();
        }

        if text.chars().count() < self.min_length {
            debug!(
                "Rejecting '{}': shorter than {} characters",
                text, self.min_length
            );
            return AssembledText::rejected();
        }

        AssembledText {
            text,
            confidence: confidence_sum / used as f32,
        }
    }
}

/// Keep ASCII letters and digits, uppercased
pub fn clean_fragment(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_uppercase())
        .collect()
}
