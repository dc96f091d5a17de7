// ─────────────────────────────────────────────────────────────────────
// Itinera — Extraction Kernel Configuration
// ─────────────────────────────────────────────────────────────────────

use serde::{Deserialize, Serialize};

use crate::error::{KernelError, KernelResult};

/// Weights of the composite fidelity score. Must sum to 100.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    pub accuracy: f64,
    /// Applied to `1 - hallucination`.
    pub faithfulness: f64,
    pub conciseness: f64,
    /// Awarded in full on structure Pass, nothing on Fail.
    pub structure: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            accuracy: 35.0,
            faithfulness: 35.0,
            conciseness: 20.0,
            structure: 10.0,
        }
    }
}

impl ScoreWeights {
    pub fn total(&self) -> f64 {
        self.accuracy + self.faithfulness + self.conciseness + self.structure
    }
}

/// Runtime configuration for the extraction kernel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelConfig {
    /// Composite score weights. Default: 35 / 35 / 20 / 10.
    pub weights: ScoreWeights,

    /// Minimum overall score that needs no human validation. Default: 80.
    pub pass_score: u8,

    /// Hallucination ceiling for passing records; above it with a
    /// structure Fail the score is forced to 0. Default: 0.15.
    pub max_hallucination: f64,

    /// Maximum length of `validation_reason` in characters. Default: 100.
    pub validation_reason_max_chars: usize,

    /// Categories inferred when none is supplied. Default: 3.
    pub max_categories: usize,

    /// Independent supporting phrases a category needs. Default: 2.
    pub min_category_support: usize,

    /// Default: 2.
    pub max_primary_types: usize,

    /// Default: 4.
    pub max_primary_subtypes: usize,

    /// Default: 8 (half verbatim source phrases, half taxonomy terms).
    pub primary_tags: usize,

    /// Default: 2.
    pub max_secondary_types: usize,

    /// Default: 3.
    pub max_secondary_subtypes: usize,

    /// Default: 5.
    pub secondary_tags: usize,

    /// Longest verbatim source phrase usable as a tag, in words. Default: 3.
    pub max_tag_words: usize,

    /// Share of a fact's content tokens found in the source for it to
    /// count as supported. Default: 0.8.
    pub supported_coverage: f64,

    /// Below `supported_coverage` but at least this share: unsupported
    /// (inferred). Below this: hallucinated. Default: 0.4.
    pub inferred_coverage: f64,

    /// Token-set Jaccard similarity at which two facts repeat each other.
    /// Default: 0.8.
    pub near_duplicate_similarity: f64,

    /// Captions longer than this many words count as fluff. Default: 20.
    pub max_caption_words: usize,

    /// Other text fields longer than this many words count as fluff.
    /// Default: 45.
    pub max_field_words: usize,

    /// Sources shorter than this give weak evidence of absence when
    /// classifying. Default: 20.
    pub min_words_for_absence: usize,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            weights: ScoreWeights::default(),
            pass_score: 80,
            max_hallucination: 0.15,
            validation_reason_max_chars: 100,
            max_categories: 3,
            min_category_support: 2,
            max_primary_types: 2,
            max_primary_subtypes: 4,
            primary_tags: 8,
            max_secondary_types: 2,
            max_secondary_subtypes: 3,
            secondary_tags: 5,
            max_tag_words: 3,
            supported_coverage: 0.8,
            inferred_coverage: 0.4,
            near_duplicate_similarity: 0.8,
            max_caption_words: 20,
            max_field_words: 45,
            min_words_for_absence: 20,
        }
    }
}

impl KernelConfig {
    /// Validate configuration parameters.
    pub fn validate(&self) -> KernelResult<()> {
        if (self.weights.total() - 100.0).abs() > 1e-9 {
            return Err(KernelError::Config(format!(
                "score weights must sum to 100, got {}",
                self.weights.total()
            )));
        }
        let w = &self.weights;
        if [w.accuracy, w.faithfulness, w.conciseness, w.structure]
            .iter()
            .any(|v| !v.is_finite() || *v < 0.0)
        {
            return Err(KernelError::Config(
                "score weights must be finite and non-negative".to_string(),
            ));
        }
        if self.pass_score > 100 {
            return Err(KernelError::Config(format!(
                "pass_score must be in [0, 100], got {}",
                self.pass_score
            )));
        }
        if !(0.0..=1.0).contains(&self.max_hallucination) {
            return Err(KernelError::Config(format!(
                "max_hallucination must be in [0, 1], got {}",
                self.max_hallucination
            )));
        }
        if !(0.0..=1.0).contains(&self.supported_coverage)
            || !(0.0..=1.0).contains(&self.inferred_coverage)
        {
            return Err(KernelError::Config(
                "coverage thresholds must be in [0, 1]".to_string(),
            ));
        }
        if self.inferred_coverage > self.supported_coverage {
            return Err(KernelError::Config(format!(
                "inferred_coverage ({}) must not exceed supported_coverage ({})",
                self.inferred_coverage, self.supported_coverage
            )));
        }
        if !(0.0..=1.0).contains(&self.near_duplicate_similarity) {
            return Err(KernelError::Config(format!(
                "near_duplicate_similarity must be in [0, 1], got {}",
                self.near_duplicate_similarity
            )));
        }
        if self.min_category_support < 1 {
            return Err(KernelError::Config(
                "min_category_support must be >= 1".to_string(),
            ));
        }
        if self.max_tag_words < 1 {
            return Err(KernelError::Config("max_tag_words must be >= 1".to_string()));
        }
        if self.validation_reason_max_chars < 10 {
            return Err(KernelError::Config(format!(
                "validation_reason_max_chars must be >= 10, got {}",
                self.validation_reason_max_chars
            )));
        }
        Ok(())
    }

    /// Load from JSON string. Missing fields take their defaults.
    pub fn from_json(json: &str) -> KernelResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| KernelError::Config(format!("JSON parse error: {e}")))
    }

    /// Verbatim source phrases among the primary tags.
    pub fn primary_verbatim_tags(&self) -> usize {
        self.primary_tags / 2
    }

    /// Verbatim source phrases among the secondary tags.
    pub fn secondary_verbatim_tags(&self) -> usize {
        self.secondary_tags / 2
    }
}
