// ─────────────────────────────────────────────────────────────────────
// Itinera — Evidence Scorer
// ─────────────────────────────────────────────────────────────────────
//! 0–3 rubric scoring of taxonomy terms against source text.
//!
//! | score | meaning                                             |
//! |-------|-----------------------------------------------------|
//! | 3     | the term itself appears verbatim                    |
//! | 2     | two or more independent cue phrases                 |
//! | 1     | exactly one cue phrase                              |
//! | 0     | nothing; the term cannot be selected                |
//!
//! Types match cues after light stemming. Subtypes are gated: their cues
//! are definition details and must match exactly, otherwise the subtype
//! scores 0 whatever its parent scored.

use itinera_types::{EvidenceScore, TaxonomyLevel};

use crate::text::{MatchMode, SourceText};

/// Trait for evidence backends.
pub trait EvidenceScorer: Send + Sync {
    fn score(
        &self,
        source: &SourceText,
        term: &str,
        level: TaxonomyLevel,
        cues: &[String],
    ) -> EvidenceScore;
}

/// Deterministic rubric scorer.
#[derive(Debug, Clone, Copy, Default)]
pub struct RubricScorer;

impl EvidenceScorer for RubricScorer {
    fn score(
        &self,
        source: &SourceText,
        term: &str,
        level: TaxonomyLevel,
        cues: &[String],
    ) -> EvidenceScore {
        if source.contains_phrase(term, MatchMode::Exact) {
            return EvidenceScore {
                term: term.to_string(),
                level,
                score: EvidenceScore::EXPLICIT,
                supporting_phrases: vec![term.to_string()],
            };
        }

        let mode = match level {
            TaxonomyLevel::Subtype => MatchMode::Exact,
            _ => MatchMode::Stemmed,
        };
        let found = source.independent_phrases(cues, mode);
        let score = match found.len() {
            0 => EvidenceScore::NONE,
            1 => EvidenceScore::WEAK,
            _ => EvidenceScore::STRONG,
        };
        log::debug!("evidence {level} '{term}': {score} from {found:?}");
        EvidenceScore {
            term: term.to_string(),
            level,
            score,
            supporting_phrases: found,
        }
    }
}

/// External evidence backend that calls a scoring function.
///
/// The function returns a raw score and its supporting phrases. Scores
/// above 3 are clamped; the subtype gate is enforced on the result, so a
/// subtype with no exact supporting phrase in the source scores 0.
type EvidenceFn = Box<dyn Fn(&str, &str, TaxonomyLevel) -> (u8, Vec<String>) + Send + Sync>;

pub struct ExternalScorer {
    score_fn: EvidenceFn,
}

impl ExternalScorer {
    pub fn new(
        score_fn: impl Fn(&str, &str, TaxonomyLevel) -> (u8, Vec<String>) + Send + Sync + 'static,
    ) -> Self {
        Self {
            score_fn: Box::new(score_fn),
        }
    }
}

impl EvidenceScorer for ExternalScorer {
    fn score(
        &self,
        source: &SourceText,
        term: &str,
        level: TaxonomyLevel,
        _cues: &[String],
    ) -> EvidenceScore {
        let (raw, phrases) = (self.score_fn)(source.raw(), term, level);
        let mut score = raw.min(EvidenceScore::EXPLICIT);
        if raw > EvidenceScore::EXPLICIT {
            log::warn!("external evidence score {raw} for '{term}' clamped to 3");
        }
        let phrases: Vec<String> = phrases
            .into_iter()
            .filter(|p| source.contains_phrase(p, MatchMode::Exact))
            .collect();
        if level == TaxonomyLevel::Subtype && phrases.is_empty() {
            score = EvidenceScore::NONE;
        }
        EvidenceScore {
            term: term.to_string(),
            level,
            score,
            supporting_phrases: phrases,
        }
    }
}
