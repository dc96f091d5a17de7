// ─────────────────────────────────────────────────────────────────────
// Itinera — Fidelity Score Types
// ─────────────────────────────────────────────────────────────────────
//! Fidelity report and the composite score formula.
//!
//! The composite is deliberately split into small pure steps so the
//! rounding and override order can be checked one at a time:
//!
//! ```text
//! weigh → sum → round → override
//! overall = round(acc*35 + (1-hall)*35 + conc*20 + (Pass ? 10 : 0))
//! overall = 0 if Fail and hall > 0.15
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::{KernelConfig, ScoreWeights};
use crate::error::SchemaViolation;

/// Clamp a value to [lo, hi], mapping NaN to lo and Inf to nearest bound.
#[inline]
pub fn clamp_score(value: f64, lo: f64, hi: f64) -> f64 {
    if value.is_nan() {
        log::warn!("clamp_score: NaN detected, clamping to {lo:.4}");
        return lo;
    }
    if value.is_infinite() {
        let boundary = if value > 0.0 { hi } else { lo };
        log::warn!("clamp_score: Inf detected, clamping to {boundary:.4}");
        return boundary;
    }
    value.clamp(lo, hi)
}

/// Round to two decimals (half away from zero).
#[inline]
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Clamp into [0, 1] and round to two decimals.
#[inline]
pub fn unit_score(value: f64) -> f64 {
    round2(clamp_score(value, 0.0, 1.0))
}

/// Binary schema conformance verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StructureCompliance {
    Pass,
    Fail,
}

impl StructureCompliance {
    pub fn passed(&self) -> bool {
        matches!(self, StructureCompliance::Pass)
    }
}

impl fmt::Display for StructureCompliance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StructureCompliance::Pass => f.write_str("Pass"),
            StructureCompliance::Fail => f.write_str("Fail"),
        }
    }
}

/// Weighted contributions `[accuracy, faithfulness, conciseness, structure]`.
pub fn weigh(
    accuracy: f64,
    hallucination: f64,
    conciseness: f64,
    compliance: StructureCompliance,
    weights: &ScoreWeights,
) -> [f64; 4] {
    [
        accuracy * weights.accuracy,
        (1.0 - hallucination) * weights.faithfulness,
        conciseness * weights.conciseness,
        if compliance.passed() { weights.structure } else { 0.0 },
    ]
}

/// Left-to-right sum of the weighted parts.
pub fn sum_parts(parts: [f64; 4]) -> f64 {
    parts[0] + parts[1] + parts[2] + parts[3]
}

/// Round the weighted sum to an integer score in [0, 100].
pub fn round_score(sum: f64) -> u8 {
    clamp_score(sum.round(), 0.0, 100.0) as u8
}

/// Hard override: a structurally broken, hallucinating record scores 0.
pub fn apply_override(
    score: u8,
    compliance: StructureCompliance,
    hallucination: f64,
    max_hallucination: f64,
) -> u8 {
    if !compliance.passed() && hallucination > max_hallucination {
        0
    } else {
        score
    }
}

/// The full composite: weigh → sum → round → override.
pub fn overall_score(
    accuracy: f64,
    hallucination: f64,
    conciseness: f64,
    compliance: StructureCompliance,
    config: &KernelConfig,
) -> u8 {
    let parts = weigh(accuracy, hallucination, conciseness, compliance, &config.weights);
    let score = round_score(sum_parts(parts));
    apply_override(score, compliance, hallucination, config.max_hallucination)
}

/// True when a record needs no human validation.
pub fn thresholds_met(
    overall: u8,
    hallucination: f64,
    compliance: StructureCompliance,
    config: &KernelConfig,
) -> bool {
    overall >= config.pass_score && hallucination <= config.max_hallucination && compliance.passed()
}

/// Bullet list of at most three issues, cut to `max_chars` characters.
///
/// Whole lines are dropped first; a single over-long line is truncated
/// with a trailing ellipsis.
pub fn format_validation_reason(issues: &[String], max_chars: usize) -> String {
    let mut lines: Vec<String> = issues.iter().take(3).map(|i| format!("- {i}")).collect();
    let mut reason = lines.join("\n");
    while reason.chars().count() > max_chars && lines.len() > 1 {
        lines.pop();
        reason = lines.join("\n");
    }
    if reason.chars().count() > max_chars {
        let keep = max_chars.saturating_sub(3);
        reason = reason.chars().take(keep).collect::<String>() + "...";
    }
    reason
}

/// Quality evaluation of one extraction against its source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FidelityReport {
    pub hallucination: f64,
    pub accuracy: f64,
    pub conciseness: f64,
    pub structure_compliance: StructureCompliance,
    pub overall_score: u8,
    pub validation_required: bool,
    pub validation_reason: String,
}

impl FidelityReport {
    /// Build a report from its components.
    ///
    /// `issues` are the evaluator's findings, most severe first; threshold
    /// breaches not already covered are appended after them.
    pub fn from_components(
        hallucination: f64,
        accuracy: f64,
        conciseness: f64,
        structure_compliance: StructureCompliance,
        issues: &[String],
        config: &KernelConfig,
    ) -> Self {
        let hallucination = unit_score(hallucination);
        let accuracy = unit_score(accuracy);
        let conciseness = unit_score(conciseness);
        let overall = overall_score(
            accuracy,
            hallucination,
            conciseness,
            structure_compliance,
            config,
        );

        let validation_reason =
            if thresholds_met(overall, hallucination, structure_compliance, config) {
                String::new()
            } else {
                let mut all: Vec<String> = issues.to_vec();
                if !structure_compliance.passed() && !all.iter().any(|i| i.starts_with("schema")) {
                    all.push("schema: structure Fail".to_string());
                }
                if hallucination > config.max_hallucination {
                    all.push(format!(
                        "hallucination {hallucination:.2} > {:.2}",
                        config.max_hallucination
                    ));
                }
                if overall < config.pass_score {
                    all.push(format!("score {overall} < {}", config.pass_score));
                }
                format_validation_reason(&all, config.validation_reason_max_chars)
            };

        Self {
            hallucination,
            accuracy,
            conciseness,
            structure_compliance,
            overall_score: overall,
            validation_required: !validation_reason.is_empty(),
            validation_reason,
        }
    }

    /// Recompute the composite from the stored component fields.
    pub fn recompute_overall(&self, config: &KernelConfig) -> u8 {
        overall_score(
            self.accuracy,
            self.hallucination,
            self.conciseness,
            self.structure_compliance,
            config,
        )
    }

    /// Check the stored score and validation fields against the formula.
    pub fn is_consistent(&self, config: &KernelConfig) -> bool {
        let met = thresholds_met(
            self.overall_score,
            self.hallucination,
            self.structure_compliance,
            config,
        );
        self.recompute_overall(config) == self.overall_score
            && met == self.validation_reason.is_empty()
            && self.validation_required == !self.validation_reason.is_empty()
            && self.validation_reason.chars().count() <= config.validation_reason_max_chars
    }
}

/// How well a single extracted fact is backed by the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactSupport {
    Supported,
    /// Plausible but not directly evidenced; counts against accuracy.
    Unsupported,
    /// No support anywhere in the source.
    Hallucinated,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactVerdict {
    pub path: String,
    pub value: String,
    pub support: FactSupport,
}

/// A fidelity report together with the evidence behind it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FidelityAssessment {
    pub report: FidelityReport,
    pub facts: Vec<FactVerdict>,
    pub conciseness_note: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub schema_violations: Vec<SchemaViolation>,
}

impl FidelityAssessment {
    pub fn count(&self, support: FactSupport) -> usize {
        self.facts.iter().filter(|f| f.support == support).count()
    }
}
