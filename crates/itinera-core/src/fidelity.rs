// ─────────────────────────────────────────────────────────────────────
// Itinera — Fidelity Evaluator
// ─────────────────────────────────────────────────────────────────────
//! Scores a structured extraction against its source text.
//!
//! The candidate is decomposed into atomic facts (leaf strings, numbers,
//! list items). Each fact is checked against the source:
//!
//! - strings: share of content tokens present in the source,
//!   `≥ supported_coverage` → Supported, `≥ inferred_coverage` →
//!   Unsupported, otherwise Hallucinated
//! - numbers: Supported when the same value appears in the source
//!
//! Estimated fields (tags, coordinates, durations, FAQ questions) are
//! lenient: a miss there is Unsupported rather than Hallucinated.
//!
//! `hallucination = hallucinated / total` and
//! `accuracy = supported / (supported + unsupported)`; both are rounded
//! to two decimals before the composite is computed so stored reports
//! recompute to the same score.

use std::collections::HashSet;

use serde_json::Value;

use itinera_types::score::{clamp_score, round2};
use itinera_types::{
    FactSupport, FactVerdict, FidelityAssessment, FidelityReport, KernelConfig, KernelError,
    KernelResult, SchemaError, SchemaKind, SchemaViolation, StructureCompliance,
};

use crate::schema;
use crate::text::{content_tokens, jaccard, word_count, SourceText};

/// Keys whose values are layout constants rather than claims.
const STRUCTURAL_KEYS: &[&str] = &["time", "timeline", "day"];
const STRUCTURAL_SUFFIXES: &[&str] = &["type.name", "coordinates.type"];

/// Keys whose values are estimated or taxonomy-derived.
const LENIENT_KEYS: &[&str] = &["coordinates", "duration in hours", "question", "secondaryTags"];

/// Repeats are only looked for in facts with at least this many content
/// tokens; short values such as a city name legitimately recur.
const MIN_REPEAT_TOKENS: usize = 3;

/// A leaf value extracted from a candidate record.
#[derive(Debug, Clone, PartialEq)]
pub enum FactValue {
    Text(String),
    Number(f64),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Fact {
    pub path: String,
    pub value: FactValue,
}

impl Fact {
    fn key(&self) -> &str {
        last_key(&self.path)
    }

    fn render(&self) -> String {
        match &self.value {
            FactValue::Text(s) => s.clone(),
            FactValue::Number(n) => n.to_string(),
        }
    }
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('.').map(|s| s.split('[').next().unwrap_or(s))
}

fn last_key(path: &str) -> &str {
    segments(path).last().unwrap_or("")
}

fn join(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}.{key}")
    }
}

fn is_structural(path: &str) -> bool {
    let bare: String = segments(path).collect::<Vec<_>>().join(".");
    STRUCTURAL_KEYS.contains(&last_key(path))
        || STRUCTURAL_SUFFIXES.iter().any(|s| bare.ends_with(s))
}

fn is_lenient(path: &str) -> bool {
    segments(path).any(|k| LENIENT_KEYS.contains(&k) || k.starts_with("experience"))
}

/// Flatten a record into atomic facts.
///
/// Empty strings, booleans and nulls carry no checkable claim and are
/// skipped, as are structural constants.
pub fn decompose(value: &Value) -> Vec<Fact> {
    let mut out = Vec::new();
    collect(value, "", &mut out);
    out
}

fn collect(value: &Value, path: &str, out: &mut Vec<Fact>) {
    match value {
        Value::Object(map) => {
            for (k, v) in map {
                collect(v, &join(path, k), out);
            }
        }
        Value::Array(items) => {
            for (i, v) in items.iter().enumerate() {
                collect(v, &format!("{path}[{i}]"), out);
            }
        }
        Value::String(s) if !s.trim().is_empty() && !is_structural(path) => out.push(Fact {
            path: path.to_string(),
            value: FactValue::Text(s.clone()),
        }),
        Value::Number(n) if !is_structural(path) => {
            if let Some(v) = n.as_f64() {
                out.push(Fact {
                    path: path.to_string(),
                    value: FactValue::Number(v),
                });
            }
        }
        _ => {}
    }
}

/// Hallucinated share of the verdicts, rounded to two decimals.
pub fn hallucination_rate(facts: &[FactVerdict]) -> f64 {
    if facts.is_empty() {
        return 0.0;
    }
    let h = facts.iter().filter(|f| f.support == FactSupport::Hallucinated).count();
    round2(h as f64 / facts.len() as f64)
}

/// Supported share of the verifiable-but-not-invented verdicts; 1.0
/// when there are none.
pub fn accuracy_rate(facts: &[FactVerdict]) -> f64 {
    let supported = facts.iter().filter(|f| f.support == FactSupport::Supported).count();
    let unsupported = facts.iter().filter(|f| f.support == FactSupport::Unsupported).count();
    if supported + unsupported == 0 {
        return 1.0;
    }
    round2(supported as f64 / (supported + unsupported) as f64)
}

/// Conciseness score with the justification behind it.
#[derive(Debug, Clone, PartialEq)]
pub struct Conciseness {
    pub score: f64,
    pub note: String,
    /// `(path, earlier path it repeats)`.
    pub repeats: Vec<(String, String)>,
    pub verbose: Vec<String>,
}

/// A candidate part to evaluate: a path prefix, the raw text and the
/// schema it must follow.
#[derive(Debug, Clone, Copy)]
pub struct CandidatePart<'a> {
    pub label: &'a str,
    pub text: &'a str,
    pub kind: SchemaKind,
}

/// Deterministic fidelity evaluator.
#[derive(Debug, Clone, Default)]
pub struct FidelityEvaluator {
    config: KernelConfig,
}

impl FidelityEvaluator {
    pub fn new(config: KernelConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    /// Evaluate one candidate record against its source.
    pub fn evaluate(&self, source: &str, candidate: &str, kind: SchemaKind) -> FidelityReport {
        self.assess(source, candidate, kind).report
    }

    /// As [`evaluate`](Self::evaluate), with the verdicts and
    /// justification behind the report.
    pub fn assess(&self, source: &str, candidate: &str, kind: SchemaKind) -> FidelityAssessment {
        self.assess_parts(
            source,
            &[CandidatePart {
                label: "",
                text: candidate,
                kind,
            }],
        )
    }

    /// Evaluate several candidate parts as one extraction. Paths of each
    /// part are prefixed with its label.
    pub fn assess_parts(&self, source: &str, parts: &[CandidatePart<'_>]) -> FidelityAssessment {
        let mut values = Vec::with_capacity(parts.len());
        for part in parts {
            match schema::parse_candidate(part.text) {
                Ok(v) => values.push((part.label, v, part.kind)),
                Err(violation) => {
                    let violation = SchemaViolation::new(
                        join(part.label, &violation.path),
                        violation.constraint,
                    );
                    return self.unverifiable(violation);
                }
            }
        }
        let text = SourceText::new(source);
        self.assess_values(&text, &values)
    }

    /// Evaluate already parsed parts.
    pub fn assess_values(
        &self,
        source: &SourceText,
        parts: &[(&str, Value, SchemaKind)],
    ) -> FidelityAssessment {
        let mut violations: Vec<SchemaViolation> = Vec::new();
        let mut facts: Vec<Fact> = Vec::new();
        for (label, value, kind) in parts {
            violations.extend(
                schema::check(value, *kind)
                    .into_iter()
                    .map(|v| SchemaViolation::new(join(label, &v.path), v.constraint)),
            );
            facts.extend(decompose(value).into_iter().map(|f| Fact {
                path: join(label, &f.path),
                value: f.value,
            }));
        }

        let verdicts: Vec<FactVerdict> = facts
            .iter()
            .map(|f| FactVerdict {
                path: f.path.clone(),
                value: f.render(),
                support: self.classify_fact(source, f),
            })
            .collect();
        let conciseness = self.conciseness(&facts);
        let compliance = if violations.is_empty() {
            StructureCompliance::Pass
        } else {
            StructureCompliance::Fail
        };

        let issues = issues(&violations, &verdicts, &conciseness);
        let report = FidelityReport::from_components(
            hallucination_rate(&verdicts),
            accuracy_rate(&verdicts),
            conciseness.score,
            compliance,
            &issues,
            &self.config,
        );
        log::debug!(
            "fidelity: {} facts, hallucination {:.2}, accuracy {:.2}, score {}",
            verdicts.len(),
            report.hallucination,
            report.accuracy,
            report.overall_score
        );
        FidelityAssessment {
            report,
            facts: verdicts,
            conciseness_note: conciseness.note,
            schema_violations: violations,
        }
    }

    /// Nothing in an unparseable candidate can be verified.
    fn unverifiable(&self, violation: SchemaViolation) -> FidelityAssessment {
        log::warn!("candidate not parseable: {violation}");
        let issue = format!("schema: {violation}");
        let report = FidelityReport::from_components(
            1.0,
            0.0,
            0.0,
            StructureCompliance::Fail,
            &[issue],
            &self.config,
        );
        FidelityAssessment {
            report,
            facts: Vec::new(),
            conciseness_note: "candidate could not be parsed".to_string(),
            schema_violations: vec![violation],
        }
    }

    /// Support verdict for one fact.
    pub fn classify_fact(&self, source: &SourceText, fact: &Fact) -> FactSupport {
        let support = match &fact.value {
            FactValue::Number(n) => {
                if source.has_number(n.abs()) {
                    FactSupport::Supported
                } else {
                    FactSupport::Hallucinated
                }
            }
            FactValue::Text(s) => {
                let tokens = content_tokens(s);
                if tokens.is_empty() {
                    FactSupport::Supported
                } else {
                    let found = tokens.iter().filter(|t| source.has_stem(t)).count();
                    let coverage = found as f64 / tokens.len() as f64;
                    if coverage >= self.config.supported_coverage {
                        FactSupport::Supported
                    } else if coverage >= self.config.inferred_coverage {
                        FactSupport::Unsupported
                    } else {
                        FactSupport::Hallucinated
                    }
                }
            }
        };
        if support == FactSupport::Hallucinated && is_lenient(&fact.path) {
            FactSupport::Unsupported
        } else {
            support
        }
    }

    /// Redundancy and verbosity heuristics.
    ///
    /// | finding                        | score           |
    /// |--------------------------------|-----------------|
    /// | nothing                        | 1.0             |
    /// | over-long fields only, ≤ 10 %  | 0.9             |
    /// | over-long fields only, > 10 %  | 0.8             |
    /// | repeats, ratio r ≤ 0.5         | 0.7 − 0.4·r     |
    /// | repeats, ratio r > 0.5         | 1 − r           |
    pub fn conciseness(&self, facts: &[Fact]) -> Conciseness {
        let texts: Vec<(&Fact, HashSet<String>)> = facts
            .iter()
            .filter_map(|f| match &f.value {
                FactValue::Text(s) => Some((f, content_tokens(s).into_iter().collect())),
                FactValue::Number(_) => None,
            })
            .collect();

        let mut repeats: Vec<(String, String)> = Vec::new();
        for (j, (fact, tokens)) in texts.iter().enumerate() {
            if tokens.len() < MIN_REPEAT_TOKENS {
                continue;
            }
            let earlier = texts[..j].iter().find(|(_, other)| {
                other.len() >= MIN_REPEAT_TOKENS
                    && jaccard(tokens, other) >= self.config.near_duplicate_similarity
            });
            if let Some((first, _)) = earlier {
                repeats.push((fact.path.clone(), first.path.clone()));
            }
        }

        let verbose: Vec<String> = texts
            .iter()
            .filter(|(f, _)| {
                let limit = if f.key() == "caption" {
                    self.config.max_caption_words
                } else {
                    self.config.max_field_words
                };
                matches!(&f.value, FactValue::Text(s) if word_count(s) > limit)
            })
            .map(|(f, _)| f.path.clone())
            .collect();

        let n = texts.len().max(1) as f64;
        let (score, note) = if let Some((path, first)) = repeats.first() {
            let r = repeats.len() as f64 / n;
            let score = if r <= 0.5 { 0.7 - 0.4 * r } else { 1.0 - r };
            (
                score,
                format!("{} repeated field(s); {path} repeats {first}", repeats.len()),
            )
        } else if let Some(path) = verbose.first() {
            let share = verbose.len() as f64 / n;
            let score = if share <= 0.1 { 0.9 } else { 0.8 };
            (score, format!("{} over-long field(s), e.g. {path}", verbose.len()))
        } else {
            (1.0, "no redundancy".to_string())
        };

        Conciseness {
            score: clamp_score(score, 0.0, 1.0),
            note,
            repeats,
            verbose,
        }
    }

    /// Check an externally produced evaluation: it must match the
    /// evaluation schema and recompute to its own stored score.
    pub fn verify_report(&self, text: &str) -> KernelResult<FidelityReport> {
        let report = schema::validate(text, SchemaKind::Evaluation)?.evaluation()?;
        if report.is_consistent(&self.config) {
            return Ok(report);
        }
        let expected = report.recompute_overall(&self.config);
        let violation = if expected != report.overall_score {
            SchemaViolation::new(
                "overall_score",
                format!("stored {} but components give {expected}", report.overall_score),
            )
        } else {
            SchemaViolation::new(
                "validation_reason",
                "validation fields disagree with the thresholds",
            )
        };
        Err(KernelError::Schema(SchemaError::new(
            SchemaKind::Evaluation,
            vec![violation],
        )))
    }
}

/// Findings ordered by severity: schema, hallucinated, unsupported,
/// repeated.
fn issues(
    violations: &[SchemaViolation],
    verdicts: &[FactVerdict],
    conciseness: &Conciseness,
) -> Vec<String> {
    let mut out: Vec<String> = violations.iter().map(|v| format!("schema: {v}")).collect();
    for support in [FactSupport::Hallucinated, FactSupport::Unsupported] {
        let label = match support {
            FactSupport::Hallucinated => "hallucinated",
            _ => "unsupported",
        };
        out.extend(
            verdicts
                .iter()
                .filter(|v| v.support == support)
                .map(|v| format!("{label}: {}", v.path)),
        );
    }
    out.extend(
        conciseness
            .repeats
            .iter()
            .map(|(path, first)| format!("repeat: {path} = {first}")),
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    fn evaluator() -> FidelityEvaluator {
        FidelityEvaluator::default()
    }

    fn verdict(support: FactSupport) -> FactVerdict {
        FactVerdict {
            path: "summary[0]".into(),
            value: "x".into(),
            support,
        }
    }

    const COAST_SOURCE: &str = "Kayak the sea caves at Ponta da Piedade. Lunch at a beach cafe. \
        Swim at Camilo beach. Visit the old town. Sunset at the lighthouse. \
        Dinner of grilled sardines. Boat back to the marina.";

    #[test]
    fn test_three_of_ten_hallucinated() {
        let mut facts = vec![verdict(FactSupport::Supported); 7];
        facts.extend(vec![verdict(FactSupport::Hallucinated); 3]);
        assert!((hallucination_rate(&facts) - 0.30).abs() < 1e-12);
    }

    #[test]
    fn test_three_fabricated_items_end_to_end() {
        let candidate = r#"{"plan": [{
            "day": "1",
            "caption": "Sea caves at Ponta da Piedade",
            "description": [
                "Kayak the sea caves", "Lunch at a beach cafe", "Swim at Camilo beach",
                "Visit the old town", "Sunset at the lighthouse", "Dinner of grilled sardines",
                "Helicopter flight over Lisbon", "Private wine tasting", "Hot air balloon ride"
            ],
            "schedule": []
        }]}"#;
        let a = evaluator().assess(COAST_SOURCE, candidate, SchemaKind::Itinerary);
        assert_eq!(a.facts.len(), 10);
        assert_eq!(a.count(FactSupport::Hallucinated), 3);
        assert!((a.report.hallucination - 0.30).abs() < 1e-12);
        assert!((a.report.accuracy - 1.0).abs() < 1e-12);
        assert_eq!(a.report.structure_compliance, StructureCompliance::Pass);
        assert!(a.report.validation_required);
        assert!(a.report.validation_reason.contains("hallucinated: plan[0].description[6]"));
    }

    #[test]
    fn test_empty_candidate() {
        let a = evaluator().assess(COAST_SOURCE, "{}", SchemaKind::Listing);
        assert!(a.facts.is_empty());
        assert!((a.report.accuracy - 1.0).abs() < 1e-12);
        assert!(a.report.hallucination.abs() < 1e-12);
        assert_eq!(a.report.structure_compliance, StructureCompliance::Fail);
        // no override: hallucination is 0
        assert_eq!(a.report.overall_score, 90);
    }

    #[test]
    fn test_unparseable_candidate_scores_zero() {
        let r = evaluator().evaluate(
            COAST_SOURCE,
            "Sure! Here is the JSON: {",
            SchemaKind::Listing,
        );
        assert!((r.hallucination - 1.0).abs() < 1e-12);
        assert!(r.accuracy.abs() < 1e-12);
        assert!(r.conciseness.abs() < 1e-12);
        assert_eq!(r.structure_compliance, StructureCompliance::Fail);
        assert_eq!(r.overall_score, 0);
        assert!(r.validation_required);
        assert!(r.validation_reason.chars().count() <= 100);
    }

    #[test]
    fn test_fixture_listing_scores_high() {
        let a = evaluator().assess(
            fixtures::LISTING_SOURCE,
            fixtures::LISTING_JSON,
            SchemaKind::Listing,
        );
        assert_eq!(a.count(FactSupport::Hallucinated), 0);
        // coordinates and the FAQ question are not evidenced in the text
        assert_eq!(a.count(FactSupport::Unsupported), 3);
        assert!((a.report.accuracy - 0.75).abs() < 1e-12);
        assert!((a.report.conciseness - 1.0).abs() < 1e-12);
        assert_eq!(a.report.overall_score, 91);
        assert!(!a.report.validation_required);
        assert!(a.report.is_consistent(evaluator().config()));
    }

    #[test]
    fn test_structural_constants_are_not_facts() {
        let value: Value = serde_json::from_str(fixtures::ITINERARY_JSON).unwrap();
        let paths: Vec<String> = decompose(&value).into_iter().map(|f| f.path).collect();
        assert!(!paths.iter().any(|p| p.ends_with(".day")));
        assert!(!paths.iter().any(|p| p.ends_with(".time") || p.ends_with(".timeline")));
        assert!(!paths.iter().any(|p| p.ends_with("type.name")));
        assert!(paths.contains(&"plan[0].schedule[0].type.value.name".to_string()));
        assert!(paths.contains(&"plan[0].schedule[0].type.value.duration in hours".to_string()));
    }

    #[test]
    fn test_numbers_checked_against_source() {
        let text = SourceText::new("Tour lasts 3 hours and costs 1,200 INR");
        let e = evaluator();
        let fact = |path: &str, v: f64| Fact {
            path: path.into(),
            value: FactValue::Number(v),
        };
        assert_eq!(e.classify_fact(&text, &fact("price", 1200.0)), FactSupport::Supported);
        assert_eq!(e.classify_fact(&text, &fact("price", 99.0)), FactSupport::Hallucinated);
        assert_eq!(
            e.classify_fact(&text, &fact("a.value.duration in hours", 5.0)),
            FactSupport::Unsupported
        );
    }

    #[test]
    fn test_partial_coverage_is_unsupported() {
        let text = SourceText::new("Guided walk through the old town");
        let fact = Fact {
            path: "summary[0]".into(),
            value: FactValue::Text("Guided walk with lunch".into()),
        };
        // guid, walk, lunch: 2 of 3 found
        assert_eq!(evaluator().classify_fact(&text, &fact), FactSupport::Unsupported);
    }

    #[test]
    fn test_repeats_lower_conciseness_with_citation() {
        let text = |p: &str, s: &str| Fact {
            path: p.into(),
            value: FactValue::Text(s.into()),
        };
        let facts = vec![
            text("caption", "Sunset catamaran cruise from Lagos"),
            text("summary[0]", "Sunset catamaran cruise from Lagos"),
            text("summary[1]", "Dolphins along the coast at dusk"),
            text("summary[2]", "Drinks served by the crew"),
        ];
        let c = evaluator().conciseness(&facts);
        // r = 1/4 → 0.7 - 0.1
        assert!((c.score - 0.6).abs() < 1e-9);
        assert!(c.note.contains("summary[0] repeats caption"));
    }

    #[test]
    fn test_bloated_output() {
        let facts: Vec<Fact> = (0..4)
            .map(|i| Fact {
                path: format!("summary[{i}]"),
                value: FactValue::Text("Sunset cruise with dolphins and drinks".into()),
            })
            .collect();
        let c = evaluator().conciseness(&facts);
        // 3 of 4 repeat the first
        assert!((c.score - 0.25).abs() < 1e-9);
        assert!(c.score < 0.5);
    }

    #[test]
    fn test_verbose_field_minor_fluff() {
        let long = vec!["word"; 30].join(" ");
        let mut facts = vec![Fact {
            path: "caption".into(),
            value: FactValue::Text(long),
        }];
        for i in 0..9 {
            facts.push(Fact {
                path: format!("summary[{i}]"),
                value: FactValue::Text(format!("item {i}")),
            });
        }
        let c = evaluator().conciseness(&facts);
        assert!((c.score - 0.9).abs() < 1e-9);
        assert_eq!(c.verbose, vec!["caption"]);
    }

    #[test]
    fn test_override_when_fail_and_hallucinating() {
        let candidate =
            r#"{"caption": "Helicopter flight over Lisbon", "summary": ["Private wine tasting"]}"#;
        let r = evaluator().evaluate(COAST_SOURCE, candidate, SchemaKind::Listing);
        assert_eq!(r.structure_compliance, StructureCompliance::Fail);
        assert!(r.hallucination > 0.15);
        assert_eq!(r.overall_score, 0);
    }

    #[test]
    fn test_parts_are_prefixed() {
        let a = evaluator().assess_parts(
            fixtures::LISTING_SOURCE,
            &[
                CandidatePart {
                    label: "basic_information",
                    text: fixtures::LISTING_JSON,
                    kind: SchemaKind::Listing,
                },
                CandidatePart {
                    label: "travel_plan",
                    text: fixtures::ITINERARY_JSON,
                    kind: SchemaKind::Itinerary,
                },
            ],
        );
        assert!(a.facts.iter().any(|f| f.path == "basic_information.caption"));
        assert!(a.facts.iter().any(|f| f.path == "travel_plan.plan[0].caption"));
        assert_eq!(a.report.structure_compliance, StructureCompliance::Pass);
        assert_eq!(a.count(FactSupport::Hallucinated), 0);
        assert!(!a.report.validation_required);
    }

    #[test]
    fn test_verify_report_accepts_consistent() {
        let json = r#"{"hallucination": 0.1, "accuracy": 0.9, "conciseness": 0.8,
                       "structure_compliance": "Pass", "overall_score": 89,
                       "validation_required": false, "validation_reason": ""}"#;
        let report = evaluator().verify_report(json).unwrap();
        assert_eq!(report.overall_score, 89);
    }

    #[test]
    fn test_verify_report_rejects_inflated_score() {
        let json = r#"```json
            {"hallucination": 0.1, "accuracy": 0.9, "conciseness": 0.8,
             "structure_compliance": "Pass", "overall_score": 93,
             "validation_required": false, "validation_reason": ""}
            ```"#;
        let err = evaluator().verify_report(json).unwrap_err();
        match err {
            KernelError::Schema(e) => assert_eq!(e.violations[0].path, "overall_score"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
