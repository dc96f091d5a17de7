// ─────────────────────────────────────────────────────────────────────
// Itinera — Experience Pipeline
// ─────────────────────────────────────────────────────────────────────
//! Wires the engines into one scored experience record.
//!
//! Per request:
//! 1. take a taxonomy snapshot (rejects when none is loaded)
//! 2. completeness gate: a destination is required
//! 3. classify the source as MANAGED / UNMANAGED
//! 4. select tags, or audit a tag set supplied by the caller
//! 5. evaluate listing + itinerary against the source
//!
//! Schema failures in the listing or itinerary do not abort; they show
//! up as `structure_compliance = Fail` in the evaluation. Taxonomy
//! failures always abort.

use std::sync::Arc;

use serde_json::Value;

use itinera_types::{
    ClassificationResult, CompletenessReport, Experience, KernelConfig, KernelError,
    KernelResult, Listing, SchemaKind, ScoredExperience, TagSelection,
};

use crate::classify::ClassificationEngine;
use crate::completeness;
use crate::evidence::{EvidenceScorer, RubricScorer};
use crate::fidelity::{CandidatePart, FidelityEvaluator};
use crate::schema;
use crate::selector::TaxonomySelector;
use crate::taxonomy::TaxonomyStore;

/// One extraction to score: the source text and the candidate outputs
/// of the generation step.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExperienceRequest<'a> {
    pub source: &'a str,
    /// Candidate listing JSON.
    pub listing: &'a str,
    /// Candidate itinerary JSON.
    pub itinerary: &'a str,
    /// Explicit category; inferred when absent.
    pub category: Option<&'a str>,
    /// Externally produced tag set JSON to audit instead of selecting.
    pub tags: Option<&'a str>,
}

/// Request pipeline over a shared taxonomy store.
///
/// Thread-safe: the only shared state is the store, read through
/// per-request snapshots.
pub struct ExperiencePipeline {
    config: KernelConfig,
    store: Arc<TaxonomyStore>,
    scorer: Arc<dyn EvidenceScorer>,
    classifier: ClassificationEngine,
    evaluator: FidelityEvaluator,
}

impl ExperiencePipeline {
    pub fn new(config: KernelConfig, store: Arc<TaxonomyStore>) -> KernelResult<Self> {
        config.validate()?;
        Ok(Self {
            classifier: ClassificationEngine::new(config.clone()),
            evaluator: FidelityEvaluator::new(config.clone()),
            scorer: Arc::new(RubricScorer),
            config,
            store,
        })
    }

    pub fn with_scorer(mut self, scorer: Arc<dyn EvidenceScorer>) -> Self {
        self.scorer = scorer;
        self
    }

    pub fn store(&self) -> &TaxonomyStore {
        &self.store
    }

    /// Score one extraction.
    pub fn process(&self, request: &ExperienceRequest<'_>) -> KernelResult<ScoredExperience> {
        let result = self.run(request);
        if let Err(e) = &result {
            log::error!("experience rejected: {e}");
        }
        result
    }

    fn run(&self, request: &ExperienceRequest<'_>) -> KernelResult<ScoredExperience> {
        let taxonomy = self.store.snapshot()?;

        let listing_value = schema::parse_candidate(request.listing).ok();
        let listing: Option<Listing> = listing_value
            .clone()
            .and_then(|v| schema::validate_value(v, SchemaKind::Listing).ok())
            .and_then(|r| r.listing().ok());

        let completeness: CompletenessReport =
            completeness::check(request.source, listing.as_ref());
        if !completeness.has_destination {
            return Err(KernelError::Incomplete("destination".to_string()));
        }

        let classification: ClassificationResult = self
            .classifier
            .classify_with_listing(request.source, listing.as_ref());

        let selector = TaxonomySelector::new(taxonomy, self.config.clone())
            .with_scorer(Arc::clone(&self.scorer));
        let selection: TagSelection = match request.tags {
            Some(tags) => {
                let candidate = schema::validate(tags, SchemaKind::TagSet)?.tags()?;
                selector.audit(&candidate, request.source)?
            }
            None => selector.select(request.source, request.category)?,
        };

        let evaluation = self
            .evaluator
            .assess_parts(
                request.source,
                &[
                    CandidatePart {
                        label: "basic_information",
                        text: request.listing,
                        kind: SchemaKind::Listing,
                    },
                    CandidatePart {
                        label: "travel_plan",
                        text: request.itinerary,
                        kind: SchemaKind::Itinerary,
                    },
                ],
            )
            .report;

        // Undeclared keys never reach the record, valid or not.
        let basic_information = listing_value
            .map(|v| schema::declared_fields(v, SchemaKind::Listing))
            .unwrap_or_default();
        let travel_plan = match schema::parse_candidate(request.itinerary) {
            Ok(v @ Value::Object(_)) => {
                Value::Object(schema::declared_fields(v, SchemaKind::Itinerary))
            }
            _ => Value::Null,
        };

        log::info!(
            "experience scored {} ({}), validation required: {}",
            evaluation.overall_score,
            classification.plan_type,
            evaluation.validation_required
        );
        Ok(ScoredExperience {
            experience: Experience {
                basic_information,
                plan_type: classification.plan_type,
                travel_plan,
                tags_info: selection.to_experience_tags(),
            },
            classification,
            selection,
            evaluation,
            completeness,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use crate::taxonomy::{ExternalTaxonomy, StaticTaxonomy};
    use itinera_types::{PlanType, StructureCompliance};

    fn loaded_store() -> Arc<TaxonomyStore> {
        let store = TaxonomyStore::new();
        store
            .load(&StaticTaxonomy::new(fixtures::travel_tree()))
            .unwrap();
        Arc::new(store)
    }

    fn request() -> ExperienceRequest<'static> {
        ExperienceRequest {
            source: fixtures::LISTING_SOURCE,
            listing: fixtures::LISTING_JSON,
            itinerary: fixtures::ITINERARY_JSON,
            ..Default::default()
        }
    }

    #[test]
    fn test_fixture_request_end_to_end() {
        let pipeline = ExperiencePipeline::new(KernelConfig::default(), loaded_store()).unwrap();
        let scored = pipeline.process(&request()).unwrap();

        assert_eq!(scored.experience.plan_type, PlanType::Managed);
        assert_eq!(scored.selection.primary_categories, vec!["Water Activities"]);
        assert_eq!(scored.selection.primary_types[0], "Boat Tours");
        assert_eq!(scored.evaluation.structure_compliance, StructureCompliance::Pass);
        assert!(!scored.evaluation.validation_required);
        assert!(scored.completeness.is_complete());

        let json = serde_json::to_value(&scored.experience).unwrap();
        assert_eq!(json["caption"], "Sunset catamaran cruise from Lagos marina");
        assert_eq!(json["plan_type"], "MANAGED");
        assert_eq!(json["tags_info"]["experienceTypes"][0], "Boat Tours");
    }

    #[test]
    fn test_record_keeps_only_declared_listing_keys() {
        let pipeline = ExperiencePipeline::new(KernelConfig::default(), loaded_store()).unwrap();
        let listing = fixtures::LISTING_JSON.replacen(
            '{',
            r#"{"plan_type": "UNMANAGED", "rating": 5, "tags_info": null,"#,
            1,
        );
        let scored = pipeline
            .process(&ExperienceRequest {
                listing: &listing,
                ..request()
            })
            .unwrap();
        assert_eq!(scored.evaluation.structure_compliance, StructureCompliance::Fail);

        let text = serde_json::to_string(&scored.experience).unwrap();
        assert_eq!(text.matches("\"plan_type\"").count(), 1);
        assert!(!text.contains("rating"));
        let back: Experience = serde_json::from_str(&text).unwrap();
        assert_eq!(back.plan_type, PlanType::Managed);
        assert_eq!(
            back.basic_information["caption"],
            "Sunset catamaran cruise from Lagos marina"
        );
        assert!(back.basic_information.get("rating").is_none());
    }

    #[test]
    fn test_unloaded_store_rejects() {
        let store = Arc::new(TaxonomyStore::new());
        let pipeline = ExperiencePipeline::new(KernelConfig::default(), store).unwrap();
        assert!(matches!(
            pipeline.process(&request()),
            Err(KernelError::TaxonomyUnavailable(_))
        ));
    }

    #[test]
    fn test_missing_destination_rejects() {
        let pipeline = ExperiencePipeline::new(KernelConfig::default(), loaded_store()).unwrap();
        let req = ExperienceRequest {
            source: "a boat cruise with dolphins",
            listing: "not json",
            itinerary: "{}",
            ..Default::default()
        };
        let err = pipeline.process(&req).unwrap_err();
        assert_eq!(err.code(), "Incomplete");
    }

    #[test]
    fn test_broken_itinerary_fails_structure_not_request() {
        let pipeline = ExperiencePipeline::new(KernelConfig::default(), loaded_store()).unwrap();
        let req = ExperienceRequest {
            itinerary: r#"{"plan": [{"day": 1}]}"#,
            ..request()
        };
        let scored = pipeline.process(&req).unwrap();
        assert_eq!(scored.evaluation.structure_compliance, StructureCompliance::Fail);
        assert!(scored.evaluation.validation_required);
        assert!(scored.evaluation.validation_reason.contains("travel_plan.plan[0]"));
    }

    #[test]
    fn test_unknown_explicit_category_aborts() {
        let pipeline = ExperiencePipeline::new(KernelConfig::default(), loaded_store()).unwrap();
        let req = ExperienceRequest {
            category: Some("Space Tourism"),
            ..request()
        };
        assert!(matches!(
            pipeline.process(&req),
            Err(KernelError::UnknownTaxonomyTerm { .. })
        ));
    }

    #[test]
    fn test_supplied_tags_are_audited() {
        let pipeline = ExperiencePipeline::new(KernelConfig::default(), loaded_store()).unwrap();
        let tags = r#"{"experienceCategory": ["Water Activities"],
                       "experienceTypes": ["Boat Tours"],
                       "experienceSubTypes": ["Catamaran Sailing"],
                       "experienceTags": ["catamaran", "Scenic Views"],
                       "secondaryTags": {"experienceTypes": [], "experienceSubTypes": [],
                                         "experienceTags": []}}"#;
        let scored = pipeline
            .process(&ExperienceRequest {
                tags: Some(tags),
                ..request()
            })
            .unwrap();
        assert_eq!(scored.selection.primary_subtypes["Boat Tours"], vec!["Catamaran Sailing"]);

        let bad = tags.replace("Scenic Views", "Luxury Escape");
        let err = pipeline
            .process(&ExperienceRequest {
                tags: Some(&bad),
                ..request()
            })
            .unwrap_err();
        assert!(matches!(err, KernelError::TagConstraint(_)));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut cfg = KernelConfig::default();
        cfg.weights.accuracy = 50.0;
        assert!(ExperiencePipeline::new(cfg, loaded_store()).is_err());
    }

    #[test]
    fn test_concurrent_requests_during_reload() {
        let store = loaded_store();
        let pipeline =
            ExperiencePipeline::new(KernelConfig::default(), Arc::clone(&store)).unwrap();
        let json = serde_json::to_string(&fixtures::travel_tree()).unwrap();
        let source = ExternalTaxonomy::new(move || Ok(json.clone()));

        std::thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(|| {
                    for _ in 0..10 {
                        let scored = pipeline.process(&request()).unwrap();
                        assert_eq!(scored.selection.primary_types[0], "Boat Tours");
                    }
                });
            }
            s.spawn(|| {
                for _ in 0..10 {
                    store.load(&source).unwrap();
                }
            });
        });
    }
}
