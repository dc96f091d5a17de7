// ─────────────────────────────────────────────────────────────────────
// Itinera — Extraction Kernel Core Engine
// (C) 1998-2026 Miroslav Sotek. All rights reserved.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
#![deny(unsafe_code)]
//! Taxonomy selection, schema validation, fidelity scoring and
//! plan-type classification for travel experiences extracted from
//! free text by an external generation step.
//!
//! # Invariants
//!
//! 1. **Taxonomy terms are verbatim**: every category, type and subtype
//!    emitted or accepted exists in the loaded taxonomy snapshot, with
//!    its parent also selected. Nothing is paraphrased.
//!
//! 2. **No snapshot, no result**: requests against a store that has
//!    never loaded fail with `TaxonomyUnavailable`. A failed reload keeps
//!    the previous snapshot.
//!
//! 3. **Scores are reproducible**: the overall score is a pure function
//!    of the four components and the configured weights, and
//!    [`FidelityEvaluator::verify_report`] rejects reports that disagree.
//!
//! 4. **Structure failures are scored, not raised**: a candidate that
//!    breaks its schema still yields a report with
//!    `structure_compliance = Fail`.

pub mod classify;
pub mod completeness;
pub mod evidence;
pub mod fidelity;
pub mod pipeline;
pub mod schema;
pub mod selector;
pub mod taxonomy;
pub mod text;

#[doc(hidden)]
pub mod fixtures;

pub use classify::ClassificationEngine;
pub use evidence::{EvidenceScorer, ExternalScorer, RubricScorer};
pub use fidelity::{CandidatePart, FidelityEvaluator};
pub use pipeline::{ExperiencePipeline, ExperienceRequest};
pub use schema::{validate, ValidRecord};
pub use selector::TaxonomySelector;
pub use taxonomy::{ExternalTaxonomy, StaticTaxonomy, Taxonomy, TaxonomySource, TaxonomyStore};
pub use text::SourceText;
