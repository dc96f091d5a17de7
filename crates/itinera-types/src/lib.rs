// ─────────────────────────────────────────────────────────────────────
// Itinera — Extraction Kernel Types
// (C) 1998-2026 Miroslav Sotek. All rights reserved.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
#![deny(unsafe_code)]
//! Data model, configuration, and error hierarchy for the Itinera
//! extraction kernel: the validation and scoring gate that sits behind
//! the external generation step of the travel-experience pipeline.

pub mod classification;
pub mod config;
pub mod error;
pub mod record;
pub mod score;
pub mod tags;
pub mod taxonomy;

pub use classification::{ClassificationResult, CommercialElement, PlanType};
pub use config::KernelConfig;
pub use error::{ErrorReport, KernelError, KernelResult, SchemaError, SchemaViolation};
pub use record::{
    CompletenessReport, Experience, Listing, SchemaKind, ScoredExperience, TravelPlan,
};
pub use score::{FactSupport, FactVerdict, FidelityAssessment, FidelityReport, StructureCompliance};
pub use tags::{ExperienceTags, SecondaryExperienceTags, TagSelection};
pub use taxonomy::{EvidenceScore, TaxonomyLevel, TaxonomyNode};
