// ─────────────────────────────────────────────────────────────────────
// Itinera — Managed / Unmanaged Classification Types
// ─────────────────────────────────────────────────────────────────────

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::score::clamp_score;

/// Whether a listing carries commercial booking content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PlanType {
    Managed,
    Unmanaged,
}

impl PlanType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanType::Managed => "MANAGED",
            PlanType::Unmanaged => "UNMANAGED",
        }
    }
}

impl fmt::Display for PlanType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The six commercial elements whose presence makes a listing MANAGED.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommercialElement {
    CancellationPolicy,
    ContactInfo,
    InclusionsExclusions,
    Services,
    PaymentTerms,
    Pricing,
}

impl CommercialElement {
    pub const ALL: [CommercialElement; 6] = [
        CommercialElement::CancellationPolicy,
        CommercialElement::ContactInfo,
        CommercialElement::InclusionsExclusions,
        CommercialElement::Services,
        CommercialElement::PaymentTerms,
        CommercialElement::Pricing,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            CommercialElement::CancellationPolicy => "cancellation policy",
            CommercialElement::ContactInfo => "contact info",
            CommercialElement::InclusionsExclusions => "inclusions/exclusions",
            CommercialElement::Services => "services",
            CommercialElement::PaymentTerms => "payment terms",
            CommercialElement::Pricing => "pricing",
        }
    }
}

impl fmt::Display for CommercialElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    #[serde(rename = "type")]
    pub plan_type: PlanType,
    pub explanation: String,
    pub confidence: f64,
}

impl ClassificationResult {
    pub fn new(plan_type: PlanType, explanation: String, confidence: f64) -> Self {
        Self {
            plan_type,
            explanation,
            confidence: clamp_score(confidence, 0.0, 1.0),
        }
    }

    pub fn is_managed(&self) -> bool {
        self.plan_type == PlanType::Managed
    }
}
