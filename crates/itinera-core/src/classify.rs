// ─────────────────────────────────────────────────────────────────────
// Itinera — Classification Engine
// ─────────────────────────────────────────────────────────────────────
//! MANAGED / UNMANAGED decision over six commercial elements.
//!
//! Each element is detected by strong cues (explicit headings, contact
//! and currency patterns) or weak cues (loose vocabulary). A single weak
//! word is too common to count on its own; an element is weakly present
//! only when two distinct weak cues appear.
//!
//! Confidence:
//! - MANAGED: certainty of the strongest element (strong 0.95, weak 0.6)
//!   plus 0.05 per further element, capped at 1.0
//! - UNMANAGED: 0.9, or 0.6 when the source is shorter than
//!   `min_words_for_absence` words

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

use itinera_types::{ClassificationResult, CommercialElement, KernelConfig, Listing, PlanType};

use crate::text::{MatchMode, SourceText};

static EMAIL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b[A-Z0-9._%+-]+@[A-Z0-9.-]+\.[A-Z]{2,}\b").expect("email pattern")
});

static PHONE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:\+\d{1,3}[-.\s]?)?\(?\d{2,4}\)?[-.\s]?\d{3,4}[-.\s]?\d{3,4}\b")
        .expect("phone pattern")
});

static CURRENCY_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)[$€£₹¥]\s?\d|\b(?:usd|eur|gbp|inr|rs\.?|aud|cad|jpy)\s?\d|\d[\d,.]*\s?(?:usd|eur|gbp|inr|aud|cad|jpy|dollars|euros|rupees)\b",
    )
    .expect("currency pattern")
});

pub const STRONG_CERTAINTY: f64 = 0.95;
pub const WEAK_CERTAINTY: f64 = 0.6;
pub const CORROBORATION_BONUS: f64 = 0.05;
pub const ABSENCE_CONFIDENCE: f64 = 0.9;
pub const SHORT_ABSENCE_CONFIDENCE: f64 = 0.6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Certainty {
    Weak,
    Strong,
}

impl Certainty {
    pub fn value(&self) -> f64 {
        match self {
            Certainty::Strong => STRONG_CERTAINTY,
            Certainty::Weak => WEAK_CERTAINTY,
        }
    }
}

/// A detected element and the cue that gave it away.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementEvidence {
    pub element: CommercialElement,
    pub certainty: Certainty,
    pub cues: Vec<String>,
}

impl fmt::Display for ElementEvidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.element, self.cues.join(", "))
    }
}

#[derive(Debug, Clone, Copy)]
enum Pattern {
    Email,
    Phone,
    Currency,
}

impl Pattern {
    fn regex(&self) -> &'static Regex {
        match self {
            Pattern::Email => &EMAIL_PATTERN,
            Pattern::Phone => &PHONE_PATTERN,
            Pattern::Currency => &CURRENCY_PATTERN,
        }
    }
}

struct CueSet {
    strong: &'static [&'static str],
    weak: &'static [&'static str],
    patterns: &'static [Pattern],
}

fn cues_for(element: CommercialElement) -> CueSet {
    match element {
        CommercialElement::CancellationPolicy => CueSet {
            strong: &[
                "cancellation policy",
                "free cancellation",
                "refund policy",
                "non refundable",
                "fully refundable",
                "cancellation fee",
                "cancellation charges",
            ],
            weak: &["cancel", "cancellation", "refund", "reschedule", "no show"],
            patterns: &[],
        },
        CommercialElement::ContactInfo => CueSet {
            strong: &["contact us", "call us", "email us", "whatsapp", "contact number"],
            weak: &["contact", "call", "email", "phone", "website", "enquiry"],
            patterns: &[Pattern::Email, Pattern::Phone],
        },
        CommercialElement::InclusionsExclusions => CueSet {
            strong: &[
                "inclusions",
                "exclusions",
                "what s included",
                "not included",
                "price includes",
                "inclusive of",
            ],
            weak: &["included", "includes", "excluded", "excludes", "provided", "complimentary"],
            patterns: &[],
        },
        CommercialElement::Services => CueSet {
            strong: &[
                "hotel pickup",
                "airport transfer",
                "tour guide",
                "guide service",
                "pickup and drop",
                "accommodation",
            ],
            weak: &["guide", "pickup", "transfer", "transport", "meals", "equipment", "driver"],
            patterns: &[],
        },
        CommercialElement::PaymentTerms => CueSet {
            strong: &[
                "payment terms",
                "advance payment",
                "deposit",
                "balance due",
                "payment due",
                "pay online",
            ],
            weak: &["payment", "pay", "upi", "credit card", "cash", "instalment", "installment"],
            patterns: &[],
        },
        CommercialElement::Pricing => CueSet {
            strong: &["per person", "price list", "prices start", "tariff"],
            weak: &["price", "cost", "fee", "rate", "charge", "discount"],
            patterns: &[Pattern::Currency],
        },
    }
}

/// Deterministic classifier over extracted travel information.
#[derive(Debug, Clone, Default)]
pub struct ClassificationEngine {
    config: KernelConfig,
}

impl ClassificationEngine {
    pub fn new(config: KernelConfig) -> Self {
        Self { config }
    }

    /// Classify free text.
    pub fn classify(&self, extracted: &str) -> ClassificationResult {
        self.classify_with_listing(extracted, None)
    }

    /// Classify free text, also counting inclusion/exclusion lists of an
    /// already validated listing as strong evidence.
    pub fn classify_with_listing(
        &self,
        extracted: &str,
        listing: Option<&Listing>,
    ) -> ClassificationResult {
        let text = SourceText::new(extracted);
        let mut found = self.detect(&text);
        if let Some(listing) = listing {
            merge_listing_lists(&mut found, listing);
        }

        let missing: Vec<CommercialElement> = CommercialElement::ALL
            .iter()
            .copied()
            .filter(|e| !found.iter().any(|f| f.element == *e))
            .collect();
        let explanation = explain(&found, &missing);

        let (plan_type, confidence) = match found.iter().map(|f| f.certainty).max() {
            Some(best) => {
                let bonus = CORROBORATION_BONUS * (found.len() - 1) as f64;
                (PlanType::Managed, (best.value() + bonus).min(1.0))
            }
            None if text.word_count() < self.config.min_words_for_absence => {
                (PlanType::Unmanaged, SHORT_ABSENCE_CONFIDENCE)
            }
            None => (PlanType::Unmanaged, ABSENCE_CONFIDENCE),
        };
        log::debug!("classified {plan_type} ({confidence:.2}): {explanation}");
        ClassificationResult::new(plan_type, explanation, confidence)
    }

    /// Every element present in the text, in canonical order.
    pub fn detect(&self, text: &SourceText) -> Vec<ElementEvidence> {
        CommercialElement::ALL
            .iter()
            .filter_map(|&element| detect_element(text, element))
            .collect()
    }
}

fn detect_element(text: &SourceText, element: CommercialElement) -> Option<ElementEvidence> {
    let cues = cues_for(element);
    let mut strong: Vec<String> = cues
        .patterns
        .iter()
        .filter_map(|p| p.regex().find(text.raw()))
        .map(|m| m.as_str().trim().to_string())
        .collect();
    strong.extend(text.independent_phrases(cues.strong, MatchMode::Stemmed));
    if !strong.is_empty() {
        return Some(ElementEvidence {
            element,
            certainty: Certainty::Strong,
            cues: strong,
        });
    }
    let weak = text.independent_phrases(cues.weak, MatchMode::Stemmed);
    (weak.len() >= 2).then_some(ElementEvidence {
        element,
        certainty: Certainty::Weak,
        cues: weak,
    })
}

fn merge_listing_lists(found: &mut Vec<ElementEvidence>, listing: &Listing) {
    let filled = |l: &Option<Vec<String>>| l.as_ref().is_some_and(|v| !v.is_empty());
    if !(filled(&listing.inclusion) || filled(&listing.exclusion)) {
        return;
    }
    let evidence = ElementEvidence {
        element: CommercialElement::InclusionsExclusions,
        certainty: Certainty::Strong,
        cues: vec!["listing inclusion/exclusion".to_string()],
    };
    match found
        .iter_mut()
        .find(|f| f.element == CommercialElement::InclusionsExclusions)
    {
        Some(existing) => *existing = evidence,
        None => {
            found.push(evidence);
            found.sort_by_key(|f| f.element);
        }
    }
}

fn explain(found: &[ElementEvidence], missing: &[CommercialElement]) -> String {
    let found = if found.is_empty() {
        "none".to_string()
    } else {
        found
            .iter()
            .map(|f| f.element.label())
            .collect::<Vec<_>>()
            .join(", ")
    };
    let missing = if missing.is_empty() {
        "none".to_string()
    } else {
        missing.iter().map(|e| e.label()).collect::<Vec<_>>().join(", ")
    };
    format!("found: {found}; missing: {missing}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    fn engine() -> ClassificationEngine {
        ClassificationEngine::default()
    }

    #[test]
    fn test_fixture_source_is_managed() {
        let r = engine().classify(fixtures::LISTING_SOURCE);
        assert_eq!(r.plan_type, PlanType::Managed);
        assert!(r.explanation.contains("cancellation policy"));
        assert!(r.explanation.contains("contact info"));
        assert!(r.explanation.contains("pricing"));
        assert!((r.confidence - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_single_strong_element() {
        let r = engine().classify("Free cancellation up to 48 hours before departure.");
        assert_eq!(r.plan_type, PlanType::Managed);
        assert!((r.confidence - STRONG_CERTAINTY).abs() < 1e-9);
        assert!(r.explanation.starts_with("found: cancellation policy; missing: contact info"));
    }

    #[test]
    fn test_single_weak_word_ignored() {
        let r = engine().classify("We had to call a taxi back to the hotel.");
        assert_eq!(r.plan_type, PlanType::Unmanaged);
    }

    #[test]
    fn test_two_weak_cues_count() {
        let r = engine().classify("Drop us an email or give us a call to book.");
        assert_eq!(r.plan_type, PlanType::Managed);
        assert!((r.confidence - WEAK_CERTAINTY).abs() < 1e-9);
    }

    #[test]
    fn test_unmanaged_short_text_low_confidence() {
        let r = engine().classify("Beautiful sunset over the bay.");
        assert_eq!(r.plan_type, PlanType::Unmanaged);
        assert!((r.confidence - SHORT_ABSENCE_CONFIDENCE).abs() < 1e-9);
        assert_eq!(
            r.explanation,
            "found: none; missing: cancellation policy, contact info, inclusions/exclusions, \
             services, payment terms, pricing"
        );
    }

    #[test]
    fn test_unmanaged_long_text_high_confidence() {
        let diary = "We woke early and wandered down to the harbour where the fishing boats \
                     were coming in. The light over the water was soft and golden and the \
                     gulls circled overhead while we sat on the sea wall.";
        let r = engine().classify(diary);
        assert_eq!(r.plan_type, PlanType::Unmanaged);
        assert!((r.confidence - ABSENCE_CONFIDENCE).abs() < 1e-9);
    }

    #[test]
    fn test_currency_patterns() {
        let text = SourceText::new("Tickets from €35, kids INR 500.");
        let found = engine().detect(&text);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].element, CommercialElement::Pricing);
        assert_eq!(found[0].certainty, Certainty::Strong);
    }

    #[test]
    fn test_listing_lists_are_strong_evidence() {
        let listing: Listing = serde_json::from_str(fixtures::LISTING_JSON).unwrap();
        let r = engine().classify_with_listing("A lovely day out.", Some(&listing));
        assert_eq!(r.plan_type, PlanType::Managed);
        assert!(r.explanation.starts_with("found: inclusions/exclusions;"));
    }
}
