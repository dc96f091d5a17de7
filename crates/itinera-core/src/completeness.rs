// ─────────────────────────────────────────────────────────────────────
// Itinera — Completeness Check
// ─────────────────────────────────────────────────────────────────────
//! Presence gate for destination, travel dates and traveler count.

use once_cell::sync::Lazy;
use regex::Regex;

use itinera_types::{CompletenessReport, Listing};

static PLACE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b(?:[Ii]n|[Tt]o|[Aa]t|[Ff]rom|[Vv]isit(?:ing)?|[Nn]ear|[Aa]round|[Dd]estination:?)\s+[A-Z][\p{L}'-]+",
    )
    .expect("place pattern")
});

static DATE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?ix)
        \b\d{1,2}[/.-]\d{1,2}[/.-]\d{2,4}\b
        | \b\d{4}-\d{2}-\d{2}\b
        | \b(?:jan|feb|mar|apr|may|jun|jul|aug|sep|sept|oct|nov|dec)[a-z]*\.?\s+\d{1,2}\b
        | \b\d{1,2}(?:st|nd|rd|th)?\s+(?:jan|feb|mar|apr|may|jun|jul|aug|sep|sept|oct|nov|dec)[a-z]*\b
        | \b(?:monday|tuesday|wednesday|thursday|friday|saturday|sunday)s?\b
        | \bday\s+\d+\b
        | \b\d+\s+(?:days?|nights?)\b
        | \b(?:tomorrow|weekend|check[-\s]?in|check[-\s]?out)\b",
    )
    .expect("date pattern")
});

static TRAVELER_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?ix)
        \b\d+\s+(?:people|persons?|guests?|travell?ers?|adults?|children|child|kids?|pax|participants?)\b
        | \b(?:solo|couple|family|honeymoon|group\s+of)\b",
    )
    .expect("traveler pattern")
});

pub fn mentions_destination(source: &str) -> bool {
    PLACE_PATTERN.is_match(source)
}

pub fn mentions_dates(source: &str) -> bool {
    DATE_PATTERN.is_match(source)
}

pub fn mentions_travelers(source: &str) -> bool {
    TRAVELER_PATTERN.is_match(source)
}

/// Check a source (and its listing, when one was extracted) for the
/// three core trip facts.
pub fn check(source: &str, listing: Option<&Listing>) -> CompletenessReport {
    let has_destination = listing.is_some_and(|l| l.location.has_destination())
        || mentions_destination(source);
    let report = CompletenessReport::new(
        has_destination,
        mentions_dates(source),
        mentions_travelers(source),
    );
    if !report.is_complete() {
        log::debug!("source incomplete, missing {:?}", report.missing);
    }
    report
}
