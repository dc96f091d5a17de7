// ─────────────────────────────────────────────────────────────────────
// Itinera — Taxonomy Types
// ─────────────────────────────────────────────────────────────────────

use std::fmt;

use serde::{Deserialize, Serialize};

/// The three fixed levels of the experience taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaxonomyLevel {
    Category,
    Type,
    Subtype,
}

impl TaxonomyLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaxonomyLevel::Category => "category",
            TaxonomyLevel::Type => "type",
            TaxonomyLevel::Subtype => "subtype",
        }
    }

    /// Level of this node's children, `None` below subtypes.
    pub fn child(&self) -> Option<TaxonomyLevel> {
        match self {
            TaxonomyLevel::Category => Some(TaxonomyLevel::Type),
            TaxonomyLevel::Type => Some(TaxonomyLevel::Subtype),
            TaxonomyLevel::Subtype => None,
        }
    }
}

impl fmt::Display for TaxonomyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One node of the category → type → subtype tree.
///
/// `cues` holds the semantic-field phrases counted as supporting details
/// for categories and types. For subtypes it holds the exact definition
/// details: at least one must appear in the source for the subtype to
/// qualify.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxonomyNode {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cues: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TaxonomyNode>,
}

impl TaxonomyNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cues: Vec::new(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_cues<I, S>(mut self, cues: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.cues = cues.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_attributes<I, S>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attributes = attributes.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_children(mut self, children: Vec<TaxonomyNode>) -> Self {
        self.children = children;
        self
    }
}

/// Evidence strength of a single taxonomy term against a source text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvidenceScore {
    pub term: String,
    pub level: TaxonomyLevel,
    /// 0 = no evidence, 1 = one detail, 2 = two or more details,
    /// 3 = named verbatim.
    pub score: u8,
    pub supporting_phrases: Vec<String>,
}

impl EvidenceScore {
    pub const EXPLICIT: u8 = 3;
    pub const STRONG: u8 = 2;
    pub const WEAK: u8 = 1;
    pub const NONE: u8 = 0;

    pub fn none(term: impl Into<String>, level: TaxonomyLevel) -> Self {
        Self {
            term: term.into(),
            level,
            score: Self::NONE,
            supporting_phrases: Vec::new(),
        }
    }

    /// Score 0 never participates in any selection.
    pub fn is_selectable(&self) -> bool {
        self.score > Self::NONE
    }

    pub fn is_explicit(&self) -> bool {
        self.score == Self::EXPLICIT
    }
}
