// ─────────────────────────────────────────────────────────────────────
// Itinera — Extraction Kernel Error Hierarchy
// ─────────────────────────────────────────────────────────────────────

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::record::SchemaKind;
use crate::taxonomy::TaxonomyLevel;

/// Root error type for all kernel failures.
#[derive(Error, Debug)]
pub enum KernelError {
    /// The taxonomy source could not be fetched or no snapshot is loaded.
    #[error("taxonomy unavailable: {0}")]
    TaxonomyUnavailable(String),

    /// A term is not verbatim-present in the taxonomy store.
    #[error("unknown taxonomy term: {level} '{term}'")]
    UnknownTaxonomyTerm { level: TaxonomyLevel, term: String },

    /// A tag set breaks a cardinality, provenance or disjointness rule.
    #[error("tag constraint violated: {0}")]
    TagConstraint(String),

    /// Candidate record does not match its declared schema.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// The source lacks a fact the pipeline cannot proceed without.
    #[error("incomplete source: missing {0}")]
    Incomplete(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),
}

pub type KernelResult<T> = Result<T, KernelError>;

impl KernelError {
    /// Stable machine-readable code for the error variant.
    pub fn code(&self) -> &'static str {
        match self {
            KernelError::TaxonomyUnavailable(_) => "TaxonomyUnavailable",
            KernelError::UnknownTaxonomyTerm { .. } => "UnknownTaxonomyTerm",
            KernelError::TagConstraint(_) => "TagConstraint",
            KernelError::Schema(_) => "SchemaError",
            KernelError::Incomplete(_) => "Incomplete",
            KernelError::Config(_) => "ConfigError",
        }
    }

    /// Structured, serializable form of the error for callers that
    /// report failures as JSON.
    pub fn to_report(&self) -> ErrorReport {
        let violations = match self {
            KernelError::Schema(e) => e.violations.clone(),
            _ => Vec::new(),
        };
        ErrorReport {
            error: self.code().to_string(),
            constraint: self.to_string(),
            violations,
        }
    }
}

/// JSON-facing error object carrying the violated constraint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorReport {
    pub error: String,
    pub constraint: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub violations: Vec<SchemaViolation>,
}

/// A single schema constraint failure, located by JSON path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaViolation {
    /// Dotted path into the candidate, e.g. `plan[0].schedule[1].type.name`.
    pub path: String,
    /// The violated constraint in plain words.
    pub constraint: String,
}

impl SchemaViolation {
    pub fn new(path: impl Into<String>, constraint: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            constraint: constraint.into(),
        }
    }
}

impl fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "$: {}", self.constraint)
        } else {
            write!(f, "{}: {}", self.path, self.constraint)
        }
    }
}

/// Every violation found while checking a candidate against its schema.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[error("{kind} record violates {} schema constraint(s)", .violations.len())]
pub struct SchemaError {
    pub kind: SchemaKind,
    pub violations: Vec<SchemaViolation>,
}

impl SchemaError {
    pub fn new(kind: SchemaKind, violations: Vec<SchemaViolation>) -> Self {
        Self { kind, violations }
    }

    pub fn first(&self) -> Option<&SchemaViolation> {
        self.violations.first()
    }
}
