// ─────────────────────────────────────────────────────────────────────
// Itinera — Schema Validator
// ─────────────────────────────────────────────────────────────────────
//! Declarative shape checks for candidate records.
//!
//! Each record kind has a [`Shape`] tree built once. Validation walks the
//! candidate JSON against it and collects every violation with its path;
//! nothing is corrected. Only the top level of a record is closed to
//! undeclared keys.

use once_cell::sync::Lazy;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use itinera_types::{
    ClassificationResult, ExperienceTags, FidelityReport, Listing, SchemaError, SchemaKind,
    SchemaViolation, TravelPlan,
};

use crate::taxonomy::json_type;

/// Expected shape of a JSON value.
#[derive(Debug, Clone)]
pub enum Shape {
    Str,
    /// Number no smaller than zero.
    NonNegative,
    /// Number within an inclusive range.
    Range(f64, f64),
    /// Integer within an inclusive range.
    Int(i64, i64),
    Bool,
    Enum(&'static [&'static str]),
    Array(Box<Shape>),
    /// Array of exactly two numbers.
    Pair,
    Object { fields: Vec<Field>, closed: bool },
    Nullable(Box<Shape>),
}

#[derive(Debug, Clone)]
pub struct Field {
    pub name: &'static str,
    pub shape: Shape,
    pub required: bool,
}

fn req(name: &'static str, shape: Shape) -> Field {
    Field { name, shape, required: true }
}

fn opt(name: &'static str, shape: Shape) -> Field {
    Field { name, shape, required: false }
}

fn obj(fields: Vec<Field>) -> Shape {
    Shape::Object { fields, closed: false }
}

fn record(fields: Vec<Field>) -> Shape {
    Shape::Object { fields, closed: true }
}

fn list(shape: Shape) -> Shape {
    Shape::Array(Box::new(shape))
}

pub const ACTIVITY_KINDS: &[&str] = &["activity", "travel", "meal", "rest"];
pub const TIMES_OF_DAY: &[&str] = &["Morning", "Afternoon", "Evening", "Night", ""];
pub const COMPLIANCE: &[&str] = &["Pass", "Fail"];
pub const PLAN_TYPES: &[&str] = &["MANAGED", "UNMANAGED"];

static LISTING: Lazy<Shape> = Lazy::new(|| {
    record(vec![
        req("caption", Shape::Str),
        req("summary", list(Shape::Str)),
        req(
            "location",
            obj(vec![
                req("city", Shape::Str),
                req("state", Shape::Str),
                req("country", Shape::Str),
                req("placeName", Shape::Str),
                req(
                    "coordinates",
                    obj(vec![req("type", Shape::Str), req("coordinates", Shape::Pair)]),
                ),
            ]),
        ),
        opt("inclusion", Shape::Nullable(Box::new(list(Shape::Str)))),
        opt("exclusion", Shape::Nullable(Box::new(list(Shape::Str)))),
        req(
            "faq",
            list(obj(vec![req("question", Shape::Str), req("answer", Shape::Str)])),
        ),
    ])
});

static ITINERARY: Lazy<Shape> = Lazy::new(|| {
    let activity = obj(vec![
        req("name", Shape::Enum(ACTIVITY_KINDS)),
        req(
            "value",
            obj(vec![
                req("name", Shape::Str),
                req("duration in hours", Shape::NonNegative),
            ]),
        ),
        opt("placename", Shape::Nullable(Box::new(Shape::Str))),
    ]);
    let schedule_item = obj(vec![
        req("time", Shape::Enum(TIMES_OF_DAY)),
        req("timeline", Shape::Str),
        req("description", list(Shape::Str)),
        req("type", activity),
        opt("caption", Shape::Nullable(Box::new(Shape::Str))),
    ]);
    record(vec![req(
        "plan",
        list(obj(vec![
            req("day", Shape::Str),
            req("caption", Shape::Str),
            req("description", list(Shape::Str)),
            req("schedule", list(schedule_item)),
        ])),
    )])
});

static TAG_SET: Lazy<Shape> = Lazy::new(|| {
    record(vec![
        req("experienceCategory", list(Shape::Str)),
        req("experienceTypes", list(Shape::Str)),
        req("experienceSubTypes", list(Shape::Str)),
        req("experienceTags", list(Shape::Str)),
        req(
            "secondaryTags",
            obj(vec![
                req("experienceTypes", list(Shape::Str)),
                req("experienceSubTypes", list(Shape::Str)),
                req("experienceTags", list(Shape::Str)),
            ]),
        ),
    ])
});

static EVALUATION: Lazy<Shape> = Lazy::new(|| {
    record(vec![
        req("hallucination", Shape::Range(0.0, 1.0)),
        req("accuracy", Shape::Range(0.0, 1.0)),
        req("conciseness", Shape::Range(0.0, 1.0)),
        req("structure_compliance", Shape::Enum(COMPLIANCE)),
        req("overall_score", Shape::Int(0, 100)),
        req("validation_required", Shape::Bool),
        req("validation_reason", Shape::Str),
    ])
});

static CLASSIFICATION: Lazy<Shape> = Lazy::new(|| {
    record(vec![
        req("type", Shape::Enum(PLAN_TYPES)),
        req("explanation", Shape::Str),
        req("confidence", Shape::Range(0.0, 1.0)),
    ])
});

pub fn shape_for(kind: SchemaKind) -> &'static Shape {
    match kind {
        SchemaKind::Listing => &LISTING,
        SchemaKind::Itinerary => &ITINERARY,
        SchemaKind::TagSet => &TAG_SET,
        SchemaKind::Evaluation => &EVALUATION,
        SchemaKind::Classification => &CLASSIFICATION,
    }
}

/// Strip a surrounding markdown code fence (```` ```json ```` or bare
/// ```` ``` ````), if present.
pub fn strip_code_fence(text: &str) -> &str {
    let s = text.trim();
    let Some(rest) = s.strip_prefix("```") else {
        return s;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    let rest = rest.trim_start();
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Parse candidate text as JSON after fence stripping.
pub fn parse_candidate(text: &str) -> Result<Value, SchemaViolation> {
    serde_json::from_str(strip_code_fence(text))
        .map_err(|e| SchemaViolation::new("", format!("not valid JSON: {e}")))
}

/// A candidate that passed its schema.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidRecord {
    pub kind: SchemaKind,
    pub value: Value,
}

impl ValidRecord {
    fn typed<T: DeserializeOwned>(&self) -> Result<T, SchemaError> {
        serde_json::from_value(self.value.clone()).map_err(|e| {
            SchemaError::new(self.kind, vec![SchemaViolation::new("", e.to_string())])
        })
    }

    pub fn listing(&self) -> Result<Listing, SchemaError> {
        self.typed()
    }

    pub fn travel_plan(&self) -> Result<TravelPlan, SchemaError> {
        self.typed()
    }

    pub fn tags(&self) -> Result<ExperienceTags, SchemaError> {
        self.typed()
    }

    pub fn evaluation(&self) -> Result<FidelityReport, SchemaError> {
        self.typed()
    }

    pub fn classification(&self) -> Result<ClassificationResult, SchemaError> {
        self.typed()
    }
}

/// Parse and validate candidate text.
pub fn validate(candidate: &str, kind: SchemaKind) -> Result<ValidRecord, SchemaError> {
    let value = parse_candidate(candidate).map_err(|v| SchemaError::new(kind, vec![v]))?;
    validate_value(value, kind)
}

/// Validate an already parsed candidate.
pub fn validate_value(value: Value, kind: SchemaKind) -> Result<ValidRecord, SchemaError> {
    let violations = check(&value, kind);
    if violations.is_empty() {
        Ok(ValidRecord { kind, value })
    } else {
        log::debug!("{kind} candidate failed {} schema check(s)", violations.len());
        Err(SchemaError::new(kind, violations))
    }
}

/// Every violation of `kind`'s schema in `value`.
pub fn check(value: &Value, kind: SchemaKind) -> Vec<SchemaViolation> {
    let mut out = Vec::new();
    walk(value, shape_for(kind), "", &mut out);
    out
}

/// The top-level keys of `value` that `kind` declares. Non-objects
/// yield an empty map.
pub fn declared_fields(value: Value, kind: SchemaKind) -> Map<String, Value> {
    let (Value::Object(map), Shape::Object { fields, .. }) = (value, shape_for(kind)) else {
        return Map::new();
    };
    map.into_iter()
        .filter(|(key, _)| fields.iter().any(|f| f.name == key.as_str()))
        .collect()
}

fn join(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{path}.{key}")
    }
}

fn walk(value: &Value, shape: &Shape, path: &str, out: &mut Vec<SchemaViolation>) {
    let mut fail = |constraint: String| out.push(SchemaViolation::new(path, constraint));
    match shape {
        Shape::Str => {
            if !value.is_string() {
                fail(format!("expected string, got {}", json_type(value)));
            }
        }
        Shape::NonNegative => match value.as_f64() {
            Some(v) if v >= 0.0 => {}
            Some(v) => fail(format!("{v} is negative")),
            None => fail(format!("expected number, got {}", json_type(value))),
        },
        Shape::Range(lo, hi) => match value.as_f64() {
            Some(v) if (*lo..=*hi).contains(&v) => {}
            Some(v) => fail(format!("{v} outside [{lo}, {hi}]")),
            None => fail(format!("expected number, got {}", json_type(value))),
        },
        Shape::Int(lo, hi) => match value.as_i64() {
            Some(v) if (*lo..=*hi).contains(&v) => {}
            Some(v) => fail(format!("{v} outside [{lo}, {hi}]")),
            None => fail(format!("expected integer, got {}", value)),
        },
        Shape::Bool => {
            if !value.is_boolean() {
                fail(format!("expected boolean, got {}", json_type(value)));
            }
        }
        Shape::Enum(allowed) => match value.as_str() {
            Some(s) if allowed.contains(&s) => {}
            Some(s) => fail(format!("'{s}' not one of {allowed:?}")),
            None => fail(format!("expected string, got {}", json_type(value))),
        },
        Shape::Pair => match value.as_array() {
            Some(items) if items.len() == 2 && items.iter().all(Value::is_number) => {}
            Some(items) if items.len() != 2 => {
                fail(format!("expected 2 numbers, got {} item(s)", items.len()))
            }
            Some(_) => fail("coordinate pair must be numeric".to_string()),
            None => fail(format!("expected array, got {}", json_type(value))),
        },
        Shape::Nullable(inner) => {
            if !value.is_null() {
                walk(value, inner, path, out);
            }
        }
        Shape::Array(item) => match value.as_array() {
            Some(items) => {
                for (i, v) in items.iter().enumerate() {
                    walk(v, item, &format!("{path}[{i}]"), out);
                }
            }
            None => fail(format!("expected array, got {}", json_type(value))),
        },
        Shape::Object { fields, closed } => {
            let Some(map) = value.as_object() else {
                fail(format!("expected object, got {}", json_type(value)));
                return;
            };
            for field in fields {
                match map.get(field.name) {
                    Some(v) => walk(v, &field.shape, &join(path, field.name), out),
                    None if field.required => out.push(SchemaViolation::new(
                        join(path, field.name),
                        "required key missing",
                    )),
                    None => {}
                }
            }
            if *closed {
                for key in map.keys() {
                    if !fields.iter().any(|f| f.name == key) {
                        out.push(SchemaViolation::new(join(path, key), "undeclared key"));
                    }
                }
            }
        }
    }
}
