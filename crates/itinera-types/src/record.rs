// ─────────────────────────────────────────────────────────────────────
// Itinera — Structured Experience Records
// ─────────────────────────────────────────────────────────────────────
//! Typed forms of the candidate records produced by the generation step.
//! The schema validator checks raw JSON first; these types are only
//! built from records that already passed.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::classification::{ClassificationResult, PlanType};
use crate::score::FidelityReport;
use crate::tags::{ExperienceTags, TagSelection};

/// The record shapes the schema validator knows how to check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaKind {
    Listing,
    Itinerary,
    TagSet,
    Evaluation,
    Classification,
}

impl SchemaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SchemaKind::Listing => "listing",
            SchemaKind::Itinerary => "itinerary",
            SchemaKind::TagSet => "tag_set",
            SchemaKind::Evaluation => "evaluation",
            SchemaKind::Classification => "classification",
        }
    }
}

impl fmt::Display for SchemaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// GeoJSON point: `[longitude, latitude]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    #[serde(rename = "type")]
    pub kind: String,
    pub coordinates: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub city: String,
    pub state: String,
    pub country: String,
    #[serde(rename = "placeName")]
    pub place_name: String,
    pub coordinates: Coordinates,
}

impl Location {
    /// True when any place-identifying field is filled in.
    pub fn has_destination(&self) -> bool {
        [&self.city, &self.state, &self.country, &self.place_name]
            .iter()
            .any(|s| !s.trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Faq {
    pub question: String,
    pub answer: String,
}

/// Listing: caption, summary, location, inclusions/exclusions and FAQ.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub caption: String,
    pub summary: Vec<String>,
    pub location: Location,
    #[serde(default)]
    pub inclusion: Option<Vec<String>>,
    #[serde(default)]
    pub exclusion: Option<Vec<String>>,
    pub faq: Vec<Faq>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeValue {
    pub name: String,
    #[serde(rename = "duration in hours")]
    pub duration_in_hours: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityType {
    /// One of `activity`, `travel`, `meal`, `rest`.
    pub name: String,
    pub value: TypeValue,
    #[serde(default)]
    pub placename: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleItem {
    /// One of `Morning`, `Afternoon`, `Evening`, `Night` or empty.
    pub time: String,
    pub timeline: String,
    pub description: Vec<String>,
    #[serde(rename = "type")]
    pub activity: ActivityType,
    #[serde(default)]
    pub caption: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanItem {
    pub day: String,
    pub caption: String,
    pub description: Vec<String>,
    pub schedule: Vec<ScheduleItem>,
}

/// Day-by-day itinerary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TravelPlan {
    pub plan: Vec<PlanItem>,
}

impl TravelPlan {
    pub fn total_hours(&self) -> f64 {
        self.plan
            .iter()
            .flat_map(|day| day.schedule.iter())
            .map(|item| item.activity.value.duration_in_hours)
            .sum()
    }
}

/// Which of the core trip facts a source mentions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletenessReport {
    pub has_destination: bool,
    pub has_dates: bool,
    pub has_travelers: bool,
    pub missing: Vec<String>,
}

impl CompletenessReport {
    pub fn new(has_destination: bool, has_dates: bool, has_travelers: bool) -> Self {
        let missing = [
            (has_destination, "destination"),
            (has_dates, "travel dates"),
            (has_travelers, "travelers"),
        ]
        .iter()
        .filter(|(present, _)| !present)
        .map(|(_, name)| name.to_string())
        .collect();
        Self {
            has_destination,
            has_dates,
            has_travelers,
            missing,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Combined experience record: listing fields at the top level, then
/// the plan type, itinerary and tag set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Experience {
    #[serde(flatten)]
    pub basic_information: Map<String, Value>,
    pub plan_type: PlanType,
    pub travel_plan: Value,
    pub tags_info: ExperienceTags,
}

/// An experience record together with everything the kernel concluded
/// about it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredExperience {
    pub experience: Experience,
    pub classification: ClassificationResult,
    pub selection: TagSelection,
    pub evaluation: FidelityReport,
    pub completeness: CompletenessReport,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_itinerary_duration_key_with_spaces() {
        let json = r#"{
            "plan": [{
                "day": "1", "caption": "Old town", "description": [],
                "schedule": [{
                    "time": "Morning", "timeline": "Morning", "description": ["Walk"],
                    "type": {"name": "activity", "value": {"name": "Heritage Walk", "duration in hours": 3.5}}
                }]
            }]
        }"#;
        let plan: TravelPlan = serde_json::from_str(json).unwrap();
        assert!((plan.total_hours() - 3.5).abs() < 1e-9);
        assert!(plan.plan[0].schedule[0].activity.placename.is_none());
    }

    #[test]
    fn test_location_destination() {
        let loc = Location {
            city: String::new(),
            state: String::new(),
            country: "Portugal".into(),
            place_name: String::new(),
            coordinates: Coordinates { kind: "Point".into(), coordinates: vec![-9.1, 38.7] },
        };
        assert!(loc.has_destination());
    }

    #[test]
    fn test_completeness_missing_fields() {
        let report = CompletenessReport::new(true, false, false);
        assert!(!report.is_complete());
        assert_eq!(report.missing, vec!["travel dates", "travelers"]);
        assert!(CompletenessReport::new(true, true, true).is_complete());
    }

    #[test]
    fn test_experience_flattens_listing() {
        let mut basic = Map::new();
        basic.insert("caption".into(), Value::from("Harbour cruise"));
        let exp = Experience {
            basic_information: basic,
            plan_type: PlanType::Managed,
            travel_plan: serde_json::json!({"plan": []}),
            tags_info: ExperienceTags::default(),
        };
        let json = serde_json::to_value(&exp).unwrap();
        assert_eq!(json["caption"], "Harbour cruise");
        assert_eq!(json["plan_type"], "MANAGED");
        assert!(json["tags_info"].get("experienceCategory").is_some());
    }

    #[test]
    fn test_schema_kind_display() {
        assert_eq!(SchemaKind::TagSet.to_string(), "tag_set");
    }
}
