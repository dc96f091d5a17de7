// ─────────────────────────────────────────────────────────────────────
// Itinera — Tag Selection Types
// ─────────────────────────────────────────────────────────────────────

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Primary and secondary taxonomy selection for one experience.
///
/// Every member is verbatim-present in the taxonomy store and the two
/// tiers never share a member within the same field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagSelection {
    pub primary_categories: Vec<String>,
    pub primary_types: Vec<String>,
    pub primary_subtypes: BTreeMap<String, Vec<String>>,
    pub primary_tags: Vec<String>,
    pub secondary_types: Vec<String>,
    pub secondary_subtypes: BTreeMap<String, Vec<String>>,
    pub secondary_tags: Vec<String>,
}

impl TagSelection {
    /// The insufficient-evidence outcome: every array empty.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.primary_categories.is_empty()
            && self.primary_types.is_empty()
            && self.primary_tags.is_empty()
            && self.secondary_types.is_empty()
            && self.secondary_tags.is_empty()
    }

    /// Primary subtypes flattened in primary type order.
    pub fn primary_subtype_list(&self) -> Vec<String> {
        flatten_groups(&self.primary_types, &self.primary_subtypes)
    }

    /// Secondary subtypes flattened in secondary type order.
    pub fn secondary_subtype_list(&self) -> Vec<String> {
        flatten_groups(&self.secondary_types, &self.secondary_subtypes)
    }

    /// Convert to the flattened tag-set wire format.
    pub fn to_experience_tags(&self) -> ExperienceTags {
        ExperienceTags {
            experience_category: self.primary_categories.clone(),
            experience_types: self.primary_types.clone(),
            experience_sub_types: self.primary_subtype_list(),
            experience_tags: self.primary_tags.clone(),
            secondary_tags: SecondaryExperienceTags {
                experience_types: self.secondary_types.clone(),
                experience_sub_types: self.secondary_subtype_list(),
                experience_tags: self.secondary_tags.clone(),
            },
        }
    }
}

fn flatten_groups(order: &[String], groups: &BTreeMap<String, Vec<String>>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for type_name in order {
        if let Some(subtypes) = groups.get(type_name) {
            for subtype in subtypes {
                if !out.contains(subtype) {
                    out.push(subtype.clone());
                }
            }
        }
    }
    out
}

/// Flattened tag set as exchanged with the tagging collaborator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExperienceTags {
    pub experience_category: Vec<String>,
    pub experience_types: Vec<String>,
    pub experience_sub_types: Vec<String>,
    pub experience_tags: Vec<String>,
    pub secondary_tags: SecondaryExperienceTags,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecondaryExperienceTags {
    pub experience_types: Vec<String>,
    pub experience_sub_types: Vec<String>,
    pub experience_tags: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> TagSelection {
        let mut primary_subtypes = BTreeMap::new();
        primary_subtypes.insert(
            "Wildlife Watching".to_string(),
            vec!["Dolphin Watching".to_string()],
        );
        primary_subtypes.insert("Boat Tours".to_string(), vec!["Sunset Cruise".to_string()]);
        TagSelection {
            primary_categories: vec!["Water".into()],
            primary_types: vec!["Boat Tours".into(), "Wildlife Watching".into()],
            primary_subtypes,
            primary_tags: vec!["sunset".into()],
            ..Default::default()
        }
    }

    #[test]
    fn test_empty_selection() {
        assert!(TagSelection::empty().is_empty());
        assert!(!sample().is_empty());
    }

    #[test]
    fn test_subtypes_follow_type_order() {
        let sel = sample();
        assert_eq!(
            sel.primary_subtype_list(),
            vec!["Sunset Cruise".to_string(), "Dolphin Watching".to_string()]
        );
    }

    #[test]
    fn test_wire_format_keys() {
        let json = serde_json::to_value(sample().to_experience_tags()).unwrap();
        assert!(json.get("experienceCategory").is_some());
        assert!(json.get("experienceSubTypes").is_some());
        assert!(json["secondaryTags"].get("experienceTags").is_some());
    }

    #[test]
    fn test_selection_serializes_camel_case() {
        let json = serde_json::to_value(sample()).unwrap();
        assert!(json.get("primaryCategories").is_some());
        assert!(json.get("secondarySubtypes").is_some());
    }
}
