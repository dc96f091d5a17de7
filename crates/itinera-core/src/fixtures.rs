// ─────────────────────────────────────────────────────────────────────
// Itinera — Test & Bench Fixtures
// ─────────────────────────────────────────────────────────────────────
//! Small travel taxonomy and sample records shared by unit tests and
//! criterion benches. Not part of the stable API.

use itinera_types::{KernelResult, TaxonomyNode};

use crate::taxonomy::Taxonomy;

pub fn travel_tree() -> Vec<TaxonomyNode> {
    vec![
        TaxonomyNode::new("Water Activities")
            .with_cues(["sea", "water", "harbour", "coast"])
            .with_children(vec![
                TaxonomyNode::new("Boat Tours")
                    .with_cues(["boat", "cruise", "sailing", "catamaran", "yacht"])
                    .with_attributes(["Scenic Views", "Onboard Refreshments"])
                    .with_children(vec![
                        TaxonomyNode::new("Sunset Cruise").with_cues([
                            "sunset cruise",
                            "sunset boat",
                            "sunset sail",
                        ]),
                        TaxonomyNode::new("Catamaran Sailing").with_cues(["catamaran"]),
                        TaxonomyNode::new("Snorkel Trip").with_cues(["snorkel", "snorkelling"]),
                    ]),
                TaxonomyNode::new("Wildlife Watching")
                    .with_cues(["dolphin", "whale", "wildlife", "seal", "bird"])
                    .with_attributes(["Marine Life"])
                    .with_children(vec![
                        TaxonomyNode::new("Dolphin Watching").with_cues(["dolphin", "dolphins"]),
                        TaxonomyNode::new("Whale Watching").with_cues(["whale", "whales"]),
                    ]),
                TaxonomyNode::new("Water Sports")
                    .with_cues(["kayak", "surf", "paddle", "swim"])
                    .with_attributes(["Equipment Rental"])
                    .with_children(vec![
                        TaxonomyNode::new("Kayaking").with_cues(["kayak", "kayaks"]),
                        TaxonomyNode::new("Surfing Lesson")
                            .with_cues(["surf lesson", "surf school"]),
                    ]),
            ]),
        TaxonomyNode::new("Transport")
            .with_cues(["transfer", "pickup"])
            .with_children(vec![TaxonomyNode::new("Ferries")
                .with_cues(["boat", "ferry", "crossing"])
                .with_children(vec![
                    TaxonomyNode::new("Island Ferry").with_cues(["island ferry"])
                ])]),
        TaxonomyNode::new("Culture & Heritage")
            .with_cues(["history", "heritage", "historic"])
            .with_children(vec![
                TaxonomyNode::new("Walking Tours")
                    .with_cues(["walk", "stroll", "old town", "street"])
                    .with_attributes(["Local Stories"])
                    .with_children(vec![
                        TaxonomyNode::new("Guided Heritage Walk").with_cues([
                            "guide",
                            "guided",
                            "tour guide",
                        ]),
                        TaxonomyNode::new("Self-Guided Walk")
                            .with_cues(["self guided", "audio guide"]),
                    ]),
                TaxonomyNode::new("Museums")
                    .with_cues(["museum", "gallery", "exhibition"])
                    .with_children(vec![
                        TaxonomyNode::new("Art Museum").with_cues(["art museum", "paintings"]),
                    ]),
            ]),
        TaxonomyNode::new("Food & Drink")
            .with_cues(["food", "tasting", "wine", "cuisine"])
            .with_children(vec![
                TaxonomyNode::new("Food Tours")
                    .with_cues(["tasting", "street food", "market"])
                    .with_attributes(["Local Cuisine"])
                    .with_children(vec![
                        TaxonomyNode::new("Market Tour").with_cues(["market tour", "food market"]),
                    ]),
                TaxonomyNode::new("Cooking Classes")
                    .with_cues(["cook", "cooking", "recipe", "chef"])
                    .with_children(vec![
                        TaxonomyNode::new("Pasta Making").with_cues(["pasta"]),
                    ]),
            ]),
    ]
}

/// The fixture tree as a loaded taxonomy.
pub fn travel_taxonomy() -> KernelResult<Taxonomy> {
    Taxonomy::from_tree(&travel_tree())
}

pub const SUNSET_SOURCE: &str = "We booked a sunset boat cruise and went dolphin watching.";

pub const LISTING_SOURCE: &str = "Sunset catamaran cruise from Lagos marina, Portugal. \
The yacht crew serves drinks while we go sailing along the coast and watch dolphins. \
Cruise lasts 3 hours and costs 45 EUR per person. Free cancellation up to 24 hours before. \
Contact bookings@lagossail.pt for groups of up to 12 guests. Departures daily on 14 June.";

pub const LISTING_JSON: &str = r#"{
  "caption": "Sunset catamaran cruise from Lagos marina",
  "summary": [
    "Sunset catamaran cruise along the coast",
    "The yacht crew serves drinks",
    "Watch dolphins while sailing"
  ],
  "location": {
    "city": "Lagos",
    "state": "",
    "country": "Portugal",
    "placeName": "Lagos marina",
    "coordinates": {"type": "Point", "coordinates": [-8.67, 37.1]}
  },
  "inclusion": ["drinks"],
  "exclusion": null,
  "faq": [
    {"question": "How long is the cruise?", "answer": "Cruise lasts 3 hours"}
  ]
}"#;

pub const ITINERARY_JSON: &str = r#"{
  "plan": [{
    "day": "1",
    "caption": "Sunset catamaran cruise",
    "description": ["Sailing along the coast from Lagos marina"],
    "schedule": [{
      "time": "Evening",
      "timeline": "Evening",
      "description": ["Watch dolphins from the catamaran"],
      "type": {
        "name": "activity",
        "value": {"name": "Catamaran cruise", "duration in hours": 3},
        "placename": "Lagos marina"
      }
    }]
  }]
}"#;
