// ─────────────────────────────────────────────────────────────────────
// Itinera — Taxonomy Store
// ─────────────────────────────────────────────────────────────────────
//! Authoritative category → type → subtype tree.
//!
//! The tree is flattened into an arena: nodes live in one `Vec`, children
//! are indices, and a per-level name index answers membership queries.
//! A loaded [`Taxonomy`] is immutable; [`TaxonomyStore`] swaps whole
//! snapshots so readers never see a partially built tree.
//!
//! Sources plug in through the [`TaxonomySource`] trait. The static
//! backend serves an in-memory tree; the external backend calls a
//! function that returns taxonomy JSON.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde_json::Value;

use itinera_types::{KernelError, KernelResult, TaxonomyLevel, TaxonomyNode};

pub type NodeId = usize;

/// One arena slot.
#[derive(Debug, Clone)]
pub struct TaxonomyEntry {
    pub name: String,
    pub level: TaxonomyLevel,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub cues: Vec<String>,
    pub attributes: Vec<String>,
    /// Declaration position among its siblings.
    pub ordinal: usize,
}

/// Immutable, arena-backed taxonomy snapshot.
#[derive(Debug, Clone, Default)]
pub struct Taxonomy {
    nodes: Vec<TaxonomyEntry>,
    roots: Vec<NodeId>,
    index: HashMap<(TaxonomyLevel, String), Vec<NodeId>>,
    vocabulary: HashSet<String>,
}

impl Taxonomy {
    /// Build from a category forest. Names must be non-empty and unique
    /// among siblings; the tree may not be deeper than three levels.
    pub fn from_tree(tree: &[TaxonomyNode]) -> KernelResult<Self> {
        let mut taxonomy = Taxonomy::default();
        check_siblings(tree, "root")?;
        for (ordinal, node) in tree.iter().enumerate() {
            let id = taxonomy.insert(node, TaxonomyLevel::Category, None, ordinal)?;
            taxonomy.roots.push(id);
        }
        Ok(taxonomy)
    }

    fn insert(
        &mut self,
        node: &TaxonomyNode,
        level: TaxonomyLevel,
        parent: Option<NodeId>,
        ordinal: usize,
    ) -> KernelResult<NodeId> {
        if node.name.trim().is_empty() {
            return Err(KernelError::TaxonomyUnavailable(format!(
                "empty {level} name in taxonomy"
            )));
        }
        let id = self.nodes.len();
        self.nodes.push(TaxonomyEntry {
            name: node.name.clone(),
            level,
            parent,
            children: Vec::with_capacity(node.children.len()),
            cues: node.cues.clone(),
            attributes: node.attributes.clone(),
            ordinal,
        });
        self.index
            .entry((level, node.name.clone()))
            .or_default()
            .push(id);
        self.vocabulary.insert(node.name.clone());
        self.vocabulary.extend(node.cues.iter().cloned());
        self.vocabulary.extend(node.attributes.iter().cloned());

        if node.children.is_empty() {
            return Ok(id);
        }
        let child_level = level.child().ok_or_else(|| {
            KernelError::TaxonomyUnavailable(format!(
                "subtype '{}' has children; taxonomy is limited to three levels",
                node.name
            ))
        })?;
        check_siblings(&node.children, &node.name)?;
        for (i, child) in node.children.iter().enumerate() {
            let child_id = self.insert(child, child_level, Some(id), i)?;
            self.nodes[id].children.push(child_id);
        }
        Ok(id)
    }

    /// Parse taxonomy JSON in either accepted format.
    ///
    /// - node list: `[{"name": ..., "cues": [...], "children": [...]}]`
    /// - nested map: `{"Category": {"Type": ["Subtype", ...]}}`
    pub fn from_json(json: &str) -> KernelResult<Self> {
        let value: Value = serde_json::from_str(json)
            .map_err(|e| KernelError::TaxonomyUnavailable(format!("JSON parse error: {e}")))?;
        match value {
            Value::Array(_) => {
                let tree: Vec<TaxonomyNode> = serde_json::from_value(value).map_err(|e| {
                    KernelError::TaxonomyUnavailable(format!("invalid taxonomy node list: {e}"))
                })?;
                Self::from_tree(&tree)
            }
            Value::Object(map) => {
                let mut tree = Vec::with_capacity(map.len());
                for (category, types) in map {
                    tree.push(TaxonomyNode::new(category).with_children(plain_types(&types)?));
                }
                Self::from_tree(&tree)
            }
            other => Err(KernelError::TaxonomyUnavailable(format!(
                "taxonomy JSON must be an array or object, got {}",
                json_type(&other)
            ))),
        }
    }

    /// The full tree in declaration order.
    pub fn lookup(&self) -> Vec<TaxonomyNode> {
        self.roots.iter().map(|&id| self.to_node(id)).collect()
    }

    fn to_node(&self, id: NodeId) -> TaxonomyNode {
        let entry = &self.nodes[id];
        TaxonomyNode {
            name: entry.name.clone(),
            cues: entry.cues.clone(),
            attributes: entry.attributes.clone(),
            children: entry.children.iter().map(|&c| self.to_node(c)).collect(),
        }
    }

    /// Verbatim (case-sensitive) membership at a level.
    pub fn contains(&self, level: TaxonomyLevel, name: &str) -> bool {
        self.index.contains_key(&(level, name.to_string()))
    }

    /// Verbatim membership anywhere in the store: node names, cues and
    /// attributes.
    pub fn in_vocabulary(&self, term: &str) -> bool {
        self.vocabulary.contains(term)
    }

    /// Ordered child names of a category, or of one of its types.
    pub fn children_of(
        &self,
        category: &str,
        type_name: Option<&str>,
    ) -> KernelResult<Vec<String>> {
        let cat = self.category(category)?;
        let parent = match type_name {
            None => cat,
            Some(t) => self.child_named(cat, t).ok_or_else(|| KernelError::UnknownTaxonomyTerm {
                level: TaxonomyLevel::Type,
                term: t.to_string(),
            })?,
        };
        Ok(self.nodes[parent]
            .children
            .iter()
            .map(|&c| self.nodes[c].name.clone())
            .collect())
    }

    /// Resolve a category by verbatim name.
    pub fn category(&self, name: &str) -> KernelResult<NodeId> {
        self.find(TaxonomyLevel::Category, name)
            .ok_or_else(|| KernelError::UnknownTaxonomyTerm {
                level: TaxonomyLevel::Category,
                term: name.to_string(),
            })
    }

    pub fn find(&self, level: TaxonomyLevel, name: &str) -> Option<NodeId> {
        self.find_all(level, name).first().copied()
    }

    /// All nodes with this name at this level (names repeat across parents).
    pub fn find_all(&self, level: TaxonomyLevel, name: &str) -> &[NodeId] {
        self.index
            .get(&(level, name.to_string()))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn child_named(&self, parent: NodeId, name: &str) -> Option<NodeId> {
        self.nodes[parent]
            .children
            .iter()
            .copied()
            .find(|&c| self.nodes[c].name == name)
    }

    pub fn node(&self, id: NodeId) -> &TaxonomyEntry {
        &self.nodes[id]
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id].children
    }

    pub fn categories(&self) -> &[NodeId] {
        &self.roots
    }

    /// A node and all of its descendants, depth-first in declaration order.
    pub fn subtree(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = vec![id];
        for &c in &self.nodes[id].children {
            out.extend(self.subtree(c));
        }
        out
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

fn check_siblings(children: &[TaxonomyNode], parent: &str) -> KernelResult<()> {
    let mut seen = HashSet::new();
    for child in children {
        if !seen.insert(child.name.as_str()) {
            return Err(KernelError::TaxonomyUnavailable(format!(
                "duplicate name '{}' under '{parent}'",
                child.name
            )));
        }
    }
    Ok(())
}

fn plain_types(types: &Value) -> KernelResult<Vec<TaxonomyNode>> {
    let map = types.as_object().ok_or_else(|| {
        KernelError::TaxonomyUnavailable(format!(
            "category value must be an object of types, got {}",
            json_type(types)
        ))
    })?;
    let mut out = Vec::with_capacity(map.len());
    for (type_name, subtypes) in map {
        let list = subtypes.as_array().ok_or_else(|| {
            KernelError::TaxonomyUnavailable(format!(
                "type '{type_name}' must map to an array of subtypes"
            ))
        })?;
        let mut children = Vec::with_capacity(list.len());
        for s in list {
            let name = s.as_str().ok_or_else(|| {
                KernelError::TaxonomyUnavailable(format!(
                    "subtype under '{type_name}' must be a string"
                ))
            })?;
            children.push(TaxonomyNode::new(name));
        }
        out.push(TaxonomyNode::new(type_name.clone()).with_children(children));
    }
    Ok(out)
}

pub(crate) fn json_type(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Trait for taxonomy backends.
pub trait TaxonomySource: Send + Sync {
    /// Fetch and build a complete taxonomy, or fail with
    /// `TaxonomyUnavailable`.
    fn fetch(&self) -> KernelResult<Taxonomy>;
}

/// In-memory taxonomy source.
pub struct StaticTaxonomy {
    tree: Vec<TaxonomyNode>,
}

impl StaticTaxonomy {
    pub fn new(tree: Vec<TaxonomyNode>) -> Self {
        Self { tree }
    }
}

impl TaxonomySource for StaticTaxonomy {
    fn fetch(&self) -> KernelResult<Taxonomy> {
        Taxonomy::from_tree(&self.tree)
    }
}

/// External taxonomy source that calls a function returning taxonomy JSON.
///
/// Used by callers that keep the taxonomy in a service or file the core
/// never touches directly.
type FetchFn = Box<dyn Fn() -> Result<String, String> + Send + Sync>;

pub struct ExternalTaxonomy {
    fetch_fn: FetchFn,
}

impl ExternalTaxonomy {
    pub fn new(fetch_fn: impl Fn() -> Result<String, String> + Send + Sync + 'static) -> Self {
        Self {
            fetch_fn: Box::new(fetch_fn),
        }
    }
}

impl TaxonomySource for ExternalTaxonomy {
    fn fetch(&self) -> KernelResult<Taxonomy> {
        let json = (self.fetch_fn)().map_err(KernelError::TaxonomyUnavailable)?;
        Taxonomy::from_json(&json)
    }
}

/// Shared holder of the current taxonomy snapshot.
///
/// Loads are serialised through one path; each load builds the whole
/// tree before swapping it in. Readers clone the `Arc` and keep a
/// consistent snapshot for the rest of their request.
#[derive(Default)]
pub struct TaxonomyStore {
    snapshot: RwLock<Option<Arc<Taxonomy>>>,
    reload: Mutex<()>,
}

impl TaxonomyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_taxonomy(taxonomy: Taxonomy) -> Self {
        Self {
            snapshot: RwLock::new(Some(Arc::new(taxonomy))),
            reload: Mutex::new(()),
        }
    }

    /// Fetch from `source` and publish the result. On failure the
    /// previous snapshot (if any) stays in place.
    pub fn load(&self, source: &dyn TaxonomySource) -> KernelResult<Arc<Taxonomy>> {
        let _guard = self.reload.lock();
        match source.fetch() {
            Ok(taxonomy) => {
                let fresh = Arc::new(taxonomy);
                log::info!(
                    "taxonomy loaded: {} categories, {} nodes",
                    fresh.categories().len(),
                    fresh.len()
                );
                *self.snapshot.write() = Some(Arc::clone(&fresh));
                Ok(fresh)
            }
            Err(e) => {
                if self.is_loaded() {
                    log::warn!("taxonomy refresh failed, serving stale snapshot: {e}");
                } else {
                    log::error!("taxonomy load failed: {e}");
                }
                Err(e)
            }
        }
    }

    /// The current snapshot, or `TaxonomyUnavailable` if none was loaded.
    pub fn snapshot(&self) -> KernelResult<Arc<Taxonomy>> {
        self.snapshot
            .read()
            .as_ref()
            .map(Arc::clone)
            .ok_or_else(|| KernelError::TaxonomyUnavailable("no taxonomy loaded".to_string()))
    }

    pub fn is_loaded(&self) -> bool {
        self.snapshot.read().is_some()
    }

    pub fn lookup(&self) -> KernelResult<Vec<TaxonomyNode>> {
        Ok(self.snapshot()?.lookup())
    }

    pub fn contains(&self, level: TaxonomyLevel, name: &str) -> KernelResult<bool> {
        Ok(self.snapshot()?.contains(level, name))
    }

    pub fn children_of(
        &self,
        category: &str,
        type_name: Option<&str>,
    ) -> KernelResult<Vec<String>> {
        self.snapshot()?.children_of(category, type_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    #[test]
    fn test_contains_is_verbatim() {
        let tax = fixtures::travel_taxonomy().unwrap();
        assert!(tax.contains(TaxonomyLevel::Category, "Water Activities"));
        assert!(!tax.contains(TaxonomyLevel::Category, "water activities"));
        assert!(tax.contains(TaxonomyLevel::Subtype, "Sunset Cruise"));
        assert!(!tax.contains(TaxonomyLevel::Type, "Sunset Cruise"));
    }

    #[test]
    fn test_children_of_preserves_declaration_order() {
        let tax = fixtures::travel_taxonomy().unwrap();
        let types = tax.children_of("Water Activities", None).unwrap();
        assert_eq!(types, vec!["Boat Tours", "Wildlife Watching", "Water Sports"]);
        let subs = tax.children_of("Water Activities", Some("Boat Tours")).unwrap();
        assert_eq!(subs[0], "Sunset Cruise");
    }

    #[test]
    fn test_children_of_unknown_category() {
        let tax = fixtures::travel_taxonomy().unwrap();
        let err = tax.children_of("Space", None).unwrap_err();
        assert!(matches!(
            err,
            KernelError::UnknownTaxonomyTerm { level: TaxonomyLevel::Category, .. }
        ));
    }

    #[test]
    fn test_lookup_round_trips_tree() {
        let tree = fixtures::travel_tree();
        let tax = Taxonomy::from_tree(&tree).unwrap();
        assert_eq!(tax.lookup(), tree);
    }

    #[test]
    fn test_duplicate_sibling_rejected() {
        let tree = vec![TaxonomyNode::new("Food").with_children(vec![
            TaxonomyNode::new("Tours"),
            TaxonomyNode::new("Tours"),
        ])];
        assert!(matches!(
            Taxonomy::from_tree(&tree),
            Err(KernelError::TaxonomyUnavailable(_))
        ));
    }

    #[test]
    fn test_fourth_level_rejected() {
        let tree = vec![TaxonomyNode::new("A").with_children(vec![TaxonomyNode::new("B")
            .with_children(vec![TaxonomyNode::new("C")
                .with_children(vec![TaxonomyNode::new("D")])])])];
        assert!(Taxonomy::from_tree(&tree).is_err());
    }

    #[test]
    fn test_plain_json_keeps_order() {
        let json = r#"{
            "Activity": {
                "Adventure Sports": ["Bungee Jumping", "Base Jumping"],
                "Creative Workshops": ["Pottery", "Painting"]
            },
            "Food": {"Restaurants": ["Street Food", "Fine Dining"]}
        }"#;
        let tax = Taxonomy::from_json(json).unwrap();
        let types = tax.children_of("Activity", None).unwrap();
        assert_eq!(types, vec!["Adventure Sports", "Creative Workshops"]);
        let subs = tax.children_of("Food", Some("Restaurants")).unwrap();
        assert_eq!(subs, vec!["Street Food", "Fine Dining"]);
    }

    #[test]
    fn test_json_scalar_rejected() {
        assert!(matches!(
            Taxonomy::from_json("42"),
            Err(KernelError::TaxonomyUnavailable(_))
        ));
    }

    #[test]
    fn test_vocabulary_includes_cues_and_attributes() {
        let tax = fixtures::travel_taxonomy().unwrap();
        assert!(tax.in_vocabulary("sunset boat"));
        assert!(tax.in_vocabulary("Scenic Views"));
        assert!(!tax.in_vocabulary("moon landing"));
    }

    #[test]
    fn test_store_unloaded_is_unavailable() {
        let store = TaxonomyStore::new();
        assert!(matches!(
            store.snapshot(),
            Err(KernelError::TaxonomyUnavailable(_))
        ));
        assert!(store.lookup().is_err());
    }

    #[test]
    fn test_store_failed_refresh_keeps_stale_snapshot() {
        let store = TaxonomyStore::new();
        store
            .load(&StaticTaxonomy::new(fixtures::travel_tree()))
            .unwrap();
        let failing = ExternalTaxonomy::new(|| Err("connection refused".to_string()));
        let err = store.load(&failing).unwrap_err();
        assert!(err.to_string().contains("connection refused"));
        assert!(store
            .contains(TaxonomyLevel::Category, "Water Activities")
            .unwrap());
    }

    #[test]
    fn test_store_reload_swaps_snapshot() {
        let store = TaxonomyStore::new();
        store
            .load(&StaticTaxonomy::new(fixtures::travel_tree()))
            .unwrap();
        let held = store.snapshot().unwrap();
        let external = ExternalTaxonomy::new(|| Ok(r#"{"Food": {"Markets": []}}"#.to_string()));
        store.load(&external).unwrap();
        // The earlier reader still sees its own complete tree.
        assert!(held.contains(TaxonomyLevel::Category, "Water Activities"));
        assert!(!store
            .contains(TaxonomyLevel::Category, "Water Activities")
            .unwrap());
        assert!(store.contains(TaxonomyLevel::Type, "Markets").unwrap());
    }
}
