// ─────────────────────────────────────────────────────────────────────
// Itinera — Taxonomy Selector
// ─────────────────────────────────────────────────────────────────────
//! Evidence-based primary/secondary tag selection.
//!
//! Selection pipeline per request:
//!
//! 1. categories: explicit (membership-checked) or inferred from
//!    independent supporting phrases across each category's subtree
//! 2. types: rubric score, ranked `(score desc, category order,
//!    declaration order)`; top two with score ≥ 2, else the best ≥ 1
//! 3. subtypes: gate-passing children of each selected type
//! 4. tags: verbatim source phrases drawn from taxonomy vocabulary, then
//!    taxonomy tags (selected subtypes, then type attributes)
//! 5. secondary tier: next types with score ≥ 1, disjoint from primary
//!
//! Nothing is guessed: when no category has enough support the result
//! is the empty selection.

use std::cmp::Reverse;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use itinera_types::{
    EvidenceScore, ExperienceTags, KernelConfig, KernelError, KernelResult, TagSelection,
    TaxonomyLevel,
};

use crate::evidence::{EvidenceScorer, RubricScorer};
use crate::taxonomy::{NodeId, Taxonomy};
use crate::text::{normalize, word_count, MatchMode, SourceText};

/// A scored type candidate, carrying its rank keys.
#[derive(Debug, Clone)]
struct RankedType {
    id: NodeId,
    category_rank: usize,
    evidence: EvidenceScore,
}

impl RankedType {
    fn sort_key(&self, taxonomy: &Taxonomy) -> (Reverse<u8>, usize, usize) {
        (
            Reverse(self.evidence.score),
            self.category_rank,
            taxonomy.node(self.id).ordinal,
        )
    }
}

/// Category with its independent supporting phrases.
#[derive(Debug, Clone, PartialEq)]
pub struct CategorySupport {
    pub name: String,
    pub phrases: Vec<String>,
}

/// Selects taxonomy terms for one source text against one snapshot.
pub struct TaxonomySelector {
    taxonomy: Arc<Taxonomy>,
    config: KernelConfig,
    scorer: Arc<dyn EvidenceScorer>,
}

impl TaxonomySelector {
    pub fn new(taxonomy: Arc<Taxonomy>, config: KernelConfig) -> Self {
        Self {
            taxonomy,
            config,
            scorer: Arc::new(RubricScorer),
        }
    }

    /// Replace the rubric scorer with another backend.
    pub fn with_scorer(mut self, scorer: Arc<dyn EvidenceScorer>) -> Self {
        self.scorer = scorer;
        self
    }

    pub fn taxonomy(&self) -> &Taxonomy {
        &self.taxonomy
    }

    /// Run the full selection.
    ///
    /// An explicit `category` must be a verbatim category name, otherwise
    /// the whole selection is rejected with `UnknownTaxonomyTerm`.
    pub fn select(&self, source: &str, category: Option<&str>) -> KernelResult<TagSelection> {
        let text = SourceText::new(source);
        let categories = match category {
            Some(name) => vec![self.taxonomy.category(name)?],
            None => {
                let inferred = self.infer_categories(&text);
                inferred
                    .iter()
                    .filter_map(|c| self.taxonomy.find(TaxonomyLevel::Category, &c.name))
                    .collect()
            }
        };
        if categories.is_empty() {
            log::warn!("insufficient evidence: no category reaches the support threshold");
            return Ok(TagSelection::empty());
        }

        let ranked = self.rank_types(&text, &categories);
        let (primary, secondary) = self.split_tiers(&ranked);

        let mut selection = TagSelection {
            primary_categories: categories
                .iter()
                .map(|&c| self.taxonomy.node(c).name.clone())
                .collect(),
            ..TagSelection::default()
        };

        for t in &primary {
            selection.primary_types.push(self.taxonomy.node(t.id).name.clone());
            let subs = self.select_subtypes(
                &text,
                t.id,
                self.config.max_primary_subtypes,
                &HashSet::new(),
            );
            if !subs.is_empty() {
                selection
                    .primary_subtypes
                    .insert(self.taxonomy.node(t.id).name.clone(), subs);
            }
        }

        let primary_subtypes: HashSet<String> =
            selection.primary_subtype_list().into_iter().collect();
        for t in &secondary {
            selection.secondary_types.push(self.taxonomy.node(t.id).name.clone());
            let subs = self.select_subtypes(
                &text,
                t.id,
                self.config.max_secondary_subtypes,
                &primary_subtypes,
            );
            if !subs.is_empty() {
                selection
                    .secondary_subtypes
                    .insert(self.taxonomy.node(t.id).name.clone(), subs);
            }
        }

        let verbatim = self.verbatim_candidates(&text, &categories);
        let primary_taxonomy = self.taxonomy_tag_candidates(
            &selection.primary_subtype_list(),
            primary.iter().map(|t| t.id),
        );
        selection.primary_tags = assemble_tags(
            &verbatim,
            &primary_taxonomy,
            self.config.primary_verbatim_tags(),
            self.config.primary_tags - self.config.primary_verbatim_tags(),
            &HashSet::new(),
        );

        let taken: HashSet<String> = selection.primary_tags.iter().map(|t| normalize(t)).collect();
        let secondary_taxonomy = self.taxonomy_tag_candidates(
            &selection.secondary_subtype_list(),
            secondary.iter().map(|t| t.id),
        );
        selection.secondary_tags = assemble_tags(
            &verbatim,
            &secondary_taxonomy,
            self.config.secondary_verbatim_tags(),
            self.config.secondary_tags - self.config.secondary_verbatim_tags(),
            &taken,
        );

        log::debug!(
            "selected {} categories, {} primary / {} secondary types",
            selection.primary_categories.len(),
            selection.primary_types.len(),
            selection.secondary_types.len()
        );
        Ok(selection)
    }

    /// Categories with at least `min_category_support` independent
    /// supporting phrases, strongest first, capped at `max_categories`.
    pub fn infer_categories(&self, text: &SourceText) -> Vec<CategorySupport> {
        let mut supported: Vec<(usize, CategorySupport)> = Vec::new();
        for &cat in self.taxonomy.categories() {
            let mut phrases: Vec<&str> = Vec::new();
            for id in self.taxonomy.subtree(cat) {
                let node = self.taxonomy.node(id);
                phrases.push(&node.name);
                phrases.extend(node.cues.iter().map(String::as_str));
            }
            let found = text.independent_phrases(&phrases, MatchMode::Stemmed);
            let name = &self.taxonomy.node(cat).name;
            log::debug!("category '{name}' support {}: {found:?}", found.len());
            if found.len() >= self.config.min_category_support {
                supported.push((
                    self.taxonomy.node(cat).ordinal,
                    CategorySupport {
                        name: name.clone(),
                        phrases: found,
                    },
                ));
            }
        }
        supported.sort_by_key(|(ordinal, c)| (Reverse(c.phrases.len()), *ordinal));
        supported
            .into_iter()
            .take(self.config.max_categories)
            .map(|(_, c)| c)
            .collect()
    }

    /// Score one term with the configured backend.
    pub fn score_node(&self, text: &SourceText, id: NodeId) -> EvidenceScore {
        let node = self.taxonomy.node(id);
        self.scorer.score(text, &node.name, node.level, &node.cues)
    }

    fn rank_types(&self, text: &SourceText, categories: &[NodeId]) -> Vec<RankedType> {
        let mut ranked: Vec<RankedType> = Vec::new();
        for (category_rank, &cat) in categories.iter().enumerate() {
            for &t in self.taxonomy.children(cat) {
                let evidence = self.score_node(text, t);
                if evidence.is_selectable() {
                    ranked.push(RankedType {
                        id: t,
                        category_rank,
                        evidence,
                    });
                }
            }
        }
        ranked.sort_by_key(|r| r.sort_key(&self.taxonomy));
        let mut seen = HashSet::new();
        ranked.retain(|r| seen.insert(self.taxonomy.node(r.id).name.clone()));
        ranked
    }

    fn split_tiers(&self, ranked: &[RankedType]) -> (Vec<RankedType>, Vec<RankedType>) {
        let mut primary: Vec<RankedType> = ranked
            .iter()
            .filter(|r| r.evidence.score >= EvidenceScore::STRONG)
            .take(self.config.max_primary_types)
            .cloned()
            .collect();
        if primary.is_empty() {
            primary.extend(ranked.first().cloned());
        }
        let chosen: HashSet<NodeId> = primary.iter().map(|r| r.id).collect();
        let secondary = ranked
            .iter()
            .filter(|r| !chosen.contains(&r.id))
            .take(self.config.max_secondary_types)
            .cloned()
            .collect();
        (primary, secondary)
    }

    fn select_subtypes(
        &self,
        text: &SourceText,
        type_id: NodeId,
        cap: usize,
        exclude: &HashSet<String>,
    ) -> Vec<String> {
        let mut scored: Vec<(Reverse<u8>, usize, String)> = self
            .taxonomy
            .children(type_id)
            .iter()
            .filter_map(|&s| {
                let node = self.taxonomy.node(s);
                if exclude.contains(&node.name) {
                    return None;
                }
                let evidence = self.score_node(text, s);
                evidence
                    .is_selectable()
                    .then(|| (Reverse(evidence.score), node.ordinal, node.name.clone()))
            })
            .collect();
        scored.sort();
        scored.into_iter().take(cap).map(|(_, _, name)| name).collect()
    }

    /// Taxonomy vocabulary of the selected categories that occurs
    /// verbatim in the text. Independent matches first, each group in
    /// order of first occurrence.
    fn verbatim_candidates(&self, text: &SourceText, categories: &[NodeId]) -> Vec<String> {
        let mut vocabulary: Vec<&str> = Vec::new();
        for &cat in categories {
            for id in self.taxonomy.subtree(cat) {
                let node = self.taxonomy.node(id);
                vocabulary.push(&node.name);
                vocabulary.extend(node.cues.iter().map(String::as_str));
                vocabulary.extend(node.attributes.iter().map(String::as_str));
            }
        }
        vocabulary.retain(|v| word_count(v) <= self.config.max_tag_words);
        let matches = text.match_phrases(&vocabulary, MatchMode::Exact);
        let (independent, nested): (Vec<_>, Vec<_>) =
            matches.into_iter().partition(|m| m.independent);
        independent
            .into_iter()
            .chain(nested)
            .map(|m| m.phrase)
            .collect()
    }

    fn taxonomy_tag_candidates(
        &self,
        subtypes: &[String],
        types: impl Iterator<Item = NodeId>,
    ) -> Vec<String> {
        let mut out: Vec<String> = subtypes.to_vec();
        for t in types {
            out.extend(self.taxonomy.node(t).attributes.iter().cloned());
        }
        out
    }

    /// Verify a tag set produced by the external tagging collaborator.
    ///
    /// Tags follow the same provenance rule as [`select`](Self::select):
    /// every tag is taxonomy vocabulary, and tags not found verbatim in
    /// the source may fill at most the taxonomy half of each tier.
    ///
    /// Returns the equivalent [`TagSelection`] when every rule holds.
    pub fn audit(&self, candidate: &ExperienceTags, source: &str) -> KernelResult<TagSelection> {
        let text = SourceText::new(source);
        let cfg = &self.config;
        let tax = &self.taxonomy;

        check_unique("experienceCategory", &candidate.experience_category)?;
        check_cap("experienceCategory", candidate.experience_category.len(), cfg.max_categories)?;
        for c in &candidate.experience_category {
            tax.category(c)?;
        }
        let categories: HashSet<&str> =
            candidate.experience_category.iter().map(String::as_str).collect();

        let secondary = &candidate.secondary_tags;
        check_cap("experienceTypes", candidate.experience_types.len(), cfg.max_primary_types)?;
        check_cap(
            "secondaryTags.experienceTypes",
            secondary.experience_types.len(),
            cfg.max_secondary_types,
        )?;
        for (field, types) in [
            ("experienceTypes", &candidate.experience_types),
            ("secondaryTags.experienceTypes", &secondary.experience_types),
        ] {
            check_unique(field, types)?;
            for t in types {
                self.parent_in(TaxonomyLevel::Type, t, &categories)?;
            }
        }
        check_disjoint(
            "experienceTypes",
            &candidate.experience_types,
            &secondary.experience_types,
        )?;

        let primary_subtypes = self.group_subtypes(
            "experienceSubTypes",
            &candidate.experience_sub_types,
            &candidate.experience_types,
            cfg.max_primary_subtypes,
        )?;
        let secondary_subtypes = self.group_subtypes(
            "secondaryTags.experienceSubTypes",
            &secondary.experience_sub_types,
            &secondary.experience_types,
            cfg.max_secondary_subtypes,
        )?;
        check_disjoint(
            "experienceSubTypes",
            &candidate.experience_sub_types,
            &secondary.experience_sub_types,
        )?;

        check_cap("experienceTags", candidate.experience_tags.len(), cfg.primary_tags)?;
        check_cap(
            "secondaryTags.experienceTags",
            secondary.experience_tags.len(),
            cfg.secondary_tags,
        )?;
        for (field, tags, taxonomy_quota) in [
            (
                "experienceTags",
                &candidate.experience_tags,
                cfg.primary_tags - cfg.primary_verbatim_tags(),
            ),
            (
                "secondaryTags.experienceTags",
                &secondary.experience_tags,
                cfg.secondary_tags - cfg.secondary_verbatim_tags(),
            ),
        ] {
            check_unique(field, tags)?;
            let mut taxonomy_only = 0;
            for tag in tags {
                if !tax.in_vocabulary(tag) {
                    return Err(KernelError::TagConstraint(format!(
                        "{field}: '{tag}' is not taxonomy vocabulary"
                    )));
                }
                if !text.contains_phrase(tag, MatchMode::Exact) {
                    taxonomy_only += 1;
                }
            }
            if taxonomy_only > taxonomy_quota {
                return Err(KernelError::TagConstraint(format!(
                    "{field}: {taxonomy_only} tags absent from the source, at most \
                     {taxonomy_quota} allowed"
                )));
            }
        }
        check_disjoint(
            "experienceTags",
            &candidate.experience_tags,
            &secondary.experience_tags,
        )?;

        Ok(TagSelection {
            primary_categories: candidate.experience_category.clone(),
            primary_types: candidate.experience_types.clone(),
            primary_subtypes,
            primary_tags: candidate.experience_tags.clone(),
            secondary_types: secondary.experience_types.clone(),
            secondary_subtypes,
            secondary_tags: secondary.experience_tags.clone(),
        })
    }

    /// Resolve `name` at `level` to a node whose parent is in `parents`.
    fn parent_in(
        &self,
        level: TaxonomyLevel,
        name: &str,
        parents: &HashSet<&str>,
    ) -> KernelResult<String> {
        let candidates = self.taxonomy.find_all(level, name);
        if candidates.is_empty() {
            return Err(KernelError::UnknownTaxonomyTerm {
                level,
                term: name.to_string(),
            });
        }
        candidates
            .iter()
            .filter_map(|&id| self.taxonomy.node(id).parent)
            .map(|p| self.taxonomy.node(p).name.clone())
            .find(|p| parents.contains(p.as_str()))
            .ok_or_else(|| {
                KernelError::TagConstraint(format!(
                    "{level} '{name}' does not belong to any listed parent"
                ))
            })
    }

    fn group_subtypes(
        &self,
        field: &str,
        subtypes: &[String],
        types: &[String],
        cap_per_type: usize,
    ) -> KernelResult<BTreeMap<String, Vec<String>>> {
        check_unique(field, subtypes)?;
        let parents: HashSet<&str> = types.iter().map(String::as_str).collect();
        let mut groups: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for s in subtypes {
            let parent = self.parent_in(TaxonomyLevel::Subtype, s, &parents)?;
            let group = groups.entry(parent.clone()).or_default();
            group.push(s.clone());
            if group.len() > cap_per_type {
                return Err(KernelError::TagConstraint(format!(
                    "{field}: more than {cap_per_type} subtypes under '{parent}'"
                )));
            }
        }
        Ok(groups)
    }
}

/// Verbatim tags followed by taxonomy tags, deduplicated by normalised
/// form and never padded. The taxonomy quota is filled first; a term in
/// both pools counts as a taxonomy tag.
fn assemble_tags(
    verbatim: &[String],
    taxonomy: &[String],
    verbatim_quota: usize,
    taxonomy_quota: usize,
    exclude: &HashSet<String>,
) -> Vec<String> {
    let mut taken: HashSet<String> = exclude.clone();
    let from_taxonomy = pick(taxonomy, taxonomy_quota, &mut taken);
    let mut out = pick(verbatim, verbatim_quota, &mut taken);
    out.extend(from_taxonomy);
    out
}

fn pick(pool: &[String], quota: usize, taken: &mut HashSet<String>) -> Vec<String> {
    pool.iter()
        .filter(|tag| taken.insert(normalize(tag)))
        .take(quota)
        .cloned()
        .collect()
}

fn check_cap(field: &str, len: usize, cap: usize) -> KernelResult<()> {
    if len > cap {
        return Err(KernelError::TagConstraint(format!(
            "{field}: {len} entries exceeds the limit of {cap}"
        )));
    }
    Ok(())
}

fn check_unique(field: &str, items: &[String]) -> KernelResult<()> {
    let mut seen = HashSet::new();
    match items.iter().find(|i| !seen.insert(i.as_str())) {
        Some(dup) => Err(KernelError::TagConstraint(format!(
            "{field}: duplicate entry '{dup}'"
        ))),
        None => Ok(()),
    }
}

fn check_disjoint(field: &str, primary: &[String], secondary: &[String]) -> KernelResult<()> {
    match secondary.iter().find(|s| primary.contains(s)) {
        Some(shared) => Err(KernelError::TagConstraint(format!(
            "{field}: '{shared}' appears in both primary and secondary tiers"
        ))),
        None => Ok(()),
    }
}
