// ─────────────────────────────────────────────────────────────────────
// Itinera — Source Text Normalisation & Phrase Matching
// ─────────────────────────────────────────────────────────────────────
//! Tokenisation and word-bounded phrase matching shared by the evidence
//! scorer, the selector, the fidelity evaluator and the classifier.
//!
//! Two match modes exist:
//! - [`MatchMode::Exact`]: lowercase, punctuation-insensitive, whole words.
//!   A match never spans a clause break (`. : ; , ! ?`).
//! - [`MatchMode::Stemmed`]: as `Exact`, after light suffix stripping so
//!   "dolphins" matches "dolphin" and "walked" matches "walk".

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

static NUMBER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\d{1,3}(?:,\d{3})+(?:\.\d+)?|\d+(?:\.\d+)?").expect("number regex")
});

static STOPWORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "a", "an", "the", "and", "or", "but", "if", "of", "to", "in", "on", "at", "by", "for",
        "with", "from", "into", "onto", "over", "under", "about", "as", "is", "are", "was",
        "were", "be", "been", "being", "it", "its", "this", "that", "these", "those", "there",
        "here", "we", "you", "your", "our", "us", "they", "their", "them", "he", "she", "his",
        "her", "i", "me", "my", "will", "would", "can", "could", "should", "may", "might",
        "do", "does", "did", "have", "has", "had", "not", "no", "so", "than", "then", "too",
        "very", "also", "just", "all", "any", "each", "some", "such", "own", "up", "out",
        "what", "which", "who", "whom", "when", "where", "why", "how", "s", "t",
    ]
    .into_iter()
    .collect()
});

/// Characters that end a clause. Phrase matches do not cross them.
const CLAUSE_BREAKS: &[char] = &['.', ':', ';', ',', '!', '?'];

/// Lowercase, replace every non-alphanumeric character with a space
/// and collapse runs of whitespace.
pub fn normalize(s: &str) -> String {
    let mapped: String = s
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .flat_map(char::to_lowercase)
        .collect();
    mapped.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn tokens(s: &str) -> Vec<String> {
    normalize(s).split_whitespace().map(str::to_string).collect()
}

pub fn word_count(s: &str) -> usize {
    s.split_whitespace().count()
}

/// Light suffix stripping. Both sides of a comparison go through the
/// same function, so consistency matters more than linguistic accuracy.
pub fn stem(word: &str) -> String {
    let n = word.len();
    if n > 4 && word.ends_with("ies") {
        format!("{}y", &word[..n - 3])
    } else if n > 5 && word.ends_with("ing") {
        word[..n - 3].to_string()
    } else if n > 4 && word.ends_with("ed") {
        word[..n - 2].to_string()
    } else if n > 3 && word.ends_with('s') && !word.ends_with("ss") {
        word[..n - 1].to_string()
    } else {
        word.to_string()
    }
}

pub fn is_stopword(token: &str) -> bool {
    STOPWORDS.contains(token)
}

/// Stemmed tokens with stopwords removed.
pub fn content_tokens(s: &str) -> Vec<String> {
    tokens(s)
        .into_iter()
        .filter(|t| !is_stopword(t))
        .map(|t| stem(&t))
        .collect()
}

/// Jaccard similarity of two token sets; 0.0 when both are empty.
pub fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 0.0;
    }
    let inter = a.intersection(b).count() as f64;
    let union = a.union(b).count() as f64;
    inter / union
}

/// Numbers appearing in free text. Thousands separators are dropped.
pub fn extract_numbers(s: &str) -> Vec<f64> {
    NUMBER_RE
        .find_iter(s)
        .filter_map(|m| m.as_str().replace(',', "").parse::<f64>().ok())
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    Exact,
    Stemmed,
}

/// Half-open token range `[start, end)` of a phrase occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end == self.start
    }

    /// True when `self` lies inside `other` and is strictly shorter.
    pub fn nested_in(&self, other: &Span) -> bool {
        other.start <= self.start && self.end <= other.end && other.len() > self.len()
    }
}

/// A matched phrase and where it first occurs.
#[derive(Debug, Clone, PartialEq)]
pub struct PhraseMatch {
    /// The phrase exactly as supplied by the caller.
    pub phrase: String,
    pub first: Span,
    /// False when every occurrence sits inside a longer matched phrase.
    pub independent: bool,
}

/// Source text tokenised once per request.
#[derive(Debug, Clone)]
pub struct SourceText {
    raw: String,
    tokens: Vec<String>,
    /// Clause index of each token.
    clauses: Vec<usize>,
    stems: Vec<String>,
    stem_set: HashSet<String>,
    numbers: Vec<f64>,
}

impl SourceText {
    pub fn new(raw: &str) -> Self {
        let mut tokens_out: Vec<String> = Vec::new();
        let mut clauses: Vec<usize> = Vec::new();
        for (i, clause) in raw.split(CLAUSE_BREAKS).enumerate() {
            for t in tokens(clause) {
                tokens_out.push(t);
                clauses.push(i);
            }
        }
        let tokens = tokens_out;
        let stems: Vec<String> = tokens.iter().map(|t| stem(t)).collect();
        let stem_set = stems.iter().cloned().collect();
        Self {
            raw: raw.to_string(),
            numbers: extract_numbers(raw),
            tokens,
            clauses,
            stems,
            stem_set,
        }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn word_count(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn has_stem(&self, stem: &str) -> bool {
        self.stem_set.contains(stem)
    }

    pub fn has_number(&self, value: f64) -> bool {
        self.numbers.iter().any(|n| (n - value).abs() < 1e-6)
    }

    fn haystack(&self, mode: MatchMode) -> &[String] {
        match mode {
            MatchMode::Exact => &self.tokens,
            MatchMode::Stemmed => &self.stems,
        }
    }

    fn needle(phrase: &str, mode: MatchMode) -> Vec<String> {
        let toks = tokens(phrase);
        match mode {
            MatchMode::Exact => toks,
            MatchMode::Stemmed => toks.iter().map(|t| stem(t)).collect(),
        }
    }

    /// Every word-bounded occurrence of `phrase` within a single clause.
    pub fn find(&self, phrase: &str, mode: MatchMode) -> Vec<Span> {
        let needle = Self::needle(phrase, mode);
        let hay = self.haystack(mode);
        if needle.is_empty() || needle.len() > hay.len() {
            return Vec::new();
        }
        let n = needle.len();
        (0..=hay.len() - n)
            .filter(|&i| {
                self.clauses[i] == self.clauses[i + n - 1] && hay[i..i + n] == needle[..]
            })
            .map(|i| Span {
                start: i,
                end: i + needle.len(),
            })
            .collect()
    }

    pub fn contains_phrase(&self, phrase: &str, mode: MatchMode) -> bool {
        !self.find(phrase, mode).is_empty()
    }

    /// Match a list of phrases and mark which ones are independent.
    ///
    /// Phrases with the same normalised form are reported once (first
    /// spelling wins). A phrase is independent when at least one of its
    /// occurrences is not nested inside an occurrence of another matched
    /// phrase. Results are ordered by first occurrence.
    pub fn match_phrases<S: AsRef<str>>(
        &self,
        phrases: &[S],
        mode: MatchMode,
    ) -> Vec<PhraseMatch> {
        let mut seen: HashSet<Vec<String>> = HashSet::new();
        let mut found: Vec<(String, Vec<Span>)> = Vec::new();
        for phrase in phrases {
            let phrase = phrase.as_ref();
            let key = Self::needle(phrase, mode);
            if key.is_empty() || !seen.insert(key) {
                continue;
            }
            let spans = self.find(phrase, mode);
            if !spans.is_empty() {
                found.push((phrase.to_string(), spans));
            }
        }

        let mut out: Vec<PhraseMatch> = found
            .iter()
            .enumerate()
            .map(|(i, (phrase, spans))| {
                let independent = spans.iter().any(|s| {
                    !found
                        .iter()
                        .enumerate()
                        .filter(|(j, _)| *j != i)
                        .any(|(_, (_, others))| others.iter().any(|o| s.nested_in(o)))
                });
                PhraseMatch {
                    phrase: phrase.clone(),
                    first: spans[0],
                    independent,
                }
            })
            .collect();
        out.sort_by_key(|m| (m.first.start, std::cmp::Reverse(m.first.len())));
        out
    }

    /// Distinct independent phrases found in the text, in text order.
    pub fn independent_phrases<S: AsRef<str>>(
        &self,
        phrases: &[S],
        mode: MatchMode,
    ) -> Vec<String> {
        self.match_phrases(phrases, mode)
            .into_iter()
            .filter(|m| m.independent)
            .map(|m| m.phrase)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("  Sunset-Boat   CRUISE! "), "sunset boat cruise");
        assert_eq!(normalize("Self-Guided"), "self guided");
    }

    #[test]
    fn test_stem() {
        assert_eq!(stem("dolphins"), "dolphin");
        assert_eq!(stem("watching"), "watch");
        assert_eq!(stem("walked"), "walk");
        assert_eq!(stem("ferries"), "ferry");
        assert_eq!(stem("glass"), "glass");
        assert_eq!(stem("sea"), "sea");
    }

    #[test]
    fn test_find_is_word_bounded() {
        let text = SourceText::new("We went boating near the boathouse");
        assert!(text.find("boat", MatchMode::Exact).is_empty());
        let text = SourceText::new("A boat, then another boat.");
        assert_eq!(text.find("boat", MatchMode::Exact).len(), 2);
    }

    #[test]
    fn test_match_stops_at_clause_break() {
        let text = SourceText::new("We sailed on a catamaran: sailing past the cliffs");
        assert!(!text.contains_phrase("catamaran sailing", MatchMode::Exact));
        assert!(text.contains_phrase("catamaran", MatchMode::Exact));
        let text = SourceText::new("Hop on a boat. Tours of the caves follow");
        assert!(!text.contains_phrase("boat tours", MatchMode::Exact));
        let text = SourceText::new("A sunset-boat trip");
        assert!(text.contains_phrase("sunset boat", MatchMode::Exact));
        assert_eq!(text.word_count(), 4);
    }

    #[test]
    fn test_stemmed_match() {
        let text = SourceText::new("We watched the dolphins");
        assert!(!text.contains_phrase("dolphin", MatchMode::Exact));
        assert!(text.contains_phrase("dolphin", MatchMode::Stemmed));
    }

    #[test]
    fn test_nested_phrase_not_independent() {
        let text = SourceText::new("a sunset boat cruise");
        let found = text.independent_phrases(&["boat", "sunset boat", "cruise"], MatchMode::Exact);
        assert_eq!(found, vec!["sunset boat".to_string(), "cruise".to_string()]);
    }

    #[test]
    fn test_repeated_occurrence_can_be_independent() {
        let text = SourceText::new("sunset boat trip, then a boat back");
        let found = text.independent_phrases(&["boat", "sunset boat"], MatchMode::Exact);
        assert_eq!(found.len(), 2);
    }

    #[test]
    fn test_duplicate_phrases_reported_once() {
        let text = SourceText::new("Guide included");
        let found = text.match_phrases(&["guide", "Guide", "GUIDE"], MatchMode::Exact);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].phrase, "guide");
    }

    #[test]
    fn test_extract_numbers() {
        let nums = extract_numbers("Tour costs 1,200 INR for 3.5 hours, max 12 guests");
        assert_eq!(nums, vec![1200.0, 3.5, 12.0]);
    }

    #[test]
    fn test_content_tokens_drop_stopwords() {
        assert_eq!(content_tokens("The boats of the harbour"), vec!["boat", "harbour"]);
    }

    #[test]
    fn test_jaccard() {
        let a: HashSet<String> = ["a", "b"].iter().map(|s| s.to_string()).collect();
        let b: HashSet<String> = ["b", "c"].iter().map(|s| s.to_string()).collect();
        assert!((jaccard(&a, &b) - 1.0 / 3.0).abs() < 1e-9);
    }
}
