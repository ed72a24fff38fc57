//! Relation name normalization.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::schema::RelationType;

/// Minimum normalized edit-distance similarity for a fuzzy match.
pub const FUZZY_THRESHOLD: f64 = 0.8;

static SEPARATORS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[_\s]+").unwrap());

const PARAPHRASES: &[(&str, RelationType)] = &[
    ("utilizes", RelationType::Uses),
    ("employs", RelationType::Uses),
    ("leverages", RelationType::Uses),
    ("makes use of", RelationType::Uses),
    ("uses", RelationType::Uses),
    ("implements", RelationType::Implements),
    ("follows", RelationType::Implements),
    ("adopts", RelationType::Implements),
    ("applies", RelationType::Implements),
    ("addresses", RelationType::Addresses),
    ("mitigates", RelationType::Addresses),
    ("resolves", RelationType::Addresses),
    ("solves", RelationType::Addresses),
    ("handles", RelationType::Addresses),
    ("recommended_by", RelationType::RecommendedBy),
    ("recommended", RelationType::RecommendedBy),
    ("suggested_by", RelationType::RecommendedBy),
    ("suggested", RelationType::RecommendedBy),
    ("aligned_with", RelationType::RecommendedBy),
    ("affects", RelationType::Affects),
    ("impacts", RelationType::Affects),
    ("influences", RelationType::Affects),
    ("improves", RelationType::Affects),
    ("enhances", RelationType::Affects),
    ("reduces", RelationType::Affects),
    ("depends_on", RelationType::DependsOn),
    ("depends", RelationType::DependsOn),
    ("requires", RelationType::DependsOn),
    ("relies_on", RelationType::DependsOn),
    ("needs", RelationType::DependsOn),
    ("violates", RelationType::Violates),
    ("breaks", RelationType::Violates),
    ("contradicts", RelationType::Violates),
    ("conflicts_with", RelationType::Violates),
    ("example_of", RelationType::ExampleOf),
    ("example", RelationType::ExampleOf),
    ("instance_of", RelationType::ExampleOf),
    ("demonstrates", RelationType::ExampleOf),
];

/// How a relation name was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationMatch {
    Paraphrase,
    Exact,
    Fuzzy,
    Substring,
}

/// Maps relation verb variants onto the known relation set.
///
/// Resolution order: paraphrase table, exact identifier, fuzzy edit
/// distance, substring containment.
#[derive(Debug, Clone)]
pub struct RelationNormalizer {
    paraphrases: HashMap<String, RelationType>,
    /// Known relations with their lowercased ids, in declaration order.
    canonical: Vec<(String, RelationType)>,
}

impl Default for RelationNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl RelationNormalizer {
    pub fn new() -> Self {
        let paraphrases = PARAPHRASES
            .iter()
            .map(|(phrase, relation)| (normalize_key(phrase), relation.clone()))
            .collect();

        let canonical = RelationType::known()
            .map(|r| (r.as_str().to_lowercase(), r))
            .collect();

        Self {
            paraphrases,
            canonical,
        }
    }

    /// Add or replace a paraphrase.
    pub fn with_paraphrase(mut self, phrase: &str, relation: RelationType) -> Self {
        self.paraphrases.insert(normalize_key(phrase), relation);
        self
    }

    /// Resolve a relation name, or `None` if every tier misses.
    pub fn normalize(&self, name: &str) -> Option<RelationType> {
        self.resolve(name).map(|(relation, _)| relation)
    }

    /// Resolve a relation name and report which tier matched.
    pub fn resolve(&self, name: &str) -> Option<(RelationType, RelationMatch)> {
        let key = normalize_key(name);
        if key.is_empty() {
            return None;
        }

        if let Some(relation) = self.paraphrases.get(&key) {
            return Some((relation.clone(), RelationMatch::Paraphrase));
        }

        if let Some((_, relation)) = self.canonical.iter().find(|(id, _)| *id == key) {
            return Some((relation.clone(), RelationMatch::Exact));
        }

        let mut best: Option<(&RelationType, f64)> = None;
        for (id, relation) in &self.canonical {
            let ratio = strsim::normalized_levenshtein(&key, id);
            if best.map_or(true, |(_, r)| ratio > r) {
                best = Some((relation, ratio));
            }
        }
        if let Some((relation, ratio)) = best {
            if ratio >= FUZZY_THRESHOLD {
                return Some((relation.clone(), RelationMatch::Fuzzy));
            }
        }

        if let Some((_, relation)) = self
            .canonical
            .iter()
            .find(|(id, _)| key.contains(id.as_str()) || id.contains(key.as_str()))
        {
            return Some((relation.clone(), RelationMatch::Substring));
        }

        debug!(relation = name, "Could not normalize relation");
        None
    }
}

/// Lowercase, trim and collapse runs of `_`/whitespace into a single `_`.
fn normalize_key(name: &str) -> String {
    SEPARATORS
        .replace_all(name.trim().to_lowercase().as_str(), "_")
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paraphrases() {
        let normalizer = RelationNormalizer::new();
        assert_eq!(normalizer.normalize("utilizes"), Some(RelationType::Uses));
        assert_eq!(normalizer.normalize("Makes Use Of"), Some(RelationType::Uses));
        assert_eq!(normalizer.normalize("relies on"), Some(RelationType::DependsOn));
        assert_eq!(
            normalizer.resolve("mitigates"),
            Some((RelationType::Addresses, RelationMatch::Paraphrase))
        );
    }

    #[test]
    fn test_exact_ids_including_legacy() {
        let normalizer = RelationNormalizer::new();
        assert_eq!(
            normalizer.resolve("Depends  On"),
            Some((RelationType::DependsOn, RelationMatch::Paraphrase))
        );
        assert_eq!(
            normalizer.resolve("relates to"),
            Some((RelationType::RelatesTo, RelationMatch::Exact))
        );
        assert_eq!(normalizer.normalize("CONTAINS"), Some(RelationType::Contains));
    }

    #[test]
    fn test_fuzzy_match() {
        let normalizer = RelationNormalizer::new();
        assert_eq!(
            normalizer.resolve("implemnts"),
            Some((RelationType::Implements, RelationMatch::Fuzzy))
        );
    }

    #[test]
    fn test_substring_match() {
        let normalizer = RelationNormalizer::new();
        assert_eq!(
            normalizer.resolve("uses_component"),
            Some((RelationType::Uses, RelationMatch::Substring))
        );
    }

    #[test]
    fn test_unresolved() {
        let normalizer = RelationNormalizer::new();
        assert_eq!(normalizer.normalize(""), None);
        assert_eq!(normalizer.normalize("   "), None);
        assert_eq!(normalizer.normalize("frobnicates"), None);
    }

    #[test]
    fn test_custom_paraphrase() {
        let normalizer = RelationNormalizer::new().with_paraphrase("is powered by", RelationType::DependsOn);
        assert_eq!(normalizer.normalize("IS POWERED BY"), Some(RelationType::DependsOn));
    }
}
