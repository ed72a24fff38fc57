//! Batch entity normalization with a per-run mapping table.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::models::Triple;
use crate::schema::EntityType;

use super::entity::{EntityNormalizer, NormalizationMethod, Resolution};

/// How one original name was mapped to its canonical form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizationMapping {
    pub original: String,
    pub canonical: String,
    pub entity_type: EntityType,
    pub confidence: f64,
    pub method: NormalizationMethod,
}

/// A name that resolved differently from its recorded mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizationConflict {
    pub entity: String,
    pub entity_type: EntityType,
    pub existing_canonical: String,
    pub new_canonical: String,
    pub existing_confidence: f64,
    pub new_confidence: f64,
}

/// Result of normalizing a batch.
#[derive(Debug, Clone, Default)]
pub struct NormalizationOutcome {
    pub triples: Vec<Triple>,
    /// Mappings first recorded by this batch.
    pub mappings: Vec<NormalizationMapping>,
    /// Conflicts raised by this batch.
    pub conflicts: Vec<NormalizationConflict>,
    /// Distinct names no stage could resolve, in first-seen order.
    pub unresolved: Vec<(String, EntityType)>,
}

/// Normalizes subjects and objects across batches, remembering every
/// mapping it has made.
pub struct NormalizationService {
    normalizer: EntityNormalizer,
    mappings: HashMap<(String, EntityType), NormalizationMapping>,
    conflicts: Vec<NormalizationConflict>,
}

impl NormalizationService {
    pub fn new(normalizer: EntityNormalizer) -> Self {
        Self {
            normalizer,
            mappings: HashMap::new(),
            conflicts: Vec::new(),
        }
    }

    pub fn normalizer(&self) -> &EntityNormalizer {
        &self.normalizer
    }

    /// Swap the normalizer, keeping recorded mappings.
    pub fn set_normalizer(&mut self, normalizer: EntityNormalizer) {
        self.normalizer = normalizer;
    }

    /// Normalize the subject and object of every triple.
    ///
    /// Unresolved sides keep their original name. When both sides resolve,
    /// the triple's confidence is capped by the weaker resolution.
    pub fn normalize_triples(&mut self, triples: Vec<Triple>) -> NormalizationOutcome {
        let mut outcome = NormalizationOutcome::default();
        let mut unresolved_seen = HashSet::new();

        for mut triple in triples {
            let subject = self.normalizer.normalize(&triple.subject, &triple.subject_type);
            let object = self.normalizer.normalize(&triple.object, &triple.object_type);

            for (name, entity_type, resolution) in [
                (&triple.subject, &triple.subject_type, &subject),
                (&triple.object, &triple.object_type, &object),
            ] {
                match &resolution.canonical {
                    Some(_) => self.record(name, entity_type, resolution, &mut outcome),
                    None => {
                        let key = (name.trim().to_string(), entity_type.clone());
                        if !key.0.is_empty() && unresolved_seen.insert(key.clone()) {
                            outcome.unresolved.push(key);
                        }
                    }
                }
            }

            if let (Some(s), Some(o)) = (&subject.canonical, &object.canonical) {
                triple.confidence = triple
                    .confidence
                    .min(subject.confidence)
                    .min(object.confidence);
                triple.subject = s.clone();
                triple.object = o.clone();
            } else {
                if let Some(s) = subject.canonical {
                    triple.subject = s;
                }
                if let Some(o) = object.canonical {
                    triple.object = o;
                }
            }

            outcome.triples.push(triple);
        }

        info!(
            triples = outcome.triples.len(),
            mappings = outcome.mappings.len(),
            unresolved = outcome.unresolved.len(),
            "Normalized entities"
        );
        if !outcome.conflicts.is_empty() {
            warn!(conflicts = outcome.conflicts.len(), "Normalization conflicts found");
        }

        self.conflicts.extend(outcome.conflicts.iter().cloned());
        outcome
    }

    fn record(
        &mut self,
        original: &str,
        entity_type: &EntityType,
        resolution: &Resolution,
        outcome: &mut NormalizationOutcome,
    ) {
        let Some(canonical) = &resolution.canonical else {
            return;
        };
        let key = (original.to_string(), entity_type.clone());

        match self.mappings.get(&key) {
            Some(existing) if &existing.canonical != canonical => {
                warn!(
                    entity = original,
                    existing = %existing.canonical,
                    new = %canonical,
                    "Entity resolved to a different canonical name"
                );
                outcome.conflicts.push(NormalizationConflict {
                    entity: original.to_string(),
                    entity_type: entity_type.clone(),
                    existing_canonical: existing.canonical.clone(),
                    new_canonical: canonical.clone(),
                    existing_confidence: existing.confidence,
                    new_confidence: resolution.confidence,
                });
            }
            Some(_) => {}
            None => {
                let mapping = NormalizationMapping {
                    original: original.to_string(),
                    canonical: canonical.clone(),
                    entity_type: entity_type.clone(),
                    confidence: resolution.confidence,
                    method: resolution.method,
                };
                self.mappings.insert(key, mapping.clone());
                outcome.mappings.push(mapping);
            }
        }
    }

    pub fn get_mapping(
        &self,
        original: &str,
        entity_type: &EntityType,
    ) -> Option<&NormalizationMapping> {
        self.mappings
            .get(&(original.to_string(), entity_type.clone()))
    }

    /// Every conflict recorded since the last [`clear`](Self::clear).
    pub fn conflicts(&self) -> &[NormalizationConflict] {
        &self.conflicts
    }

    pub fn mapping_count(&self) -> usize {
        self.mappings.len()
    }

    pub fn clear(&mut self) {
        self.mappings.clear();
        self.conflicts.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{CanonicalEntity, CanonicalRegistry};
    use crate::schema::RelationType;
    use std::sync::Arc;

    fn service() -> NormalizationService {
        NormalizationService::new(EntityNormalizer::new(Arc::new(CanonicalRegistry::seeded())))
    }

    fn triple(subject: &str, object: &str) -> Triple {
        Triple::new(
            subject,
            EntityType::Service,
            RelationType::Uses,
            object,
            EntityType::Service,
            "the subject uses the object heavily",
        )
        .with_confidence(0.9)
    }

    #[test]
    fn test_both_sides_resolved() {
        let mut service = service();
        let outcome = service.normalize_triples(vec![triple("S3", "KMS")]);

        let t = &outcome.triples[0];
        assert_eq!(t.subject, "Amazon S3");
        assert_eq!(t.object, "AWS KMS");
        assert_eq!(t.confidence, 0.9);
        assert_eq!(outcome.mappings.len(), 2);
        assert!(outcome.unresolved.is_empty());

        let mapping = service.get_mapping("S3", &EntityType::Service).unwrap();
        assert_eq!(mapping.canonical, "Amazon S3");
        assert_eq!(mapping.method, NormalizationMethod::Exact);
    }

    #[test]
    fn test_partial_resolution_keeps_original() {
        let mut service = service();
        let outcome = service.normalize_triples(vec![
            triple("Lambda", "Acme Billing"),
            triple("Lambda", "Acme Billing"),
        ]);

        let t = &outcome.triples[0];
        assert_eq!(t.subject, "AWS Lambda");
        assert_eq!(t.object, "Acme Billing");
        assert_eq!(t.confidence, 0.9);
        assert_eq!(outcome.mappings.len(), 1);
        assert_eq!(
            outcome.unresolved,
            vec![("Acme Billing".to_string(), EntityType::Service)]
        );
    }

    #[test]
    fn test_conflict_keeps_existing_mapping() {
        let mut first = CanonicalRegistry::empty();
        first.add_entity(CanonicalEntity::new("Foo", EntityType::Service).with_synonyms(["f"]));
        let mut second = CanonicalRegistry::empty();
        second.add_entity(CanonicalEntity::new("Bar", EntityType::Service).with_synonyms(["f"]));

        let mut service = NormalizationService::new(EntityNormalizer::new(Arc::new(first)));
        service.normalize_triples(vec![triple("f", "Foo")]);

        service.set_normalizer(EntityNormalizer::new(Arc::new(second)));
        let outcome = service.normalize_triples(vec![triple("f", "Bar")]);

        assert_eq!(outcome.conflicts.len(), 1);
        assert_eq!(outcome.conflicts[0].existing_canonical, "Foo");
        assert_eq!(outcome.conflicts[0].new_canonical, "Bar");
        assert_eq!(service.get_mapping("f", &EntityType::Service).unwrap().canonical, "Foo");
        assert_eq!(service.conflicts().len(), 1);

        service.clear();
        assert_eq!(service.mapping_count(), 0);
        assert!(service.conflicts().is_empty());
    }
}
