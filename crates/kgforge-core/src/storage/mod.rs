//! Authoritative in-memory triple index keyed by fingerprint.
//!
//! The store can be snapshotted to disk so incremental runs survive
//! process restarts (see [`TripleStore::save`] and [`TripleStore::load`]).

mod error;
mod file;

pub use error::StorageError;

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{EvidenceSource, Fingerprint, Triple};
use crate::schema::{EntityType, RelationType};

/// A fact as persisted between runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredTriple {
    pub fingerprint: Fingerprint,
    pub subject: String,
    pub subject_type: EntityType,
    pub relation: RelationType,
    pub object: String,
    pub object_type: EntityType,
    pub evidence_sources: Vec<EvidenceSource>,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    /// Observations after the first one.
    pub update_count: u64,
}

impl StoredTriple {
    fn from_triple(fingerprint: Fingerprint, triple: &Triple) -> Self {
        let evidence = EvidenceSource::from_triple(triple);
        let seen = evidence.timestamp;

        Self {
            fingerprint,
            subject: triple.subject.clone(),
            subject_type: triple.subject_type.clone(),
            relation: triple.relation.clone(),
            object: triple.object.clone(),
            object_type: triple.object_type.clone(),
            evidence_sources: vec![evidence],
            first_seen: seen,
            last_seen: seen,
            update_count: 0,
        }
    }

    fn add_evidence(&mut self, triple: &Triple) {
        let evidence = EvidenceSource::from_triple(triple);
        self.last_seen = evidence.timestamp;
        self.evidence_sources.push(evidence);
        self.update_count += 1;
    }
}

/// Store statistics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoreStats {
    pub total_triples: usize,
    pub total_evidence_sources: usize,
    pub avg_evidence_per_triple: f64,
}

/// Deduplicating triple store, iterated in insertion order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TripleStore {
    triples: Vec<StoredTriple>,
    #[serde(skip)]
    index: HashMap<Fingerprint, usize>,
}

impl TripleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a triple, appending its evidence when the fact already exists.
    ///
    /// Returns whether the fact was new, and its fingerprint.
    pub fn add_triple(&mut self, triple: &Triple) -> (bool, Fingerprint) {
        let fingerprint = triple.fingerprint();

        if let Some(&idx) = self.index.get(&fingerprint) {
            self.triples[idx].add_evidence(triple);
            return (false, fingerprint);
        }

        self.index.insert(fingerprint.clone(), self.triples.len());
        self.triples
            .push(StoredTriple::from_triple(fingerprint.clone(), triple));
        (true, fingerprint)
    }

    pub fn get_triple(&self, fingerprint: &Fingerprint) -> Option<&StoredTriple> {
        self.index.get(fingerprint).map(|&idx| &self.triples[idx])
    }

    /// Look a fact up by its parts; case and whitespace are ignored.
    pub fn find_triple(
        &self,
        subject: &str,
        relation: &RelationType,
        object: &str,
    ) -> Option<&StoredTriple> {
        self.get_triple(&Fingerprint::of(subject, relation, object))
    }

    pub fn all_triples(&self) -> &[StoredTriple] {
        &self.triples
    }

    pub fn len(&self) -> usize {
        self.triples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triples.is_empty()
    }

    pub fn stats(&self) -> StoreStats {
        let total_evidence_sources: usize =
            self.triples.iter().map(|t| t.evidence_sources.len()).sum();
        let avg_evidence_per_triple = if self.triples.is_empty() {
            0.0
        } else {
            total_evidence_sources as f64 / self.triples.len() as f64
        };

        StoreStats {
            total_triples: self.triples.len(),
            total_evidence_sources,
            avg_evidence_per_triple,
        }
    }

    pub fn clear(&mut self) {
        self.triples.clear();
        self.index.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lambda_sqs(evidence: &str) -> Triple {
        Triple::new(
            "AWS Lambda",
            EntityType::Service,
            RelationType::Uses,
            "Amazon SQS",
            EntityType::Service,
            evidence,
        )
    }

    #[test]
    fn test_add_new_then_existing() {
        let mut store = TripleStore::new();

        let (is_new, fp) = store.add_triple(&lambda_sqs("Lambda polls SQS queues"));
        assert!(is_new);
        assert_eq!(store.get_triple(&fp).map(|t| t.update_count), Some(0));

        let (is_new, fp2) = store.add_triple(&lambda_sqs("Lambda reads from SQS"));
        assert!(!is_new);
        assert_eq!(fp, fp2);

        let stored = store.get_triple(&fp).unwrap();
        assert_eq!(stored.update_count, 1);
        assert_eq!(stored.evidence_sources.len(), 2);
        assert!(stored.first_seen <= stored.last_seen);
    }

    #[test]
    fn test_find_triple_ignores_case() {
        let mut store = TripleStore::new();
        store.add_triple(&lambda_sqs("Lambda polls SQS queues"));

        assert!(store
            .find_triple("aws lambda", &RelationType::Uses, "AMAZON  SQS")
            .is_some());
        assert!(store
            .find_triple("aws lambda", &RelationType::DependsOn, "Amazon SQS")
            .is_none());
    }

    #[test]
    fn test_stats_and_clear() {
        let mut store = TripleStore::new();
        assert_eq!(store.stats().avg_evidence_per_triple, 0.0);

        store.add_triple(&lambda_sqs("Lambda polls SQS queues"));
        store.add_triple(&lambda_sqs("Lambda reads from SQS"));
        let mut other = lambda_sqs("Lambda writes to DynamoDB");
        other.object = "Amazon DynamoDB".to_string();
        store.add_triple(&other);

        let stats = store.stats();
        assert_eq!(stats.total_triples, 2);
        assert_eq!(stats.total_evidence_sources, 3);
        assert_eq!(stats.avg_evidence_per_triple, 1.5);
        assert_eq!(store.all_triples()[1].object, "Amazon DynamoDB");

        store.clear();
        assert!(store.is_empty());
    }
}
