//! Deduplication of triples by fingerprint with evidence aggregation.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::cluster::EntityClusters;
use crate::models::{Conflict, ConflictKind, EvidenceSource, Fingerprint, Triple};
use crate::schema::{EntityType, RelationType};

/// One fact with every observation that supports it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedTriple {
    pub fingerprint: Fingerprint,
    pub subject: String,
    pub subject_type: EntityType,
    pub relation: RelationType,
    pub object: String,
    pub object_type: EntityType,
    pub evidence_sources: Vec<EvidenceSource>,
    pub inferred_count: usize,
    pub total_count: usize,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

impl MergedTriple {
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
            inferred_count: usize::from(triple.inferred),
            total_count: 1,
            first_seen: seen,
            last_seen: seen,
        }
    }

    fn add_evidence(&mut self, triple: &Triple) {
        let evidence = EvidenceSource::from_triple(triple);
        self.total_count += 1;
        if triple.inferred {
            self.inferred_count += 1;
        }
        self.last_seen = evidence.timestamp;
        self.evidence_sources.push(evidence);
    }

    pub fn explicit_count(&self) -> usize {
        self.total_count - self.inferred_count
    }

    pub fn label(&self) -> String {
        format!("{} --[{}]--> {}", self.subject, self.relation, self.object)
    }
}

/// Accumulates merged triples across batches, in first-seen order.
#[derive(Debug, Default)]
pub struct MergeService {
    merged: Vec<MergedTriple>,
    index: HashMap<Fingerprint, usize>,
}

impl MergeService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a batch, substituting cluster representatives first.
    ///
    /// Returns every merged triple seen so far.
    pub fn merge_triples(
        &mut self,
        triples: &[Triple],
        clusters: Option<&EntityClusters>,
    ) -> &[MergedTriple] {
        info!(count = triples.len(), "Merging triples");

        for triple in triples {
            let triple = match clusters {
                Some(clusters) => clusters.canonicalize(triple),
                None => triple.clone(),
            };
            let fingerprint = triple.fingerprint();

            match self.index.get(&fingerprint) {
                Some(&idx) => self.merged[idx].add_evidence(&triple),
                None => {
                    self.index.insert(fingerprint.clone(), self.merged.len());
                    self.merged.push(MergedTriple::from_triple(fingerprint, &triple));
                }
            }
        }

        let evidence: usize = self.merged.iter().map(|m| m.evidence_sources.len()).sum();
        let average = if self.merged.is_empty() {
            0.0
        } else {
            evidence as f64 / self.merged.len() as f64
        };
        info!(
            unique = self.merged.len(),
            avg_evidence = format!("{average:.1}"),
            "Merged into unique triples"
        );

        &self.merged
    }

    /// Flag facts observed both as inferred and as explicit.
    pub fn detect_conflicts(merged: &[MergedTriple]) -> Vec<Conflict> {
        let conflicts: Vec<Conflict> = merged
            .iter()
            .filter(|m| m.inferred_count > 0 && m.total_count > m.inferred_count)
            .map(|m| Conflict {
                fingerprint: m.fingerprint.clone(),
                triple: m.label(),
                kind: ConflictKind::MixedInference,
                inferred_count: m.inferred_count,
                explicit_count: m.explicit_count(),
                evidence_sources: m.evidence_sources.len(),
            })
            .collect();

        if !conflicts.is_empty() {
            warn!(count = conflicts.len(), "Detected potential conflicts");
        }

        conflicts
    }

    pub fn get_merged_triple(&self, fingerprint: &Fingerprint) -> Option<&MergedTriple> {
        self.index.get(fingerprint).map(|&idx| &self.merged[idx])
    }

    pub fn merged(&self) -> &[MergedTriple] {
        &self.merged
    }

    pub fn len(&self) -> usize {
        self.merged.len()
    }

    pub fn is_empty(&self) -> bool {
        self.merged.is_empty()
    }

    pub fn clear(&mut self) {
        self.merged.clear();
        self.index.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s3_kms(evidence: &str) -> Triple {
        Triple::new(
            "Amazon S3",
            EntityType::Service,
            RelationType::Uses,
            "AWS KMS",
            EntityType::Service,
            evidence,
        )
    }

    #[test]
    fn test_merge_aggregates_evidence() {
        let mut service = MergeService::new();
        let merged = service.merge_triples(
            &[
                s3_kms("S3 encrypts objects with KMS keys").with_source("s3.md"),
                s3_kms("Server-side encryption uses KMS").with_source("kms.md"),
            ],
            None,
        );

        assert_eq!(merged.len(), 1);
        let m = &merged[0];
        assert_eq!(m.total_count, 2);
        assert_eq!(m.evidence_sources.len(), 2);
        assert_eq!(m.evidence_sources[0].source, "s3.md");
        assert_eq!(m.evidence_sources[1].source, "kms.md");
        assert!(m.first_seen <= m.last_seen);
    }

    #[test]
    fn test_case_variants_merge() {
        let mut service = MergeService::new();
        let mut variant = s3_kms("S3 encrypts objects with KMS keys");
        variant.subject = "  amazon   s3 ".to_string();

        let merged = service.merge_triples(&[s3_kms("S3 encrypts objects"), variant], None);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].subject, "Amazon S3");
    }

    #[test]
    fn test_first_seen_order_across_batches() {
        let mut service = MergeService::new();
        let lambda = Triple::new(
            "AWS Lambda",
            EntityType::Service,
            RelationType::Uses,
            "Amazon SQS",
            EntityType::Service,
            "Lambda polls SQS queues",
        );

        service.merge_triples(&[lambda.clone()], None);
        let merged = service.merge_triples(&[s3_kms("S3 uses KMS keys"), lambda], None);

        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].subject, "AWS Lambda");
        assert_eq!(merged[0].total_count, 2);
        assert_eq!(merged[1].subject, "Amazon S3");
    }

    #[test]
    fn test_detect_mixed_inference() {
        let mut service = MergeService::new();
        service.merge_triples(
            &[
                s3_kms("S3 encrypts objects with KMS keys"),
                s3_kms("inferred from bucket policy").with_inferred(true),
            ],
            None,
        );

        let conflicts = MergeService::detect_conflicts(service.merged());
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].kind, ConflictKind::MixedInference);
        assert_eq!(conflicts[0].inferred_count, 1);
        assert_eq!(conflicts[0].explicit_count, 1);
        assert_eq!(conflicts[0].triple, "Amazon S3 --[uses]--> AWS KMS");
    }

    #[test]
    fn test_all_inferred_is_not_a_conflict() {
        let mut service = MergeService::new();
        service.merge_triples(&[s3_kms("guess").with_inferred(true)], None);
        assert!(MergeService::detect_conflicts(service.merged()).is_empty());
    }

    #[test]
    fn test_get_and_clear() {
        let mut service = MergeService::new();
        let triple = s3_kms("S3 encrypts objects with KMS keys");
        service.merge_triples(std::slice::from_ref(&triple), None);

        let found = service.get_merged_triple(&triple.fingerprint());
        assert_eq!(found.map(|m| m.total_count), Some(1));

        service.clear();
        assert!(service.is_empty());
        assert!(service.get_merged_triple(&triple.fingerprint()).is_none());
    }
}
