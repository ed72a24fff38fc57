use std::sync::Arc;

use kgforge_core::diff::DiffExtractor;
use kgforge_core::merge::MergeService;
use kgforge_core::normalize::{EntityNormalizer, NormalizationMethod};
use kgforge_core::validate::{ErrorCategory, TripleValidator, ValidationError};
use kgforge_core::{CanonicalRegistry, EntityType, RelationType, Triple, TripleStore};

#[test]
fn test_ec2_resolves_to_amazon_ec2() {
    let normalizer = EntityNormalizer::new(Arc::new(CanonicalRegistry::seeded()));
    let resolution = normalizer.normalize("EC2", &EntityType::Service);

    assert_eq!(resolution.canonical.as_deref(), Some("Amazon EC2"));
    assert_eq!(resolution.confidence, 1.0);
    assert_eq!(resolution.method, NormalizationMethod::Exact);
}

#[test]
fn test_recommended_by_requires_best_practice() {
    let mut validator = TripleValidator::default();
    let triple = Triple::new(
        "AWS Lambda",
        EntityType::Service,
        RelationType::RecommendedBy,
        "Security",
        EntityType::Pillar,
        "Lambda is recommended by the security pillar",
    );

    assert!(!validator.validate(&triple));
    let issue = &validator.errors()[0];
    assert_eq!(issue.error.category(), ErrorCategory::BusinessRule);
    assert_eq!(
        issue.error,
        ValidationError::BusinessRule {
            relation: "recommended_by".to_string(),
            message: "requires subject type 'BestPractice', got 'Service'".to_string(),
        }
    );
}

#[test]
fn test_repeated_observation_merges() {
    let observation = |evidence: &str, source: &str| {
        Triple::new(
            "Amazon S3",
            EntityType::Service,
            RelationType::Uses,
            "AWS KMS",
            EntityType::Service,
            evidence,
        )
        .with_source(source)
    };

    let mut merge = MergeService::new();
    let merged = merge.merge_triples(
        &[
            observation("S3 encrypts objects at rest with KMS keys", "s3-guide.md"),
            observation("SSE-KMS uses keys managed in AWS KMS", "kms-guide.md"),
        ],
        None,
    );

    assert_eq!(merged.len(), 1);
    assert_eq!(merged[0].evidence_sources.len(), 2);
    assert_eq!(merged[0].total_count, 2);
    assert_eq!(merged[0].inferred_count, 0);
}

#[test]
fn test_second_run_updates_everything() {
    let batch: Vec<Triple> = (0..10)
        .map(|i| {
            Triple::new(
                format!("service-{i}"),
                EntityType::Service,
                RelationType::DependsOn,
                "Amazon VPC",
                EntityType::Service,
                "runs inside the shared VPC",
            )
        })
        .collect();

    let mut store = TripleStore::new();
    let mut extractor = DiffExtractor::new(&mut store);

    let first = extractor.extract_diff(batch.clone());
    assert_eq!(first.new_triples.len(), 10);
    assert!(first.updated_triples.is_empty());
    let stats = extractor.apply_diff(&first);
    assert_eq!(stats.added, 10);

    let second = extractor.extract_diff(batch);
    assert!(second.new_triples.is_empty());
    assert_eq!(second.updated_triples.len(), 10);
    assert_eq!(second.unchanged_count, 10);
    let stats = extractor.apply_diff(&second);
    assert_eq!(stats.updated, 10);

    assert_eq!(store.len(), 10);
    assert!(store.all_triples().iter().all(|t| t.update_count == 1));
}
