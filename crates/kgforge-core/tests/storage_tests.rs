use kgforge_core::models::Triple;
use kgforge_core::storage::StorageError;
use kgforge_core::{EntityType, RelationType, TripleStore};
use tempfile::TempDir;

fn triple(subject: &str, object: &str, evidence: &str) -> Triple {
    Triple::new(
        subject,
        EntityType::Service,
        RelationType::DependsOn,
        object,
        EntityType::Service,
        evidence,
    )
    .with_source("architecture.md")
}

#[test]
fn test_snapshot_roundtrip_keeps_lookups() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("store.json");

    let mut store = TripleStore::new();
    store.add_triple(&triple("AWS Lambda", "Amazon SQS", "Lambda polls SQS queues"));
    store.add_triple(&triple("Amazon ECS", "Amazon ECR", "ECS pulls images from ECR"));
    store.save(&path).unwrap();

    let mut loaded = TripleStore::load(&path).unwrap();
    assert_eq!(loaded.all_triples(), store.all_triples());
    assert!(loaded
        .find_triple("amazon ecs", &RelationType::DependsOn, "amazon ecr")
        .is_some());

    let (is_new, _) = loaded.add_triple(&triple("AWS Lambda", "Amazon SQS", "Lambda reads from SQS"));
    assert!(!is_new);
    assert_eq!(loaded.stats().total_evidence_sources, 3);
}

#[test]
fn test_snapshot_is_pretty_json() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("store.json");

    let mut store = TripleStore::new();
    store.add_triple(&triple("AWS Lambda", "Amazon SQS", "Lambda polls SQS queues"));
    store.save(&path).unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.contains("\n  \"triples\""));
    assert!(text.contains("\"update_count\": 0"));
    assert!(!text.contains("\"index\""));
}

#[test]
fn test_duplicate_fingerprint_rejected() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("store.json");

    let mut store = TripleStore::new();
    store.add_triple(&triple("AWS Lambda", "Amazon SQS", "Lambda polls SQS queues"));
    store.save(&path).unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    let mut value: serde_json::Value = serde_json::from_str(&text).unwrap();
    let entry = value["triples"][0].clone();
    value["triples"].as_array_mut().unwrap().push(entry);
    std::fs::write(&path, serde_json::to_string(&value).unwrap()).unwrap();

    assert!(matches!(
        TripleStore::load(&path),
        Err(StorageError::DuplicateFingerprint { .. })
    ));
}
