//! End-to-end processing of one batch of raw triples.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::cluster::{entities_from_triples, EntityClusterer, EntityClusters};
use crate::config::{ConfigError, PipelineConfig};
use crate::diff::{DiffExtractor, DiffResult, DiffStats};
use crate::embedding::Embedder;
use crate::extraction::RawTriple;
use crate::merge::{MergeService, MergedTriple};
use crate::models::{Conflict, Triple};
use crate::normalize::{
    EntityNormalizer, NormalizationConflict, NormalizationService, RelationNormalizer,
};
use crate::registry::CanonicalRegistry;
use crate::schema::{EntityType, SchemaError, SchemaRegistry};
use crate::storage::{StorageError, TripleStore};
use crate::validate::{TripleValidator, ValidationPipeline, ValidationReport};

/// Fatal pipeline errors. Per-triple problems are reported, not raised.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Everything one run produced.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub validation: ValidationReport,
    pub merged: Vec<MergedTriple>,
    pub merge_conflicts: Vec<Conflict>,
    pub normalization_conflicts: Vec<NormalizationConflict>,
    pub clusters: EntityClusters,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff: Option<DiffResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff_stats: Option<DiffStats>,
}

/// Ordered normalization, clustering, validation, merge and diff stages.
pub struct Pipeline {
    config: PipelineConfig,
    relations: RelationNormalizer,
    normalization: NormalizationService,
    clusterer: EntityClusterer,
    validation: ValidationPipeline,
}

impl Pipeline {
    /// Build a pipeline with the standard schema.
    pub fn new(
        config: PipelineConfig,
        registry: Arc<CanonicalRegistry>,
        embedder: Option<Arc<dyn Embedder>>,
    ) -> Result<Self, PipelineError> {
        Self::with_schema(config, SchemaRegistry::standard(), registry, embedder)
    }

    pub fn with_schema(
        config: PipelineConfig,
        schema: SchemaRegistry,
        registry: Arc<CanonicalRegistry>,
        embedder: Option<Arc<dyn Embedder>>,
    ) -> Result<Self, PipelineError> {
        config.validate()?;

        let threshold = config.normalization.similarity_threshold;
        let mut normalizer = EntityNormalizer::new(registry).with_threshold(threshold);
        if let Some(embedder) = embedder {
            info!(model = embedder.model_name(), "Semantic matching enabled");
            normalizer = normalizer.with_embedder(embedder);
        }

        let validator = TripleValidator::new(schema, config.schema.mode)
            .with_min_evidence_words(config.validation.min_evidence_words);

        Ok(Self {
            relations: RelationNormalizer::new(),
            normalization: NormalizationService::new(normalizer),
            clusterer: EntityClusterer::new(&config.clustering, threshold),
            validation: ValidationPipeline::new(validator),
            config,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn relations(&self) -> &RelationNormalizer {
        &self.relations
    }

    pub fn normalization(&self) -> &NormalizationService {
        &self.normalization
    }

    /// Run raw extractor records through every stage.
    pub fn run(&mut self, records: Vec<RawTriple>, store: Option<&mut TripleStore>) -> RunReport {
        let triples = records
            .into_iter()
            .map(|raw| raw.into_triple(&self.relations))
            .collect();
        self.run_triples(triples, store)
    }

    /// Run typed triples through every stage after relation normalization.
    pub fn run_triples(&mut self, triples: Vec<Triple>, store: Option<&mut TripleStore>) -> RunReport {
        let run_id = Uuid::new_v4();
        info!(%run_id, triples = triples.len(), "Starting pipeline run");

        let features = self.config.features.clone();

        let (triples, unresolved, normalization_conflicts) = if features.normalization {
            let outcome = self.normalization.normalize_triples(triples);
            (outcome.triples, outcome.unresolved, outcome.conflicts)
        } else {
            let unresolved = entities_from_triples(&triples);
            (triples, unresolved, Vec::new())
        };

        let clusters = if features.clustering && self.normalization.normalizer().has_embedder() {
            self.cluster(&unresolved)
        } else {
            EntityClusters::default()
        };

        let (valid, validation) = if features.validation {
            self.validation.validate(triples)
        } else {
            let total = triples.len();
            let report = ValidationReport {
                total,
                valid: total,
                ..ValidationReport::default()
            };
            (triples, report)
        };

        let mut merge = MergeService::new();
        let merged = merge.merge_triples(&valid, Some(&clusters)).to_vec();
        let merge_conflicts = MergeService::detect_conflicts(&merged);

        let (diff, diff_stats) = match store {
            Some(store) if features.incremental => {
                let canonical: Vec<Triple> = valid.iter().map(|t| clusters.canonicalize(t)).collect();
                let mut extractor = DiffExtractor::new(store);
                let diff = extractor.extract_diff(canonical);
                let stats = extractor.apply_diff(&diff);
                (Some(diff), Some(stats))
            }
            Some(_) => {
                warn!("Incremental mode is disabled, store left untouched");
                (None, None)
            }
            None => (None, None),
        };

        info!(
            %run_id,
            valid = validation.valid,
            invalid = validation.invalid,
            merged = merged.len(),
            clusters = clusters.len(),
            "Pipeline run complete"
        );

        RunReport {
            run_id,
            validation,
            merged,
            merge_conflicts,
            normalization_conflicts,
            clusters,
            diff,
            diff_stats,
        }
    }

    /// Run against a store snapshot on disk, saving it afterwards.
    pub fn run_with_snapshot(
        &mut self,
        records: Vec<RawTriple>,
        snapshot: impl AsRef<Path>,
    ) -> Result<RunReport, PipelineError> {
        let snapshot = snapshot.as_ref();
        let mut store = TripleStore::load(snapshot)?;
        let report = self.run(records, Some(&mut store));
        if report.diff_stats.is_some() {
            store.save(snapshot)?;
        }
        Ok(report)
    }

    fn cluster(&self, entities: &[(String, EntityType)]) -> EntityClusters {
        let normalizer = self.normalization.normalizer();
        let mut embeddings = HashMap::new();
        for (name, _) in entities {
            if embeddings.contains_key(name) {
                continue;
            }
            if let Some(vector) = normalizer.embedding_for(name) {
                embeddings.insert(name.clone(), vector);
            }
        }
        self.clusterer.cluster(entities, &embeddings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::RelationType;

    fn pipeline(config: PipelineConfig) -> Pipeline {
        Pipeline::new(config, Arc::new(CanonicalRegistry::seeded()), None).unwrap()
    }

    fn raw(subject: &str, relation: &str, object: &str) -> RawTriple {
        RawTriple {
            subject: subject.into(),
            subject_type: "Service".into(),
            relation: relation.into(),
            object: object.into(),
            object_type: "Service".into(),
            evidence: "observed in the architecture guide".into(),
            inferred: false,
            source: Some("guide.md".into()),
            confidence: 0.9,
            section: None,
            url: None,
            timestamp: None,
        }
    }

    #[test]
    fn test_rejects_invalid_config() {
        let mut config = PipelineConfig::default();
        config.normalization.similarity_threshold = 1.5;
        let result = Pipeline::new(config, Arc::new(CanonicalRegistry::seeded()), None);
        assert!(matches!(result, Err(PipelineError::Config(_))));
    }

    #[test]
    fn test_run_normalizes_and_merges() {
        let mut pipeline = pipeline(PipelineConfig::default());
        let report = pipeline.run(
            vec![
                raw("EC2", "depends on", "S3"),
                raw("Amazon EC2", "depends_on", "Amazon S3"),
            ],
            None,
        );

        assert_eq!(report.validation.valid, 2);
        assert_eq!(report.merged.len(), 1);
        assert_eq!(report.merged[0].subject, "Amazon EC2");
        assert_eq!(report.merged[0].relation, RelationType::DependsOn);
        assert_eq!(report.merged[0].total_count, 2);
        assert!(report.diff.is_none());
        assert!(report.clusters.is_empty());
    }

    #[test]
    fn test_incremental_requires_flag() {
        let mut store = TripleStore::new();
        let mut pipeline = pipeline(PipelineConfig::default());
        let report = pipeline.run(vec![raw("EC2", "uses", "S3")], Some(&mut store));
        assert!(report.diff.is_none());
        assert!(store.is_empty());

        let mut config = PipelineConfig::default();
        config.features.incremental = true;
        let mut pipeline = self::pipeline(config);
        let report = pipeline.run(vec![raw("EC2", "uses", "S3")], Some(&mut store));
        assert_eq!(report.diff_stats.map(|s| s.added), Some(1));
        assert!(store
            .find_triple("Amazon EC2", &RelationType::Uses, "Amazon S3")
            .is_some());
    }

    #[test]
    fn test_disabled_stages() {
        let mut config = PipelineConfig::default();
        config.features.normalization = false;
        config.features.validation = false;
        let mut pipeline = pipeline(config);

        let mut bad = raw("EC2", "uses", "S3");
        bad.evidence = "x".into();
        let report = pipeline.run(vec![bad], None);

        assert_eq!(report.validation.valid, 1);
        assert_eq!(report.merged[0].subject, "EC2");
        assert_eq!(report.merged[0].subject_type, EntityType::Service);
    }
}
