//! Embedding-based clustering of entity names the normalizer could not
//! resolve.
//!
//! Names are clustered per entity type. Each cluster elects a
//! representative (the shortest name) and every member is rewritten to it
//! before merging.

use std::collections::HashMap;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::ClusteringConfig;
use crate::embedding::cosine_similarity;
use crate::models::Triple;
use crate::schema::EntityType;

mod agglomerative;
mod density;
mod error;

pub use agglomerative::Agglomerative;
pub use density::Hdbscan;
pub use error::ClusterError;

/// A clustering algorithm over a symmetric distance matrix.
///
/// Returns one label per point; `None` marks noise.
pub trait ClusterBackend {
    fn name(&self) -> &'static str;

    fn fit_predict(&self, distances: &[Vec<f64>]) -> Result<Vec<Option<usize>>, ClusterError>;
}

/// A group of names judged to denote the same entity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Cluster {
    pub id: String,
    pub entity_type: EntityType,
    /// Members in first-seen order.
    pub members: Vec<String>,
    pub representative: String,
}

/// Clusters produced for one run, with a lookup from member to
/// representative.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EntityClusters {
    clusters: Vec<Cluster>,
    #[serde(skip)]
    representatives: HashMap<(EntityType, String), String>,
}

impl EntityClusters {
    fn push(&mut self, cluster: Cluster) {
        for member in &cluster.members {
            self.representatives.insert(
                (cluster.entity_type.clone(), member.clone()),
                cluster.representative.clone(),
            );
        }
        self.clusters.push(cluster);
    }

    pub fn clusters(&self) -> &[Cluster] {
        &self.clusters
    }

    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    /// Representative for a clustered name, if it belongs to a cluster.
    pub fn representative_for(&self, name: &str, entity_type: &EntityType) -> Option<&str> {
        self.representatives
            .get(&(entity_type.clone(), name.trim().to_string()))
            .map(String::as_str)
    }

    /// Rewrite subject and object to their cluster representatives.
    pub fn canonicalize(&self, triple: &Triple) -> Triple {
        let mut out = triple.clone();
        if let Some(rep) = self.representative_for(&triple.subject, &triple.subject_type) {
            out.subject = rep.to_string();
        }
        if let Some(rep) = self.representative_for(&triple.object, &triple.object_type) {
            out.object = rep.to_string();
        }
        out
    }
}

/// Clusters entity names per type using the configured backends.
pub struct EntityClusterer {
    backends: Vec<Box<dyn ClusterBackend>>,
}

impl EntityClusterer {
    /// Density clustering first (when enabled), agglomerative as fallback.
    pub fn new(config: &ClusteringConfig, similarity_threshold: f32) -> Self {
        let mut backends: Vec<Box<dyn ClusterBackend>> = Vec::new();
        if config.use_density_clustering {
            backends.push(Box::new(Hdbscan::new(
                config.min_cluster_size,
                config.min_samples,
            )));
        }
        backends.push(Box::new(Agglomerative::new(
            1.0 - f64::from(similarity_threshold),
        )));
        Self { backends }
    }

    /// Use an explicit backend chain, tried in order.
    pub fn with_backends(backends: Vec<Box<dyn ClusterBackend>>) -> Self {
        Self { backends }
    }

    /// Cluster `(name, type)` pairs.
    ///
    /// Names without an embedding are skipped, as are types with fewer than
    /// two embedded names. A type on which every backend fails is skipped
    /// with a warning.
    pub fn cluster(
        &self,
        entities: &[(String, EntityType)],
        embeddings: &HashMap<String, Vec<f32>>,
    ) -> EntityClusters {
        let mut by_type: Vec<(EntityType, Vec<&str>)> = Vec::new();
        for (name, entity_type) in entities {
            if !embeddings.contains_key(name) {
                continue;
            }
            let idx = match by_type.iter().position(|(t, _)| t == entity_type) {
                Some(idx) => idx,
                None => {
                    by_type.push((entity_type.clone(), Vec::new()));
                    by_type.len() - 1
                }
            };
            let names = &mut by_type[idx].1;
            if !names.contains(&name.as_str()) {
                names.push(name.as_str());
            }
        }

        let mut result = EntityClusters::default();

        for (entity_type, names) in by_type {
            if names.len() < 2 {
                continue;
            }
            debug!(entity_type = %entity_type, count = names.len(), "Clustering entities");

            let vectors: Vec<&[f32]> = names
                .iter()
                .filter_map(|n| embeddings.get(*n).map(Vec::as_slice))
                .collect();

            let Some(labels) = self.run_backends(&vectors, &entity_type) else {
                continue;
            };

            let mut groups: Vec<(usize, Vec<String>)> = Vec::new();
            for (name, label) in names.iter().zip(labels) {
                let Some(label) = label else { continue };
                match groups.iter_mut().find(|(l, _)| *l == label) {
                    Some((_, members)) => members.push(name.to_string()),
                    None => groups.push((label, vec![name.to_string()])),
                }
            }
            groups.sort_by_key(|(label, _)| *label);

            for (label, members) in groups {
                let representative = representative(&members);
                result.push(Cluster {
                    id: format!("{}_cluster_{}", entity_type, label),
                    entity_type: entity_type.clone(),
                    members,
                    representative,
                });
            }
        }

        info!(clusters = result.len(), "Clustered unresolved entities");
        result
    }

    fn run_backends(&self, vectors: &[&[f32]], entity_type: &EntityType) -> Option<Vec<Option<usize>>> {
        let distances = match cosine_distances(vectors) {
            Ok(d) => d,
            Err(e) => {
                warn!(entity_type = %entity_type, error = %e, "Cannot cluster entities");
                return None;
            }
        };

        for backend in &self.backends {
            match backend.fit_predict(&distances) {
                Ok(labels) if labels.len() == vectors.len() => return Some(labels),
                Ok(labels) => warn!(
                    backend = backend.name(),
                    expected = vectors.len(),
                    got = labels.len(),
                    "Clustering backend returned the wrong number of labels"
                ),
                Err(e) => warn!(
                    backend = backend.name(),
                    entity_type = %entity_type,
                    error = %e,
                    "Clustering backend failed"
                ),
            }
        }

        warn!(entity_type = %entity_type, "All clustering backends failed, skipping type");
        None
    }
}

/// Distinct `(name, type)` pairs of subjects and objects, in first-seen order.
pub fn entities_from_triples(triples: &[Triple]) -> Vec<(String, EntityType)> {
    let mut out: Vec<(String, EntityType)> = Vec::new();
    for triple in triples {
        for (name, entity_type) in [
            (&triple.subject, &triple.subject_type),
            (&triple.object, &triple.object_type),
        ] {
            if !out.iter().any(|(n, t)| n == name && t == entity_type) {
                out.push((name.clone(), entity_type.clone()));
            }
        }
    }
    out
}

/// Shortest name, ties broken by lowercase form then exact string.
fn representative(members: &[String]) -> String {
    members
        .iter()
        .min_by(|a, b| {
            a.chars()
                .count()
                .cmp(&b.chars().count())
                .then_with(|| a.to_lowercase().cmp(&b.to_lowercase()))
                .then_with(|| a.cmp(b))
        })
        .cloned()
        .unwrap_or_default()
}

/// Pairwise cosine distances, `1 - cosine similarity` floored at 0.
fn cosine_distances(vectors: &[&[f32]]) -> Result<Vec<Vec<f64>>, ClusterError> {
    let first = vectors.first().ok_or(ClusterError::EmptyInput)?;
    let dim = first.len();

    for (i, v) in vectors.iter().enumerate() {
        if v.len() != dim {
            return Err(ClusterError::DimensionMismatch {
                expected: dim,
                got: v.len(),
            });
        }
        if v.iter().any(|x| !x.is_finite()) {
            return Err(ClusterError::NonFinite(i));
        }
    }

    Ok(vectors
        .iter()
        .enumerate()
        .map(|(i, a)| {
            vectors
                .iter()
                .enumerate()
                .map(|(j, b)| {
                    if i == j {
                        0.0
                    } else {
                        (1.0 - f64::from(cosine_similarity(a, b))).max(0.0)
                    }
                })
                .collect()
        })
        .collect())
}
