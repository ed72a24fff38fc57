//! Entity name normalization.
//!
//! Resolution runs in two stages:
//!
//! - **Rules** (`exact`): vendor prefix/suffix stripping and registry lookups.
//! - **Semantic** (`semantic`): cosine similarity between the input and
//!   precomputed embeddings of same-type canonical entities. Only runs when
//!   an [`Embedder`] is configured and the rules miss.

use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::DEFAULT_SIMILARITY_THRESHOLD;
use crate::embedding::{cosine_similarity, embed_one, CachedEmbedder, Embedder};
use crate::registry::CanonicalRegistry;
use crate::schema::EntityType;

static VENDOR_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(aws|amazon)\s+").unwrap());
static VENDOR_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+(service|aws|amazon)$").unwrap());

/// Resource-noun suffixes stripped as a last rule-based attempt.
const RESOURCE_SUFFIXES: &[&str] = &[" bucket", " instance", " volume", " gateway", " endpoint"];

/// How an entity name was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NormalizationMethod {
    Exact,
    Semantic,
    None,
}

impl fmt::Display for NormalizationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Exact => "exact",
            Self::Semantic => "semantic",
            Self::None => "none",
        };
        f.write_str(s)
    }
}

/// Outcome of normalizing one entity name.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub canonical: Option<String>,
    pub confidence: f64,
    pub method: NormalizationMethod,
}

impl Resolution {
    fn exact(canonical: &str) -> Self {
        Self {
            canonical: Some(canonical.to_string()),
            confidence: 1.0,
            method: NormalizationMethod::Exact,
        }
    }

    fn unresolved() -> Self {
        Self {
            canonical: None,
            confidence: 0.0,
            method: NormalizationMethod::None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.canonical.is_some()
    }
}

struct CanonicalVector {
    entity_type: EntityType,
    name: String,
    vector: Vec<f32>,
}

/// Maps entity name variants to canonical names.
pub struct EntityNormalizer {
    registry: Arc<CanonicalRegistry>,
    similarity_threshold: f32,
    embedder: Option<Arc<CachedEmbedder>>,
    canonical_vectors: Vec<CanonicalVector>,
}

impl EntityNormalizer {
    /// Create a rule-based normalizer.
    pub fn new(registry: Arc<CanonicalRegistry>) -> Self {
        Self {
            registry,
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            embedder: None,
            canonical_vectors: Vec::new(),
        }
    }

    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.similarity_threshold = threshold;
        self
    }

    /// Enable semantic matching.
    ///
    /// Canonical embeddings are computed once here. If the backend fails the
    /// normalizer keeps working with rules only.
    pub fn with_embedder(mut self, embedder: Arc<dyn Embedder>) -> Self {
        let cached = Arc::new(CachedEmbedder::new(embedder));

        let entities: Vec<_> = self.registry.iter().collect();
        let texts: Vec<String> = entities.iter().map(|e| e.embedding_text()).collect();

        self.canonical_vectors = match cached.embed(&texts) {
            Ok(vectors) if vectors.len() == entities.len() => entities
                .iter()
                .zip(vectors)
                .map(|(entity, vector)| CanonicalVector {
                    entity_type: entity.entity_type.clone(),
                    name: entity.name.clone(),
                    vector,
                })
                .collect(),
            Ok(vectors) => {
                warn!(
                    expected = entities.len(),
                    got = vectors.len(),
                    "Embedding backend returned a short batch, semantic matching disabled"
                );
                Vec::new()
            }
            Err(e) => {
                warn!(error = %e, "Failed to embed canonical entities, semantic matching disabled");
                Vec::new()
            }
        };
        debug!(count = self.canonical_vectors.len(), "Precomputed canonical embeddings");

        self.embedder = Some(cached);
        self
    }

    pub fn similarity_threshold(&self) -> f32 {
        self.similarity_threshold
    }

    pub fn has_embedder(&self) -> bool {
        self.embedder.is_some()
    }

    pub fn registry(&self) -> &CanonicalRegistry {
        &self.registry
    }

    /// Normalize an entity name of the given type.
    pub fn normalize(&self, name: &str, entity_type: &EntityType) -> Resolution {
        let name = name.trim();
        if name.is_empty() {
            return Resolution::unresolved();
        }

        if let Some(canonical) = self.normalize_rules(name, entity_type) {
            return Resolution::exact(canonical);
        }

        if let Some((canonical, similarity)) = self.normalize_semantic(name, entity_type) {
            return Resolution {
                canonical: Some(canonical),
                confidence: f64::from(similarity),
                method: NormalizationMethod::Semantic,
            };
        }

        Resolution::unresolved()
    }

    /// Embedding of a name through the shared cache, if a backend is set.
    ///
    /// Failures are logged and yield `None`.
    pub fn embedding_for(&self, name: &str) -> Option<Vec<f32>> {
        let embedder = self.embedder.as_ref()?;
        match embed_one(embedder.as_ref(), name) {
            Ok(vector) => Some(vector),
            Err(e) => {
                warn!(entity = name, error = %e, "Failed to embed entity");
                None
            }
        }
    }

    fn normalize_rules(&self, name: &str, entity_type: &EntityType) -> Option<&str> {
        let lowered = name.to_lowercase();
        let stripped = strip_vendor(&lowered);

        let mut candidates = vec![lowered.as_str()];
        if stripped != lowered {
            candidates.push(stripped.as_str());
        }

        for candidate in &candidates {
            if let Some(canonical) = self.registry.find_canonical(candidate, Some(entity_type)) {
                return Some(canonical);
            }

            if let Some(canonical) = self.registry.find_canonical(candidate, None) {
                if self.registry.get_entity(canonical, entity_type).is_some() {
                    return Some(canonical);
                }
            }
        }

        for suffix in RESOURCE_SUFFIXES {
            if let Some(base) = stripped.strip_suffix(suffix) {
                let base = base.trim();
                if base.is_empty() {
                    continue;
                }
                if let Some(canonical) = self.registry.find_canonical(base, Some(entity_type)) {
                    return Some(canonical);
                }
            }
        }

        None
    }

    fn normalize_semantic(&self, name: &str, entity_type: &EntityType) -> Option<(String, f32)> {
        if self.canonical_vectors.is_empty() {
            return None;
        }
        let query = self.embedding_for(name)?;

        let mut best: Option<(&CanonicalVector, f32)> = None;
        for candidate in self
            .canonical_vectors
            .iter()
            .filter(|c| &c.entity_type == entity_type)
        {
            let similarity = cosine_similarity(&query, &candidate.vector);
            if best.map_or(true, |(_, s)| similarity > s) {
                best = Some((candidate, similarity));
            }
        }

        match best {
            Some((candidate, similarity)) if similarity >= self.similarity_threshold => {
                Some((candidate.name.clone(), similarity))
            }
            _ => None,
        }
    }
}

/// Strip a leading `aws `/`amazon ` and a trailing ` service`/` aws`/` amazon`.
fn strip_vendor(lowered: &str) -> String {
    let without_prefix = VENDOR_PREFIX.replace(lowered, "");
    VENDOR_SUFFIX.replace(&without_prefix, "").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::KnowledgeError;

    fn normalizer() -> EntityNormalizer {
        EntityNormalizer::new(Arc::new(CanonicalRegistry::seeded()))
    }

    #[test]
    fn test_strip_vendor() {
        assert_eq!(strip_vendor("amazon s3"), "s3");
        assert_eq!(strip_vendor("aws kms service"), "kms");
        assert_eq!(strip_vendor("lambda aws"), "lambda");
        assert_eq!(strip_vendor("awsome"), "awsome");
    }

    #[test]
    fn test_exact_synonym() {
        let resolution = normalizer().normalize("EC2", &EntityType::Service);
        assert_eq!(resolution.canonical.as_deref(), Some("Amazon EC2"));
        assert_eq!(resolution.confidence, 1.0);
        assert_eq!(resolution.method, NormalizationMethod::Exact);
    }

    #[test]
    fn test_canonical_name_is_fixpoint() {
        let n = normalizer();
        for name in ["Amazon EC2", "AWS Lambda", "AWS Site-to-Site VPN", "Elastic Load Balancing"] {
            let resolution = n.normalize(name, &EntityType::Service);
            assert_eq!(resolution.canonical.as_deref(), Some(name));
        }
    }

    #[test]
    fn test_prefix_and_suffix_rules() {
        let n = normalizer();
        assert_eq!(
            n.normalize("Amazon DynamoDB service", &EntityType::Service).canonical.as_deref(),
            Some("Amazon DynamoDB")
        );
        assert_eq!(
            n.normalize("Amazon Cognito", &EntityType::Service).canonical.as_deref(),
            Some("Amazon Cognito")
        );
        assert_eq!(
            n.normalize("SQS instance", &EntityType::Service).canonical.as_deref(),
            Some("Amazon SQS")
        );
        assert_eq!(
            n.normalize("nat gateway", &EntityType::Component).canonical.as_deref(),
            Some("NAT Gateway")
        );
    }

    #[test]
    fn test_type_mismatch_is_unresolved() {
        let resolution = normalizer().normalize("EC2", &EntityType::Pillar);
        assert_eq!(resolution, Resolution::unresolved());
    }

    #[test]
    fn test_blank_input() {
        let resolution = normalizer().normalize("   ", &EntityType::Service);
        assert!(!resolution.is_resolved());
        assert_eq!(resolution.method, NormalizationMethod::None);
    }

    struct KeywordEmbedder;

    impl Embedder for KeywordEmbedder {
        fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, KnowledgeError> {
            Ok(texts
                .iter()
                .map(|t| {
                    let t = t.to_lowercase();
                    vec![
                        if t.contains("queue") { 1.0 } else { 0.0 },
                        if t.contains("notification") { 1.0 } else { 0.0 },
                        0.1,
                    ]
                })
                .collect())
        }

        fn dimension(&self) -> usize {
            3
        }

        fn model_name(&self) -> &str {
            "keyword"
        }
    }

    struct FailingEmbedder;

    impl Embedder for FailingEmbedder {
        fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, KnowledgeError> {
            Err(KnowledgeError::Embedding("backend offline".to_string()))
        }

        fn dimension(&self) -> usize {
            0
        }

        fn model_name(&self) -> &str {
            "failing"
        }
    }

    #[test]
    fn test_semantic_match() {
        let n = normalizer().with_embedder(Arc::new(KeywordEmbedder));
        let resolution = n.normalize("managed message queue", &EntityType::Service);
        assert_eq!(resolution.canonical.as_deref(), Some("Amazon SQS"));
        assert_eq!(resolution.method, NormalizationMethod::Semantic);
        assert!(resolution.confidence >= 0.75);
    }

    #[test]
    fn test_semantic_respects_threshold() {
        let n = normalizer()
            .with_threshold(0.9999)
            .with_embedder(Arc::new(KeywordEmbedder));
        let resolution = n.normalize("queue of notifications", &EntityType::Service);
        assert!(!resolution.is_resolved());
    }

    #[test]
    fn test_backend_failure_degrades_to_rules() {
        let n = normalizer().with_embedder(Arc::new(FailingEmbedder));
        assert!(n.has_embedder());
        assert_eq!(
            n.normalize("S3", &EntityType::Service).canonical.as_deref(),
            Some("Amazon S3")
        );
        assert!(!n.normalize("object lake", &EntityType::Service).is_resolved());
        assert!(n.embedding_for("object lake").is_none());
    }
}
