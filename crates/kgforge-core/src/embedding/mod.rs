//! Embedding backends for semantic matching.
//!
//! The pipeline only needs the [`Embedder`] trait; computing vectors is left
//! to a backend. [`FastEmbedder`] is available with the `fastembed` feature.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use crate::error::KnowledgeError;

#[cfg(feature = "fastembed")]
mod local;

#[cfg(feature = "fastembed")]
pub use local::FastEmbedder;

/// Trait for embedding generation.
pub trait Embedder: Send + Sync {
    /// Generate embeddings for a batch of text.
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, KnowledgeError>;

    /// Get the embedding dimension.
    fn dimension(&self) -> usize;

    /// Get the model name.
    fn model_name(&self) -> &str;
}

/// Embed a single text.
pub fn embed_one(embedder: &dyn Embedder, text: &str) -> Result<Vec<f32>, KnowledgeError> {
    let mut vectors = embedder.embed(&[text.to_string()])?;
    match vectors.len() {
        1 => Ok(vectors.remove(0)),
        got => Err(KnowledgeError::BatchMismatch { expected: 1, got }),
    }
}

/// Cosine similarity of two vectors.
///
/// Returns 0 for mismatched dimensions, empty input or zero vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        0.0
    } else {
        dot / denom
    }
}

/// Memoizing wrapper: each distinct text is sent to the backend once.
pub struct CachedEmbedder {
    inner: Arc<dyn Embedder>,
    cache: Mutex<HashMap<String, Vec<f32>>>,
}

impl CachedEmbedder {
    pub fn new(inner: Arc<dyn Embedder>) -> Self {
        Self {
            inner,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Number of cached texts.
    pub fn cached(&self) -> usize {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl Embedder for CachedEmbedder {
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, KnowledgeError> {
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);

        let mut missing: Vec<String> = Vec::new();
        for text in texts {
            if !cache.contains_key(text) && !missing.contains(text) {
                missing.push(text.clone());
            }
        }

        if !missing.is_empty() {
            let vectors = self.inner.embed(&missing)?;
            if vectors.len() != missing.len() {
                return Err(KnowledgeError::BatchMismatch {
                    expected: missing.len(),
                    got: vectors.len(),
                });
            }
            cache.extend(missing.into_iter().zip(vectors));
        }

        texts
            .iter()
            .map(|text| {
                cache
                    .get(text)
                    .cloned()
                    .ok_or_else(|| KnowledgeError::Embedding(format!("no vector cached for '{}'", text)))
            })
            .collect()
    }

    fn dimension(&self) -> usize {
        self.inner.dimension()
    }

    fn model_name(&self) -> &str {
        self.inner.model_name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingEmbedder {
        calls: AtomicUsize,
    }

    impl Embedder for CountingEmbedder {
        fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, KnowledgeError> {
            self.calls.fetch_add(texts.len(), Ordering::SeqCst);
            Ok(texts.iter().map(|t| vec![t.len() as f32, 1.0]).collect())
        }

        fn dimension(&self) -> usize {
            2
        }

        fn model_name(&self) -> &str {
            "counting"
        }
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
    }

    #[test]
    fn test_cache_embeds_each_text_once() {
        let backend = Arc::new(CountingEmbedder {
            calls: AtomicUsize::new(0),
        });
        let cached = CachedEmbedder::new(backend.clone());

        let texts = vec!["ec2".to_string(), "s3".to_string(), "ec2".to_string()];
        let vectors = cached.embed(&texts).unwrap();
        assert_eq!(vectors.len(), 3);
        assert_eq!(vectors[0], vectors[2]);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 2);

        cached.embed(&["s3".to_string()]).unwrap();
        assert_eq!(backend.calls.load(Ordering::SeqCst), 2);
        assert_eq!(cached.cached(), 2);
        assert_eq!(cached.model_name(), "counting");
    }

    #[test]
    fn test_embed_one() {
        let backend = CountingEmbedder {
            calls: AtomicUsize::new(0),
        };
        assert_eq!(embed_one(&backend, "abc").unwrap(), vec![3.0, 1.0]);
    }
}
