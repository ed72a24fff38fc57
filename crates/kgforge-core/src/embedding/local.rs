//! Local embedding generation with fastembed.

use std::path::PathBuf;

use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};

use crate::error::KnowledgeError;

use super::Embedder;

/// FastEmbed-based embedder.
pub struct FastEmbedder {
    model: TextEmbedding,
    dimension: usize,
    model_name: String,
}

impl FastEmbedder {
    /// Create an embedder for a configured model name.
    ///
    /// Uses `~/.kgforge/cache/` as the model cache directory.
    pub fn from_name(name: &str) -> Result<Self, KnowledgeError> {
        let model = Self::resolve_model(name)?;
        Self::with_model_and_cache(model, name, Self::default_cache_dir())
    }

    /// Create an embedder with a specific model and cache directory.
    pub fn with_model_and_cache(
        model: EmbeddingModel,
        model_name: &str,
        cache_dir: PathBuf,
    ) -> Result<Self, KnowledgeError> {
        std::fs::create_dir_all(&cache_dir).map_err(|e| {
            KnowledgeError::Embedding(format!("Failed to create cache directory: {}", e))
        })?;

        let text_embedding = TextEmbedding::try_new(
            InitOptions::new(model)
                .with_cache_dir(cache_dir)
                .with_show_download_progress(false),
        )
        .map_err(|e| KnowledgeError::Embedding(e.to_string()))?;

        // Probe the dimension with a throwaway embedding
        let probe = text_embedding
            .embed(vec!["probe"], None)
            .map_err(|e| KnowledgeError::Embedding(e.to_string()))?;
        let dimension = probe.first().map(|v| v.len()).unwrap_or(384);

        Ok(Self {
            model: text_embedding,
            dimension,
            model_name: model_name.to_string(),
        })
    }

    /// Map a sentence-transformers style model name onto a fastembed model.
    fn resolve_model(name: &str) -> Result<EmbeddingModel, KnowledgeError> {
        let key = name
            .trim()
            .trim_start_matches("sentence-transformers/")
            .trim_start_matches("BAAI/")
            .to_lowercase();

        match key.as_str() {
            "all-minilm-l6-v2" => Ok(EmbeddingModel::AllMiniLML6V2),
            "all-minilm-l12-v2" => Ok(EmbeddingModel::AllMiniLML12V2),
            "bge-small-en-v1.5" => Ok(EmbeddingModel::BGESmallENV15),
            "bge-base-en-v1.5" => Ok(EmbeddingModel::BGEBaseENV15),
            _ => Err(KnowledgeError::Embedding(format!(
                "Unsupported embedding model: {}",
                name
            ))),
        }
    }

    fn default_cache_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".kgforge")
            .join("cache")
    }
}

impl Embedder for FastEmbedder {
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, KnowledgeError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let texts_vec: Vec<&str> = texts.iter().map(|s| s.as_str()).collect();

        self.model
            .embed(texts_vec, None)
            .map_err(|e| KnowledgeError::Embedding(e.to_string()))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_model_names() {
        assert!(matches!(
            FastEmbedder::resolve_model("all-MiniLM-L6-v2"),
            Ok(EmbeddingModel::AllMiniLML6V2)
        ));
        assert!(matches!(
            FastEmbedder::resolve_model("sentence-transformers/all-MiniLM-L6-v2"),
            Ok(EmbeddingModel::AllMiniLML6V2)
        ));
        assert!(FastEmbedder::resolve_model("word2vec").is_err());
    }

    #[test]
    fn test_embedder_dimension() {
        // Requires downloading the model, so skip in CI
        if std::env::var("CI").is_ok() {
            return;
        }

        let embedder = FastEmbedder::from_name("all-MiniLM-L6-v2").expect("Failed to create embedder");
        assert_eq!(embedder.dimension(), 384);
    }
}
