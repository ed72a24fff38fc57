//! Configuration management for kgforge.
//!
//! Configuration is loaded from multiple sources with the following priority:
//! 1. Environment variables (highest priority)
//! 2. Project-local `kgforge.toml` file
//! 3. User config `~/.config/kgforge/config.toml`
//! 4. Built-in defaults (lowest priority)

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

mod defaults;

pub use defaults::*;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Main configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Schema strictness.
    pub schema: SchemaConfig,

    /// Pipeline stage toggles.
    pub features: FeatureFlags,

    /// Entity normalization settings.
    pub normalization: NormalizationConfig,

    /// Clustering settings.
    pub clustering: ClusteringConfig,

    /// Validation settings.
    pub validation: ValidationConfig,
}

impl PipelineConfig {
    /// Load configuration from default locations.
    ///
    /// Searches for config in order:
    /// 1. `./kgforge.toml` (project local)
    /// 2. `~/.config/kgforge/config.toml` (user config)
    /// 3. Falls back to defaults
    ///
    /// Environment overrides are applied on top in every case.
    pub fn load() -> Result<Self, ConfigError> {
        if Path::new(PROJECT_CONFIG_FILE).exists() {
            return Self::from_file(PROJECT_CONFIG_FILE);
        }

        if let Some(path) = Self::user_config_path() {
            if path.exists() {
                return Self::from_file(&path);
            }
        }

        Self::from_env()
    }

    /// Load configuration from a specific file, then apply env overrides.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: PipelineConfig = toml::from_str(&content)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Defaults plus environment overrides.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Path of the user config file, if a config dir exists.
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(USER_CONFIG_DIR).join(USER_CONFIG_FILE))
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Apply `KG_*` overrides read through `lookup`.
    ///
    /// Values that fail to parse are ignored.
    pub fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        // Schema overrides
        if let Some(mode) = lookup("KG_SCHEMA_MODE") {
            if let Ok(mode) = mode.parse() {
                self.schema.mode = mode;
            }
        }

        // Feature overrides
        let flags = [
            ("KG_ENABLE_NORMALIZATION", &mut self.features.normalization),
            ("KG_ENABLE_VALIDATION", &mut self.features.validation),
            ("KG_ENABLE_CLUSTERING", &mut self.features.clustering),
            ("KG_ENABLE_INCREMENTAL", &mut self.features.incremental),
            (
                "KG_USE_DENSITY_CLUSTERING",
                &mut self.clustering.use_density_clustering,
            ),
        ];
        for (key, slot) in flags {
            if let Some(value) = lookup(key).as_deref().and_then(parse_bool) {
                *slot = value;
            }
        }

        // Threshold overrides
        if let Some(threshold) = lookup("KG_SIMILARITY_THRESHOLD") {
            if let Ok(n) = threshold.trim().parse() {
                self.normalization.similarity_threshold = n;
            }
        }
        if let Some(words) = lookup("KG_MIN_EVIDENCE_WORDS") {
            if let Ok(n) = words.trim().parse() {
                self.validation.min_evidence_words = n;
            }
        }
        if let Some(size) = lookup("KG_MIN_CLUSTER_SIZE") {
            if let Ok(n) = size.trim().parse() {
                self.clustering.min_cluster_size = n;
            }
        }

        // Model overrides
        if let Some(model) = lookup("KG_EMBEDDING_MODEL") {
            self.normalization.embedding_model = model;
        }
    }

    /// Reject values no stage can work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let threshold = self.normalization.similarity_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(ConfigError::Invalid(format!(
                "similarity_threshold must be within [0, 1], got {}",
                threshold
            )));
        }
        if self.clustering.min_cluster_size < 2 {
            return Err(ConfigError::Invalid(format!(
                "min_cluster_size must be at least 2, got {}",
                self.clustering.min_cluster_size
            )));
        }
        if self.clustering.min_samples == 0 {
            return Err(ConfigError::Invalid(
                "min_samples must be at least 1".to_string(),
            ));
        }
        if self.normalization.embedding_model.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "embedding_model must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Render this configuration as TOML.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    /// Create a default config file content as a string.
    pub fn default_config_string() -> String {
        PipelineConfig::default().to_toml_string().unwrap_or_default()
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}

/// Which type and relation sets count as valid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaMode {
    /// Only core types and relations.
    #[default]
    Strict,
    /// Core plus legacy types and relations.
    Legacy,
}

impl fmt::Display for SchemaMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Strict => f.write_str("strict"),
            Self::Legacy => f.write_str("legacy"),
        }
    }
}

impl FromStr for SchemaMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "strict" => Ok(Self::Strict),
            "legacy" => Ok(Self::Legacy),
            other => Err(ConfigError::Invalid(format!("unknown schema mode '{}'", other))),
        }
    }
}

/// Schema configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaConfig {
    pub mode: SchemaMode,
}

/// Pipeline stage toggles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureFlags {
    pub normalization: bool,
    pub validation: bool,
    pub clustering: bool,
    /// Diff against and update the triple store.
    pub incremental: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            normalization: DEFAULT_ENABLE_NORMALIZATION,
            validation: DEFAULT_ENABLE_VALIDATION,
            clustering: DEFAULT_ENABLE_CLUSTERING,
            incremental: DEFAULT_ENABLE_INCREMENTAL,
        }
    }
}

/// Entity normalization configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizationConfig {
    /// Minimum cosine similarity for semantic matches.
    pub similarity_threshold: f32,

    /// Embedding model name.
    pub embedding_model: String,
}

impl Default for NormalizationConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
        }
    }
}

/// Clustering configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusteringConfig {
    /// Try HDBSCAN before agglomerative clustering.
    pub use_density_clustering: bool,

    pub min_cluster_size: usize,

    pub min_samples: usize,
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            use_density_clustering: DEFAULT_USE_DENSITY_CLUSTERING,
            min_cluster_size: DEFAULT_MIN_CLUSTER_SIZE,
            min_samples: DEFAULT_MIN_SAMPLES,
        }
    }
}

/// Validation configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Minimum evidence words for explicit triples.
    pub min_evidence_words: usize,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            min_evidence_words: DEFAULT_MIN_EVIDENCE_WORDS,
        }
    }
}
