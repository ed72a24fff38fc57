//! Default values for kgforge configuration.
//!
//! All hardcoded defaults are centralized here for easy maintenance.

// ============================================================================
// Feature Defaults
// ============================================================================

/// Resolve entity and relation variants to canonical forms.
pub const DEFAULT_ENABLE_NORMALIZATION: bool = true;

/// Check triples against the schema and business rules.
pub const DEFAULT_ENABLE_VALIDATION: bool = true;

/// Cluster names the normalizer could not resolve.
pub const DEFAULT_ENABLE_CLUSTERING: bool = true;

/// Diff each run against the stored triples.
pub const DEFAULT_ENABLE_INCREMENTAL: bool = false;

// ============================================================================
// Normalization Defaults
// ============================================================================

/// Minimum cosine similarity for a semantic match, and the merge threshold
/// for agglomerative clustering.
pub const DEFAULT_SIMILARITY_THRESHOLD: f32 = 0.75;

/// Sentence embedding model used for semantic matching.
pub const DEFAULT_EMBEDDING_MODEL: &str = "all-MiniLM-L6-v2";

// ============================================================================
// Clustering Defaults
// ============================================================================

/// Prefer density-based clustering (HDBSCAN) over agglomerative.
pub const DEFAULT_USE_DENSITY_CLUSTERING: bool = true;

/// Smallest group HDBSCAN reports as a cluster.
pub const DEFAULT_MIN_CLUSTER_SIZE: usize = 2;

/// Neighbour count used for HDBSCAN core distances.
pub const DEFAULT_MIN_SAMPLES: usize = 1;

// ============================================================================
// Validation Defaults
// ============================================================================

/// Minimum words of evidence for an explicit (non-inferred) triple.
pub const DEFAULT_MIN_EVIDENCE_WORDS: usize = 3;

// ============================================================================
// Reporting Defaults
// ============================================================================

/// Errors listed in a rendered validation report.
pub const REPORT_MAX_ERRORS: usize = 20;

/// New triples and conflicts listed in a rendered diff report.
pub const REPORT_MAX_DIFF_ITEMS: usize = 10;

// ============================================================================
// File Names
// ============================================================================

/// Project-local config file name.
pub const PROJECT_CONFIG_FILE: &str = "kgforge.toml";

/// Directory under the user config dir.
pub const USER_CONFIG_DIR: &str = "kgforge";

/// User config file name.
pub const USER_CONFIG_FILE: &str = "config.toml";
