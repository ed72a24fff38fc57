//! Evidence records attached to merged and stored triples.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Triple;

/// Source used when a triple does not say where it came from.
pub const UNKNOWN_SOURCE: &str = "unknown";

/// One observation supporting a fact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceSource {
    pub evidence: String,
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    /// Extraction confidence of the observation.
    pub score: f64,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl EvidenceSource {
    /// Build the evidence record for an observed triple.
    ///
    /// A missing source becomes `"unknown"` and a missing timestamp becomes now.
    pub fn from_triple(triple: &Triple) -> Self {
        Self {
            evidence: triple.evidence.clone(),
            source: triple
                .source
                .clone()
                .unwrap_or_else(|| UNKNOWN_SOURCE.to_string()),
            section: triple.section.clone(),
            score: triple.confidence,
            timestamp: triple.timestamp.unwrap_or_else(Utc::now),
            url: triple.url.clone(),
        }
    }
}
