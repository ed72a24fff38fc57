//! The triple record and its fingerprint.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::schema::{EntityType, RelationType};

/// A subject–relation–object assertion with its supporting evidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Triple {
    pub subject: String,
    pub subject_type: EntityType,
    pub relation: RelationType,
    pub object: String,
    pub object_type: EntityType,
    /// Text span supporting the assertion.
    pub evidence: String,
    /// Whether the relation was inferred rather than stated explicitly.
    #[serde(default)]
    pub inferred: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Extraction confidence in `[0, 1]`.
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl Triple {
    /// Create an explicit triple with full confidence.
    pub fn new(
        subject: impl Into<String>,
        subject_type: EntityType,
        relation: RelationType,
        object: impl Into<String>,
        object_type: EntityType,
        evidence: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            subject_type,
            relation,
            object: object.into(),
            object_type,
            evidence: evidence.into(),
            inferred: false,
            source: None,
            confidence: 1.0,
            section: None,
            url: None,
            timestamp: None,
        }
    }

    pub fn with_inferred(mut self, inferred: bool) -> Self {
        self.inferred = inferred;
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Set the confidence, clamped into `[0, 1]`.
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = clamp_confidence(confidence);
        self
    }

    pub fn with_section(mut self, section: impl Into<String>) -> Self {
        self.section = Some(section.into());
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::of(&self.subject, &self.relation, &self.object)
    }

    /// Short human-readable form, e.g. `Amazon S3 --[uses]--> AWS KMS`.
    pub fn label(&self) -> String {
        format!("{} --[{}]--> {}", self.subject, self.relation, self.object)
    }
}

/// Clamp a confidence into `[0, 1]`; NaN becomes 0.
pub fn clamp_confidence(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Deterministic identity of a fact, independent of case and whitespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// SHA-256 of `subject|relation|object` after trimming, collapsing
    /// internal whitespace and lowercasing.
    pub fn of(subject: &str, relation: &RelationType, object: &str) -> Self {
        let key = format!(
            "{}|{}|{}",
            canonical_text(subject),
            relation.as_str().to_lowercase(),
            canonical_text(object)
        );

        let mut hasher = Sha256::new();
        hasher.update(key.as_bytes());
        Self(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 12 hex characters, for logs and reports.
    pub fn short(&self) -> &str {
        self.0.get(..12).unwrap_or(&self.0)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn canonical_text(value: &str) -> String {
    value
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
