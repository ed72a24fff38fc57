use serde::{Deserialize, Serialize};

use super::Fingerprint;

/// Kind of conflict signal raised for a merged fact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    /// The fact was observed both as inferred and as explicitly stated.
    MixedInference,
}

/// A flagged fact whose observations disagree on how it was derived.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conflict {
    pub fingerprint: Fingerprint,
    /// Label of the fact, `subject --[relation]--> object`.
    pub triple: String,
    #[serde(rename = "type")]
    pub kind: ConflictKind,
    pub inferred_count: usize,
    pub explicit_count: usize,
    /// Number of evidence records behind the fact.
    pub evidence_sources: usize,
}
