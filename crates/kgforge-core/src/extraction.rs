//! Strict decoding of raw extractor output.
//!
//! Each line of the input is one JSON object with a fixed set of keys.
//! Lines that fail to decode are quarantined and the rest of the batch
//! continues.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, warn};

use crate::error::KnowledgeError;
use crate::models::{clamp_confidence, Triple};
use crate::normalize::RelationNormalizer;
use crate::schema::{EntityType, RelationType};

/// A triple exactly as the extractor produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawTriple {
    pub subject: String,
    pub subject_type: String,
    pub relation: String,
    pub object: String,
    pub object_type: String,
    pub evidence: String,
    #[serde(default)]
    pub inferred: bool,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
    #[serde(default)]
    pub section: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default, deserialize_with = "deserialize_timestamp")]
    pub timestamp: Option<DateTime<Utc>>,
}

fn default_confidence() -> f64 {
    1.0
}

/// Accepts RFC 3339, or a naive ISO 8601 timestamp taken as UTC.
fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(raw) = Option::<String>::deserialize(deserializer)? else {
        return Ok(None);
    };

    if let Ok(ts) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(Some(ts.with_timezone(&Utc)));
    }
    NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| Some(naive.and_utc()))
        .map_err(|e| serde::de::Error::custom(format!("invalid timestamp '{raw}': {e}")))
}

impl RawTriple {
    /// Convert into a typed [`Triple`].
    ///
    /// Unresolvable relations and type names are kept as `Unknown` so the
    /// validator can reject them with a reason.
    pub fn into_triple(self, relations: &RelationNormalizer) -> Triple {
        let relation = relations.normalize(&self.relation).unwrap_or_else(|| {
            debug!(relation = %self.relation, "Relation left unresolved");
            RelationType::Unknown(self.relation.trim().to_string())
        });

        Triple {
            subject: self.subject,
            subject_type: EntityType::parse(&self.subject_type),
            relation,
            object: self.object,
            object_type: EntityType::parse(&self.object_type),
            evidence: self.evidence,
            inferred: self.inferred,
            source: self.source,
            confidence: clamp_confidence(self.confidence),
            section: self.section,
            url: self.url,
            timestamp: self.timestamp,
        }
    }
}

/// A line that could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Quarantined {
    /// 1-based line number.
    pub line: usize,
    pub reason: String,
}

/// Decoded records plus quarantined lines.
#[derive(Debug, Clone, Default)]
pub struct DecodedBatch {
    pub records: Vec<RawTriple>,
    pub quarantined: Vec<Quarantined>,
}

impl DecodedBatch {
    /// Convert every decoded record into a [`Triple`].
    pub fn into_triples(self, relations: &RelationNormalizer) -> Vec<Triple> {
        self.records
            .into_iter()
            .map(|raw| raw.into_triple(relations))
            .collect()
    }
}

/// Decode JSON Lines, one record per non-blank line.
pub fn decode_jsonl(text: &str) -> DecodedBatch {
    let mut batch = DecodedBatch::default();

    for (idx, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }

        match decode_line(idx + 1, line) {
            Ok(record) => batch.records.push(record),
            Err(KnowledgeError::Decode { line, message }) => {
                warn!(line, reason = %message, "Quarantined raw triple");
                batch.quarantined.push(Quarantined {
                    line,
                    reason: message,
                });
            }
            Err(e) => {
                warn!(line = idx + 1, error = %e, "Quarantined raw triple");
                batch.quarantined.push(Quarantined {
                    line: idx + 1,
                    reason: e.to_string(),
                });
            }
        }
    }

    batch
}

/// Decode a single JSON record.
pub fn decode_line(line: usize, text: &str) -> Result<RawTriple, KnowledgeError> {
    serde_json::from_str(text).map_err(|e| KnowledgeError::Decode {
        line,
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const LAMBDA: &str = r#"{"subject":"Lambda","subject_type":"Service","relation":"integrates with","object":"SQS","object_type":"Service","evidence":"Lambda polls SQS queues"}"#;

    #[test]
    fn test_decode_with_defaults() {
        let batch = decode_jsonl(LAMBDA);
        assert!(batch.quarantined.is_empty());

        let raw = &batch.records[0];
        assert!(!raw.inferred);
        assert_eq!(raw.confidence, 1.0);
        assert!(raw.timestamp.is_none());
    }

    #[test]
    fn test_quarantine_bad_lines() {
        let text = format!(
            "{LAMBDA}\n\n{{\"subject\":\"x\"}}\nnot json\n{}",
            LAMBDA.replace("\"evidence\"", "\"extra\":1,\"evidence\"")
        );
        let batch = decode_jsonl(&text);

        assert_eq!(batch.records.len(), 1);
        let lines: Vec<usize> = batch.quarantined.iter().map(|q| q.line).collect();
        assert_eq!(lines, vec![3, 4, 5]);
        assert!(batch.quarantined[2].reason.contains("unknown field"));
    }

    #[test]
    fn test_into_triple() {
        let relations = RelationNormalizer::new();
        let raw = RawTriple {
            subject: "Lambda".into(),
            subject_type: "service".into(),
            relation: "frobnicates".into(),
            object: "SQS".into(),
            object_type: "Gizmo".into(),
            evidence: "Lambda polls SQS queues".into(),
            inferred: false,
            source: None,
            confidence: 1.7,
            section: None,
            url: None,
            timestamp: None,
        };

        let triple = raw.into_triple(&relations);
        assert_eq!(triple.subject_type, EntityType::Service);
        assert_eq!(triple.object_type, EntityType::Unknown("Gizmo".into()));
        assert_eq!(triple.relation, RelationType::Unknown("frobnicates".into()));
        assert_eq!(triple.confidence, 1.0);
    }

    #[test]
    fn test_timestamp_formats() {
        let rfc = LAMBDA.replace('}', r#","timestamp":"2024-05-01T10:00:00Z"}"#);
        let naive = LAMBDA.replace('}', r#","timestamp":"2024-05-01T10:00:00.250"}"#);
        let bad = LAMBDA.replace('}', r#","timestamp":"yesterday"}"#);

        let batch = decode_jsonl(&[rfc, naive, bad].join("\n"));
        assert_eq!(batch.records.len(), 2);
        assert_eq!(batch.quarantined[0].line, 3);
        assert!(batch.records.iter().all(|r| r.timestamp.is_some()));
    }
}
