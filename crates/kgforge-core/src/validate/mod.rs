//! Triple validation against the schema and business rules.
//!
//! Checks run in order and stop at the first failure:
//! 1. required fields
//! 2. type and relation validity for the schema mode
//! 3. relation compatibility
//! 4. evidence length
//! 5. business rules
//!
//! When a compatibility failure is on a relation that carries a business
//! rule, the business rule is reported instead since it names the exact
//! constraint that was broken.

use std::fmt;

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::config::{SchemaMode, ValidationConfig};
use crate::models::Triple;
use crate::schema::{EntityType, RelationType, SchemaRegistry};

mod report;

pub use report::{ValidationPipeline, ValidationReport};

/// Why a triple was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationError {
    #[error("{field} is empty")]
    RequiredField { field: String },

    #[error("Invalid {field} '{value}' for {mode} schema")]
    SchemaType {
        field: String,
        value: String,
        mode: String,
    },

    #[error("Relation '{relation}' is not compatible with subject type '{subject_type}' and object type '{object_type}'")]
    RelationCompatibility {
        relation: String,
        subject_type: String,
        object_type: String,
    },

    #[error("Evidence too short ({words} words). Minimum {min} words required unless inferred")]
    EvidenceTooShort { words: usize, min: usize },

    #[error("Relation '{relation}' {message}")]
    BusinessRule { relation: String, message: String },
}

impl ValidationError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::RequiredField { .. } => ErrorCategory::RequiredField,
            Self::SchemaType { .. } | Self::RelationCompatibility { .. } => ErrorCategory::Schema,
            Self::EvidenceTooShort { .. } => ErrorCategory::Evidence,
            Self::BusinessRule { .. } => ErrorCategory::BusinessRule,
        }
    }
}

/// Reporting bucket of a [`ValidationError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    RequiredField,
    Schema,
    Evidence,
    BusinessRule,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::RequiredField => "required_field",
            Self::Schema => "schema",
            Self::Evidence => "evidence",
            Self::BusinessRule => "business_rule",
        };
        f.write_str(s)
    }
}

/// A rejected triple with the reason.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationIssue {
    pub triple: Triple,
    pub error: ValidationError,
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.error.category(), self.error)
    }
}

/// Validates triples one at a time, keeping the errors of the last call.
#[derive(Debug, Clone)]
pub struct TripleValidator {
    schema: SchemaRegistry,
    mode: SchemaMode,
    min_evidence_words: usize,
    errors: Vec<ValidationIssue>,
}

impl Default for TripleValidator {
    fn default() -> Self {
        Self::new(SchemaRegistry::standard(), SchemaMode::Strict)
    }
}

impl TripleValidator {
    pub fn new(schema: SchemaRegistry, mode: SchemaMode) -> Self {
        Self {
            schema,
            mode,
            min_evidence_words: ValidationConfig::default().min_evidence_words,
            errors: Vec::new(),
        }
    }

    pub fn with_min_evidence_words(mut self, words: usize) -> Self {
        self.min_evidence_words = words;
        self
    }

    pub fn schema(&self) -> &SchemaRegistry {
        &self.schema
    }

    /// Validate a triple, recording the failure reason.
    pub fn validate(&mut self, triple: &Triple) -> bool {
        self.errors.clear();
        match self.check(triple) {
            Ok(()) => true,
            Err(error) => {
                self.errors.push(ValidationIssue {
                    triple: triple.clone(),
                    error,
                });
                false
            }
        }
    }

    /// Errors recorded by the last [`validate`](Self::validate) call.
    pub fn errors(&self) -> &[ValidationIssue] {
        &self.errors
    }

    /// Split a batch into valid triples and issues for the rest.
    pub fn validate_batch(&mut self, triples: Vec<Triple>) -> (Vec<Triple>, Vec<ValidationIssue>) {
        let mut valid = Vec::with_capacity(triples.len());
        let mut issues = Vec::new();

        for triple in triples {
            match self.check(&triple) {
                Ok(()) => valid.push(triple),
                Err(error) => issues.push(ValidationIssue { triple, error }),
            }
        }

        (valid, issues)
    }

    /// Run every check without recording anything.
    pub fn check(&self, triple: &Triple) -> Result<(), ValidationError> {
        check_required_fields(triple)?;
        self.check_types(triple)?;
        self.check_compatibility(triple)?;
        self.check_evidence(triple)?;
        check_business_rules(triple)
    }

    fn check_types(&self, triple: &Triple) -> Result<(), ValidationError> {
        let invalid = |field: &str, value: &str| ValidationError::SchemaType {
            field: field.to_string(),
            value: value.to_string(),
            mode: self.mode.to_string(),
        };

        if !self.entity_type_allowed(&triple.subject_type) {
            return Err(invalid("subject_type", triple.subject_type.as_str()));
        }
        if !self.entity_type_allowed(&triple.object_type) {
            return Err(invalid("object_type", triple.object_type.as_str()));
        }
        if !self.relation_allowed(&triple.relation) {
            return Err(invalid("relation", triple.relation.as_str()));
        }
        Ok(())
    }

    fn entity_type_allowed(&self, entity_type: &EntityType) -> bool {
        entity_type.is_core() || (self.mode == SchemaMode::Legacy && entity_type.is_legacy())
    }

    fn relation_allowed(&self, relation: &RelationType) -> bool {
        relation.is_core() || (self.mode == SchemaMode::Legacy && relation.is_legacy())
    }

    fn check_compatibility(&self, triple: &Triple) -> Result<(), ValidationError> {
        if self.schema.validate_relation_compatibility(
            &triple.relation,
            &triple.subject_type,
            &triple.object_type,
        ) {
            return Ok(());
        }

        check_business_rules(triple)?;
        Err(ValidationError::RelationCompatibility {
            relation: triple.relation.to_string(),
            subject_type: triple.subject_type.to_string(),
            object_type: triple.object_type.to_string(),
        })
    }

    fn check_evidence(&self, triple: &Triple) -> Result<(), ValidationError> {
        let words = triple.evidence.split_whitespace().count();
        if words < self.min_evidence_words && !triple.inferred {
            return Err(ValidationError::EvidenceTooShort {
                words,
                min: self.min_evidence_words,
            });
        }
        Ok(())
    }
}

fn check_required_fields(triple: &Triple) -> Result<(), ValidationError> {
    for (field, value) in [
        ("subject", &triple.subject),
        ("object", &triple.object),
        ("evidence", &triple.evidence),
    ] {
        if value.trim().is_empty() {
            return Err(ValidationError::RequiredField {
                field: field.to_string(),
            });
        }
    }
    Ok(())
}

fn check_business_rules(triple: &Triple) -> Result<(), ValidationError> {
    let violation = |message: String| ValidationError::BusinessRule {
        relation: triple.relation.to_string(),
        message,
    };

    match triple.relation {
        RelationType::RecommendedBy => {
            if triple.subject_type != EntityType::BestPractice {
                return Err(violation(format!(
                    "requires subject type 'BestPractice', got '{}'",
                    triple.subject_type
                )));
            }
            if triple.object_type != EntityType::Pillar {
                return Err(violation(format!(
                    "requires object type 'Pillar', got '{}'",
                    triple.object_type
                )));
            }
        }
        RelationType::Addresses => {
            if !matches!(
                triple.subject_type,
                EntityType::Mitigation | EntityType::BestPractice
            ) {
                return Err(violation(format!(
                    "requires subject type 'Mitigation' or 'BestPractice', got '{}'",
                    triple.subject_type
                )));
            }
            if triple.object_type != EntityType::Risk {
                return Err(violation(format!(
                    "requires object type 'Risk', got '{}'",
                    triple.object_type
                )));
            }
        }
        RelationType::Uses => {
            if !matches!(triple.subject_type, EntityType::Service | EntityType::Component) {
                debug!(
                    subject_type = %triple.subject_type,
                    "Relation 'uses' typically has a Service or Component subject"
                );
            }
        }
        _ => {}
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triple(
        subject_type: EntityType,
        relation: RelationType,
        object_type: EntityType,
    ) -> Triple {
        Triple::new(
            "Subject",
            subject_type,
            relation,
            "Object",
            object_type,
            "evidence with enough words",
        )
    }

    #[test]
    fn test_valid_triple() {
        let mut validator = TripleValidator::default();
        let t = triple(EntityType::Service, RelationType::Uses, EntityType::Component);
        assert!(validator.validate(&t));
        assert!(validator.errors().is_empty());
    }

    #[test]
    fn test_required_fields() {
        let mut validator = TripleValidator::default();
        let mut t = triple(EntityType::Service, RelationType::Uses, EntityType::Component);
        t.object = "   ".to_string();

        assert!(!validator.validate(&t));
        assert_eq!(
            validator.errors()[0].error,
            ValidationError::RequiredField {
                field: "object".to_string()
            }
        );
        assert_eq!(validator.errors()[0].error.category(), ErrorCategory::RequiredField);
    }

    #[test]
    fn test_schema_mode() {
        let legacy_triple = triple(EntityType::Document, RelationType::Mentions, EntityType::Concept);

        let strict = TripleValidator::new(SchemaRegistry::standard(), SchemaMode::Strict);
        assert!(matches!(
            strict.check(&legacy_triple),
            Err(ValidationError::SchemaType { .. })
        ));

        let legacy = TripleValidator::new(SchemaRegistry::standard(), SchemaMode::Legacy);
        assert!(legacy.check(&legacy_triple).is_ok());

        let unknown = triple(
            EntityType::Unknown("Widget".into()),
            RelationType::Uses,
            EntityType::Service,
        );
        assert!(matches!(
            legacy.check(&unknown),
            Err(ValidationError::SchemaType { ref field, .. }) if field == "subject_type"
        ));
    }

    #[test]
    fn test_compatibility() {
        let validator = TripleValidator::default();
        let t = triple(EntityType::Pillar, RelationType::Uses, EntityType::Service);
        let err = validator.check(&t).unwrap_err();
        assert!(matches!(err, ValidationError::RelationCompatibility { .. }));
        assert_eq!(err.category(), ErrorCategory::Schema);
    }

    #[test]
    fn test_evidence_length() {
        let validator = TripleValidator::default();
        let mut t = triple(EntityType::Service, RelationType::Uses, EntityType::Component);
        t.evidence = "too short".to_string();
        assert_eq!(
            validator.check(&t),
            Err(ValidationError::EvidenceTooShort { words: 2, min: 3 })
        );

        t.inferred = true;
        assert!(validator.check(&t).is_ok());

        let lenient = TripleValidator::default().with_min_evidence_words(1);
        t.inferred = false;
        assert!(lenient.check(&t).is_ok());
    }

    #[test]
    fn test_business_rule_reported_for_recommended_by() {
        let validator = TripleValidator::default();
        let t = triple(EntityType::Service, RelationType::RecommendedBy, EntityType::Pillar);
        let err = validator.check(&t).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::BusinessRule);
        assert!(err.to_string().contains("BestPractice"));
    }

    #[test]
    fn test_business_rules_without_matrix() {
        let validator = TripleValidator::new(
            SchemaRegistry::from_rules([]).unwrap(),
            SchemaMode::Strict,
        );
        let t = triple(EntityType::Mitigation, RelationType::Addresses, EntityType::Metric);
        assert!(matches!(
            validator.check(&t),
            Err(ValidationError::BusinessRule { .. })
        ));

        let ok = triple(EntityType::Role, RelationType::Uses, EntityType::Role);
        assert!(validator.check(&ok).is_ok());
    }

    #[test]
    fn test_validate_batch() {
        let mut validator = TripleValidator::default();
        let good = triple(EntityType::Service, RelationType::Uses, EntityType::Component);
        let bad = triple(EntityType::Service, RelationType::Addresses, EntityType::Risk);

        let (valid, issues) = validator.validate_batch(vec![good.clone(), bad]);
        assert_eq!(valid, vec![good]);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].error.category(), ErrorCategory::BusinessRule);
        assert!(issues[0].to_string().starts_with("business_rule: "));
    }
}
