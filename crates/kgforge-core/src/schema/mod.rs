//! Closed entity/relation schema and the relation compatibility matrix.
//!
//! The matrix maps a relation to the entity types allowed on each side.
//! Relations without a rule are unconstrained, which is how the legacy
//! relations pass through compatibility checks.

use std::collections::{BTreeMap, BTreeSet};

use thiserror::Error;

mod types;

pub use types::{EntityType, RelationType};

/// Errors raised while building a [`SchemaRegistry`].
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("Rule declared for non-core relation '{0}'")]
    NonCoreRelation(String),

    #[error("Rule for '{relation}' references unknown entity type '{entity_type}'")]
    UnknownEntityType {
        relation: String,
        entity_type: String,
    },

    #[error("Duplicate rule for relation '{0}'")]
    DuplicateRule(String),
}

/// Allowed subject and object types for one relation.
///
/// An empty side imposes no constraint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaRule {
    pub subject: BTreeSet<EntityType>,
    pub object: BTreeSet<EntityType>,
}

impl SchemaRule {
    pub fn new(
        subject: impl IntoIterator<Item = EntityType>,
        object: impl IntoIterator<Item = EntityType>,
    ) -> Self {
        Self {
            subject: subject.into_iter().collect(),
            object: object.into_iter().collect(),
        }
    }

    fn allows_subject(&self, entity_type: &EntityType) -> bool {
        self.subject.is_empty() || self.subject.contains(entity_type)
    }

    fn allows_object(&self, entity_type: &EntityType) -> bool {
        self.object.is_empty() || self.object.contains(entity_type)
    }
}

/// Relation compatibility matrix.
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    rules: BTreeMap<RelationType, SchemaRule>,
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

impl SchemaRegistry {
    /// The built-in matrix for the core relations.
    pub fn standard() -> Self {
        use EntityType::*;

        let rules = [
            (
                RelationType::Uses,
                SchemaRule::new([Service, Component], [Component, Service]),
            ),
            (
                RelationType::Implements,
                SchemaRule::new([Component, Service], [Pattern]),
            ),
            (
                RelationType::Addresses,
                SchemaRule::new([Mitigation, BestPractice], [Risk]),
            ),
            (
                RelationType::RecommendedBy,
                SchemaRule::new([BestPractice], [Pillar]),
            ),
            (
                RelationType::Affects,
                SchemaRule::new([Service, Component, Pattern, BestPractice], [Metric]),
            ),
            (
                RelationType::DependsOn,
                SchemaRule::new([Service, Component], [Service, Component]),
            ),
            (
                RelationType::Violates,
                SchemaRule::new([Service, Component, Pattern], [Pillar]),
            ),
            (
                RelationType::ExampleOf,
                SchemaRule::new([Service, Component, Pattern], [Pattern]),
            ),
        ];

        Self {
            rules: rules.into_iter().collect(),
        }
    }

    /// Build a registry from custom rules.
    ///
    /// Rules may only be declared for core relations and may only reference
    /// known entity types.
    pub fn from_rules(
        rules: impl IntoIterator<Item = (RelationType, SchemaRule)>,
    ) -> Result<Self, SchemaError> {
        let mut map = BTreeMap::new();

        for (relation, rule) in rules {
            if !relation.is_core() {
                return Err(SchemaError::NonCoreRelation(relation.to_string()));
            }
            if let Some(bad) = rule
                .subject
                .iter()
                .chain(rule.object.iter())
                .find(|t| t.is_unknown())
            {
                return Err(SchemaError::UnknownEntityType {
                    relation: relation.to_string(),
                    entity_type: bad.to_string(),
                });
            }
            if map.contains_key(&relation) {
                return Err(SchemaError::DuplicateRule(relation.to_string()));
            }
            map.insert(relation, rule);
        }

        Ok(Self { rules: map })
    }

    pub fn rule(&self, relation: &RelationType) -> Option<&SchemaRule> {
        self.rules.get(relation)
    }

    pub fn rules(&self) -> impl Iterator<Item = (&RelationType, &SchemaRule)> {
        self.rules.iter()
    }

    /// Check whether `subject_type --relation--> object_type` is allowed.
    ///
    /// Relations without a rule are always compatible.
    pub fn validate_relation_compatibility(
        &self,
        relation: &RelationType,
        subject_type: &EntityType,
        object_type: &EntityType,
    ) -> bool {
        match self.rules.get(relation) {
            None => true,
            Some(rule) => rule.allows_subject(subject_type) && rule.allows_object(object_type),
        }
    }

    /// Object types allowed for `relation` given a subject type.
    ///
    /// Empty when the relation has no rule or the subject is not allowed.
    pub fn allowed_object_types(
        &self,
        relation: &RelationType,
        subject_type: &EntityType,
    ) -> BTreeSet<EntityType> {
        match self.rules.get(relation) {
            Some(rule) if rule.allows_subject(subject_type) => rule.object.clone(),
            _ => BTreeSet::new(),
        }
    }

    /// Subject types allowed for `relation` given an object type.
    pub fn allowed_subject_types(
        &self,
        relation: &RelationType,
        object_type: &EntityType,
    ) -> BTreeSet<EntityType> {
        match self.rules.get(relation) {
            Some(rule) if rule.allows_object(object_type) => rule.subject.clone(),
            _ => BTreeSet::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_covers_every_core_relation() {
        let schema = SchemaRegistry::standard();
        for relation in RelationType::CORE {
            assert!(schema.rule(&relation).is_some(), "missing rule for {}", relation);
        }
    }

    #[test]
    fn test_compatibility() {
        let schema = SchemaRegistry::standard();
        assert!(schema.validate_relation_compatibility(
            &RelationType::Uses,
            &EntityType::Service,
            &EntityType::Component
        ));
        assert!(!schema.validate_relation_compatibility(
            &RelationType::Uses,
            &EntityType::Pillar,
            &EntityType::Component
        ));
        assert!(schema.validate_relation_compatibility(
            &RelationType::Mentions,
            &EntityType::Document,
            &EntityType::Concept
        ));
    }

    #[test]
    fn test_allowed_types() {
        let schema = SchemaRegistry::standard();
        let objects = schema.allowed_object_types(&RelationType::Addresses, &EntityType::Mitigation);
        assert_eq!(objects.into_iter().collect::<Vec<_>>(), vec![EntityType::Risk]);

        assert!(schema
            .allowed_object_types(&RelationType::Addresses, &EntityType::Service)
            .is_empty());
        assert!(schema
            .allowed_subject_types(&RelationType::Contains, &EntityType::Section)
            .is_empty());
    }

    #[test]
    fn test_empty_side_is_unconstrained() {
        let schema = SchemaRegistry::from_rules([(
            RelationType::Affects,
            SchemaRule::new([], [EntityType::Metric]),
        )])
        .unwrap();

        assert!(schema.validate_relation_compatibility(
            &RelationType::Affects,
            &EntityType::Role,
            &EntityType::Metric
        ));
    }

    #[test]
    fn test_from_rules_rejects_bad_definitions() {
        let legacy = SchemaRegistry::from_rules([(RelationType::Contains, SchemaRule::default())]);
        assert!(matches!(legacy, Err(SchemaError::NonCoreRelation(_))));

        let unknown = SchemaRegistry::from_rules([(
            RelationType::Uses,
            SchemaRule::new([EntityType::Unknown("Widget".into())], []),
        )]);
        assert!(matches!(unknown, Err(SchemaError::UnknownEntityType { .. })));

        let duplicate = SchemaRegistry::from_rules([
            (RelationType::Uses, SchemaRule::default()),
            (RelationType::Uses, SchemaRule::default()),
        ]);
        assert!(matches!(duplicate, Err(SchemaError::DuplicateRule(_))));
    }
}
