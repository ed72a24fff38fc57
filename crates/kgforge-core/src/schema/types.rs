//! Entity and relation type enumerations.
//!
//! Both enums are closed over the core knowledge schema plus a handful of
//! legacy values kept for backward compatibility. Anything else parses into
//! the `Unknown` variant, which is representable but never valid.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Type of an entity in the knowledge graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EntityType {
    // === Core types ===
    Service,
    Component,
    Pattern,
    Pillar,
    BestPractice,
    Risk,
    Mitigation,
    Metric,
    Role,

    // === Legacy types ===
    Concept,
    Document,
    Section,
    Domain,
    Category,

    /// A value outside the schema, kept verbatim for error reporting.
    Unknown(String),
}

impl EntityType {
    /// Core schema types, in registry order.
    pub const CORE: [EntityType; 9] = [
        EntityType::Service,
        EntityType::Component,
        EntityType::Pattern,
        EntityType::Pillar,
        EntityType::BestPractice,
        EntityType::Risk,
        EntityType::Mitigation,
        EntityType::Metric,
        EntityType::Role,
    ];

    /// Legacy types accepted in `legacy` schema mode.
    pub const LEGACY: [EntityType; 5] = [
        EntityType::Concept,
        EntityType::Document,
        EntityType::Section,
        EntityType::Domain,
        EntityType::Category,
    ];

    /// Canonical identifier.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Service => "Service",
            Self::Component => "Component",
            Self::Pattern => "Pattern",
            Self::Pillar => "Pillar",
            Self::BestPractice => "BestPractice",
            Self::Risk => "Risk",
            Self::Mitigation => "Mitigation",
            Self::Metric => "Metric",
            Self::Role => "Role",
            Self::Concept => "Concept",
            Self::Document => "Document",
            Self::Section => "Section",
            Self::Domain => "Domain",
            Self::Category => "Category",
            Self::Unknown(raw) => raw,
        }
    }

    /// Parse a type name.
    ///
    /// Matching ignores case and the separators `_`, `-` and spaces, so
    /// `best_practice` and `Best Practice` both yield [`EntityType::BestPractice`].
    pub fn parse(value: &str) -> Self {
        let key = squash(value);
        Self::CORE
            .iter()
            .chain(Self::LEGACY.iter())
            .find(|t| squash(t.as_str()) == key)
            .cloned()
            .unwrap_or_else(|| Self::Unknown(value.trim().to_string()))
    }

    pub fn is_core(&self) -> bool {
        Self::CORE.contains(self)
    }

    pub fn is_legacy(&self) -> bool {
        Self::LEGACY.contains(self)
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown(_))
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for EntityType {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<EntityType> for String {
    fn from(value: EntityType) -> Self {
        value.as_str().to_string()
    }
}

/// Type of a relation between two entities.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RelationType {
    // === Core relations ===
    Uses,
    Implements,
    Addresses,
    RecommendedBy,
    Affects,
    DependsOn,
    Violates,
    ExampleOf,

    // === Legacy relations (outside the compatibility matrix) ===
    Contains,
    Documents,
    RelatesTo,
    References,
    Mentions,
    Extracts,

    /// A relation the normalizer could not resolve, kept verbatim.
    Unknown(String),
}

impl RelationType {
    /// Core schema relations.
    pub const CORE: [RelationType; 8] = [
        RelationType::Uses,
        RelationType::Implements,
        RelationType::Addresses,
        RelationType::RecommendedBy,
        RelationType::Affects,
        RelationType::DependsOn,
        RelationType::Violates,
        RelationType::ExampleOf,
    ];

    /// Legacy relations accepted in `legacy` schema mode.
    pub const LEGACY: [RelationType; 6] = [
        RelationType::Contains,
        RelationType::Documents,
        RelationType::RelatesTo,
        RelationType::References,
        RelationType::Mentions,
        RelationType::Extracts,
    ];

    /// Relation identifier as stored in the graph.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Uses => "uses",
            Self::Implements => "implements",
            Self::Addresses => "addresses",
            Self::RecommendedBy => "recommended_by",
            Self::Affects => "affects",
            Self::DependsOn => "depends_on",
            Self::Violates => "violates",
            Self::ExampleOf => "example_of",
            Self::Contains => "CONTAINS",
            Self::Documents => "DOCUMENTS",
            Self::RelatesTo => "RELATES_TO",
            Self::References => "REFERENCES",
            Self::Mentions => "MENTIONS",
            Self::Extracts => "EXTRACTS",
            Self::Unknown(raw) => raw,
        }
    }

    /// Every known relation (core then legacy), in declaration order.
    pub fn known() -> impl Iterator<Item = RelationType> {
        Self::CORE.into_iter().chain(Self::LEGACY)
    }

    /// Exact identifier lookup. Unlike [`RelationType::from`], this does not
    /// fall back to `Unknown`.
    pub fn from_id(id: &str) -> Option<Self> {
        Self::known().find(|r| r.as_str() == id)
    }

    pub fn is_core(&self) -> bool {
        Self::CORE.contains(self)
    }

    pub fn is_legacy(&self) -> bool {
        Self::LEGACY.contains(self)
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown(_))
    }
}

impl fmt::Display for RelationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for RelationType {
    fn from(value: String) -> Self {
        Self::from_id(&value).unwrap_or(Self::Unknown(value))
    }
}

impl From<RelationType> for String {
    fn from(value: RelationType) -> Self {
        value.as_str().to_string()
    }
}

fn squash(value: &str) -> String {
    value
        .chars()
        .filter(|c| !matches!(c, '_' | '-' | ' '))
        .flat_map(char::to_lowercase)
        .collect()
}
