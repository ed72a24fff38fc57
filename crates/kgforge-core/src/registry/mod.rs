//! Canonical entity registry.
//!
//! A curated dictionary of canonical entity names with their synonyms and
//! aliases, plus a reverse index from every lowercased variant back to the
//! entities that declare it. A variant may belong to several entities of
//! different types (`VPC Endpoint` is both a component and a synonym of
//! `AWS PrivateLink`), so the index is multi-valued.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::schema::EntityType;

mod catalog;

/// A canonical entity with its known name variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalEntity {
    pub name: String,
    pub entity_type: EntityType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub synonyms: Vec<String>,
    #[serde(default)]
    pub aliases: Vec<String>,
}

impl CanonicalEntity {
    pub fn new(name: impl Into<String>, entity_type: EntityType) -> Self {
        Self {
            name: name.into(),
            entity_type,
            description: None,
            synonyms: Vec::new(),
            aliases: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_synonyms<S: Into<String>>(mut self, synonyms: impl IntoIterator<Item = S>) -> Self {
        self.synonyms.extend(synonyms.into_iter().map(Into::into));
        self
    }

    pub fn with_aliases<S: Into<String>>(mut self, aliases: impl IntoIterator<Item = S>) -> Self {
        self.aliases.extend(aliases.into_iter().map(Into::into));
        self
    }

    /// Lowercased name, synonyms and aliases.
    pub fn all_variants(&self) -> BTreeSet<String> {
        std::iter::once(&self.name)
            .chain(self.synonyms.iter())
            .chain(self.aliases.iter())
            .map(|v| v.trim().to_lowercase())
            .collect()
    }

    /// Text embedded for semantic matching: `name. description`.
    pub fn embedding_text(&self) -> String {
        match &self.description {
            Some(description) => format!("{}. {}", self.name, description),
            None => self.name.clone(),
        }
    }
}

/// Registry of canonical entities.
#[derive(Debug, Clone, Default)]
pub struct CanonicalRegistry {
    entities: Vec<CanonicalEntity>,
    /// Lowercased variant -> indices into `entities`, in registration order.
    index: HashMap<String, Vec<usize>>,
}

impl CanonicalRegistry {
    /// An empty registry.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A registry seeded with the built-in catalog.
    pub fn seeded() -> Self {
        let mut registry = Self {
            entities: catalog::seed_entities(),
            index: HashMap::new(),
        };
        registry.rebuild_index();
        registry
    }

    /// Look up the canonical name of a variant.
    ///
    /// With a type filter only entities registered under that type match.
    /// When several entities share the variant, the latest registration wins.
    pub fn find_canonical(&self, name: &str, entity_type: Option<&EntityType>) -> Option<&str> {
        let key = name.trim().to_lowercase();
        let candidates = self.index.get(&key)?;

        candidates
            .iter()
            .rev()
            .map(|&i| &self.entities[i])
            .find(|e| entity_type.map_or(true, |t| &e.entity_type == t))
            .map(|e| e.name.as_str())
    }

    /// Get an entity by exact canonical name and type.
    pub fn get_entity(&self, name: &str, entity_type: &EntityType) -> Option<&CanonicalEntity> {
        self.entities
            .iter()
            .find(|e| e.name == name && &e.entity_type == entity_type)
    }

    /// All entities registered under a type, in registration order.
    pub fn entities_of<'a>(
        &'a self,
        entity_type: &'a EntityType,
    ) -> impl Iterator<Item = &'a CanonicalEntity> + 'a {
        self.entities
            .iter()
            .filter(move |e| &e.entity_type == entity_type)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CanonicalEntity> {
        self.entities.iter()
    }

    /// Register an entity, replacing any entry with the same name and type.
    ///
    /// The reverse index is rebuilt from scratch.
    pub fn add_entity(&mut self, entity: CanonicalEntity) {
        match self
            .entities
            .iter_mut()
            .find(|e| e.name == entity.name && e.entity_type == entity.entity_type)
        {
            Some(existing) => *existing = entity,
            None => self.entities.push(entity),
        }
        self.rebuild_index();
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    fn rebuild_index(&mut self) {
        self.index.clear();
        for (i, entity) in self.entities.iter().enumerate() {
            for variant in entity.all_variants() {
                self.index.entry(variant).or_default().push(i);
            }
        }
    }
}
