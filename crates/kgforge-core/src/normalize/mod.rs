//! Entity and relation normalization.
//!
//! - [`RelationNormalizer`] maps relation verb variants onto the known relation set.
//! - [`EntityNormalizer`] maps entity name variants onto canonical registry names.
//! - [`NormalizationService`] runs the entity normalizer over batches and keeps
//!   the mapping table.

mod entity;
mod relation;
mod service;

pub use entity::{EntityNormalizer, NormalizationMethod, Resolution};
pub use relation::{RelationMatch, RelationNormalizer, FUZZY_THRESHOLD};
pub use service::{
    NormalizationConflict, NormalizationMapping, NormalizationOutcome, NormalizationService,
};
