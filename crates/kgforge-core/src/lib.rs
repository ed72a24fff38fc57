pub mod cluster;
pub mod config;
pub mod diff;
pub mod embedding;
pub mod error;
pub mod extraction;
pub mod merge;
pub mod models;
pub mod normalize;
pub mod pipeline;
pub mod registry;
pub mod schema;
pub mod storage;
pub mod validate;

pub use config::{PipelineConfig, SchemaMode};
pub use error::KnowledgeError;
pub use models::{Fingerprint, Triple};
pub use pipeline::{Pipeline, PipelineError, RunReport};
pub use registry::CanonicalRegistry;
pub use schema::{EntityType, RelationType, SchemaRegistry};
pub use storage::TripleStore;
