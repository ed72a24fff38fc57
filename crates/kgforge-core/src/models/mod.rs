//! Data models shared across the pipeline stages.

mod conflict;
mod evidence;
mod triple;

pub use conflict::{Conflict, ConflictKind};
pub use evidence::{EvidenceSource, UNKNOWN_SOURCE};
pub use triple::{clamp_confidence, Fingerprint, Triple};
