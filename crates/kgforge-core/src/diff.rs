//! Incremental diffing of a batch against the triple store.

use std::fmt::Write;

use serde::Serialize;
use tracing::info;

use crate::config::REPORT_MAX_DIFF_ITEMS;
use crate::models::{Conflict, Triple};
use crate::storage::{StoredTriple, TripleStore};

/// What a batch would change in the store.
///
/// `conflicts` is never populated at this layer; mixed-inference signals
/// come from [`MergeService::detect_conflicts`](crate::merge::MergeService::detect_conflicts).
#[derive(Debug, Clone, Default, Serialize)]
pub struct DiffResult {
    pub new_triples: Vec<Triple>,
    /// Incoming triple paired with the stored fact it matched.
    pub updated_triples: Vec<(Triple, StoredTriple)>,
    pub conflicts: Vec<Conflict>,
    pub unchanged_count: usize,
}

impl DiffResult {
    /// Human-readable report listing the first few new triples and conflicts.
    pub fn render(&self) -> String {
        let rule = "=".repeat(60);
        let mut out = String::new();

        let _ = writeln!(out, "{rule}");
        let _ = writeln!(out, "Diff Extraction Report");
        let _ = writeln!(out, "{rule}");
        let _ = writeln!(out, "New triples: {}", self.new_triples.len());
        let _ = writeln!(out, "Updated triples: {}", self.updated_triples.len());
        let _ = writeln!(out, "Conflicts: {}", self.conflicts.len());
        let _ = writeln!(out, "Unchanged: {}", self.unchanged_count);
        let _ = writeln!(out);

        if !self.new_triples.is_empty() {
            let _ = writeln!(out, "New Triples:");
            let labels = self.new_triples.iter().map(Triple::label);
            write_limited(&mut out, labels, self.new_triples.len());
        }

        if !self.conflicts.is_empty() {
            let _ = writeln!(out, "Conflicts:");
            let labels = self
                .conflicts
                .iter()
                .map(|c| format!("{} ({} inferred, {} explicit)", c.triple, c.inferred_count, c.explicit_count));
            write_limited(&mut out, labels, self.conflicts.len());
        }

        let _ = write!(out, "{rule}");
        out
    }
}

fn write_limited(out: &mut String, items: impl Iterator<Item = String>, total: usize) {
    for (i, item) in items.take(REPORT_MAX_DIFF_ITEMS).enumerate() {
        let _ = writeln!(out, "  {}. {}", i + 1, item);
    }
    if total > REPORT_MAX_DIFF_ITEMS {
        let _ = writeln!(out, "  ... and {} more", total - REPORT_MAX_DIFF_ITEMS);
    }
    let _ = writeln!(out);
}

/// Counts from applying a diff.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DiffStats {
    pub added: usize,
    pub updated: usize,
    pub conflicts: usize,
}

/// Computes and applies diffs against a [`TripleStore`].
pub struct DiffExtractor<'a> {
    store: &'a mut TripleStore,
}

impl<'a> DiffExtractor<'a> {
    pub fn new(store: &'a mut TripleStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &TripleStore {
        self.store
    }

    /// Classify each triple as new or already stored. The store is not modified.
    pub fn extract_diff(&self, triples: Vec<Triple>) -> DiffResult {
        info!(count = triples.len(), "Extracting diff");

        let mut diff = DiffResult::default();
        for triple in triples {
            match self.store.get_triple(&triple.fingerprint()) {
                Some(existing) => {
                    let existing = existing.clone();
                    diff.updated_triples.push((triple, existing));
                    diff.unchanged_count += 1;
                }
                None => diff.new_triples.push(triple),
            }
        }

        info!(
            new = diff.new_triples.len(),
            updated = diff.updated_triples.len(),
            conflicts = diff.conflicts.len(),
            unchanged = diff.unchanged_count,
            "Diff extraction complete"
        );

        diff
    }

    /// Write a diff into the store.
    ///
    /// A triple listed as new that duplicates an earlier one in the same
    /// batch only appends evidence and is not counted as added.
    pub fn apply_diff(&mut self, diff: &DiffResult) -> DiffStats {
        let mut stats = DiffStats {
            conflicts: diff.conflicts.len(),
            ..DiffStats::default()
        };

        for triple in &diff.new_triples {
            let (is_new, _) = self.store.add_triple(triple);
            if is_new {
                stats.added += 1;
            }
        }

        for (triple, _) in &diff.updated_triples {
            self.store.add_triple(triple);
            stats.updated += 1;
        }

        info!(added = stats.added, updated = stats.updated, "Applied diff");
        stats
    }
}
