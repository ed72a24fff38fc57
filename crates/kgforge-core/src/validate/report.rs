//! Batch validation with a summary report.

use std::collections::BTreeMap;
use std::fmt::Write;

use serde::Serialize;
use tracing::info;

use super::{ErrorCategory, TripleValidator, ValidationIssue};
use crate::config::REPORT_MAX_ERRORS;
use crate::models::Triple;

/// Outcome of validating one batch.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationReport {
    pub total: usize,
    pub valid: usize,
    pub invalid: usize,
    pub errors: Vec<ValidationIssue>,
    /// Error counts per category.
    pub error_summary: BTreeMap<ErrorCategory, usize>,
}

impl ValidationReport {
    fn from_issues(total: usize, valid: usize, errors: Vec<ValidationIssue>) -> Self {
        let mut error_summary = BTreeMap::new();
        for issue in &errors {
            *error_summary.entry(issue.error.category()).or_insert(0) += 1;
        }

        Self {
            total,
            valid,
            invalid: errors.len(),
            errors,
            error_summary,
        }
    }

    /// Human-readable report listing the first few errors.
    pub fn render(&self) -> String {
        let rule = "=".repeat(60);
        let mut out = String::new();

        let _ = writeln!(out, "{rule}");
        let _ = writeln!(out, "Validation Report");
        let _ = writeln!(out, "{rule}");
        let _ = writeln!(out, "Total triples: {}", self.total);
        let _ = writeln!(out, "Valid triples: {}", self.valid);
        let _ = writeln!(out, "Invalid triples: {}", self.invalid);

        if !self.error_summary.is_empty() {
            let _ = writeln!(out);
            let _ = writeln!(out, "Error Summary:");
            for (category, count) in &self.error_summary {
                let _ = writeln!(out, "  {category}: {count}");
            }
        }

        if !self.errors.is_empty() {
            let _ = writeln!(out);
            let _ = writeln!(out, "Errors:");
            for (i, issue) in self.errors.iter().take(REPORT_MAX_ERRORS).enumerate() {
                let _ = writeln!(out, "  {}. {}", i + 1, issue);
                let _ = writeln!(out, "     Triple: {}", issue.triple.label());
            }
            if self.errors.len() > REPORT_MAX_ERRORS {
                let _ = writeln!(
                    out,
                    "  ... and {} more errors",
                    self.errors.len() - REPORT_MAX_ERRORS
                );
            }
        }

        let _ = write!(out, "{rule}");
        out
    }
}

/// Runs a [`TripleValidator`] over batches and builds reports.
#[derive(Debug, Clone, Default)]
pub struct ValidationPipeline {
    validator: TripleValidator,
}

impl ValidationPipeline {
    pub fn new(validator: TripleValidator) -> Self {
        Self { validator }
    }

    pub fn validator(&self) -> &TripleValidator {
        &self.validator
    }

    /// Validate a batch, returning the valid triples and the report.
    pub fn validate(&mut self, triples: Vec<Triple>) -> (Vec<Triple>, ValidationReport) {
        let total = triples.len();
        let (valid, issues) = self.validator.validate_batch(triples);
        let report = ValidationReport::from_issues(total, valid.len(), issues);

        info!(
            total = report.total,
            valid = report.valid,
            invalid = report.invalid,
            "Validated triples"
        );

        (valid, report)
    }
}
