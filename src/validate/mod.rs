//! Validation module
//!
//! This module checks page results against per-field rules:
//! - Rules are keyed by field identifier, at most one per field
//! - Only fields present in the session catalog are checked
//! - Diagnostics are accumulated into a session-wide summary

mod rules;
mod summary;

pub use rules::{default_rules, Check, Rule};
pub use summary::{Diagnostic, ValidationSummary};

use crate::crawler::PageResult;
use crate::fields::FieldCatalog;
use std::collections::HashMap;
use std::fmt;

/// Diagnostic severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Warning => f.write_str("warning"),
            Self::Error => f.write_str("error"),
        }
    }
}

/// A diagnostic for one field of one page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResult {
    pub field: String,
    pub severity: Severity,
    pub message: String,
}

/// Applies field rules and accumulates the session summary
#[derive(Debug, Clone)]
pub struct Validator {
    rules: HashMap<String, Rule>,
    summary: ValidationSummary,
}

impl Default for Validator {
    fn default() -> Self {
        Self::with_rules(default_rules())
    }
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validator with a custom rule set; a later rule for the same field replaces an earlier one
    pub fn with_rules(rules: impl IntoIterator<Item = Rule>) -> Self {
        Self {
            rules: rules.into_iter().map(|r| (r.field.clone(), r)).collect(),
            summary: ValidationSummary::default(),
        }
    }

    /// Checks one page against the rules of the catalog's fields
    ///
    /// Pure: nothing is recorded. Results follow catalog order.
    pub fn check(&self, page: &PageResult, catalog: &FieldCatalog) -> Vec<ValidationResult> {
        catalog
            .fields()
            .iter()
            .filter_map(|id| self.rules.get(id))
            .filter_map(|rule| {
                let value = page.value(&rule.field);
                rule.checks.iter().find_map(|(check, severity)| {
                    check.failure(value).map(|message| ValidationResult {
                        field: rule.field.clone(),
                        severity: *severity,
                        message,
                    })
                })
            })
            .collect()
    }

    /// Adds a page's diagnostics to the summary
    pub fn record(&mut self, url: &str, results: &[ValidationResult]) {
        for result in results {
            self.summary.push(
                &result.field,
                Diagnostic {
                    url: url.to_string(),
                    severity: result.severity,
                    message: result.message.clone(),
                },
            );
        }
    }

    /// Ends accumulation and hands out the summary
    pub fn summarize(self) -> ValidationSummary {
        self.summary
    }
}
