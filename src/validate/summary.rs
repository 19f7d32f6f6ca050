use crate::fields::terminal_name;
use crate::validate::Severity;
use std::collections::BTreeMap;

/// One diagnostic as recorded in the session summary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub url: String,
    pub severity: Severity,
    pub message: String,
}

/// Diagnostics of the whole session grouped by field identifier
///
/// Entries of a field keep the order in which pages were recorded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationSummary {
    entries: BTreeMap<String, Vec<Diagnostic>>,
}

impl ValidationSummary {
    pub(crate) fn push(&mut self, field: &str, diagnostic: Diagnostic) {
        self.entries.entry(field.to_string()).or_default().push(diagnostic);
    }

    /// Diagnostics for a field, by full identifier or terminal name
    pub fn get(&self, field: &str) -> Option<&[Diagnostic]> {
        self.entries
            .get(field)
            .or_else(|| {
                self.entries
                    .iter()
                    .find(|(id, _)| terminal_name(id) == field)
                    .map(|(_, diagnostics)| diagnostics)
            })
            .map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Diagnostic])> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of diagnostics across all fields
    pub fn total(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.entries
            .values()
            .flatten()
            .filter(|d| d.severity == severity)
            .count()
    }
}
