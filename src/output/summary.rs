//! Console summaries printed at the end of a session

use crate::validate::{Severity, ValidationSummary};
use std::time::Duration;

/// Formats the session's validation diagnostics grouped by field
///
/// # Arguments
///
/// * `summary` - Diagnostics accumulated during the crawl
///
/// # Returns
///
/// A multi-line string, or a single line when nothing was reported
pub fn format_validation_summary(summary: &ValidationSummary) -> String {
    if summary.is_empty() {
        return "Validation: no issues found".to_string();
    }

    let mut out = String::new();
    out.push_str(&format!(
        "Validation: {} errors, {} warnings\n",
        summary.count(Severity::Error),
        summary.count(Severity::Warning)
    ));

    for (field, diagnostics) in summary.iter() {
        out.push_str(&format!("\n{} ({}):\n", field, diagnostics.len()));
        for diagnostic in diagnostics {
            out.push_str(&format!(
                "  [{}] {}: {}\n",
                diagnostic.severity, diagnostic.url, diagnostic.message
            ));
        }
    }

    out
}

/// `Finish: 1.5 mins (4.50 sec per page)`
pub fn format_finish_line(elapsed: Duration, pages: usize) -> String {
    let secs = elapsed.as_secs_f64();
    let per_page = if pages > 0 { secs / pages as f64 } else { 0.0 };
    format!("Finish: {:.1} mins ({:.2} sec per page)", secs / 60.0, per_page)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finish_line() {
        assert_eq!(
            format_finish_line(Duration::from_secs(90), 20),
            "Finish: 1.5 mins (4.50 sec per page)"
        );
        assert_eq!(
            format_finish_line(Duration::from_secs(3), 0),
            "Finish: 0.1 mins (0.00 sec per page)"
        );
    }

    #[test]
    fn test_empty_summary() {
        assert_eq!(
            format_validation_summary(&ValidationSummary::default()),
            "Validation: no issues found"
        );
    }
}
