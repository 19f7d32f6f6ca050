use crate::audit::{AUDIT_FIELD_PREFIX, CATEGORIES};
use crate::fields::FieldValue;
use crate::validate::Severity;

/// A single condition a field value must meet
#[derive(Debug, Clone, PartialEq)]
pub enum Check {
    /// Present and not blank
    NotEmpty,
    /// Text no longer than this many characters
    MaxLength(usize),
    Equals(f64),
    Min(f64),
    Max(f64),
    /// Absent or blank
    MustBeEmpty,
}

impl Check {
    /// Returns a message when `value` fails the check
    ///
    /// Numeric and length checks pass when the value is absent.
    pub fn failure(&self, value: Option<&FieldValue>) -> Option<String> {
        match self {
            Self::NotEmpty => match value {
                Some(v) if !v.is_empty() => None,
                _ => Some("is empty".to_string()),
            },
            Self::MustBeEmpty => match value {
                Some(v) if !v.is_empty() => Some(format!("must be empty, found {}", v)),
                _ => None,
            },
            Self::MaxLength(max) => {
                let len = value?.to_string().chars().count();
                (len > *max).then(|| format!("length {} exceeds {}", len, max))
            }
            Self::Equals(expected) => {
                let actual = value?.as_f64();
                (actual != Some(*expected)).then(|| format!("is {}, expected {}", display(value), expected))
            }
            Self::Min(min) => {
                let actual = value?.as_f64()?;
                (actual < *min).then(|| format!("{} is below {}", actual, min))
            }
            Self::Max(max) => {
                let actual = value?.as_f64()?;
                (actual > *max).then(|| format!("{} is above {}", actual, max))
            }
        }
    }
}

fn display(value: Option<&FieldValue>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Checks for one field, tried in order; the first failure is reported
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub field: String,
    pub checks: Vec<(Check, Severity)>,
}

impl Rule {
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            checks: Vec::new(),
        }
    }

    pub fn error(mut self, check: Check) -> Self {
        self.checks.push((check, Severity::Error));
        self
    }

    pub fn warning(mut self, check: Check) -> Self {
        self.checks.push((check, Severity::Warning));
        self
    }
}

/// The built-in rule set
pub fn default_rules() -> Vec<Rule> {
    let mut rules = vec![
        Rule::new("response.status").error(Check::Equals(200.0)),
        Rule::new("result.title")
            .error(Check::NotEmpty)
            .warning(Check::MaxLength(70)),
        Rule::new("result.description").warning(Check::NotEmpty),
        Rule::new("result.h1_count")
            .error(Check::Min(1.0))
            .warning(Check::Max(1.0)),
        Rule::new("result.is_canonical").warning(Check::Min(1.0)),
        Rule::new("result.request_time").warning(Check::Max(3000.0)),
        Rule::new("result.images_without_alt").warning(Check::Max(0.0)),
        Rule::new("result.mixed_content_url").error(Check::MustBeEmpty),
        Rule::new("result.dom_size").warning(Check::Max(1500.0)),
        Rule::new("result.html_size").warning(Check::Max(1_000_000.0)),
    ];

    for category in CATEGORIES {
        rules.push(
            Rule::new(format!("{}scores.{}", AUDIT_FIELD_PREFIX, category))
                .error(Check::Min(50.0))
                .warning(Check::Min(90.0)),
        );
    }

    rules
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_empty() {
        assert!(Check::NotEmpty.failure(None).is_some());
        assert!(Check::NotEmpty.failure(Some(&FieldValue::from("  "))).is_some());
        assert!(Check::NotEmpty.failure(Some(&FieldValue::from("Home"))).is_none());
        assert!(Check::NotEmpty.failure(Some(&FieldValue::Integer(0))).is_none());
    }

    #[test]
    fn test_numeric_checks_skip_absent_values() {
        assert!(Check::Min(1.0).failure(None).is_none());
        assert!(Check::Max(1.0).failure(None).is_none());
        assert!(Check::MaxLength(3).failure(None).is_none());
        assert!(Check::Equals(200.0).failure(None).is_none());
    }

    #[test]
    fn test_bounds() {
        assert_eq!(
            Check::Max(1.0).failure(Some(&FieldValue::Integer(3))),
            Some("3 is above 1".to_string())
        );
        assert!(Check::Min(50.0).failure(Some(&FieldValue::Integer(50))).is_none());
        assert!(Check::Equals(200.0).failure(Some(&FieldValue::Integer(404))).is_some());
    }

    #[test]
    fn test_max_length_counts_chars() {
        let title = FieldValue::from("Привет");
        assert!(Check::MaxLength(6).failure(Some(&title)).is_none());
        assert!(Check::MaxLength(5).failure(Some(&title)).is_some());
    }

    #[test]
    fn test_must_be_empty() {
        assert!(Check::MustBeEmpty.failure(None).is_none());
        assert!(Check::MustBeEmpty
            .failure(Some(&FieldValue::from("http://cdn.example.com/a.png")))
            .is_some());
    }

    #[test]
    fn test_audit_score_rules() {
        let rules = default_rules();
        assert!(rules.iter().any(|r| r.field == "lighthouse.scores.performance"));
        let ids: std::collections::HashSet<_> = rules.iter().map(|r| r.field.as_str()).collect();
        assert_eq!(ids.len(), rules.len());
    }
}
