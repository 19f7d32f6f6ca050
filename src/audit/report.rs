use crate::audit::AuditError;
use crate::fields::{FieldMap, FieldValue};
use serde::Deserialize;
use std::collections::BTreeMap;

/// Prefix of every audit field identifier
pub const AUDIT_FIELD_PREFIX: &str = "lighthouse.";

/// Headline performance metrics, always read as integers
pub const HEADLINE_METRICS: &[&str] = &[
    "first-contentful-paint",
    "speed-index",
    "largest-contentful-paint",
    "interactive",
    "total-blocking-time",
    "cumulative-layout-shift",
];

/// Categories whose scores are reported
pub const CATEGORIES: &[&str] = &["performance", "accessibility", "best-practices", "seo", "pwa"];

/// Scores and metrics produced by one audit
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuditReport {
    /// Category scores, 0-100
    pub scores: BTreeMap<String, i64>,
    /// Named audit values
    pub metrics: BTreeMap<String, FieldValue>,
}

impl AuditReport {
    /// Maps the report into the audit field namespace
    ///
    /// Scores become `lighthouse.scores.<category>`, metrics `lighthouse.<audit-id>`.
    pub fn to_fields(&self) -> FieldMap {
        let mut fields = FieldMap::new();
        for (category, score) in &self.scores {
            fields.insert(
                format!("{}scores.{}", AUDIT_FIELD_PREFIX, category),
                FieldValue::Integer(*score),
            );
        }
        for (name, value) in &self.metrics {
            fields.insert(format!("{}{}", AUDIT_FIELD_PREFIX, name), value.clone());
        }
        fields
    }
}

#[derive(Debug, Deserialize)]
struct LighthouseJson {
    #[serde(default)]
    categories: BTreeMap<String, Category>,
    #[serde(default)]
    audits: BTreeMap<String, Audit>,
}

#[derive(Debug, Deserialize)]
struct Category {
    score: Option<f64>,
    #[serde(default, rename = "auditRefs")]
    audit_refs: Vec<AuditRef>,
}

#[derive(Debug, Deserialize)]
struct AuditRef {
    id: String,
}

#[derive(Debug, Deserialize)]
struct Audit {
    score: Option<f64>,
    #[serde(rename = "numericValue")]
    numeric_value: Option<f64>,
}

impl Audit {
    fn value(&self) -> Option<FieldValue> {
        match (self.numeric_value, self.score) {
            (Some(n), _) if n != 0.0 => Some(FieldValue::Integer(n as i64)),
            (_, Some(s)) if s.fract() == 0.0 => Some(FieldValue::Integer(s as i64)),
            (_, Some(s)) => Some(FieldValue::Float(s)),
            _ => None,
        }
    }
}

/// Parses a Lighthouse JSON report
///
/// # Mapping
///
/// - headline metrics: `numericValue` truncated to an integer
/// - category scores: `score * 100` truncated to an integer
/// - every audit referenced by a category: `numericValue` as an integer when
///   present and non-zero, otherwise the audit score
pub fn parse_lighthouse_report(json: &str) -> Result<AuditReport, AuditError> {
    let data: LighthouseJson = serde_json::from_str(json)?;
    let mut report = AuditReport::default();

    for name in HEADLINE_METRICS {
        if let Some(n) = data.audits.get(*name).and_then(|a| a.numeric_value) {
            report.metrics.insert(name.to_string(), FieldValue::Integer(n as i64));
        }
    }

    for category_id in CATEGORIES {
        let Some(category) = data.categories.get(*category_id) else {
            continue;
        };
        if let Some(score) = category.score {
            report
                .scores
                .insert(category_id.to_string(), (score * 100.0) as i64);
        }
        for audit_ref in &category.audit_refs {
            if HEADLINE_METRICS.contains(&audit_ref.id.as_str()) {
                continue;
            }
            if let Some(value) = data.audits.get(&audit_ref.id).and_then(Audit::value) {
                report.metrics.insert(audit_ref.id.clone(), value);
            }
        }
    }

    Ok(report)
}
