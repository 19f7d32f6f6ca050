//! Time-series export of report items to InfluxDB (line protocol, v2 write API)

use crate::config::InfluxConfig;
use crate::crawler::URL_FIELD;
use crate::fields::FieldValue;
use crate::output::finalize::ExportError;
use crate::output::report::Report;
use reqwest::header::AUTHORIZATION;
use reqwest::Client;

fn escape_key(raw: &str) -> String {
    raw.replace(',', "\\,").replace('=', "\\=").replace(' ', "\\ ")
}

fn field_literal(value: &FieldValue) -> Option<String> {
    match value {
        FieldValue::Integer(i) => Some(format!("{}i", i)),
        FieldValue::Float(f) if f.is_finite() => Some(f.to_string()),
        FieldValue::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Converts report items into line protocol points
///
/// Each item becomes one point tagged with its URL; only numeric and boolean
/// fields are sent. At most `max_points` items are converted.
pub fn to_line_protocol(report: &Report, measurement: &str, max_points: usize) -> Vec<String> {
    report
        .items
        .iter()
        .filter_map(|item| {
            let url = item.get(URL_FIELD)?.to_string();
            let fields: Vec<String> = item
                .iter()
                .filter(|(key, _)| key.as_str() != URL_FIELD)
                .filter_map(|(key, value)| {
                    field_literal(value).map(|literal| format!("{}={}", escape_key(key), literal))
                })
                .collect();
            (!fields.is_empty()).then(|| {
                format!(
                    "{},url={} {}",
                    escape_key(measurement),
                    escape_key(&url),
                    fields.join(",")
                )
            })
        })
        .take(max_points)
        .collect()
}

/// Sends report points to InfluxDB
pub struct InfluxExporter {
    client: Client,
    config: InfluxConfig,
}

impl InfluxExporter {
    pub fn new(client: Client, config: InfluxConfig) -> Self {
        Self { client, config }
    }

    /// Writes the report's points; returns how many were sent
    pub async fn export(&self, report: &Report) -> Result<usize, ExportError> {
        let lines = to_line_protocol(report, &self.config.measurement, self.config.max_send_count);
        if lines.is_empty() {
            return Ok(0);
        }

        let endpoint = format!("{}/api/v2/write", self.config.url.trim_end_matches('/'));
        self.client
            .post(&endpoint)
            .query(&[
                ("org", self.config.org.as_str()),
                ("bucket", self.config.bucket.as_str()),
            ])
            .header(AUTHORIZATION, format!("Token {}", self.config.token))
            .body(lines.join("\n"))
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| ExportError::Influx(e.to_string()))?;

        tracing::info!("Sent {} points to InfluxDB", lines.len());
        Ok(lines.len())
    }
}
