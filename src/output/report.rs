//! Structured (JSON) report built from the tabular file

use crate::fields::{FieldMap, FieldValue};
use crate::output::csv_sink::Table;
use crate::output::traits::OutputResult;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

/// Report metadata
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportParams {
    pub lang: String,
    pub preset: String,
    /// Filter a viewer applies on open, e.g. `depth>1`
    pub default_filter: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_hash: Option<String>,
    pub generated_at: String,
    /// Column order of the tabular file
    pub fields: Vec<String>,
}

/// The structured report
///
/// Items hold typed values; empty cells are left out.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub params: ReportParams,
    pub items: Vec<FieldMap>,
}

/// Session data recorded in [`ReportParams`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportMeta {
    pub lang: String,
    pub preset: String,
    pub default_filter: String,
    pub config_hash: Option<String>,
}

/// Builds the report from a tabular file's contents
pub fn build_report(table: &Table, meta: &ReportMeta) -> Report {
    let items = table
        .rows
        .iter()
        .map(|row| {
            table
                .headers
                .iter()
                .zip(row)
                .filter_map(|(field, cell)| {
                    FieldValue::parse_cell(cell).map(|value| (field.clone(), value))
                })
                .collect()
        })
        .collect();

    Report {
        params: ReportParams {
            lang: meta.lang.clone(),
            preset: meta.preset.clone(),
            default_filter: meta.default_filter.clone(),
            config_hash: meta.config_hash.clone(),
            generated_at: chrono::Utc::now().to_rfc3339(),
            fields: table.headers.clone(),
        },
        items,
    }
}

pub fn write_report(report: &Report, path: &Path) -> OutputResult<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer(&mut writer, report)?;
    writer.flush()?;
    Ok(())
}

pub fn read_report(path: &Path) -> OutputResult<Report> {
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}
