//! Output module for page results and exported artifacts
//!
//! This module handles:
//! - Writing page results as rows of the tabular (csv) file
//! - Converting the tabular file into a spreadsheet and a JSON report
//! - Publishing the report (upload, served reports directory, InfluxDB)
//! - Formatting the end-of-session console summaries

mod csv_sink;
pub mod finalize;
mod influx;
mod memory;
mod report;
mod summary;
mod traits;
mod upload;
mod xlsx;

pub use csv_sink::{read_table, CsvSink, Table, DELIMITER};
pub use finalize::{
    with_retry, Converter, ExportArtifacts, ExportError, ExportFailure, Finalizer,
    JsonReportConverter, OutputPaths, RetryPolicy, XlsxConverter,
};
pub use influx::{to_line_protocol, InfluxExporter};
pub use memory::MemorySink;
pub use report::{build_report, read_report, write_report, Report, ReportMeta, ReportParams};
pub use summary::{format_finish_line, format_validation_summary};
pub use traits::{OutputError, OutputResult, PageSink};
pub use upload::{HttpUploader, Uploader};
pub use xlsx::write_xlsx;
