//! Tabular intermediate file
//!
//! One row per page, one column per catalog field, `;` separated. The
//! derived formats are all converted from this file.

use crate::crawler::PageResult;
use crate::fields::FieldCatalog;
use crate::output::traits::{OutputResult, PageSink};
use csv::{ReaderBuilder, Writer, WriterBuilder};
use std::fs::File;
use std::path::{Path, PathBuf};

/// Column separator of the tabular file
pub const DELIMITER: u8 = b';';

/// Writes page results as csv rows
pub struct CsvSink {
    writer: Writer<File>,
    catalog: FieldCatalog,
    path: PathBuf,
    rows: usize,
}

impl CsvSink {
    /// Creates the file and writes the header row (the catalog identifiers)
    pub fn create(path: &Path, catalog: &FieldCatalog) -> OutputResult<Self> {
        let mut writer = WriterBuilder::new().delimiter(DELIMITER).from_path(path)?;
        writer.write_record(catalog.fields())?;

        Ok(Self {
            writer,
            catalog: catalog.clone(),
            path: path.to_path_buf(),
            rows: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn rows(&self) -> usize {
        self.rows
    }
}

impl PageSink for CsvSink {
    fn write(&mut self, page: &PageResult) -> OutputResult<()> {
        let record: Vec<String> = page
            .row(&self.catalog)
            .into_iter()
            .map(|value| value.map(ToString::to_string).unwrap_or_default())
            .collect();
        self.writer.write_record(&record)?;
        self.rows += 1;
        Ok(())
    }

    fn flush(&mut self) -> OutputResult<()> {
        self.writer.flush()?;
        Ok(())
    }
}

/// The tabular file read back into memory
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Reads a tabular file written by [`CsvSink`]
pub fn read_table(path: &Path) -> OutputResult<Table> {
    let mut reader = ReaderBuilder::new()
        .delimiter(DELIMITER)
        .flexible(true)
        .from_path(path)?;

    let headers = reader.headers()?.iter().map(str::to_string).collect();
    let mut rows = Vec::new();
    for record in reader.records() {
        rows.push(record?.iter().map(str::to_string).collect());
    }

    Ok(Table { headers, rows })
}
