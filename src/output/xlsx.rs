//! Spreadsheet conversion of the tabular file

use crate::fields::FieldValue;
use crate::output::csv_sink::Table;
use crate::output::finalize::ExportError;
use rust_xlsxwriter::{Format, Workbook, XlsxError};
use std::path::Path;

/// Writes the table to an `.xlsx` workbook
///
/// Numbers and booleans keep their type; the header row is bold, frozen and
/// carries an autofilter.
pub fn write_xlsx(table: &Table, target: &Path) -> Result<(), ExportError> {
    let map_err = |e: XlsxError| match e {
        XlsxError::IoError(source) => ExportError::Io {
            path: target.to_path_buf(),
            source,
        },
        other => ExportError::Xlsx(other.to_string()),
    };

    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();
    let worksheet = workbook.add_worksheet();

    for (col, header) in table.headers.iter().enumerate() {
        worksheet
            .write_string_with_format(0, col as u16, header, &header_format)
            .map_err(map_err)?;
    }

    for (index, row) in table.rows.iter().enumerate() {
        let row_num = index as u32 + 1;
        for (col, cell) in row.iter().enumerate() {
            let col = col as u16;
            let written = match FieldValue::parse_cell(cell) {
                Some(FieldValue::Integer(i)) => worksheet.write_number(row_num, col, i as f64),
                Some(FieldValue::Float(f)) => worksheet.write_number(row_num, col, f),
                Some(FieldValue::Bool(b)) => worksheet.write_boolean(row_num, col, b),
                Some(FieldValue::Text(s)) => worksheet.write_string(row_num, col, s),
                None => continue,
            };
            written.map_err(map_err)?;
        }
    }

    if !table.headers.is_empty() {
        worksheet.set_freeze_panes(1, 0).map_err(map_err)?;
        worksheet
            .autofilter(0, 0, table.rows.len() as u32, table.headers.len() as u16 - 1)
            .map_err(map_err)?;
    }

    workbook.save(target).map_err(map_err)?;
    Ok(())
}
