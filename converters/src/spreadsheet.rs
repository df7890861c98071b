//! Spreadsheet text extraction.

use std::path::Path;

use calamine::{Data, Reader, open_workbook_auto};

use crate::converter::Converter;
use crate::error::Result;

/// Dumps every sheet of a workbook as comma-separated rows.
#[derive(Debug, Clone, Copy, Default)]
pub struct XlsxConverter;

impl Converter for XlsxConverter {
    fn convert(&self, path: &Path) -> Result<String> {
        let mut workbook = open_workbook_auto(path)?;
        let mut lines = Vec::new();

        for name in workbook.sheet_names() {
            lines.push(format!("--- Sheet {name} ---"));
            let range = workbook.worksheet_range(&name)?;
            for row in range.rows() {
                let cells: Vec<String> = row.iter().map(cell_text).collect();
                lines.push(cells.join(", "));
            }
        }

        Ok(lines.join("\n"))
    }
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::DateTime(value) => match value.as_datetime() {
            Some(datetime) => datetime.format("%Y-%m-%d %H:%M:%S").to_string(),
            None => value.to_string(),
        },
        other => other.to_string(),
    }
}
