//! CSV output for extracted units.

use std::fs::File;
use std::path::PathBuf;

use indexmap::IndexSet;

use crate::error::Result;
use crate::types::{context::JobContext, record::ExtractionUnit, record::Record};

/// Write a unit's rows to `<prefix><unit>.csv` in the working directory.
///
/// Headers are the union of every row's keys in first-seen order. Commas in
/// values become `;` so the files stay friendly to naive spreadsheet imports.
/// No rows still produces an (empty) file, recording that the unit ran.
pub fn write_unit_csv(ctx: &JobContext, unit: &ExtractionUnit, rows: &[Record]) -> Result<PathBuf> {
    let path = ctx
        .working_directory
        .join(format!("{}{}.csv", ctx.file_prefix(), unit.file_stem()));

    let headers: IndexSet<&str> = rows
        .iter()
        .flat_map(|row| row.keys().map(String::as_str))
        .collect();

    if headers.is_empty() {
        File::create(&path)?;
        return Ok(path);
    }

    let mut writer = csv::Writer::from_path(&path)?;
    writer.write_record(headers.iter())?;
    for row in rows {
        writer.write_record(
            headers
                .iter()
                .map(|h| sanitize_value(row.get(*h).map(String::as_str).unwrap_or(""))),
        )?;
    }
    writer.flush()?;
    Ok(path)
}

/// Strip commas and surrounding whitespace from a cell value.
pub fn sanitize_value(value: &str) -> String {
    value.replace(',', ";").trim().to_string()
}
