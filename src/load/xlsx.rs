use calamine::{open_workbook_auto, Data, Reader};
use std::path::Path;
use tracing::{debug, warn};

use super::cells::{build_record, is_blank, Cell};
use super::LoadOptions;
use crate::error::{PipelineError, Result};
use crate::schema::{ColumnMap, SalesTable, REQUIRED_COLUMNS};

fn to_cell(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Empty,
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::from_text(s),
        Data::Float(f) => Cell::Number(*f),
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Bool(b) => Cell::Text(b.to_string()),
        // `as_datetime` applies the workbook's 1900/1904 epoch
        Data::DateTime(dt) if dt.is_datetime() => match dt.as_datetime() {
            Some(d) => Cell::Date(d.date()),
            None => Cell::Number(dt.as_f64()),
        },
        Data::DateTime(dt) => Cell::Number(dt.as_f64()),
        Data::Error(e) => Cell::Text(e.to_string()),
    }
}

/// Read one worksheet of a workbook (`.xlsx`, `.xlsm`, `.xlsb`, `.xls`, `.ods`).
pub fn read_workbook(path: &Path, opts: &LoadOptions) -> Result<SalesTable> {
    let mut workbook = open_workbook_auto(path)?;

    let sheet = match &opts.sheet {
        Some(name) => name.clone(),
        None => workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| PipelineError::InvalidInput("workbook contains no sheets".into()))?,
    };
    debug!(sheet = %sheet, "reading worksheet");
    let range = workbook.worksheet_range(&sheet)?;

    // `Range` starts at the first used cell, not at A1
    let first_row = range.start().map(|(r, _)| r as usize).unwrap_or(0);
    let skip = opts.header_row.saturating_sub(first_row);
    let mut rows = range.rows().skip(skip);
    let headers: Vec<String> = match rows.next() {
        Some(row) => row
            .iter()
            .map(|c| match to_cell(c) {
                Cell::Text(s) => s,
                _ => String::new(),
            })
            .collect(),
        None => {
            warn!(sheet = %sheet, header_row = opts.header_row, "worksheet has no header row");
            return Err(PipelineError::SchemaMismatch {
                missing: REQUIRED_COLUMNS.iter().map(|c| c.to_string()).collect(),
            });
        }
    };
    let map = ColumnMap::resolve(&headers)?;

    let mut records = Vec::with_capacity(range.height().saturating_sub(skip + 1));
    for (idx, row) in rows.enumerate() {
        let cells: Vec<Cell> = row.iter().map(to_cell).collect();
        if is_blank(&cells) {
            continue;
        }
        records.push(build_record(idx + 1, &map, &cells)?);
    }

    Ok(SalesTable::new(map.extra_names(), records))
}
