use csv::{ReaderBuilder, WriterBuilder};

use super::{ColumnData, ColumnType, Exportable, ExportTable};
use crate::error::{PipelineError, Result};
use crate::schema::Amount;

/// Encode as UTF-8 comma-separated text: one header row, then one line per row.
pub fn to_delimited_text<T: Exportable + ?Sized>(rows: &T) -> Result<Vec<u8>> {
    let table = rows.export_table();
    let mut wtr = WriterBuilder::new().from_writer(Vec::new());
    wtr.write_record(table.headers())?;
    for row in 0..table.num_rows() {
        wtr.write_record(table.columns.iter().map(|c| c.data.render(row)))?;
    }
    wtr.into_inner().map_err(|e| PipelineError::Io(e.into_error()))
}

/// Parse text produced by `to_delimited_text` back into columns.
///
/// The header must list exactly the schema's column names, in order.
pub fn from_delimited_text(bytes: &[u8], schema: &[(String, ColumnType)]) -> Result<ExportTable> {
    let mut rdr = ReaderBuilder::new().has_headers(true).from_reader(bytes);
    let headers = rdr.headers()?.clone();
    let names: Vec<&str> = headers.iter().collect();
    let expected: Vec<&str> = schema.iter().map(|(n, _)| n.as_str()).collect();
    if names != expected {
        let missing = expected
            .iter()
            .filter(|n| !names.contains(n))
            .map(|n| n.to_string())
            .collect::<Vec<_>>();
        return Err(if missing.is_empty() {
            PipelineError::InvalidInput(format!(
                "columns {:?} do not match expected {:?}",
                names, expected
            ))
        } else {
            PipelineError::SchemaMismatch { missing }
        });
    }

    let mut table = ExportTable::empty(schema);
    for (idx, result) in rdr.records().enumerate() {
        let record = result?;
        for (col, column) in table.columns.iter_mut().enumerate() {
            let raw = record.get(col).unwrap_or("");
            let invalid = || PipelineError::InvalidValue {
                row: idx + 1,
                column: column.name.clone(),
                value: raw.to_string(),
            };
            match &mut column.data {
                ColumnData::Text(v) => {
                    v.push(Some(raw.to_string()).filter(|s| !s.is_empty()))
                }
                ColumnData::Amount(v) => v.push(raw.parse::<Amount>().map_err(|_| invalid())?),
                ColumnData::Count(v) => v.push(raw.parse::<u64>().map_err(|_| invalid())?),
            }
        }
    }
    Ok(table)
}
