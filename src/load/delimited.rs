use csv::{ReaderBuilder, StringRecord, Trim};
use std::io::Read;

use super::cells::{build_record, is_blank, Cell};
use super::LoadOptions;
use crate::error::{PipelineError, Result};
use crate::schema::{ColumnMap, SalesTable, REQUIRED_COLUMNS};

/// Read comma-separated text. The header is the record at `opts.header_row`;
/// records before it are skipped.
pub fn read_csv<R: Read>(reader: R, opts: &LoadOptions) -> Result<SalesTable> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true) // short rows read as trailing empty cells
        .trim(Trim::All)
        .from_reader(reader);

    let mut records = rdr.records().skip(opts.header_row);
    let headers: StringRecord = match records.next() {
        Some(result) => result?,
        None => {
            return Err(PipelineError::SchemaMismatch {
                missing: REQUIRED_COLUMNS.iter().map(|c| c.to_string()).collect(),
            })
        }
    };
    let map = ColumnMap::resolve(&headers.iter().collect::<Vec<_>>())?;

    let mut out = Vec::new();
    for (idx, result) in records.enumerate() {
        let record = result?;
        let cells: Vec<Cell> = record.iter().map(Cell::from_text).collect();
        if is_blank(&cells) {
            continue;
        }
        out.push(build_record(idx + 1, &map, &cells)?);
    }

    Ok(SalesTable::new(map.extra_names(), out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Amount;
    use anyhow::Result;
    use std::io::Cursor;

    #[test]
    fn reads_header_and_rows() -> Result<()> {
        let text = "\
InvoiceDate,Retailer,Region,State,City,UnitsSold,TotalSales,Product
2023-01-15,A,West,California,Los Angeles,10,100,Shoes
2023-02-03,A,West,California,San Francisco,5,200,Shoes
2023-02-04,B,South,Texas,Houston,1,50
,,,,,,,
";
        let table = read_csv(Cursor::new(text), &LoadOptions::default())?;
        assert_eq!(table.len(), 3);
        assert_eq!(table.extra_columns(), &["Product".to_string()]);
        assert_eq!(table.total_sales(), Some(Amount::from_units(350)));
        assert_eq!(table.records()[2].extra, vec![String::new()]);
        Ok(())
    }

    #[test]
    fn missing_total_sales_is_a_schema_mismatch() {
        let text = "InvoiceDate,Retailer,Region,State,City,UnitsSold\n2023-01-15,A,West,CA,LA,1\n";
        let err = read_csv(Cursor::new(text), &LoadOptions::default()).unwrap_err();
        match err {
            PipelineError::SchemaMismatch { missing } => assert_eq!(missing, vec!["TotalSales"]),
            other => panic!("expected SchemaMismatch, got {:?}", other),
        }
    }

    #[test]
    fn empty_source_is_a_schema_mismatch() {
        let err = read_csv(Cursor::new(""), &LoadOptions::default()).unwrap_err();
        assert!(matches!(err, PipelineError::SchemaMismatch { .. }));
    }

    #[test]
    fn skips_preamble_before_header_row() -> Result<()> {
        let text = "\
Adidas Sales Database
\"exported 2023-06-30\"
InvoiceDate,Retailer,Region,State,City,UnitsSold,TotalSales
2021-01-01,Foot Locker,Northeast,New York,New York,\"1,200\",\"$600,000\"
";
        let opts = LoadOptions {
            header_row: 2,
            ..LoadOptions::default()
        };
        let table = read_csv(Cursor::new(text), &opts)?;
        assert_eq!(table.len(), 1);
        assert_eq!(table.records()[0].units_sold, 1200);
        assert_eq!(table.total_sales(), Some(Amount::from_units(600_000)));
        Ok(())
    }
}
