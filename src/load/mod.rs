// src/load/mod.rs
pub mod cells;
pub mod date_parser;
pub mod delimited;
pub mod xlsx;

use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};
use tracing::{info, instrument};

use crate::error::{PipelineError, Result};
use crate::schema::SalesTable;

/// Where in the source the table lives.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadOptions {
    /// Worksheet name; the first sheet when unset. Ignored for CSV.
    pub sheet: Option<String>,
    /// 0-based row holding the column names.
    pub header_row: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Spreadsheet,
    Delimited,
}

impl SourceKind {
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match ext.as_deref() {
            Some("xlsx" | "xlsm" | "xlsb" | "xls" | "ods") => Ok(SourceKind::Spreadsheet),
            Some("csv") => Ok(SourceKind::Delimited),
            _ => Err(PipelineError::UnsupportedSource(PathBuf::from(path))),
        }
    }
}

/// Load the sales table from a workbook or CSV file.
///
/// Fails with `SourceNotFound` when `path` is not a readable file and with
/// `SchemaMismatch` when any required column is absent.
#[instrument(level = "info", skip(path, opts), fields(path = %path.as_ref().display()))]
pub fn load_sales_table<P: AsRef<Path>>(path: P, opts: &LoadOptions) -> Result<SalesTable> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(PipelineError::SourceNotFound {
            path: path.to_path_buf(),
        });
    }

    let table = match SourceKind::from_path(path)? {
        SourceKind::Spreadsheet => xlsx::read_workbook(path, opts)?,
        SourceKind::Delimited => {
            let file = File::open(path)?;
            delimited::read_csv(BufReader::new(file), opts)?
        }
    };

    info!(
        rows = table.len(),
        extra_columns = table.extra_columns().len(),
        "loaded sales table"
    );
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Amount;
    use anyhow::Result;
    use std::io::Write;
    use tempfile::{Builder, TempDir};

    #[test]
    fn missing_source_is_reported() {
        let err = load_sales_table("does/not/exist.xlsx", &LoadOptions::default()).unwrap_err();
        assert!(matches!(err, PipelineError::SourceNotFound { .. }));
    }

    #[test]
    fn directory_is_not_a_source() -> Result<()> {
        let dir = TempDir::new()?;
        let err = load_sales_table(dir.path(), &LoadOptions::default()).unwrap_err();
        assert!(matches!(err, PipelineError::SourceNotFound { .. }));
        Ok(())
    }

    #[test]
    fn unknown_extension_is_rejected() -> Result<()> {
        let tmp = Builder::new().suffix(".json").tempfile()?;
        let err = load_sales_table(tmp.path(), &LoadOptions::default()).unwrap_err();
        assert!(matches!(err, PipelineError::UnsupportedSource(_)));
        Ok(())
    }

    #[test]
    fn loads_csv_by_extension() -> Result<()> {
        let mut tmp = Builder::new().suffix(".CSV").tempfile()?;
        writeln!(
            tmp,
            "InvoiceDate,Retailer,Region,State,City,UnitsSold,TotalSales"
        )?;
        writeln!(tmp, "2023-01-15,A,West,California,Los Angeles,2,100")?;
        tmp.flush()?;

        let table = load_sales_table(tmp.path(), &LoadOptions::default())?;
        assert_eq!(table.len(), 1);
        assert_eq!(table.total_sales(), Some(Amount::from_units(100)));
        Ok(())
    }

    #[test]
    fn source_kind_by_extension() {
        assert_eq!(
            SourceKind::from_path(Path::new("Adidas.xlsx")).unwrap(),
            SourceKind::Spreadsheet
        );
        assert_eq!(
            SourceKind::from_path(Path::new("raw.csv")).unwrap(),
            SourceKind::Delimited
        );
        assert!(SourceKind::from_path(Path::new("noext")).is_err());
    }
}
