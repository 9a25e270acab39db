// src/export/mod.rs
pub mod columnar;
pub mod delimited;

pub use columnar::to_parquet;
pub use delimited::{from_delimited_text, to_delimited_text};

use crate::aggregate::Aggregation;
use crate::schema::{
    columns::{CITY, INVOICE_DATE, REGION, RETAILER, STATE, TOTAL_SALES, UNITS_SOLD},
    Amount, SalesRecord, SalesTable,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Text,
    Amount,
    Count,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnData {
    /// `None` is an empty cell.
    Text(Vec<Option<String>>),
    Amount(Vec<Amount>),
    Count(Vec<u64>),
}

impl ColumnData {
    pub fn column_type(&self) -> ColumnType {
        match self {
            ColumnData::Text(_) => ColumnType::Text,
            ColumnData::Amount(_) => ColumnType::Amount,
            ColumnData::Count(_) => ColumnType::Count,
        }
    }

    fn empty(ty: ColumnType) -> Self {
        match ty {
            ColumnType::Text => ColumnData::Text(Vec::new()),
            ColumnType::Amount => ColumnData::Amount(Vec::new()),
            ColumnType::Count => ColumnData::Count(Vec::new()),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ColumnData::Text(v) => v.len(),
            ColumnData::Amount(v) => v.len(),
            ColumnData::Count(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Delimited-text rendering of one cell.
    fn render(&self, row: usize) -> String {
        match self {
            ColumnData::Text(v) => v[row].clone().unwrap_or_default(),
            ColumnData::Amount(v) => v[row].to_string(),
            ColumnData::Count(v) => v[row].to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportColumn {
    pub name: String,
    pub data: ColumnData,
}

impl ExportColumn {
    fn new(name: &str, data: ColumnData) -> Self {
        Self {
            name: name.to_string(),
            data,
        }
    }
}

/// Column-oriented table handed to the writers. All columns have equal length.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportTable {
    pub columns: Vec<ExportColumn>,
}

impl ExportTable {
    pub fn num_rows(&self) -> usize {
        self.columns.first().map(|c| c.data.len()).unwrap_or(0)
    }

    pub fn headers(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Column names and types, as needed to parse an export back.
    pub fn schema(&self) -> Vec<(String, ColumnType)> {
        self.columns
            .iter()
            .map(|c| (c.name.clone(), c.data.column_type()))
            .collect()
    }

    fn empty(schema: &[(String, ColumnType)]) -> Self {
        Self {
            columns: schema
                .iter()
                .map(|(name, ty)| ExportColumn::new(name, ColumnData::empty(*ty)))
                .collect(),
        }
    }
}

/// Anything that can be offered as a download.
pub trait Exportable {
    fn export_table(&self) -> ExportTable;
}

impl Exportable for ExportTable {
    fn export_table(&self) -> ExportTable {
        self.clone()
    }
}

impl Exportable for Aggregation {
    /// Key columns, then `TotalSales`, then `UnitsSold` for the by-state view.
    fn export_table(&self) -> ExportTable {
        let mut columns: Vec<ExportColumn> = self
            .spec
            .key_columns()
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let values = self
                    .rows
                    .iter()
                    .map(|r| r.keys.get(i).map(ToString::to_string))
                    .collect();
                ExportColumn::new(name, ColumnData::Text(values))
            })
            .collect();
        columns.push(ExportColumn::new(
            TOTAL_SALES,
            ColumnData::Amount(self.rows.iter().map(|r| r.total_sales).collect()),
        ));
        if self.spec.includes_units() {
            columns.push(ExportColumn::new(
                UNITS_SOLD,
                ColumnData::Count(self.rows.iter().map(|r| r.units_sold).collect()),
            ));
        }
        ExportTable { columns }
    }
}

impl Exportable for SalesTable {
    /// Required columns in their canonical order, then the extra columns.
    fn export_table(&self) -> ExportTable {
        let records = self.records();
        let text = |f: fn(&SalesRecord) -> Option<String>| {
            ColumnData::Text(records.iter().map(f).collect())
        };
        let mut columns = vec![
            ExportColumn::new(
                INVOICE_DATE,
                text(|r| r.invoice_date.as_ref().map(ToString::to_string)),
            ),
            ExportColumn::new(RETAILER, text(|r| r.retailer.clone())),
            ExportColumn::new(REGION, text(|r| r.region.clone())),
            ExportColumn::new(STATE, text(|r| r.state.clone())),
            ExportColumn::new(CITY, text(|r| r.city.clone())),
            ExportColumn::new(
                UNITS_SOLD,
                ColumnData::Count(records.iter().map(|r| r.units_sold).collect()),
            ),
            ExportColumn::new(
                TOTAL_SALES,
                ColumnData::Amount(records.iter().map(|r| r.total_sales).collect()),
            ),
        ];
        for (i, name) in self.extra_columns().iter().enumerate() {
            let values = records
                .iter()
                .map(|r| r.extra.get(i).filter(|v| !v.is_empty()).cloned())
                .collect();
            columns.push(ExportColumn::new(name, ColumnData::Text(values)));
        }
        ExportTable { columns }
    }
}
