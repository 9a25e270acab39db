// src/schema/types.rs

use chrono::NaiveDate;
use std::fmt;

use super::Amount;

/// Invoice date as read from the source.
///
/// Unparsable text is kept verbatim so that only the views that actually
/// need a calendar date (month bucketing) fail on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvoiceDate {
    Parsed(NaiveDate),
    Unparsed(String),
}

impl InvoiceDate {
    pub fn date(&self) -> Option<NaiveDate> {
        match self {
            InvoiceDate::Parsed(d) => Some(*d),
            InvoiceDate::Unparsed(_) => None,
        }
    }
}

impl fmt::Display for InvoiceDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvoiceDate::Parsed(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            InvoiceDate::Unparsed(raw) => f.write_str(raw),
        }
    }
}

/// One sales line. `None` marks an empty cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SalesRecord {
    pub invoice_date: Option<InvoiceDate>,
    pub retailer: Option<String>,
    pub region: Option<String>,
    pub state: Option<String>,
    pub city: Option<String>,
    pub units_sold: u64,
    pub total_sales: Amount,
    /// Values of the table's extra columns, in `SalesTable::extra_columns` order.
    pub extra: Vec<String>,
}

/// The loaded source table. Never mutated after construction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SalesTable {
    extra_columns: Vec<String>,
    records: Vec<SalesRecord>,
}

impl SalesTable {
    pub fn new(extra_columns: Vec<String>, records: Vec<SalesRecord>) -> Self {
        debug_assert!(records.iter().all(|r| r.extra.len() == extra_columns.len()));
        Self {
            extra_columns,
            records,
        }
    }

    /// Columns present in the source beyond the required ones, in source order.
    pub fn extra_columns(&self) -> &[String] {
        &self.extra_columns
    }

    pub fn records(&self) -> &[SalesRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Sum of `TotalSales`; `None` when it does not fit an `Amount`.
    pub fn total_sales(&self) -> Option<Amount> {
        Amount::checked_sum(self.records.iter().map(|r| r.total_sales))
    }

    pub fn total_units(&self) -> Option<u64> {
        self.records
            .iter()
            .try_fold(0u64, |acc, r| acc.checked_add(r.units_sold))
    }

    fn parsed_dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.records
            .iter()
            .filter_map(|r| r.invoice_date.as_ref().and_then(InvoiceDate::date))
    }

    /// Most recent parsable invoice date ("last updated").
    pub fn latest_invoice_date(&self) -> Option<NaiveDate> {
        self.parsed_dates().max()
    }

    pub fn earliest_invoice_date(&self) -> Option<NaiveDate> {
        self.parsed_dates().min()
    }
}
