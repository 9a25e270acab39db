// src/schema/columns.rs

use crate::error::{PipelineError, Result};

pub const INVOICE_DATE: &str = "InvoiceDate";
pub const RETAILER: &str = "Retailer";
pub const REGION: &str = "Region";
pub const STATE: &str = "State";
pub const CITY: &str = "City";
pub const UNITS_SOLD: &str = "UnitsSold";
pub const TOTAL_SALES: &str = "TotalSales";
pub const MONTH_YEAR: &str = "Month_Year";
pub const TOTAL_SALES_FORMATTED: &str = "TotalSales (Formatted)";

/// Columns every source must carry (case-sensitive), in raw-export order.
pub const REQUIRED_COLUMNS: [&str; 7] = [
    INVOICE_DATE,
    RETAILER,
    REGION,
    STATE,
    CITY,
    UNITS_SOLD,
    TOTAL_SALES,
];

/// Header positions of the required columns plus any extra columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMap {
    pub invoice_date: usize,
    pub retailer: usize,
    pub region: usize,
    pub state: usize,
    pub city: usize,
    pub units_sold: usize,
    pub total_sales: usize,
    /// `(position, name)` of non-required columns, in header order.
    pub extra: Vec<(usize, String)>,
}

impl ColumnMap {
    /// Resolve header names. Header cells are trimmed; matching is exact.
    /// Blank header cells are ignored; the first occurrence of a name wins.
    pub fn resolve<S: AsRef<str>>(headers: &[S]) -> Result<Self> {
        let headers: Vec<&str> = headers.iter().map(|h| h.as_ref().trim()).collect();
        let find = |name: &str| headers.iter().position(|h| *h == name);

        let missing: Vec<String> = REQUIRED_COLUMNS
            .iter()
            .filter(|c| find(c).is_none())
            .map(|c| c.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(PipelineError::SchemaMismatch { missing });
        }

        let mut extra: Vec<(usize, String)> = Vec::new();
        for (i, h) in headers.iter().enumerate() {
            if h.is_empty() || REQUIRED_COLUMNS.contains(h) {
                continue;
            }
            if extra.iter().any(|(_, seen)| seen == h) {
                continue;
            }
            extra.push((i, h.to_string()));
        }

        // Presence was checked above.
        let at = |name: &str| find(name).unwrap_or_default();
        Ok(Self {
            invoice_date: at(INVOICE_DATE),
            retailer: at(RETAILER),
            region: at(REGION),
            state: at(STATE),
            city: at(CITY),
            units_sold: at(UNITS_SOLD),
            total_sales: at(TOTAL_SALES),
            extra,
        })
    }

    pub fn extra_names(&self) -> Vec<String> {
        self.extra.iter().map(|(_, n)| n.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_required_and_extra_columns() {
        let headers = [
            "Retailer",
            " InvoiceDate ",
            "Product",
            "Region",
            "State",
            "City",
            "",
            "UnitsSold",
            "TotalSales",
            "Product",
        ];
        let map = ColumnMap::resolve(&headers).unwrap();
        assert_eq!(map.retailer, 0);
        assert_eq!(map.invoice_date, 1);
        assert_eq!(map.total_sales, 8);
        assert_eq!(map.extra, vec![(2, "Product".to_string())]);
    }

    #[test]
    fn missing_columns_are_listed() {
        let headers = ["InvoiceDate", "Retailer", "Region", "State", "City", "UnitsSold"];
        match ColumnMap::resolve(&headers) {
            Err(PipelineError::SchemaMismatch { missing }) => {
                assert_eq!(missing, vec!["TotalSales".to_string()])
            }
            other => panic!("expected SchemaMismatch, got {:?}", other),
        }
    }

    #[test]
    fn column_names_are_case_sensitive() {
        let headers = [
            "invoicedate",
            "Retailer",
            "Region",
            "State",
            "City",
            "UnitsSold",
            "TotalSales",
        ];
        assert!(matches!(
            ColumnMap::resolve(&headers),
            Err(PipelineError::SchemaMismatch { .. })
        ));
    }
}
