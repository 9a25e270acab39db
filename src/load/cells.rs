use chrono::NaiveDate;

use super::date_parser::{from_excel_serial, parse_invoice_date};
use crate::error::{PipelineError, Result};
use crate::schema::{
    columns::{TOTAL_SALES, UNITS_SOLD},
    Amount, ColumnMap, InvoiceDate, SalesRecord,
};

/// A source cell, independent of the file format it came from.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    Date(NaiveDate),
}

impl Cell {
    pub fn from_text(raw: &str) -> Self {
        let cleaned = clean_str(raw);
        if cleaned.is_empty() {
            Cell::Empty
        } else {
            Cell::Text(cleaned)
        }
    }

    fn render(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(s) => s.clone(),
            Cell::Number(n) => render_number(*n),
            Cell::Date(d) => d.format("%Y-%m-%d").to_string(),
        }
    }
}

/// Trim whitespace + strip outer quotes if present.
pub fn clean_str(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.starts_with('"') && trimmed.ends_with('"') && trimmed.len() >= 2 {
        trimmed[1..trimmed.len() - 1].trim().to_string()
    } else {
        trimmed.to_string()
    }
}

/// Drop currency sign, thousands separators and inner spaces: `"$1,200.50"` → `"1200.50"`.
fn clean_numeric(raw: &str) -> String {
    let s = raw.trim();
    let (sign, body) = match s.strip_prefix('-') {
        Some(rest) => ("-", rest.trim_start()),
        None => ("", s),
    };
    let body = body.strip_prefix('$').unwrap_or(body);
    let digits: String = body.chars().filter(|c| *c != ',' && *c != ' ').collect();
    format!("{}{}", sign, digits)
}

fn render_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

fn invalid(row: usize, column: &str, cell: &Cell) -> PipelineError {
    PipelineError::InvalidValue {
        row,
        column: column.to_string(),
        value: cell.render(),
    }
}

fn text(cell: &Cell) -> Option<String> {
    match cell {
        Cell::Empty => None,
        other => Some(other.render()).filter(|s| !s.is_empty()),
    }
}

fn invoice_date(cell: &Cell) -> Option<InvoiceDate> {
    match cell {
        Cell::Empty => None,
        Cell::Date(d) => Some(InvoiceDate::Parsed(*d)),
        Cell::Number(serial) => Some(match from_excel_serial(*serial) {
            Some(d) => InvoiceDate::Parsed(d),
            None => InvoiceDate::Unparsed(render_number(*serial)),
        }),
        Cell::Text(s) => Some(match parse_invoice_date(s) {
            Some(d) => InvoiceDate::Parsed(d),
            None => InvoiceDate::Unparsed(s.clone()),
        }),
    }
}

fn total_sales(row: usize, cell: &Cell) -> Result<Amount> {
    let amount = match cell {
        Cell::Empty => Some(Amount::ZERO),
        Cell::Number(n) => Amount::from_f64(*n),
        Cell::Text(s) => clean_numeric(s).parse::<Amount>().ok(),
        Cell::Date(_) => None,
    };
    match amount {
        Some(a) if !a.is_negative() => Ok(a),
        _ => Err(invalid(row, TOTAL_SALES, cell)),
    }
}

fn units_sold(row: usize, cell: &Cell) -> Result<u64> {
    let units = match cell {
        Cell::Empty => Some(0),
        Cell::Number(n) if *n >= 0.0 && n.fract() == 0.0 && *n <= u64::MAX as f64 => {
            Some(*n as u64)
        }
        Cell::Text(s) => parse_count(&clean_numeric(s)),
        _ => None,
    };
    units.ok_or_else(|| invalid(row, UNITS_SOLD, cell))
}

/// Whole non-negative count: "1200" and "12.00" are fine, "12.5" and "-1" are not.
fn parse_count(s: &str) -> Option<u64> {
    let s = s.strip_prefix('+').unwrap_or(s);
    let whole = match s.split_once('.') {
        Some((whole, frac)) if frac.bytes().all(|b| b == b'0') => whole,
        Some(_) => return None,
        None => s,
    };
    if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    whole.parse().ok()
}

/// Build one record from a row of cells. `row` is the 1-based data row number.
/// Cells past the end of a short row read as empty.
pub fn build_record(row: usize, map: &ColumnMap, cells: &[Cell]) -> Result<SalesRecord> {
    let at = |i: usize| cells.get(i).unwrap_or(&Cell::Empty);
    Ok(SalesRecord {
        invoice_date: invoice_date(at(map.invoice_date)),
        retailer: text(at(map.retailer)),
        region: text(at(map.region)),
        state: text(at(map.state)),
        city: text(at(map.city)),
        units_sold: units_sold(row, at(map.units_sold))?,
        total_sales: total_sales(row, at(map.total_sales))?,
        extra: map.extra.iter().map(|(i, _)| at(*i).render()).collect(),
    })
}

/// True when every cell of a row is empty (trailing spreadsheet rows).
pub fn is_blank(cells: &[Cell]) -> bool {
    cells.iter().all(|c| matches!(c, Cell::Empty))
}
