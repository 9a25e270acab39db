// src/aggregate.rs

use chrono::{Datelike, NaiveDate};
use std::{collections::BTreeMap, fmt};
use tracing::{debug, warn};

use crate::error::{PipelineError, Result};
use crate::schema::{
    columns::{CITY, MONTH_YEAR, REGION, RETAILER, STATE, TOTAL_SALES, UNITS_SOLD},
    Amount, InvoiceDate, SalesRecord, SalesTable,
};

/// Grouping key(s) of a derived view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeySpec {
    Retailer,
    MonthYear,
    State,
    RegionCity,
}

impl KeySpec {
    pub const ALL: [KeySpec; 4] = [
        KeySpec::Retailer,
        KeySpec::MonthYear,
        KeySpec::State,
        KeySpec::RegionCity,
    ];

    pub fn key_columns(self) -> &'static [&'static str] {
        match self {
            KeySpec::Retailer => &[RETAILER],
            KeySpec::MonthYear => &[MONTH_YEAR],
            KeySpec::State => &[STATE],
            KeySpec::RegionCity => &[REGION, CITY],
        }
    }

    /// Only the by-state view reports units next to sales.
    pub fn includes_units(self) -> bool {
        matches!(self, KeySpec::State)
    }

    pub fn value_columns(self) -> &'static [&'static str] {
        if self.includes_units() {
            &[TOTAL_SALES, UNITS_SOLD]
        } else {
            &[TOTAL_SALES]
        }
    }

    /// Column names of the derived table, keys first.
    pub fn columns(self) -> Vec<&'static str> {
        let mut cols = self.key_columns().to_vec();
        cols.extend_from_slice(self.value_columns());
        cols
    }
}

impl fmt::Display for KeySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key_columns().join("/"))
    }
}

/// One grouping-key component.
///
/// Variant order is the sort order: calendar months (chronological), then
/// observed text (byte-wise), then the configured unknown bucket.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum KeyValue {
    Month { year: i32, month: u32 },
    Text(String),
    Unknown(String),
}

impl KeyValue {
    pub fn month_of(date: NaiveDate) -> Self {
        KeyValue::Month {
            year: date.year(),
            month: date.month(),
        }
    }
}

impl fmt::Display for KeyValue {
    /// Months render as abbreviated month + apostrophe + 2-digit year: `Jan'23`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyValue::Month { year, month } => match NaiveDate::from_ymd_opt(*year, *month, 1) {
                Some(d) => write!(f, "{}", d.format("%b'%y")),
                None => write!(f, "{:04}-{:02}", year, month),
            },
            KeyValue::Text(s) | KeyValue::Unknown(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregatedRow {
    pub keys: Vec<KeyValue>,
    pub total_sales: Amount,
    /// Summed for every view; only exported where `KeySpec::includes_units`.
    pub units_sold: u64,
}

impl AggregatedRow {
    pub fn labels(&self) -> Vec<String> {
        self.keys.iter().map(ToString::to_string).collect()
    }
}

/// Result of grouping a table by one key spec.
///
/// Rows whose key is missing are not grouped (unless an unknown bucket is
/// configured); they are counted in `dropped_rows`/`dropped_sales`, so
/// `total_sales() + dropped_sales` always equals the table total.
/// `aggregate` refuses any group or drop sum that would overflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Aggregation {
    pub spec: KeySpec,
    pub rows: Vec<AggregatedRow>,
    pub dropped_rows: usize,
    pub dropped_sales: Amount,
}

impl Aggregation {
    /// `None` when the grand total does not fit.
    pub fn total_sales(&self) -> Option<Amount> {
        Amount::checked_sum(self.rows.iter().map(|r| r.total_sales))
    }

    pub fn total_units(&self) -> Option<u64> {
        self.rows
            .iter()
            .try_fold(0u64, |acc, r| acc.checked_add(r.units_sold))
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregateOptions {
    /// Group missing keys under this label instead of dropping the row.
    pub unknown_bucket: Option<String>,
}

fn text_key(value: &Option<String>, opts: &AggregateOptions) -> Option<KeyValue> {
    match value {
        Some(v) => Some(KeyValue::Text(v.clone())),
        None => opts.unknown_bucket.clone().map(KeyValue::Unknown),
    }
}

/// Key tuple for one record; `Ok(None)` when a key component is missing.
fn keys_for(
    spec: KeySpec,
    row: usize,
    rec: &SalesRecord,
    opts: &AggregateOptions,
) -> Result<Option<Vec<KeyValue>>> {
    let keys = match spec {
        KeySpec::Retailer => text_key(&rec.retailer, opts).map(|k| vec![k]),
        KeySpec::State => text_key(&rec.state, opts).map(|k| vec![k]),
        KeySpec::RegionCity => text_key(&rec.region, opts)
            .zip(text_key(&rec.city, opts))
            .map(|(region, city)| vec![region, city]),
        KeySpec::MonthYear => match &rec.invoice_date {
            Some(InvoiceDate::Parsed(d)) => Some(vec![KeyValue::month_of(*d)]),
            Some(InvoiceDate::Unparsed(raw)) => {
                return Err(PipelineError::InvalidDate {
                    row,
                    value: raw.clone(),
                })
            }
            None => opts.unknown_bucket.clone().map(|u| vec![KeyValue::Unknown(u)]),
        },
    };
    Ok(keys)
}

/// Group `table` by `spec`, summing sales (and units).
///
/// Output rows are ascending by key tuple. The table is only read.
/// For `KeySpec::MonthYear` an unparsable invoice date fails the whole call
/// with `InvalidDate` (row numbers are 1-based positions in the table). A
/// group whose sales or units no longer fit fails it with `Overflow`.
pub fn aggregate(
    table: &SalesTable,
    spec: KeySpec,
    opts: &AggregateOptions,
) -> Result<Aggregation> {
    let mut groups: BTreeMap<Vec<KeyValue>, (Amount, u64)> = BTreeMap::new();
    let mut dropped_rows = 0;
    let mut dropped_sales = Amount::ZERO;

    for (idx, rec) in table.records().iter().enumerate() {
        let row = idx + 1;
        let overflow = |column: &str| PipelineError::Overflow {
            row,
            column: column.to_string(),
        };
        match keys_for(spec, row, rec, opts)? {
            Some(keys) => {
                let (sales, units) = groups.entry(keys).or_insert((Amount::ZERO, 0));
                *sales = sales
                    .checked_add(rec.total_sales)
                    .ok_or_else(|| overflow(TOTAL_SALES))?;
                *units = units
                    .checked_add(rec.units_sold)
                    .ok_or_else(|| overflow(UNITS_SOLD))?;
            }
            None => {
                dropped_rows += 1;
                dropped_sales = dropped_sales
                    .checked_add(rec.total_sales)
                    .ok_or_else(|| overflow(TOTAL_SALES))?;
            }
        }
    }

    if dropped_rows > 0 {
        warn!(view = %spec, dropped_rows, dropped_sales = %dropped_sales, "rows with missing keys left out");
    }
    debug!(view = %spec, groups = groups.len(), "aggregated");

    let rows = groups
        .into_iter()
        .map(|(keys, (total_sales, units_sold))| AggregatedRow {
            keys,
            total_sales,
            units_sold,
        })
        .collect();

    Ok(Aggregation {
        spec,
        rows,
        dropped_rows,
        dropped_sales,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(
        date: Option<&str>,
        retailer: Option<&str>,
        region: Option<&str>,
        city: Option<&str>,
        state: Option<&str>,
        units: u64,
        sales: i64,
    ) -> SalesRecord {
        SalesRecord {
            invoice_date: date.map(|d| match NaiveDate::parse_from_str(d, "%Y-%m-%d") {
                Ok(p) => InvoiceDate::Parsed(p),
                Err(_) => InvoiceDate::Unparsed(d.to_string()),
            }),
            retailer: retailer.map(String::from),
            region: region.map(String::from),
            state: state.map(String::from),
            city: city.map(String::from),
            units_sold: units,
            total_sales: Amount::from_units(sales),
            extra: Vec::new(),
        }
    }

    fn sample() -> SalesTable {
        SalesTable::new(
            Vec::new(),
            vec![
                rec(Some("2023-01-15"), Some("A"), Some("West"), Some("Seattle"), Some("Washington"), 10, 100),
                rec(Some("2023-02-03"), Some("A"), Some("West"), Some("Portland"), Some("Oregon"), 4, 200),
                rec(Some("2023-01-20"), Some("B"), Some("South"), Some("Houston"), Some("Texas"), 2, 50),
                rec(Some("2022-12-31"), Some("B"), Some("West"), Some("Seattle"), Some("Washington"), 1, 7),
            ],
        )
    }

    fn totals(agg: &Aggregation) -> Vec<(Vec<String>, Amount)> {
        agg.rows.iter().map(|r| (r.labels(), r.total_sales)).collect()
    }

    #[test]
    fn groups_by_retailer() {
        let table = SalesTable::new(
            Vec::new(),
            vec![
                rec(None, Some("A"), None, None, None, 1, 100),
                rec(None, Some("A"), None, None, None, 1, 200),
                rec(None, Some("B"), None, None, None, 1, 50),
            ],
        );
        let agg = aggregate(&table, KeySpec::Retailer, &AggregateOptions::default()).unwrap();
        assert_eq!(
            totals(&agg),
            vec![
                (vec!["A".to_string()], Amount::from_units(300)),
                (vec!["B".to_string()], Amount::from_units(50)),
            ]
        );
        assert_eq!(agg.dropped_rows, 0);
    }

    #[test]
    fn months_are_labelled_and_chronological() {
        let agg = aggregate(&sample(), KeySpec::MonthYear, &AggregateOptions::default()).unwrap();
        assert_eq!(
            totals(&agg),
            vec![
                (vec!["Dec'22".to_string()], Amount::from_units(7)),
                (vec!["Jan'23".to_string()], Amount::from_units(150)),
                (vec!["Feb'23".to_string()], Amount::from_units(200)),
            ]
        );
    }

    #[test]
    fn state_view_sums_units() {
        let agg = aggregate(&sample(), KeySpec::State, &AggregateOptions::default()).unwrap();
        let rows: Vec<(String, Amount, u64)> = agg
            .rows
            .iter()
            .map(|r| (r.labels().join(""), r.total_sales, r.units_sold))
            .collect();
        assert_eq!(
            rows,
            vec![
                ("Oregon".to_string(), Amount::from_units(200), 4),
                ("Texas".to_string(), Amount::from_units(50), 2),
                ("Washington".to_string(), Amount::from_units(107), 11),
            ]
        );
        assert_eq!(KeySpec::State.columns(), vec!["State", "TotalSales", "UnitsSold"]);
    }

    #[test]
    fn region_city_keeps_one_row_per_observed_pair() {
        let agg = aggregate(&sample(), KeySpec::RegionCity, &AggregateOptions::default()).unwrap();
        assert_eq!(
            totals(&agg),
            vec![
                (vec!["South".to_string(), "Houston".to_string()], Amount::from_units(50)),
                (vec!["West".to_string(), "Portland".to_string()], Amount::from_units(200)),
                (vec!["West".to_string(), "Seattle".to_string()], Amount::from_units(107)),
            ]
        );
    }

    #[test]
    fn totals_are_conserved_and_repeatable() {
        let table = sample();
        for spec in KeySpec::ALL {
            let first = aggregate(&table, spec, &AggregateOptions::default()).unwrap();
            let second = aggregate(&table, spec, &AggregateOptions::default()).unwrap();
            assert_eq!(first, second, "{spec}");
            assert_eq!(first.total_sales(), table.total_sales(), "{spec}");
            assert_eq!(first.total_units(), table.total_units(), "{spec}");
        }
    }

    #[test]
    fn missing_keys_are_dropped_but_accounted_for() {
        let mut records = sample().records().to_vec();
        records.push(rec(None, None, Some("West"), None, None, 3, 30));
        let table = SalesTable::new(Vec::new(), records);

        for spec in KeySpec::ALL {
            let agg = aggregate(&table, spec, &AggregateOptions::default()).unwrap();
            assert_eq!(
                agg.total_sales().and_then(|t| t.checked_add(agg.dropped_sales)),
                table.total_sales()
            );
            assert_eq!(agg.dropped_rows, 1, "{spec}");
            assert_eq!(agg.dropped_sales, Amount::from_units(30), "{spec}");
        }
    }

    #[test]
    fn unknown_bucket_collects_missing_keys_last() {
        let mut records = sample().records().to_vec();
        records.push(rec(None, None, Some("West"), None, None, 3, 30));
        let table = SalesTable::new(Vec::new(), records);
        let opts = AggregateOptions {
            unknown_bucket: Some("(unknown)".into()),
        };

        let by_retailer = aggregate(&table, KeySpec::Retailer, &opts).unwrap();
        assert_eq!(by_retailer.dropped_rows, 0);
        let last = by_retailer.rows.last().unwrap();
        assert_eq!(last.keys, vec![KeyValue::Unknown("(unknown)".into())]);
        assert_eq!(last.total_sales, Amount::from_units(30));
        assert_eq!(by_retailer.total_sales(), table.total_sales());

        let by_month = aggregate(&table, KeySpec::MonthYear, &opts).unwrap();
        assert_eq!(by_month.rows.last().unwrap().labels(), vec!["(unknown)"]);

        let by_region = aggregate(&table, KeySpec::RegionCity, &opts).unwrap();
        assert!(by_region
            .rows
            .iter()
            .any(|r| r.labels() == vec!["West", "(unknown)"]));
    }

    #[test]
    fn unparsable_date_fails_only_the_month_view() {
        let mut records = sample().records().to_vec();
        records.push(rec(Some("31/31/2023"), Some("C"), Some("East"), Some("Boston"), Some("Massachusetts"), 1, 1));
        let table = SalesTable::new(Vec::new(), records);

        match aggregate(&table, KeySpec::MonthYear, &AggregateOptions::default()) {
            Err(PipelineError::InvalidDate { row, value }) => {
                assert_eq!(row, 5);
                assert_eq!(value, "31/31/2023");
            }
            other => panic!("expected InvalidDate, got {:?}", other),
        }
        assert!(aggregate(&table, KeySpec::Retailer, &AggregateOptions::default()).is_ok());
    }

    #[test]
    fn overflowing_group_fails_only_that_grouping() {
        let big = 900_000_000_000_000;
        let table = SalesTable::new(
            Vec::new(),
            vec![
                rec(Some("2023-01-15"), Some("A"), Some("West"), Some("Seattle"), Some("Washington"), 1, big),
                rec(Some("2023-02-15"), Some("A"), Some("West"), Some("Portland"), Some("Oregon"), 1, big),
            ],
        );
        let opts = AggregateOptions::default();

        match aggregate(&table, KeySpec::Retailer, &opts) {
            Err(PipelineError::Overflow { row, column }) => {
                assert_eq!(row, 2);
                assert_eq!(column, TOTAL_SALES);
            }
            other => panic!("expected Overflow, got {:?}", other),
        }

        // each state, month and city holds one row, so those groups fit
        for spec in [KeySpec::State, KeySpec::MonthYear, KeySpec::RegionCity] {
            let agg = aggregate(&table, spec, &opts).unwrap();
            assert_eq!(agg.rows.len(), 2, "{spec}");
            assert_eq!(agg.rows[0].total_sales, Amount::from_units(big), "{spec}");
            assert_eq!(agg.total_sales(), None, "{spec}");
        }
        assert_eq!(table.total_sales(), None);
    }

    #[test]
    fn empty_table_yields_no_rows() {
        let agg = aggregate(&SalesTable::default(), KeySpec::State, &AggregateOptions::default()).unwrap();
        assert!(agg.is_empty());
        assert_eq!(agg.total_sales(), Some(Amount::ZERO));
    }
}
