// src/dashboard.rs

use chrono::NaiveDate;
use serde::Serialize;
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::{error, info, instrument, warn};

use crate::aggregate::{aggregate, AggregateOptions, Aggregation, KeySpec};
use crate::config::ExportFormat;
use crate::error::{PipelineError, Result};
use crate::export::{to_delimited_text, to_parquet, Exportable, ExportTable};
use crate::format::format_scaled;
use crate::load::{load_sales_table, LoadOptions};
use crate::schema::{Amount, SalesTable};

pub const SUMMARY_FILE: &str = "summary.json";

/// The views offered on the dashboard, each with its own download.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewKind {
    Retailer,
    Monthly,
    State,
    RegionCity,
    Raw,
}

impl ViewKind {
    pub const ALL: [ViewKind; 5] = [
        ViewKind::Retailer,
        ViewKind::Monthly,
        ViewKind::State,
        ViewKind::RegionCity,
        ViewKind::Raw,
    ];

    pub fn key_spec(self) -> Option<KeySpec> {
        match self {
            ViewKind::Retailer => Some(KeySpec::Retailer),
            ViewKind::Monthly => Some(KeySpec::MonthYear),
            ViewKind::State => Some(KeySpec::State),
            ViewKind::RegionCity => Some(KeySpec::RegionCity),
            ViewKind::Raw => None,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            ViewKind::Retailer => "Total Sales by Retailer",
            ViewKind::Monthly => "Total Sales Over Time",
            ViewKind::State => "Total Sales and Units Sold by State",
            ViewKind::RegionCity => "Total Sales by Region and City",
            ViewKind::Raw => "Sales Raw Data",
        }
    }

    /// Download name without extension.
    pub fn file_stem(self) -> &'static str {
        match self {
            ViewKind::Retailer => "RetailerSales",
            ViewKind::Monthly => "Monthly Sales",
            ViewKind::State => "Sales_by_UnitsSold",
            ViewKind::RegionCity => "Sales_by_Region",
            ViewKind::Raw => "SalesRawData",
        }
    }

    pub fn file_name(self, format: ExportFormat) -> String {
        format!("{}.{}", self.file_stem(), format.extension())
    }
}

/// What a successful view hands to the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewContent {
    /// The download table.
    pub export: ExportTable,
    /// Grouped rows; `None` for the raw view.
    pub aggregation: Option<Aggregation>,
    /// `format_scaled` label per aggregated row (region/city view only).
    pub formatted: Vec<String>,
    pub warnings: Vec<String>,
}

impl ViewContent {
    pub fn is_empty(&self) -> bool {
        self.export.num_rows() == 0
    }
}

#[derive(Debug)]
pub struct View {
    pub kind: ViewKind,
    pub outcome: std::result::Result<ViewContent, PipelineError>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewStatus {
    Ready,
    Empty,
    Failed,
}

impl View {
    pub fn status(&self) -> ViewStatus {
        match &self.outcome {
            Ok(c) if c.is_empty() => ViewStatus::Empty,
            Ok(_) => ViewStatus::Ready,
            Err(_) => ViewStatus::Failed,
        }
    }
}

fn build_view(kind: ViewKind, table: &SalesTable, opts: &AggregateOptions) -> Result<ViewContent> {
    let mut warnings = Vec::new();
    let content = match kind.key_spec() {
        None => ViewContent {
            export: table.export_table(),
            aggregation: None,
            formatted: Vec::new(),
            warnings: Vec::new(),
        },
        Some(spec) => {
            let agg = aggregate(table, spec, opts)?;
            if agg.dropped_rows > 0 {
                warnings.push(format!(
                    "{} row(s) with missing {} left out ({} in sales)",
                    agg.dropped_rows, spec, agg.dropped_sales
                ));
            }
            let formatted = if kind == ViewKind::RegionCity {
                agg.rows
                    .iter()
                    .map(|r| format_scaled(r.total_sales))
                    .collect::<Result<Vec<_>>>()?
            } else {
                Vec::new()
            };
            ViewContent {
                export: agg.export_table(),
                aggregation: Some(agg),
                formatted,
                warnings,
            }
        }
    };
    Ok(content)
}

/// Every view computed from one table. Rebuild it whenever the table or the
/// options change; nothing is cached.
#[derive(Debug)]
pub struct Dashboard {
    pub rows: usize,
    /// `None` when the table total does not fit.
    pub total_sales: Option<Amount>,
    pub total_units: Option<u64>,
    pub last_updated: Option<NaiveDate>,
    pub views: Vec<View>,
}

impl Dashboard {
    /// Compute all views. A failing view is recorded as such and does not
    /// stop the others.
    pub fn build(table: &SalesTable, opts: &AggregateOptions) -> Self {
        let views = ViewKind::ALL
            .iter()
            .map(|&kind| {
                let mut outcome = build_view(kind, table, opts);
                match &mut outcome {
                    Ok(content) if content.is_empty() => {
                        warn!(view = kind.title(), "insufficient data");
                        content
                            .warnings
                            .push(format!("Insufficient data to display {}.", kind.title()));
                    }
                    Ok(content) => {
                        info!(view = kind.title(), rows = content.export.num_rows(), "view ready")
                    }
                    Err(e) => error!(view = kind.title(), error = %e, "view failed"),
                }
                View { kind, outcome }
            })
            .collect();

        let (total_sales, total_units) = (table.total_sales(), table.total_units());
        if total_sales.is_none() || total_units.is_none() {
            warn!(rows = table.len(), "table totals overflow; headline figures unavailable");
        }

        Self {
            rows: table.len(),
            total_sales,
            total_units,
            last_updated: table.latest_invoice_date(),
            views,
        }
    }

    pub fn view(&self, kind: ViewKind) -> Option<&View> {
        self.views.iter().find(|v| v.kind == kind)
    }

    pub fn summary(&self) -> DashboardSummary {
        DashboardSummary {
            rows: self.rows,
            total_sales: self.total_sales,
            total_units: self.total_units,
            last_updated: self.last_updated,
            views: self
                .views
                .iter()
                .map(|v| {
                    let (rows, total_sales, warnings, error) = match &v.outcome {
                        Ok(c) => (
                            c.export.num_rows(),
                            c.aggregation.as_ref().and_then(Aggregation::total_sales),
                            c.warnings.clone(),
                            None,
                        ),
                        Err(e) => (0, None, Vec::new(), Some(e.to_string())),
                    };
                    ViewSummary {
                        view: v.kind,
                        title: v.kind.title(),
                        file: v.kind.file_name(ExportFormat::Csv),
                        status: v.status(),
                        rows,
                        total_sales,
                        warnings,
                        error,
                    }
                })
                .collect(),
        }
    }

    /// Write each available view's download in every requested format, plus
    /// `summary.json`. Returns the paths written.
    pub fn write_artifacts(&self, dir: &Path, formats: &[ExportFormat]) -> Result<Vec<PathBuf>> {
        fs::create_dir_all(dir)?;
        let mut written = Vec::new();

        for view in &self.views {
            let content = match &view.outcome {
                Ok(c) => c,
                Err(_) => continue,
            };
            for &format in formats {
                let bytes = match format {
                    ExportFormat::Csv => to_delimited_text(&content.export)?,
                    ExportFormat::Parquet => to_parquet(&content.export)?,
                };
                let path = dir.join(view.kind.file_name(format));
                fs::write(&path, &bytes)?;
                info!(path = %path.display(), bytes = bytes.len(), "wrote download");
                written.push(path);
            }
        }

        let summary_path = dir.join(SUMMARY_FILE);
        let json = serde_json::to_vec_pretty(&self.summary())?;
        fs::write(&summary_path, json)?;
        written.push(summary_path);
        Ok(written)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewSummary {
    pub view: ViewKind,
    pub title: &'static str,
    pub file: String,
    pub status: ViewStatus,
    pub rows: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_sales: Option<Amount>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardSummary {
    pub rows: usize,
    pub total_sales: Option<Amount>,
    pub total_units: Option<u64>,
    pub last_updated: Option<NaiveDate>,
    pub views: Vec<ViewSummary>,
}

/// Load `source` and build every view.
#[instrument(level = "info", skip(source, load, opts), fields(source = %source.as_ref().display()))]
pub fn run_pipeline<P: AsRef<Path>>(
    source: P,
    load: &LoadOptions,
    opts: &AggregateOptions,
) -> Result<Dashboard> {
    let table = load_sales_table(source, load)?;
    Ok(Dashboard::build(&table, opts))
}
