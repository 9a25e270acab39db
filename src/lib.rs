pub mod aggregate;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod export;
pub mod format;
pub mod load;
pub mod schema;

pub use aggregate::{aggregate, AggregateOptions, AggregatedRow, Aggregation, KeySpec, KeyValue};
pub use dashboard::{run_pipeline, Dashboard, ViewKind};
pub use error::PipelineError;
pub use export::{to_delimited_text, to_parquet, Exportable};
pub use format::format_scaled;
pub use load::{load_sales_table, LoadOptions};
pub use schema::{Amount, SalesRecord, SalesTable};
