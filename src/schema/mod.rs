pub mod amount;
pub mod columns;
pub mod types;

pub use amount::{Amount, ParseAmountError};
pub use columns::{ColumnMap, REQUIRED_COLUMNS};
pub use types::{InvoiceDate, SalesRecord, SalesTable};
