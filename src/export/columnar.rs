use arrow::{
    array::{ArrayRef, Decimal128Array, StringArray, UInt64Array},
    datatypes::{DataType, Field, Schema},
    record_batch::RecordBatch,
};
use parquet::{arrow::ArrowWriter, basic::Compression, file::properties::WriterProperties};
use std::sync::Arc;

use super::{ColumnData, Exportable, ExportTable};
use crate::error::Result;
use crate::schema::amount::AMOUNT_SCALE;

/// Amounts are written as exact decimals.
const AMOUNT_PRECISION: u8 = 20;

fn arrow_type(data: &ColumnData) -> DataType {
    match data {
        ColumnData::Text(_) => DataType::Utf8,
        ColumnData::Amount(_) => DataType::Decimal128(AMOUNT_PRECISION, AMOUNT_SCALE as i8),
        ColumnData::Count(_) => DataType::UInt64,
    }
}

fn to_array(data: &ColumnData) -> Result<ArrayRef> {
    let array: ArrayRef = match data {
        ColumnData::Text(v) => Arc::new(StringArray::from(v.clone())),
        ColumnData::Amount(v) => Arc::new(
            Decimal128Array::from(v.iter().map(|a| a.raw() as i128).collect::<Vec<_>>())
                .with_precision_and_scale(AMOUNT_PRECISION, AMOUNT_SCALE as i8)?,
        ),
        ColumnData::Count(v) => Arc::new(UInt64Array::from(v.clone())),
    };
    Ok(array)
}

/// Build the Arrow batch for an export table.
pub fn to_record_batch(table: &ExportTable) -> Result<RecordBatch> {
    let fields: Vec<Field> = table
        .columns
        .iter()
        .map(|c| {
            let nullable = matches!(c.data, ColumnData::Text(_));
            Field::new(&c.name, arrow_type(&c.data), nullable)
        })
        .collect();
    let arrays = table
        .columns
        .iter()
        .map(|c| to_array(&c.data))
        .collect::<Result<Vec<_>>>()?;
    Ok(RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays)?)
}

/// Encode as a single-row-group Parquet file (Snappy).
pub fn to_parquet<T: Exportable + ?Sized>(rows: &T) -> Result<Vec<u8>> {
    let batch = to_record_batch(&rows.export_table())?;
    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();

    let mut buf = Vec::new();
    let mut writer = ArrowWriter::try_new(&mut buf, batch.schema(), Some(props))?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{aggregate, AggregateOptions, KeySpec};
    use crate::schema::{Amount, SalesRecord, SalesTable};
    use anyhow::Result;
    use arrow::array::Array;
    use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn table() -> SalesTable {
        let rec = |state: &str, units, sales: &str| SalesRecord {
            invoice_date: None,
            retailer: Some("A".into()),
            region: Some("West".into()),
            state: Some(state.into()),
            city: Some("X".into()),
            units_sold: units,
            total_sales: sales.parse::<Amount>().unwrap(),
            extra: Vec::new(),
        };
        SalesTable::new(
            Vec::new(),
            vec![rec("Utah", 2, "10.5"), rec("Idaho", 1, "3"), rec("Utah", 4, "0.25")],
        )
    }

    #[test]
    fn parquet_keeps_exact_amounts() -> Result<()> {
        let agg = aggregate(&table(), KeySpec::State, &AggregateOptions::default())?;
        let bytes = to_parquet(&agg)?;

        let mut tmp = NamedTempFile::new()?;
        tmp.write_all(&bytes)?;
        tmp.flush()?;

        let reader = ParquetRecordBatchReaderBuilder::try_new(tmp.reopen()?)?.build()?;
        let batches = reader.collect::<std::result::Result<Vec<_>, _>>()?;
        assert_eq!(batches.len(), 1);
        let batch = &batches[0];
        assert_eq!(batch.num_rows(), 2);

        let states = batch
            .column(0)
            .as_any()
            .downcast_ref::<StringArray>()
            .expect("State must be Utf8");
        assert_eq!(states.value(0), "Idaho");
        assert_eq!(states.value(1), "Utah");

        let sales = batch
            .column(1)
            .as_any()
            .downcast_ref::<Decimal128Array>()
            .expect("TotalSales must be Decimal128");
        assert_eq!(sales.value_as_string(1), "10.7500");
        assert!(!sales.is_null(0));

        let units = batch
            .column(2)
            .as_any()
            .downcast_ref::<UInt64Array>()
            .expect("UnitsSold must be UInt64");
        assert_eq!(units.value(1), 6);
        Ok(())
    }

    #[test]
    fn record_batch_schema_follows_export_columns() -> Result<()> {
        let batch = to_record_batch(&table().export_table())?;
        let names: Vec<String> = batch
            .schema()
            .fields()
            .iter()
            .map(|f| f.name().clone())
            .collect();
        assert_eq!(names[0], "InvoiceDate");
        assert_eq!(names.len(), 7);
        assert_eq!(batch.column(0).null_count(), 3);
        Ok(())
    }
}
