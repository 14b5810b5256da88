use anyhow::{anyhow, Result};
use arrow::{
    array::{new_null_array, ArrayRef, StringArray},
    datatypes::{DataType, SchemaRef},
    record_batch::{RecordBatch, RecordBatchOptions},
};

/// Borrow column `idx` as text. Every normalized column is Utf8.
pub fn string_column(batch: &RecordBatch, idx: usize) -> Result<&StringArray> {
    batch
        .column(idx)
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| {
            anyhow!(
                "column `{}` is {:?}, expected Utf8",
                batch.schema().field(idx).name(),
                batch.column(idx).data_type()
            )
        })
}

/// Index of the first column called `name`.
pub fn first_column_named(batch: &RecordBatch, name: &str) -> Option<usize> {
    batch
        .schema()
        .fields()
        .iter()
        .position(|f| f.name() == name)
}

pub fn null_text_column(len: usize) -> ArrayRef {
    new_null_array(&DataType::Utf8, len)
}

/// Build a batch that stays valid with zero columns.
pub fn batch_with_rows(schema: SchemaRef, columns: Vec<ArrayRef>, rows: usize) -> Result<RecordBatch> {
    let options = RecordBatchOptions::new().with_row_count(Some(rows));
    RecordBatch::try_new_with_options(schema, columns, &options).map_err(Into::into)
}

/// A cell that carries a usable value: present and not blank.
pub fn has_value(cell: Option<&str>) -> bool {
    cell.map_or(false, |v| !v.is_empty())
}
