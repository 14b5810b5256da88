use crate::process::utils::string_column;
use anyhow::Result;
use arrow::{
    array::{ArrayRef, StringArray},
    record_batch::RecordBatch,
};
use std::sync::Arc;

/// Strip surrounding whitespace from every text cell. Missing cells stay
/// missing; a cell of only spaces becomes an empty string.
pub fn apply_trimming(batch: &RecordBatch) -> Result<RecordBatch> {
    let mut cols = Vec::with_capacity(batch.num_columns());
    for i in 0..batch.num_columns() {
        let sarr = string_column(batch, i)?;
        if !sarr.iter().flatten().any(|v| v.trim() != v) {
            cols.push(batch.column(i).clone());
            continue;
        }
        let trimmed: StringArray = sarr.iter().map(|opt| opt.map(str::trim)).collect();
        cols.push(Arc::new(trimmed) as ArrayRef);
    }

    RecordBatch::try_new(batch.schema(), cols).map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::schema::utf8_schema;
    use arrow::array::Array;

    #[test]
    fn trims_text_and_keeps_nulls() -> Result<()> {
        let batch = RecordBatch::try_new(
            Arc::new(utf8_schema(["employee_id", "department"])),
            vec![
                Arc::new(StringArray::from(vec![Some("  A100 "), None])) as ArrayRef,
                Arc::new(StringArray::from(vec![Some("Sales"), Some("   ")])) as ArrayRef,
            ],
        )?;

        let out = apply_trimming(&batch)?;
        let ids = string_column(&out, 0)?;
        assert_eq!(ids.value(0), "A100");
        assert!(ids.is_null(1));
        let dept = string_column(&out, 1)?;
        assert_eq!(dept.value(0), "Sales");
        assert_eq!(dept.value(1), "");
        Ok(())
    }
}
