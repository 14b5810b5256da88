use anyhow::{Context, Result};
use arrow::{
    array::{Array, ArrayRef, StringArray},
    compute::cast,
    datatypes::{DataType, Field, Schema},
    record_batch::RecordBatch,
};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::process::{
    date_parser::parse_date,
    schema::{DATE, EMPLOYEE_ID},
    utils::{batch_with_rows, first_column_named, null_text_column, string_column},
};

/// When several columns start with `base`, fold them into one column called
/// `base`: per row, the first non-missing value left to right. The folded
/// column takes the first candidate's position. Returns the names folded
/// away (every candidate not already called `base`).
pub fn merge_split_columns(batch: &RecordBatch, base: &str) -> Result<(RecordBatch, Vec<String>)> {
    let schema = batch.schema();
    let candidates: Vec<usize> = schema
        .fields()
        .iter()
        .enumerate()
        .filter(|(_, f)| f.name().starts_with(base))
        .map(|(i, _)| i)
        .collect();
    if candidates.len() <= 1 {
        return Ok((batch.clone(), Vec::new()));
    }

    let arrays: Vec<&StringArray> = candidates
        .iter()
        .map(|&i| string_column(batch, i))
        .collect::<Result<_>>()?;
    let folded: StringArray = (0..batch.num_rows())
        .map(|row| {
            let value = arrays
                .iter()
                .find(|arr| !arr.is_null(row))
                .map(|arr| arr.value(row))?;
            // split date columns skipped normalization under their own name
            Some(if base == DATE {
                parse_date(value).to_string()
            } else {
                value.to_string()
            })
        })
        .collect();

    let first = candidates[0];
    let mut fields = Vec::with_capacity(batch.num_columns() - candidates.len() + 1);
    let mut columns: Vec<ArrayRef> = Vec::with_capacity(fields.capacity());
    let mut folded_names = Vec::new();
    for (i, field) in schema.fields().iter().enumerate() {
        if candidates.contains(&i) && field.name() != base {
            folded_names.push(field.name().clone());
        }
        if i == first {
            fields.push(Field::new(base, DataType::Utf8, true));
            columns.push(Arc::new(folded.clone()) as ArrayRef);
        } else if !candidates.contains(&i) {
            fields.push(field.as_ref().clone());
            columns.push(batch.column(i).clone());
        }
    }
    debug!(base, folded = ?folded_names, "reconciled split identity columns");

    let out = batch_with_rows(Arc::new(Schema::new(fields)), columns, batch.num_rows())?;
    Ok((out, folded_names))
}

/// Make `employee_id` and `date` plain text columns. A column that cannot be
/// found is added empty and the result is flagged degraded.
pub fn finalize_identity_columns(batch: &RecordBatch) -> Result<(RecordBatch, bool)> {
    let mut fields: Vec<Field> = batch
        .schema()
        .fields()
        .iter()
        .map(|f| f.as_ref().clone())
        .collect();
    let mut columns: Vec<ArrayRef> = batch.columns().to_vec();
    let mut degraded = false;

    for base in [EMPLOYEE_ID, DATE] {
        match first_column_named(batch, base) {
            Some(idx) if columns[idx].data_type() != &DataType::Utf8 => {
                columns[idx] = cast(columns[idx].as_ref(), &DataType::Utf8)
                    .with_context(|| format!("casting `{base}` to text"))?;
                fields[idx] = Field::new(base, DataType::Utf8, true);
            }
            Some(_) => {}
            None => {
                warn!(column = base, "no source provided this identity column");
                fields.push(Field::new(base, DataType::Utf8, true));
                columns.push(null_text_column(batch.num_rows()));
                degraded = true;
            }
        }
    }

    let out = batch_with_rows(Arc::new(Schema::new(fields)), columns, batch.num_rows())?;
    Ok((out, degraded))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::schema::utf8_schema;

    #[test]
    fn split_columns_fold_left_to_right() -> Result<()> {
        let batch = RecordBatch::try_new(
            Arc::new(utf8_schema(["shift", "date_x", "date", "note"])),
            vec![
                Arc::new(StringArray::from(vec![Some("day"), Some("night")])) as ArrayRef,
                Arc::new(StringArray::from(vec![None, Some("2025-07-02")])) as ArrayRef,
                Arc::new(StringArray::from(vec![Some("2025-07-01"), Some("2025-07-09")])) as ArrayRef,
                Arc::new(StringArray::from(vec![Some("a"), Some("b")])) as ArrayRef,
            ],
        )?;

        let (out, folded) = merge_split_columns(&batch, DATE)?;
        assert_eq!(folded, vec!["date_x"]);
        let names: Vec<_> = out.schema().fields().iter().map(|f| f.name().clone()).collect();
        assert_eq!(names, vec!["shift", "date", "note"]);
        let date = string_column(&out, 1)?;
        assert_eq!(date.value(0), "2025-07-01");
        assert_eq!(date.value(1), "2025-07-02");
        Ok(())
    }

    #[test]
    fn folded_date_values_are_parsed() -> Result<()> {
        let batch = RecordBatch::try_new(
            Arc::new(utf8_schema(["date", "date_worked"])),
            vec![
                Arc::new(StringArray::from(vec![None, None, Some("2025-07-03")])) as ArrayRef,
                Arc::new(StringArray::from(vec![Some("01/07/2025"), Some("soon"), None])) as ArrayRef,
            ],
        )?;

        let (out, _) = merge_split_columns(&batch, DATE)?;
        let date = string_column(&out, 0)?;
        assert_eq!(date.value(0), "2025-07-01");
        assert_eq!(date.value(1), "soon");
        assert_eq!(date.value(2), "2025-07-03");
        Ok(())
    }

    #[test]
    fn missing_identity_columns_are_added_and_flagged() -> Result<()> {
        let batch = RecordBatch::try_new(
            Arc::new(utf8_schema(["shift"])),
            vec![Arc::new(StringArray::from(vec![Some("day")])) as ArrayRef],
        )?;
        let (out, degraded) = finalize_identity_columns(&batch)?;
        assert!(degraded);
        assert_eq!(out.num_columns(), 3);
        assert!(string_column(&out, 1)?.is_null(0));
        Ok(())
    }
}
