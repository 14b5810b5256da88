use crate::process::{date_parser, schema::DATE, utils::string_column};
use anyhow::Result;
use arrow::{
    array::{ArrayRef, StringArray},
    record_batch::RecordBatch,
};
use std::sync::Arc;
use tracing::debug;

/// Rewrite every `date` column into its parsed form. Returns the new batch
/// and how many non-missing cells stayed unparsed.
pub fn convert_date_columns(batch: &RecordBatch) -> Result<(RecordBatch, usize)> {
    let schema = batch.schema();
    let mut unparsed = 0;
    let mut out = Vec::with_capacity(batch.num_columns());

    for (i, field) in schema.fields().iter().enumerate() {
        if field.name() != DATE {
            out.push(batch.column(i).clone());
            continue;
        }
        let sarr = string_column(batch, i)?;
        let converted: StringArray = sarr
            .iter()
            .map(|opt| {
                opt.map(|raw| {
                    let value = date_parser::parse_date(raw);
                    if !value.is_parsed() {
                        debug!(value = raw, "date left unparsed");
                        unparsed += 1;
                    }
                    value.to_string()
                })
            })
            .collect();
        out.push(Arc::new(converted) as ArrayRef);
    }

    Ok((RecordBatch::try_new(schema, out)?, unparsed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::schema::utf8_schema;
    use arrow::array::Array;

    #[test]
    fn only_date_columns_are_rewritten() -> Result<()> {
        let schema = Arc::new(utf8_schema(["date", "note"]));
        let batch = RecordBatch::try_new(
            schema,
            vec![
                Arc::new(StringArray::from(vec![
                    Some("01/07/2025"),
                    Some("garbage"),
                    None,
                ])) as ArrayRef,
                Arc::new(StringArray::from(vec![Some("01/07/2025"), None, None])) as ArrayRef,
            ],
        )?;

        let (out, unparsed) = convert_date_columns(&batch)?;
        let dates = string_column(&out, 0)?;
        assert_eq!(dates.value(0), "2025-07-01");
        assert_eq!(dates.value(1), "garbage");
        assert!(dates.is_null(2));
        assert_eq!(string_column(&out, 1)?.value(0), "01/07/2025");
        assert_eq!(unparsed, 1);
        Ok(())
    }
}
