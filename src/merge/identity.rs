use anyhow::Result;
use arrow::{array::Array, record_batch::RecordBatch};

use crate::process::{
    schema::{DATE, EMPLOYEE_ID},
    utils::{first_column_named, has_value, string_column},
    NormalizedTable,
};

pub const IDENTITY_COLUMN: &str = "employee_date_id";

/// `<employee_id>_<date>` when both halves carry a value.
pub fn derive_identity(employee_id: Option<&str>, date: Option<&str>) -> Option<String> {
    match (employee_id, date) {
        (Some(e), Some(d)) if has_value(Some(e)) && has_value(Some(d)) => Some(format!("{e}_{d}")),
        _ => None,
    }
}

/// Synthetic identity unique to one file and row position.
pub fn fallback_identity(file_seq: usize, row: usize) -> String {
    format!("unidentified_{file_seq}_{row}")
}

fn cell(batch: &RecordBatch, col: Option<usize>, row: usize) -> Result<Option<&str>> {
    let Some(idx) = col else {
        return Ok(None);
    };
    let arr = string_column(batch, idx)?;
    Ok((!arr.is_null(row)).then(|| arr.value(row)))
}

/// One identity per row of a freshly normalized table.
pub fn assign_identities(table: &NormalizedTable) -> Result<Vec<String>> {
    let batch = &table.batch;
    let emp = first_column_named(batch, EMPLOYEE_ID);
    let date = first_column_named(batch, DATE);

    (0..batch.num_rows())
        .map(|row| {
            let id = derive_identity(cell(batch, emp, row)?, cell(batch, date, row)?)
                .unwrap_or_else(|| fallback_identity(table.file_seq, row));
            Ok(id)
        })
        .collect()
}

/// Recompute identities from finalized columns. Rows still missing either
/// half keep the identity they already had.
pub fn rederive(batch: &RecordBatch, ids: &[String]) -> Result<Vec<String>> {
    let emp = first_column_named(batch, EMPLOYEE_ID);
    let date = first_column_named(batch, DATE);

    ids.iter()
        .enumerate()
        .map(|(row, old)| {
            let id = derive_identity(cell(batch, emp, row)?, cell(batch, date, row)?)
                .unwrap_or_else(|| old.clone());
            Ok(id)
        })
        .collect()
}

/// Rows whose identity is still synthetic.
pub fn count_fallbacks(batch: &RecordBatch) -> Result<usize> {
    let emp = first_column_named(batch, EMPLOYEE_ID);
    let date = first_column_named(batch, DATE);
    let mut n = 0;
    for row in 0..batch.num_rows() {
        if derive_identity(cell(batch, emp, row)?, cell(batch, date, row)?).is_none() {
            n += 1;
        }
    }
    Ok(n)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_needs_both_halves() {
        assert_eq!(
            derive_identity(Some("A100"), Some("2025-07-01")).as_deref(),
            Some("A100_2025-07-01")
        );
        assert_eq!(derive_identity(Some("A100"), None), None);
        assert_eq!(derive_identity(Some(""), Some("2025-07-01")), None);
        assert_eq!(fallback_identity(2, 7), "unidentified_2_7");
    }
}
