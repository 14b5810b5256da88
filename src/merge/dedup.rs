use anyhow::{Context, Result};
use arrow::{
    array::{ArrayRef, UInt32Array},
    compute::take,
    record_batch::RecordBatch,
};
use std::{
    collections::{hash_map::DefaultHasher, HashSet},
    hash::{Hash, Hasher},
    sync::Arc,
};

use super::ReconTable;
use crate::process::{
    schema::{utf8_schema, DATE, EMPLOYEE_ID},
    utils::{batch_with_rows, string_column},
};

/// Keep the first row of every identity. Returns the table and how many
/// rows were dropped.
pub fn dedup_rows(table: ReconTable) -> Result<(ReconTable, usize)> {
    let keep: Vec<u32> = {
        let mut seen: HashSet<&str> = HashSet::with_capacity(table.ids.len());
        let mut keep = Vec::with_capacity(table.ids.len());
        for (row, id) in table.ids.iter().enumerate() {
            if seen.insert(id.as_str()) {
                keep.push(u32::try_from(row).context("row index exceeds u32")?);
            }
        }
        keep
    };
    let dropped = table.ids.len() - keep.len();
    if dropped == 0 {
        return Ok((table, 0));
    }

    let indices = UInt32Array::from(keep);
    let columns: Vec<ArrayRef> = table
        .batch
        .columns()
        .iter()
        .map(|col| take(col.as_ref(), &indices, None))
        .collect::<Result<_, _>>()?;
    let batch = batch_with_rows(table.batch.schema(), columns, indices.len())?;
    let ids = indices
        .values()
        .iter()
        .map(|&i| table.ids[i as usize].clone())
        .collect();

    Ok((ReconTable { ids, batch }, dropped))
}

fn fingerprint(batch: &RecordBatch, idx: usize) -> Result<u64> {
    let mut hasher = DefaultHasher::new();
    for cell in string_column(batch, idx)?.iter() {
        cell.hash(&mut hasher);
    }
    Ok(hasher.finish())
}

fn same_content(batch: &RecordBatch, a: usize, b: usize) -> Result<bool> {
    Ok(string_column(batch, a)?
        .iter()
        .eq(string_column(batch, b)?.iter()))
}

fn is_identity_bearing(name: &str) -> bool {
    name == EMPLOYEE_ID || name == DATE
}

/// Drop every column whose cells equal an earlier column's cell for cell.
/// `employee_id` and `date` are never the one dropped. Columns are bucketed
/// by hash so only likely twins are compared in full.
pub fn collapse_identical_columns(batch: &RecordBatch) -> Result<(RecordBatch, Vec<String>)> {
    let schema = batch.schema();
    let names: Vec<&str> = schema.fields().iter().map(|f| f.name().as_str()).collect();
    let hashes: Vec<u64> = (0..names.len())
        .map(|i| fingerprint(batch, i))
        .collect::<Result<_>>()?;

    let mut kept: Vec<usize> = Vec::with_capacity(names.len());
    let mut dropped: Vec<usize> = Vec::new();
    for j in 0..names.len() {
        let mut twin = None;
        for (pos, &k) in kept.iter().enumerate() {
            if hashes[k] == hashes[j] && same_content(batch, k, j)? {
                twin = Some(pos);
                break;
            }
        }
        match twin {
            None => kept.push(j),
            Some(pos) => {
                let k = kept[pos];
                match (is_identity_bearing(names[k]), is_identity_bearing(names[j])) {
                    (false, true) => {
                        kept[pos] = j;
                        dropped.push(k);
                    }
                    (true, true) => kept.push(j),
                    _ => dropped.push(j),
                }
            }
        }
    }

    if dropped.is_empty() {
        return Ok((batch.clone(), Vec::new()));
    }
    kept.sort_unstable();
    dropped.sort_unstable();

    let out_schema = Arc::new(utf8_schema(kept.iter().map(|&i| names[i])));
    let columns = kept.iter().map(|&i| batch.column(i).clone()).collect();
    let out = batch_with_rows(out_schema, columns, batch.num_rows())?;
    let dropped_names = dropped.iter().map(|&i| names[i].to_string()).collect();
    Ok((out, dropped_names))
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::StringArray;

    fn table(cols: &[(&str, Vec<Option<&str>>)]) -> RecordBatch {
        let schema = Arc::new(utf8_schema(cols.iter().map(|(n, _)| *n)));
        let arrays = cols
            .iter()
            .map(|(_, v)| Arc::new(StringArray::from(v.clone())) as ArrayRef)
            .collect();
        RecordBatch::try_new(schema, arrays).unwrap()
    }

    #[test]
    fn first_row_per_identity_survives() -> Result<()> {
        let batch = table(&[("shift", vec![Some("day"), Some("night"), Some("late")])]);
        let ids = vec!["A_1".to_string(), "B_1".to_string(), "A_1".to_string()];
        let (out, dropped) = dedup_rows(ReconTable { ids, batch })?;
        assert_eq!(dropped, 1);
        assert_eq!(out.ids, vec!["A_1", "B_1"]);
        let shift = string_column(&out.batch, 0)?;
        assert_eq!(shift.value(0), "day");
        assert_eq!(shift.value(1), "night");
        Ok(())
    }

    #[test]
    fn later_twin_column_is_dropped() -> Result<()> {
        let batch = table(&[
            ("total_ot", vec![Some("1"), None]),
            ("overtime", vec![Some("1"), None]),
            ("note", vec![Some("1"), Some("x")]),
        ]);
        let (out, dropped) = collapse_identical_columns(&batch)?;
        assert_eq!(dropped, vec!["overtime"]);
        let names: Vec<_> = out.schema().fields().iter().map(|f| f.name().clone()).collect();
        assert_eq!(names, vec!["total_ot", "note"]);
        Ok(())
    }

    #[test]
    fn identity_columns_win_over_earlier_twins() -> Result<()> {
        let batch = table(&[
            ("staff_no", vec![Some("A1"), Some("A2")]),
            ("employee_id", vec![Some("A1"), Some("A2")]),
        ]);
        let (out, dropped) = collapse_identical_columns(&batch)?;
        assert_eq!(dropped, vec!["staff_no"]);
        assert_eq!(out.schema().field(0).name(), "employee_id");
        Ok(())
    }
}
