use anyhow::Result;
use arrow::array::{Array, ArrayRef, StringArray};
use std::{collections::HashMap, sync::Arc};
use tracing::debug;

use super::{identity::IDENTITY_COLUMN, ReconTable};
use crate::process::{
    schema::utf8_schema,
    utils::{batch_with_rows, string_column},
    NormalizedTable,
};

/// Key of a column in the union: its name plus which repeat of that name
/// it is inside its own file.
type ColumnKey = (String, usize);

fn column_keys(table: &NormalizedTable) -> Vec<Option<ColumnKey>> {
    let mut seen: HashMap<&str, usize> = HashMap::new();
    table
        .batch
        .schema_ref()
        .fields()
        .iter()
        .map(|f| {
            let name = f.name().as_str();
            if name == IDENTITY_COLUMN {
                return None;
            }
            let occ = seen.entry(name).or_insert(0);
            let key = (name.to_string(), *occ);
            *occ += 1;
            Some(key)
        })
        .collect()
}

/// Stack all tables under the union of their columns (first-seen order),
/// then keep only the first column of each name. Returns the table and the
/// names of the repeats that were dropped.
pub fn union_tables(
    tables: &[NormalizedTable],
    ids: Vec<Vec<String>>,
) -> Result<(ReconTable, Vec<String>)> {
    let per_table: Vec<Vec<Option<ColumnKey>>> = tables.iter().map(column_keys).collect();

    let mut order: Vec<ColumnKey> = Vec::new();
    for keys in &per_table {
        for key in keys.iter().flatten() {
            if !order.contains(key) {
                order.push(key.clone());
            }
        }
    }

    let (kept, repeats): (Vec<ColumnKey>, Vec<ColumnKey>) =
        order.into_iter().partition(|(_, occ)| *occ == 0);
    let dropped: Vec<String> = repeats.into_iter().map(|(name, _)| name).collect();
    for name in &dropped {
        debug!(column = %name, "dropping repeated column name");
    }

    let total_rows: usize = tables.iter().map(|t| t.batch.num_rows()).sum();
    let mut columns: Vec<ArrayRef> = Vec::with_capacity(kept.len());
    for key in &kept {
        let mut cells: Vec<Option<&str>> = Vec::with_capacity(total_rows);
        for (table, keys) in tables.iter().zip(&per_table) {
            match keys.iter().position(|k| k.as_ref() == Some(key)) {
                Some(idx) => {
                    let arr = string_column(&table.batch, idx)?;
                    cells.extend(
                        (0..arr.len()).map(|r| (!arr.is_null(r)).then(|| arr.value(r))),
                    );
                }
                None => cells.extend(std::iter::repeat(None).take(table.batch.num_rows())),
            }
        }
        columns.push(Arc::new(StringArray::from(cells)) as ArrayRef);
    }

    let schema = Arc::new(utf8_schema(kept.iter().map(|(name, _)| name.as_str())));
    let batch = batch_with_rows(schema, columns, total_rows)?;
    let ids: Vec<String> = ids.into_iter().flatten().collect();

    Ok((ReconTable { ids, batch }, dropped))
}
