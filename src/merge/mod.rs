//! Reconciliation merger: folds every normalized source table into the one
//! canonical table, keyed by `employee_date_id`.

pub mod dedup;
pub mod finalize;
pub mod identity;
pub mod union;

use anyhow::Result;
use arrow::{
    array::{ArrayRef, StringArray},
    datatypes::{DataType, Field, Schema},
    record_batch::RecordBatch,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use crate::process::{
    schema::{DATE, EMPLOYEE_ID},
    utils::batch_with_rows,
    NormalizedTable,
};

pub use identity::IDENTITY_COLUMN;

/// Rows plus their identities, kept apart from the data columns so that no
/// column pass can touch the key by accident.
#[derive(Debug, Clone)]
pub struct ReconTable {
    pub ids: Vec<String>,
    pub batch: RecordBatch,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct MergeStats {
    pub rows_in: usize,
    pub rows_out: usize,
    pub duplicate_rows_dropped: usize,
    /// Rows that collided only after identity re-derivation.
    pub late_duplicate_rows_dropped: usize,
    pub columns_dropped_by_name: Vec<String>,
    pub columns_dropped_by_content: Vec<String>,
    pub columns_folded: Vec<String>,
    pub fallback_identities: usize,
    /// `employee_id` or `date` could not be found in any source.
    pub degraded: bool,
}

#[derive(Debug)]
pub struct MergeOutcome {
    /// Canonical table, `employee_date_id` first.
    pub batch: RecordBatch,
    pub stats: MergeStats,
}

/// Run the full merge sequence over all normalized tables.
pub fn reconcile(tables: &[NormalizedTable]) -> Result<MergeOutcome> {
    let mut stats = MergeStats {
        rows_in: tables.iter().map(|t| t.batch.num_rows()).sum(),
        ..Default::default()
    };

    let ids = tables
        .iter()
        .map(identity::assign_identities)
        .collect::<Result<Vec<_>>>()?;

    let (table, by_name) = union::union_tables(tables, ids)?;
    stats.columns_dropped_by_name = by_name;

    let (table, dropped) = dedup::dedup_rows(table)?;
    stats.duplicate_rows_dropped = dropped;

    let (batch, by_content) = dedup::collapse_identical_columns(&table.batch)?;
    stats.columns_dropped_by_content = by_content;

    let mut batch = batch;
    for base in [EMPLOYEE_ID, DATE] {
        let (folded, names) = finalize::merge_split_columns(&batch, base)?;
        batch = folded;
        stats.columns_folded.extend(names);
    }

    let (batch, degraded) = finalize::finalize_identity_columns(&batch)?;
    stats.degraded = degraded;

    let ids = identity::rederive(&batch, &table.ids)?;
    let (table, late) = dedup::dedup_rows(ReconTable { ids, batch })?;
    stats.late_duplicate_rows_dropped = late;
    if late > 0 {
        warn!(rows = late, "rows collided after identity re-derivation");
    }

    // folding and the late dedup can leave new twin columns behind
    let (batch, late_twins) = dedup::collapse_identical_columns(&table.batch)?;
    stats.columns_dropped_by_content.extend(late_twins);
    let table = ReconTable {
        ids: table.ids,
        batch,
    };

    stats.fallback_identities = identity::count_fallbacks(&table.batch)?;
    stats.rows_out = table.ids.len();
    if stats.degraded {
        warn!(
            fallback_identities = stats.fallback_identities,
            "canonical table has no usable identity columns; every row keeps a synthetic identity"
        );
    }
    info!(
        rows_in = stats.rows_in,
        rows_out = stats.rows_out,
        duplicate_rows = stats.duplicate_rows_dropped,
        fallback_identities = stats.fallback_identities,
        "merge complete"
    );

    Ok(MergeOutcome {
        batch: with_identity_column(table)?,
        stats,
    })
}

/// Prepend the identity as the table's first column.
fn with_identity_column(table: ReconTable) -> Result<RecordBatch> {
    let rows = table.ids.len();
    let mut fields = vec![Field::new(IDENTITY_COLUMN, DataType::Utf8, false)];
    fields.extend(table.batch.schema().fields().iter().map(|f| f.as_ref().clone()));

    let mut columns: Vec<ArrayRef> = vec![Arc::new(StringArray::from(table.ids)) as ArrayRef];
    columns.extend(table.batch.columns().iter().cloned());

    batch_with_rows(Arc::new(Schema::new(fields)), columns, rows)
}
