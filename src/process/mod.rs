//! Schema normalizer: one source CSV in, one all-text Arrow table out with
//! canonical column names, trimmed values and parsed dates.

pub mod convert;
pub mod date_parser;
pub mod raw_table;
pub mod schema;
pub mod trimming;
pub mod utils;

use anyhow::{Context, Result};
use arrow::{
    array::{ArrayRef, StringArray},
    record_batch::RecordBatch,
};
use glob::glob;
use std::{
    path::{Path, PathBuf},
    sync::Arc,
};
use tracing::{debug, info};

use self::{
    convert::convert_date_columns,
    raw_table::RawTable,
    schema::{normalize_columns, utf8_schema, ColumnName},
    trimming::apply_trimming,
    utils::batch_with_rows,
};

/// A source file after normalization.
#[derive(Debug)]
pub struct NormalizedTable {
    pub source: PathBuf,
    /// Position of the file in the sorted source listing.
    pub file_seq: usize,
    pub columns: Vec<ColumnName>,
    pub batch: RecordBatch,
    pub unparsed_dates: usize,
    pub malformed_rows: usize,
}

/// List `*.csv` files directly under `dir`, sorted by path.
pub fn discover_sources(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        anyhow::bail!(
            "source dir `{}` does not exist or is not a directory",
            dir.display()
        );
    }
    let pattern = format!("{}/*.csv", dir.display());
    let mut paths: Vec<PathBuf> = glob(&pattern)
        .with_context(|| format!("invalid glob pattern {pattern}"))?
        .filter_map(|entry| entry.ok())
        .filter(|p| p.is_file())
        .collect();
    paths.sort();
    Ok(paths)
}

/// Read and normalize one source file.
#[tracing::instrument(level = "debug", skip(path), fields(file = %path.display()))]
pub fn normalize_file(path: &Path, file_seq: usize) -> Result<NormalizedTable> {
    let raw = RawTable::read(path)?;
    let table = normalize_raw(raw, path.to_path_buf(), file_seq)?;
    info!(
        file = %path.display(),
        rows = table.batch.num_rows(),
        columns = table.batch.num_columns(),
        unparsed_dates = table.unparsed_dates,
        "normalized source"
    );
    Ok(table)
}

pub fn normalize_raw(raw: RawTable, source: PathBuf, file_seq: usize) -> Result<NormalizedTable> {
    let columns = normalize_columns(&raw.headers);
    for c in columns.iter().filter(|c| c.original != c.canonical) {
        debug!(from = %c.original, to = %c.canonical, "renamed column");
    }

    let schema = Arc::new(utf8_schema(columns.iter().map(|c| c.canonical.as_str())));
    let arrays: Vec<ArrayRef> = (0..columns.len())
        .map(|i| {
            let col: StringArray = raw.rows.iter().map(|row| row[i].as_deref()).collect();
            Arc::new(col) as ArrayRef
        })
        .collect();
    let batch = batch_with_rows(schema, arrays, raw.rows.len())
        .with_context(|| format!("building table for {}", source.display()))?;

    let batch = apply_trimming(&batch)?;
    let (batch, unparsed_dates) = convert_date_columns(&batch)?;

    Ok(NormalizedTable {
        source,
        file_seq,
        columns,
        batch,
        unparsed_dates,
        malformed_rows: raw.malformed_rows,
    })
}
