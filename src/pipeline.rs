use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::{path::PathBuf, time::Instant};
use tracing::{info, warn};

use crate::{
    config::PipelineConfig,
    merge::{reconcile, MergeStats},
    process::{discover_sources, normalize_file},
    store::write_canonical,
};

/// A source file the run could not use.
#[derive(Debug, Clone, Serialize)]
pub struct SkippedSource {
    pub path: PathBuf,
    pub reason: String,
}

/// What one cleaning run did.
#[derive(Debug, Clone, Serialize)]
pub struct CleanReport {
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u128,
    pub sources_discovered: usize,
    pub sources_read: usize,
    pub skipped_sources: Vec<SkippedSource>,
    pub malformed_rows: usize,
    pub unparsed_dates: usize,
    #[serde(flatten)]
    pub merge: MergeStats,
    pub artifact_path: PathBuf,
    pub artifact_bytes: u64,
}

impl CleanReport {
    pub fn degraded(&self) -> bool {
        self.merge.degraded
    }
}

/// Clean every source CSV and replace the canonical artifact.
///
/// Per-file and per-row problems are absorbed and counted. The run fails
/// only when no source can be read at all or the artifact cannot be written.
#[tracing::instrument(level = "info", skip(config), fields(source = %config.source_dir.display(), dest = %config.dest_path.display()))]
pub fn clean_all(config: &PipelineConfig) -> Result<CleanReport> {
    let started_at = Utc::now();
    let start = Instant::now();

    let sources = discover_sources(&config.source_dir)?;
    if sources.is_empty() {
        bail!("no CSV files found in `{}`", config.source_dir.display());
    }
    info!(files = sources.len(), "discovered source files");

    let mut tables = Vec::with_capacity(sources.len());
    let mut skipped = Vec::new();
    for (seq, path) in sources.iter().enumerate() {
        match normalize_file(path, seq) {
            Ok(table) => tables.push(table),
            Err(e) => {
                warn!(file = %path.display(), error = %format!("{e:#}"), "skipping unreadable source");
                skipped.push(SkippedSource {
                    path: path.clone(),
                    reason: format!("{e:#}"),
                });
            }
        }
    }
    if tables.is_empty() {
        bail!(
            "none of the {} source files in `{}` could be read",
            sources.len(),
            config.source_dir.display()
        );
    }

    let outcome = reconcile(&tables)?;
    let artifact_bytes = write_canonical(&outcome.batch, &config.dest_path)?;

    let report = CleanReport {
        started_at,
        elapsed_ms: start.elapsed().as_millis(),
        sources_discovered: sources.len(),
        sources_read: tables.len(),
        skipped_sources: skipped,
        malformed_rows: tables.iter().map(|t| t.malformed_rows).sum(),
        unparsed_dates: tables.iter().map(|t| t.unparsed_dates).sum(),
        merge: outcome.stats,
        artifact_path: config.dest_path.clone(),
        artifact_bytes,
    };
    if report.unparsed_dates > 0 {
        warn!(count = report.unparsed_dates, "dates kept as raw text");
    }
    info!(
        rows = report.merge.rows_out,
        skipped = report.skipped_sources.len(),
        degraded = report.degraded(),
        elapsed_ms = report.elapsed_ms as u64,
        "cleaning run finished"
    );
    Ok(report)
}
