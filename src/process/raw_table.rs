use anyhow::{bail, Context, Result};
use csv::ReaderBuilder;
use std::{fs::File, io::Read, path::Path};
use tracing::warn;

#[derive(Debug)]
pub struct RawTable {
    /// Column names exactly as the file's header row spells them.
    pub headers: Vec<String>,
    /// Each data row, one cell per header. Empty fields are `None`.
    pub rows: Vec<Vec<Option<String>>>,
    /// Records the CSV decoder rejected (bad UTF-8, broken quoting).
    pub malformed_rows: usize,
}

impl RawTable {
    /// Open and decode a source CSV. Fails only when the file itself is
    /// unusable; individual bad records are skipped and counted.
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
        Self::from_reader(file).with_context(|| format!("reading {}", path.display()))
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let headers: Vec<String> = rdr
            .headers()
            .context("decoding header row")?
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').to_string())
            .collect();
        if headers.is_empty() || headers.iter().all(|h| h.trim().is_empty()) {
            bail!("no header row");
        }

        let width = headers.len();
        let mut rows = Vec::new();
        let mut malformed_rows = 0;
        for (idx, result) in rdr.records().enumerate() {
            let record = match result {
                Ok(r) => r,
                Err(e) => {
                    warn!(record = idx, error = %e, "skipping malformed record");
                    malformed_rows += 1;
                    continue;
                }
            };
            // ragged rows: pad short ones, cut long ones
            let row: Vec<Option<String>> = (0..width)
                .map(|i| match record.get(i) {
                    Some("") | None => None,
                    Some(v) => Some(v.to_string()),
                })
                .collect();
            rows.push(row);
        }

        Ok(RawTable {
            headers,
            rows,
            malformed_rows,
        })
    }
}
