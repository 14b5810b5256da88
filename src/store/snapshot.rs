use anyhow::{Context, Result};
use csv::ReaderBuilder;
use serde::Deserialize;
use std::{fs::File, io::Read, path::Path};
use tracing::warn;

/// The columns reports read from a canonical row. Anything the artifact
/// lacks comes back as `None`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AttendanceRecord {
    pub employee_date_id: Option<String>,
    pub employee_id: Option<String>,
    pub date: Option<String>,
    pub department: Option<String>,
    pub day_type: Option<String>,
    pub exception: Option<String>,
    pub total_ot: Option<String>,
}

/// Read-only view of one canonical artifact.
#[derive(Debug, Clone, Default)]
pub struct CanonicalSnapshot {
    pub columns: Vec<String>,
    pub records: Vec<AttendanceRecord>,
}

impl CanonicalSnapshot {
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = ReaderBuilder::new().flexible(true).from_reader(reader);
        let columns = rdr
            .headers()
            .context("reading canonical header")?
            .iter()
            .map(str::to_string)
            .collect();

        let mut records = Vec::new();
        for (idx, result) in rdr.deserialize::<AttendanceRecord>().enumerate() {
            match result {
                Ok(r) => records.push(r),
                Err(e) => warn!(record = idx, error = %e, "skipping unreadable canonical row"),
            }
        }
        Ok(CanonicalSnapshot { columns, records })
    }
}

/// Load the artifact fresh from disk.
pub fn load_snapshot(path: &Path) -> Result<CanonicalSnapshot> {
    let file = File::open(path)
        .with_context(|| format!("opening canonical artifact {}", path.display()))?;
    CanonicalSnapshot::from_reader(file)
        .with_context(|| format!("reading canonical artifact {}", path.display()))
}
