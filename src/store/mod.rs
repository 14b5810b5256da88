//! Durable canonical artifact: written once per cleaning run, read by the
//! report layer as an immutable snapshot.

pub mod snapshot;

use anyhow::{Context, Result};
use arrow::{csv::WriterBuilder, record_batch::RecordBatch};
use std::{
    fs,
    io::{BufWriter, Write},
    path::Path,
};
use tempfile::NamedTempFile;
use tracing::info;

pub use snapshot::{load_snapshot, AttendanceRecord, CanonicalSnapshot};

/// Replace the artifact at `dest` with `batch`. The CSV is written to a
/// temporary file next to `dest` and renamed over it, so readers see either
/// the previous artifact or the new one.
pub fn write_canonical(batch: &RecordBatch, dest: &Path) -> Result<u64> {
    let dir = match dest.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).with_context(|| format!("could not create `{}`", dir.display()))?;

    let tmp = NamedTempFile::new_in(dir)
        .with_context(|| format!("could not create temporary file in `{}`", dir.display()))?;
    {
        let mut buf = BufWriter::new(tmp.as_file());
        let mut writer = WriterBuilder::new().with_header(true).build(&mut buf);
        writer
            .write(batch)
            .context("writing canonical table as CSV")?;
        drop(writer);
        buf.flush().context("flushing canonical CSV")?;
    }
    tmp.as_file()
        .sync_all()
        .context("syncing canonical CSV")?;
    // temp files are created owner-only
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(tmp.path(), fs::Permissions::from_mode(0o644))?;
    }

    let bytes = tmp.as_file().metadata()?.len();
    tmp.persist(dest).with_context(|| {
        format!("failed to move temporary artifact over `{}`", dest.display())
    })?;
    info!(path = %dest.display(), rows = batch.num_rows(), bytes, "wrote canonical artifact");
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::schema::utf8_schema;
    use arrow::array::{ArrayRef, StringArray};
    use std::sync::Arc;
    use tempfile::tempdir;

    fn sample() -> RecordBatch {
        RecordBatch::try_new(
            Arc::new(utf8_schema(["employee_date_id", "employee_id", "date", "note"])),
            vec![
                Arc::new(StringArray::from(vec!["A1_2025-07-01"])) as ArrayRef,
                Arc::new(StringArray::from(vec!["A1"])) as ArrayRef,
                Arc::new(StringArray::from(vec!["2025-07-01"])) as ArrayRef,
                Arc::new(StringArray::from(vec![None::<&str>])) as ArrayRef,
            ],
        )
        .unwrap()
    }

    #[test]
    fn writes_header_and_empty_nulls() -> Result<()> {
        let tmp = tempdir()?;
        let dest = tmp.path().join("clean_data").join("cleaned.csv");
        write_canonical(&sample(), &dest)?;

        let text = fs::read_to_string(&dest)?;
        assert_eq!(
            text,
            "employee_date_id,employee_id,date,note\nA1_2025-07-01,A1,2025-07-01,\n"
        );
        Ok(())
    }

    #[test]
    fn replaces_previous_artifact_without_leftovers() -> Result<()> {
        let tmp = tempdir()?;
        let dest = tmp.path().join("cleaned.csv");
        fs::write(&dest, "stale")?;

        write_canonical(&sample(), &dest)?;
        assert!(fs::read_to_string(&dest)?.starts_with("employee_date_id"));
        let entries = fs::read_dir(tmp.path())?.count();
        assert_eq!(entries, 1);
        Ok(())
    }
}
