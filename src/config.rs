use anyhow::{Context, Result};
use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
};

pub const DEFAULT_SOURCE_DIR: &str = "unclean_data";
pub const DEFAULT_DEST_PATH: &str = "clean_data/cleaned.csv";

/// Where a cleaning run reads from and writes to.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub source_dir: PathBuf,
    pub dest_path: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            source_dir: PathBuf::from(DEFAULT_SOURCE_DIR),
            dest_path: PathBuf::from(DEFAULT_DEST_PATH),
        }
    }
}

impl PipelineConfig {
    pub fn new(source_dir: impl Into<PathBuf>, dest_path: impl Into<PathBuf>) -> Self {
        Self {
            source_dir: source_dir.into(),
            dest_path: dest_path.into(),
        }
    }

    /// Load a YAML config. Keys left out fall back to the defaults.
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        serde_yaml::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    /// Apply explicit overrides on top of this config.
    pub fn with_overrides(mut self, source_dir: Option<PathBuf>, dest_path: Option<PathBuf>) -> Self {
        if let Some(dir) = source_dir {
            self.source_dir = dir;
        }
        if let Some(dest) = dest_path {
            self.dest_path = dest;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn yaml_keys_override_defaults() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("recon.yaml");
        fs::write(&path, "source_dir: /data/hr/raw\n")?;

        let cfg = PipelineConfig::from_yaml_file(&path)?;
        assert_eq!(cfg.source_dir, PathBuf::from("/data/hr/raw"));
        assert_eq!(cfg.dest_path, PathBuf::from(DEFAULT_DEST_PATH));
        Ok(())
    }

    #[test]
    fn cli_overrides_win() {
        let cfg = PipelineConfig::default().with_overrides(None, Some(PathBuf::from("out.csv")));
        assert_eq!(cfg.source_dir, PathBuf::from(DEFAULT_SOURCE_DIR));
        assert_eq!(cfg.dest_path, PathBuf::from("out.csv"));
    }
}
