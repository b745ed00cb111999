use anyhow::Result;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Isolated cache directory that is removed when dropped.
pub struct TestWorkspace {
    _temp_dir: TempDir,
    data_dir: PathBuf,
}

impl TestWorkspace {
    pub fn new() -> Result<Self> {
        let temp_dir = TempDir::new()?;
        let data_dir = temp_dir.path().join(".jules");
        std::fs::create_dir_all(&data_dir)?;

        Ok(Self {
            _temp_dir: temp_dir,
            data_dir,
        })
    }

    /// The cache data directory (`<tmp>/.jules`).
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn index_path(&self) -> PathBuf {
        self.data_dir.join("index.db")
    }

    pub fn config_path(&self) -> PathBuf {
        self.data_dir.join("config.toml")
    }
}
