//! Cross-platform application paths

use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct AppPaths {
    data_dir: PathBuf,
}

impl AppPaths {
    /// Platform data directory, e.g. `~/.local/share/tron` on Linux.
    pub fn new() -> Result<Self, String> {
        let base = dirs::data_dir().ok_or("Could not determine data directory")?;
        Self::at(base.join("tron"))
    }

    pub fn at(data_dir: PathBuf) -> Result<Self, String> {
        fs::create_dir_all(&data_dir)
            .map_err(|e| format!("Failed to create data directory {:?}: {}", data_dir, e))?;
        Ok(Self { data_dir })
    }

    pub fn registry_file(&self) -> PathBuf {
        self.data_dir.join("registry.json")
    }
}
