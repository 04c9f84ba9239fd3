//! Whole-document JSON persistence for the registry.
//!
//! The document is read entirely at open and rewritten entirely on every
//! mutation. Writes land in a sibling `*.tmp` file that is synced and then
//! renamed over the target, so readers never observe a half-written document.
//! There is no file locking.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{Result, TronError};

/// Read and decode a document. `Ok(None)` when the file does not exist.
pub fn read_document<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(TronError::store_io(path, e)),
    };
    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|e| TronError::store_corrupt(path, e.to_string()))
}

/// Encode a document as indented JSON and replace `path` atomically.
pub fn write_document<T: Serialize + ?Sized>(path: &Path, document: &T) -> Result<()> {
    let mut bytes = serde_json::to_vec_pretty(document)
        .map_err(|e| TronError::store_io(path, io::Error::new(io::ErrorKind::InvalidData, e)))?;
    bytes.push(b'\n');
    write_atomic(path, &bytes).map_err(|e| TronError::store_io(path, e))
}

/// Write `bytes` to a temp sibling, sync, then rename over `path`.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let tmp = temp_sibling(path);
    {
        let mut f = File::create(&tmp)?;
        f.write_all(bytes)?;
        f.flush()?;
        f.sync_all()?;
    }
    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }
    Ok(())
}

pub fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "registry".into());
    name.push(".tmp");
    path.with_file_name(name)
}
