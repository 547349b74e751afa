//! JSON file helpers. Writes go to a temp file in the target directory,
//! are synced, then renamed over the target so readers never see a torn file.

use std::io::Write;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tempfile::NamedTempFile;

use crate::error::StoreError;

/// # Errors
///
/// Returns [`StoreError::Io`] if the file cannot be read and
/// [`StoreError::Deserialize`] if it is not the expected JSON.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, StoreError> {
    let raw = std::fs::read_to_string(path).map_err(|e| StoreError::io(path, e))?;
    serde_json::from_str(&raw).map_err(|e| StoreError::Deserialize {
        path: path.display().to_string(),
        source: e,
    })
}

/// Pretty-printed, atomically replaced JSON file. Missing parent
/// directories are created.
///
/// # Errors
///
/// Returns [`StoreError::Serialize`] if `value` cannot be encoded and
/// [`StoreError::Io`] for any filesystem failure.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), StoreError> {
    let tmp = write_temp(path, value)?;
    persist(tmp, path)
}

/// Write a diagnostic report (issues, validation, suggestions).
///
/// # Errors
///
/// Same as [`write_json`].
pub fn write_json_report<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), StoreError> {
    write_json(path, value)?;
    tracing::info!(path = %path.display(), "wrote report");
    Ok(())
}

pub(crate) fn write_temp<T: Serialize + ?Sized>(
    path: &Path,
    value: &T,
) -> Result<NamedTempFile, StoreError> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir).map_err(|e| StoreError::io(dir, e))?;

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| StoreError::io(dir, e))?;
    serde_json::to_writer_pretty(&mut tmp, value).map_err(|e| StoreError::Serialize {
        context: path.display().to_string(),
        source: e,
    })?;
    tmp.write_all(b"\n").map_err(|e| StoreError::io(tmp.path(), e))?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| StoreError::io(tmp.path(), e))?;
    Ok(tmp)
}

pub(crate) fn persist(tmp: NamedTempFile, path: &Path) -> Result<(), StoreError> {
    tmp.persist(path).map_err(|e| StoreError::io(path, e.error))?;
    Ok(())
}
