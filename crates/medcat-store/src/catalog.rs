//! Product catalog file: a JSON array of `{ "data": Product }` entries.

use std::path::{Path, PathBuf};

use chrono::Local;
use medcat_core::{CatalogEntry, MappingTable};

use crate::error::StoreError;
use crate::json::{persist, read_json, write_json, write_temp};

/// # Errors
///
/// Returns [`StoreError`] if the file cannot be read or parsed.
pub fn read_catalog(path: &Path) -> Result<Vec<CatalogEntry>, StoreError> {
    read_json(path)
}

/// # Errors
///
/// Returns [`StoreError`] if the file cannot be written.
pub fn write_catalog(path: &Path, entries: &[CatalogEntry]) -> Result<(), StoreError> {
    write_json(path, entries)
}

/// Read a cached `id → name` mapping file.
///
/// # Errors
///
/// Returns [`StoreError`] if the file cannot be read or parsed.
pub fn read_mapping(path: &Path) -> Result<MappingTable, StoreError> {
    read_json(path)
}

/// Like [`read_mapping`], but a missing file yields an empty table.
///
/// # Errors
///
/// Returns [`StoreError`] if the file exists but cannot be read or parsed.
pub fn read_mapping_or_empty(path: &Path) -> Result<MappingTable, StoreError> {
    if path.exists() {
        read_mapping(path)
    } else {
        tracing::warn!(path = %path.display(), "mapping file not found, using an empty table");
        Ok(MappingTable::new())
    }
}

/// # Errors
///
/// Returns [`StoreError`] if the file cannot be written.
pub fn write_mapping(path: &Path, table: &MappingTable) -> Result<(), StoreError> {
    write_json(path, table)
}

/// Catalog file with backup-on-save.
///
/// Every save writes a synced temp file next to the catalog, copies the
/// previous version to `<file>.<YYYYmmdd_HHMMSS>.bak`, then renames the temp
/// file into place.
#[derive(Debug, Clone)]
pub struct CatalogRepository {
    path: PathBuf,
}

impl CatalogRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// # Errors
    ///
    /// Returns [`StoreError`] if the catalog cannot be read or parsed.
    pub fn load(&self) -> Result<Vec<CatalogEntry>, StoreError> {
        read_catalog(&self.path)
    }

    /// Save `entries`, returning the backup path when a previous file existed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if writing, backing up or renaming fails. The
    /// existing catalog is untouched on error.
    pub fn save(&self, entries: &[CatalogEntry]) -> Result<Option<PathBuf>, StoreError> {
        let tmp = write_temp(&self.path, entries)?;

        let backup = if self.path.exists() {
            let backup = self.backup_path();
            std::fs::copy(&self.path, &backup).map_err(|e| StoreError::io(&backup, e))?;
            Some(backup)
        } else {
            None
        };

        persist(tmp, &self.path)?;
        tracing::info!(
            path = %self.path.display(),
            entries = entries.len(),
            backup = ?backup,
            "saved catalog"
        );
        Ok(backup)
    }

    /// Load, transform in memory, save. `name` labels the transform in logs.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] from the load or the save.
    pub fn apply<R, F>(&self, name: &str, transform: F) -> Result<R, StoreError>
    where
        F: FnOnce(&mut Vec<CatalogEntry>) -> R,
    {
        let mut entries = self.load()?;
        let before = entries.len();
        let result = transform(&mut entries);
        tracing::info!(transform = name, before, after = entries.len(), "applied catalog transform");
        self.save(&entries)?;
        Ok(result)
    }

    fn backup_path(&self) -> PathBuf {
        let stamp = Local::now().format("%Y%m%d_%H%M%S");
        let mut name = self
            .path
            .file_name()
            .map(std::ffi::OsStr::to_os_string)
            .unwrap_or_default();
        name.push(format!(".{stamp}.bak"));
        self.path.with_file_name(name)
    }
}
