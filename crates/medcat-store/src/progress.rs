//! Resumable progress log keyed by slide or row index.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::json::{read_json, write_json};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressAction {
    Upload,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEntry {
    pub index: usize,
    pub action: ProgressAction,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub product_name: Option<String>,
    #[serde(default)]
    pub cms_id: Option<i64>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ProgressEntry {
    #[must_use]
    pub fn new(index: usize, action: ProgressAction) -> Self {
        Self {
            index,
            action,
            timestamp: Utc::now(),
            product_name: None,
            cms_id: None,
            error: None,
        }
    }

    #[must_use]
    pub fn with_product(mut self, name: &str, cms_id: Option<i64>) -> Self {
        self.product_name = Some(name.to_string());
        self.cms_id = cms_id;
        self
    }

    #[must_use]
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }
}

/// Progress file stored as a JSON array. The latest entry per index wins.
#[derive(Debug)]
pub struct ProgressTracker {
    path: PathBuf,
    entries: BTreeMap<usize, ProgressEntry>,
}

impl ProgressTracker {
    /// Open `path`, loading earlier entries if the file exists. A file that
    /// cannot be parsed is moved to `<file>.<YYYYmmdd_HHMMSS>.corrupt` and the
    /// tracker starts empty, so the next flush never overwrites it.
    #[must_use]
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mut entries = BTreeMap::new();
        if path.exists() {
            match read_json::<Vec<ProgressEntry>>(&path) {
                Ok(list) => {
                    for entry in list {
                        entries.insert(entry.index, entry);
                    }
                }
                Err(err) => set_aside(&path, &err),
            }
        }
        Self { path, entries }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&ProgressEntry> {
        self.entries.get(&index)
    }

    /// `true` when `index` already has a successful (error-free) entry.
    #[must_use]
    pub fn is_done(&self, index: usize) -> bool {
        self.entries
            .get(&index)
            .is_some_and(|e| e.error.is_none())
    }

    /// Record `entry` and save the whole log immediately.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the log cannot be written.
    pub fn record(&mut self, entry: ProgressEntry) -> Result<(), StoreError> {
        self.entries.insert(entry.index, entry);
        self.flush()
    }

    /// # Errors
    ///
    /// Returns [`StoreError`] if the log cannot be written.
    pub fn flush(&self) -> Result<(), StoreError> {
        let list: Vec<&ProgressEntry> = self.entries.values().collect();
        write_json(&self.path, &list)
    }
}

fn corrupt_path(path: &Path) -> PathBuf {
    let stamp = Local::now().format("%Y%m%d_%H%M%S");
    let mut name = path
        .file_name()
        .map(std::ffi::OsStr::to_os_string)
        .unwrap_or_default();
    name.push(format!(".{stamp}.corrupt"));
    path.with_file_name(name)
}

fn set_aside(path: &Path, err: &StoreError) {
    let moved = corrupt_path(path);
    match std::fs::rename(path, &moved) {
        Ok(()) => tracing::warn!(
            path = %path.display(),
            moved_to = %moved.display(),
            error = %err,
            "unreadable progress file moved aside; starting fresh"
        ),
        Err(rename_err) => tracing::warn!(
            path = %path.display(),
            error = %err,
            rename_error = %rename_err,
            "unreadable progress file could not be moved aside; starting fresh"
        ),
    }
}
