//! Upload artifacts: one timestamped JSON file for the successes and one for
//! the failures of each upload session.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, Utc};
use medcat_core::{FailedProduct, UploadSession, UploadedProduct};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::json::{read_json, write_json};

const UPLOADED_PREFIX: &str = "uploaded_products_";
const FAILED_PREFIX: &str = "failed_products_";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadedArtifact {
    pub uploaded_count: usize,
    pub uploaded_products: Vec<UploadedProduct>,
    pub session_start: DateTime<Utc>,
    pub session_end: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedArtifact {
    pub failed_count: usize,
    pub failed_products: Vec<FailedProduct>,
    pub session_start: DateTime<Utc>,
    pub session_end: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub uploaded: Option<PathBuf>,
    pub failed: Option<PathBuf>,
}

/// Write `uploaded_products_<ts>.json` and `failed_products_<ts>.json` into
/// `dir`. A file is only written when its list is non-empty.
///
/// # Errors
///
/// Returns [`StoreError`] if a file cannot be written.
pub fn write_upload_artifacts(dir: &Path, session: &UploadSession) -> Result<ArtifactPaths, StoreError> {
    let stamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
    let session_end = session.finished_at.unwrap_or_else(Utc::now);
    let mut paths = ArtifactPaths::default();

    if !session.uploaded.is_empty() {
        let path = dir.join(format!("{UPLOADED_PREFIX}{stamp}.json"));
        write_json(
            &path,
            &UploadedArtifact {
                uploaded_count: session.uploaded.len(),
                uploaded_products: session.uploaded.clone(),
                session_start: session.started_at,
                session_end,
            },
        )?;
        tracing::info!(path = %path.display(), count = session.uploaded.len(), "wrote uploaded artifact");
        paths.uploaded = Some(path);
    }

    if !session.failed.is_empty() {
        let path = dir.join(format!("{FAILED_PREFIX}{stamp}.json"));
        write_json(
            &path,
            &FailedArtifact {
                failed_count: session.failed.len(),
                failed_products: session.failed.clone(),
                session_start: session.started_at,
                session_end,
            },
        )?;
        tracing::info!(path = %path.display(), count = session.failed.len(), "wrote failed artifact");
        paths.failed = Some(path);
    }

    Ok(paths)
}

/// Most recent `failed_products_*.json` in `dir`, by file name.
///
/// # Errors
///
/// Returns [`StoreError::Io`] if `dir` exists but cannot be listed.
pub fn latest_failed_artifact(dir: &Path) -> Result<Option<PathBuf>, StoreError> {
    if !dir.exists() {
        return Ok(None);
    }
    let listing = std::fs::read_dir(dir).map_err(|e| StoreError::io(dir, e))?;
    let mut latest: Option<(String, PathBuf)> = None;
    for entry in listing {
        let entry = entry.map_err(|e| StoreError::io(dir, e))?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if !name.starts_with(FAILED_PREFIX) || !name.ends_with(".json") {
            continue;
        }
        if latest.as_ref().is_none_or(|(best, _)| name > *best) {
            latest = Some((name, entry.path()));
        }
    }
    Ok(latest.map(|(_, path)| path))
}

/// # Errors
///
/// Returns [`StoreError`] if the artifact cannot be read or parsed.
pub fn load_failed_products(path: &Path) -> Result<Vec<FailedProduct>, StoreError> {
    let artifact: FailedArtifact = read_json(path)?;
    Ok(artifact.failed_products)
}
