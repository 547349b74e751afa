use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::product::Product;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadedProduct {
    pub product_id: i64,
    pub product_name: String,
    pub reference: String,
    pub upload_time: DateTime<Utc>,
}

/// A product the CMS did not accept, kept with its full payload so it can be
/// re-posted without going back to the source workbook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedProduct {
    pub product_name: String,
    pub reference: String,
    pub error: String,
    pub product_data: Product,
    pub upload_time: DateTime<Utc>,
}

/// Outcome of one batch-upload run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadSession {
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub uploaded: Vec<UploadedProduct>,
    pub failed: Vec<FailedProduct>,
    /// Set when the operator declined to continue or interrupted the run.
    pub stopped_early: bool,
}

impl UploadSession {
    #[must_use]
    pub fn start() -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            uploaded: Vec::new(),
            failed: Vec::new(),
            stopped_early: false,
        }
    }

    pub fn finish(&mut self, stopped_early: bool) {
        self.finished_at = Some(Utc::now());
        self.stopped_early = stopped_early;
    }

    #[must_use]
    pub fn processed(&self) -> usize {
        self.uploaded.len() + self.failed.len()
    }
}
