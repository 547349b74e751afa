//! Sequential batch upload with operator checkpoints between batches.
//!
//! The uploader keeps its [`UploadSession`] across `.await` points so a caller
//! racing [`BatchUploader::run`] against Ctrl-C still gets every result
//! recorded before the interrupt from [`BatchUploader::finish`]. A create
//! still awaiting its response at that point is reported as failed.

use std::time::Duration;

use chrono::Utc;
use medcat_core::{FailedProduct, Product, UploadSession, UploadedProduct};

use crate::client::CmsClient;

#[derive(Debug, Clone, Copy)]
pub struct BatchOptions {
    pub batch_size: usize,
    /// Skip the checkpoint prompt between batches.
    pub auto_confirm: bool,
    pub inter_request_delay: Duration,
}

/// State shown to the operator after each batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchCheckpoint {
    pub batch_number: usize,
    pub total_batches: usize,
    pub uploaded: usize,
    pub failed: usize,
    pub remaining: usize,
}

/// Decides whether the next batch runs. Returning `false` stops the upload.
pub trait ConfirmBatch {
    fn confirm(&mut self, checkpoint: &BatchCheckpoint) -> bool;
}

impl<F> ConfirmBatch for F
where
    F: FnMut(&BatchCheckpoint) -> bool,
{
    fn confirm(&mut self, checkpoint: &BatchCheckpoint) -> bool {
        self(checkpoint)
    }
}

/// Result of one item, handed to the per-item callback.
#[derive(Debug, Clone, Copy)]
pub enum ItemOutcome<'a> {
    Uploaded(&'a UploadedProduct),
    Failed(&'a FailedProduct),
}

pub struct BatchUploader<'a> {
    client: &'a CmsClient,
    options: BatchOptions,
    session: UploadSession,
    in_flight: Option<Product>,
}

impl<'a> BatchUploader<'a> {
    #[must_use]
    pub fn new(client: &'a CmsClient, options: BatchOptions) -> Self {
        Self {
            client,
            options,
            session: UploadSession::start(),
            in_flight: None,
        }
    }

    #[must_use]
    pub fn session(&self) -> &UploadSession {
        &self.session
    }

    /// Create every product in order, one request at a time.
    ///
    /// `items` pairs each product with the caller's index for it (row or
    /// slide position); the index is passed back through `on_item`. Returns
    /// `true` when all items were attempted, `false` when `confirm` stopped
    /// the run at a checkpoint.
    pub async fn run(
        &mut self,
        items: &[(usize, Product)],
        confirm: &mut dyn ConfirmBatch,
        on_item: &mut dyn FnMut(usize, ItemOutcome<'_>),
    ) -> bool {
        let batch_size = self.options.batch_size.max(1);
        let total_batches = items.len().div_ceil(batch_size);

        for (batch_idx, batch) in items.chunks(batch_size).enumerate() {
            tracing::info!(
                batch = batch_idx + 1,
                total_batches,
                items = batch.len(),
                "starting batch"
            );

            for (pos, (index, product)) in batch.iter().enumerate() {
                self.upload_one(*index, product, on_item).await;
                let last_overall = batch_idx + 1 == total_batches && pos + 1 == batch.len();
                if !last_overall && !self.options.inter_request_delay.is_zero() {
                    tokio::time::sleep(self.options.inter_request_delay).await;
                }
            }

            let done = (batch_idx * batch_size + batch.len()).min(items.len());
            if done >= items.len() {
                break;
            }
            let checkpoint = BatchCheckpoint {
                batch_number: batch_idx + 1,
                total_batches,
                uploaded: self.session.uploaded.len(),
                failed: self.session.failed.len(),
                remaining: items.len() - done,
            };
            if !self.options.auto_confirm && !confirm.confirm(&checkpoint) {
                tracing::info!(remaining = checkpoint.remaining, "upload stopped at checkpoint");
                return false;
            }
        }
        true
    }

    async fn upload_one(
        &mut self,
        index: usize,
        product: &Product,
        on_item: &mut dyn FnMut(usize, ItemOutcome<'_>),
    ) {
        self.in_flight = Some(product.clone());
        let result = self.client.create(product).await;
        self.in_flight = None;

        match result {
            Ok(entry) => {
                self.session.uploaded.push(UploadedProduct {
                    product_id: entry.id,
                    product_name: product.name.clone(),
                    reference: product.reference_string.clone(),
                    upload_time: Utc::now(),
                });
                if let Some(last) = self.session.uploaded.last() {
                    on_item(index, ItemOutcome::Uploaded(last));
                }
            }
            Err(err) => {
                tracing::warn!(
                    index,
                    reference = %product.reference_string,
                    error = %err,
                    "skipping product, upload failed"
                );
                self.session.failed.push(FailedProduct {
                    product_name: product.name.clone(),
                    reference: product.reference_string.clone(),
                    error: err.to_string(),
                    product_data: product.clone(),
                    upload_time: Utc::now(),
                });
                if let Some(last) = self.session.failed.last() {
                    on_item(index, ItemOutcome::Failed(last));
                }
            }
        }
    }

    /// Close the session. `stopped_early` marks an operator stop or an
    /// interrupt.
    ///
    /// A product whose create was dropped mid-request lands in `failed`: the
    /// CMS may or may not have stored it, and the failure artifact is where
    /// retries come from.
    #[must_use]
    pub fn finish(mut self, stopped_early: bool) -> UploadSession {
        if let Some(product) = self.in_flight.take() {
            tracing::warn!(
                reference = %product.reference_string,
                "upload interrupted while a create was in flight"
            );
            self.session.failed.push(FailedProduct {
                product_name: product.name.clone(),
                reference: product.reference_string.clone(),
                error: "interrupted before the CMS responded".to_string(),
                product_data: product,
                upload_time: Utc::now(),
            });
        }
        self.session.finish(stopped_early);
        self.session
    }
}
