pub mod batch;
pub mod client;
pub mod error;
pub(crate) mod retry;
pub mod types;

pub use batch::{BatchCheckpoint, BatchOptions, BatchUploader, ConfirmBatch, ItemOutcome};
pub use client::CmsClient;
pub use error::CmsError;
pub use types::{Entry, Pagination};
