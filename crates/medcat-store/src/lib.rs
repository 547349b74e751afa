pub mod artifacts;
pub mod catalog;
pub mod error;
pub mod json;
pub mod progress;

pub use artifacts::{
    latest_failed_artifact, load_failed_products, write_upload_artifacts, ArtifactPaths,
    FailedArtifact, UploadedArtifact,
};
pub use catalog::{
    read_catalog, read_mapping, read_mapping_or_empty, write_catalog, write_mapping,
    CatalogRepository,
};
pub use error::StoreError;
pub use json::{read_json, write_json, write_json_report};
pub use progress::{ProgressAction, ProgressEntry, ProgressTracker};
