pub mod app_config;
pub mod config;
pub mod lookups;
pub mod product;
pub mod slug;
pub mod upload;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use lookups::{load_lookup_defaults, LookupDefaults, MappingTable, NamedId};
pub use product::{
    is_unknown_text, validate_catalog, CatalogEntry, CatalogIssues, LoadingCapacity,
    PackagingInformation, Product, Variation, UNKNOWN_TEXT, UNSPECIFIED_NOTES,
};
pub use slug::{assign_slugs, slugify, SlugAllocator};
pub use upload::{FailedProduct, UploadSession, UploadedProduct};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read lookups file {path}: {source}")]
    LookupsFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse lookups file: {0}")]
    LookupsFileParse(#[from] serde_yaml::Error),

    #[error("lookups validation error: {0}")]
    Validation(String),
}
