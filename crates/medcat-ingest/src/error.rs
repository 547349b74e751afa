use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("failed to open workbook {path}: {source}")]
    WorkbookOpen {
        path: String,
        #[source]
        source: calamine::Error,
    },

    #[error("workbook {path} has no sheet named \"{sheet}\"")]
    SheetNotFound { path: String, sheet: String },

    #[error("workbook {path} contains no sheets")]
    NoSheets { path: String },

    #[error("failed to read sheet \"{sheet}\": {source}")]
    SheetRead {
        sheet: String,
        #[source]
        source: calamine::Error,
    },

    #[error("header row {header_row} is outside sheet \"{sheet}\" (data spans rows {first_row}-{last_row})")]
    HeaderRowOutOfRange {
        sheet: String,
        header_row: u32,
        first_row: u32,
        last_row: u32,
    },

    #[error("invalid alias pattern \"{pattern}\" for {canonical}: {source}")]
    InvalidAliasPattern {
        canonical: String,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },
}
