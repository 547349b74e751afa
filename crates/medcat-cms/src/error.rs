use thiserror::Error;

/// Errors returned by the CMS client.
#[derive(Debug, Error)]
pub enum CmsError {
    /// Network or TLS failure, or a request that never got a response.
    #[error("Network error: {0}")]
    Http(#[from] reqwest::Error),

    /// The CMS answered with a status the operation does not accept.
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The response body could not be deserialized into the expected type.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid CMS base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },
}
