use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub log_level: String,
    pub cms_url: String,
    pub cms_token: Option<String>,
    pub cms_collection: String,
    pub lookups_path: PathBuf,
    pub artifacts_dir: PathBuf,
    pub request_timeout_secs: u64,
    pub max_retries: u32,
    pub retry_backoff_ms: u64,
    pub inter_request_delay_ms: u64,
    pub batch_size: usize,
    pub auto_confirm: bool,
    pub page_size: u32,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("log_level", &self.log_level)
            .field("cms_url", &self.cms_url)
            .field("cms_token", &self.cms_token.as_ref().map(|_| "[redacted]"))
            .field("cms_collection", &self.cms_collection)
            .field("lookups_path", &self.lookups_path)
            .field("artifacts_dir", &self.artifacts_dir)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_ms", &self.retry_backoff_ms)
            .field("inter_request_delay_ms", &self.inter_request_delay_ms)
            .field("batch_size", &self.batch_size)
            .field("auto_confirm", &self.auto_confirm)
            .field("page_size", &self.page_size)
            .finish()
    }
}
