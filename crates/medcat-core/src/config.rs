use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Every variable has a default except `CMS_TOKEN`, which stays `None` until a
/// network command asks for it.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::path::PathBuf;

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_bool = |var: &str, default: &str| -> Result<bool, ConfigError> {
        let raw = or_default(var, default);
        match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" => Ok(true),
            "0" | "false" | "no" => Ok(false),
            _ => Err(invalid(var, format!("expected a boolean, got '{raw}'"))),
        }
    };

    let env = parse_environment(&or_default("MEDCAT_ENV", "development"));
    let log_level = or_default("MEDCAT_LOG_LEVEL", "info");

    let cms_url = or_default("CMS_URL", "http://localhost:1337");
    if !(cms_url.starts_with("http://") || cms_url.starts_with("https://")) {
        return Err(invalid("CMS_URL", format!("'{cms_url}' is not an http(s) URL")));
    }
    let cms_token = lookup("CMS_TOKEN").ok().filter(|t| !t.trim().is_empty());
    let cms_collection = or_default("CMS_COLLECTION", "medical-products");

    let lookups_path = PathBuf::from(or_default("MEDCAT_LOOKUPS_PATH", "./config/lookups.yaml"));
    let artifacts_dir = PathBuf::from(or_default("MEDCAT_ARTIFACTS_DIR", "./artifacts"));

    let request_timeout_secs = parse_u64("MEDCAT_REQUEST_TIMEOUT_SECS", "5")?;
    let max_retries = parse_u32("MEDCAT_MAX_RETRIES", "3")?;
    let retry_backoff_ms = parse_u64("MEDCAT_RETRY_BACKOFF_MS", "250")?;
    let inter_request_delay_ms = parse_u64("MEDCAT_INTER_REQUEST_DELAY_MS", "500")?;

    let batch_size = or_default("MEDCAT_BATCH_SIZE", "5")
        .parse::<usize>()
        .map_err(|e| invalid("MEDCAT_BATCH_SIZE", e.to_string()))?;
    if batch_size == 0 {
        return Err(invalid("MEDCAT_BATCH_SIZE", "must be at least 1".to_string()));
    }

    let auto_confirm = parse_bool("MEDCAT_AUTO_CONFIRM", "false")?;
    let page_size = parse_u32("MEDCAT_PAGE_SIZE", "1000")?;

    Ok(AppConfig {
        env,
        log_level,
        cms_url,
        cms_token,
        cms_collection,
        lookups_path,
        artifacts_dir,
        request_timeout_secs,
        max_retries,
        retry_backoff_ms,
        inter_request_delay_ms,
        batch_size,
        auto_confirm,
        page_size,
    })
}

/// Parse a string into an `Environment` variant.
///
/// Unrecognized values default to `Environment::Development`.
fn parse_environment(s: &str) -> Environment {
    match s {
        "production" => Environment::Production,
        "test" => Environment::Test,
        _ => Environment::Development,
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
