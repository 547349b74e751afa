//! Retry with exponential back-off and jitter for CMS requests.
//!
//! Only transport failures are retried. Once the CMS has answered with any
//! HTTP status the answer is final, so a create that reached the server is
//! never sent twice by this layer.

use std::future::Future;
use std::time::Duration;

use crate::error::CmsError;

/// Returns `true` for errors where no response was received.
///
/// **Retriable:** timeout, connection failure, request could not be sent.
///
/// **Not retriable:** any [`CmsError::Status`], malformed bodies, bad
/// configuration.
pub(crate) fn is_retriable(err: &CmsError) -> bool {
    match err {
        CmsError::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
        CmsError::Status { .. } | CmsError::Deserialize { .. } | CmsError::InvalidBaseUrl { .. } => {
            false
        }
    }
}

/// Runs `operation` with up to `max_retries` additional attempts on
/// transport errors.
///
/// The delay before attempt `n + 1` is `backoff_base_ms × 2ⁿ⁻¹` with ±25 %
/// jitter, capped at 60 s.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    max_retries: u32,
    backoff_base_ms: u64,
    mut operation: F,
) -> Result<T, CmsError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, CmsError>>,
{
    const MAX_DELAY_MS: u64 = 60_000;
    let mut attempt = 0u32;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !is_retriable(&err) || attempt >= max_retries {
                    return Err(err);
                }
                attempt += 1;
                let computed = backoff_base_ms.saturating_mul(1u64 << (attempt - 1).min(10));
                let capped = computed.min(MAX_DELAY_MS);
                #[allow(
                    clippy::cast_possible_truncation,
                    clippy::cast_sign_loss,
                    clippy::cast_precision_loss
                )]
                let delay_ms = (capped as f64 * (rand::random::<f64>() * 0.5 + 0.75)) as u64;
                tracing::warn!(
                    attempt,
                    max_retries,
                    delay_ms,
                    error = %err,
                    "CMS request failed before a response, retrying"
                );
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use super::*;

    async fn connect_error() -> CmsError {
        let err = reqwest::Client::new()
            .get("http://0.0.0.0:1")
            .send()
            .await
            .unwrap_err();
        CmsError::Http(err)
    }

    #[test]
    fn status_is_not_retriable() {
        assert!(!is_retriable(&CmsError::Status {
            status: 503,
            body: "unavailable".to_owned(),
        }));
    }

    #[test]
    fn deserialize_error_is_not_retriable() {
        let source = serde_json::from_str::<()>("invalid").unwrap_err();
        assert!(!is_retriable(&CmsError::Deserialize {
            context: "test".to_owned(),
            source,
        }));
    }

    #[tokio::test]
    async fn connect_error_is_retriable() {
        assert!(is_retriable(&connect_error().await));
    }

    #[tokio::test]
    async fn retries_then_succeeds() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_with_backoff(3, 0, || {
            let c = Arc::clone(&c);
            async move {
                let attempt = c.fetch_add(1, Ordering::SeqCst) + 1;
                if attempt < 3 {
                    Err(connect_error().await)
                } else {
                    Ok(7)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_retries() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result: Result<u32, _> = retry_with_backoff(2, 0, || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err(connect_error().await)
            }
        })
        .await;
        assert!(matches!(result, Err(CmsError::Http(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 3, "one try plus two retries");
    }

    #[tokio::test]
    async fn status_error_returns_immediately() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result: Result<u32, _> = retry_with_backoff(3, 0, || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err(CmsError::Status {
                    status: 500,
                    body: String::new(),
                })
            }
        })
        .await;
        assert!(matches!(result, Err(CmsError::Status { status: 500, .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
