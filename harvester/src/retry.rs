use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

use crate::error::HarvestError;

/// Distinguishes failures worth another attempt from those that are not.
#[derive(Debug)]
pub enum RetryError {
    /// Connection errors, timeouts, 5xx and 429 answers.
    Retryable(HarvestError),
    /// Other 4xx answers and anything that will fail the same way again.
    NonRetryable(HarvestError),
}

impl RetryError {
    pub fn into_inner(self) -> HarvestError {
        match self {
            RetryError::Retryable(err) | RetryError::NonRetryable(err) => err,
        }
    }
}

impl From<reqwest::Error> for RetryError {
    fn from(err: reqwest::Error) -> Self {
        let url = err
            .url()
            .map(|u| u.to_string())
            .unwrap_or_else(|| "<unknown>".to_string());
        let retryable = err.is_timeout() || err.is_connect() || err.is_request() || err.is_body();
        let err = HarvestError::Fetch { url, source: err };
        if retryable {
            RetryError::Retryable(err)
        } else {
            RetryError::NonRetryable(err)
        }
    }
}

/// Classify a non-success HTTP answer.
pub fn status_error(url: &str, status: reqwest::StatusCode) -> RetryError {
    let err = HarvestError::Status {
        url: url.to_string(),
        status,
    };
    if status.is_server_error() || status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        RetryError::Retryable(err)
    } else {
        RetryError::NonRetryable(err)
    }
}

#[derive(Clone, Debug)]
pub struct RetryConfig {
    /// Attempts made before giving up, the first one included.
    pub max_attempts: u32,
    /// Base delay for exponential backoff.
    pub base_delay_ms: u64,
    /// Jitter as a fraction of the delay, e.g. 0.25 = ±25%.
    pub jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        RetryConfig {
            max_attempts: 4,
            base_delay_ms: 2000,
            jitter_factor: 0.25,
        }
    }
}

/// Run `func` until it succeeds, fails with a non-retryable error, or the
/// attempts run out. The last retryable error is returned in that case.
pub async fn with_retry<F, Fut, T>(func: F, config: &RetryConfig) -> Result<T, RetryError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, RetryError>>,
{
    let attempts = config.max_attempts.max(1);
    let mut attempt = 0;
    loop {
        match func().await {
            Ok(result) => return Ok(result),
            Err(RetryError::Retryable(err)) if attempt + 1 < attempts => {
                log::warn!("Retryable error: {}", err);
                let delay = backoff_with_jitter(attempt, config);
                log::warn!(
                    "Retry attempt {}/{} after {:?}",
                    attempt + 1,
                    attempts - 1,
                    delay
                );
                sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

/// Exponential backoff (`base_delay * 2^attempt`) with ±`jitter_factor` noise.
fn backoff_with_jitter(attempt: u32, config: &RetryConfig) -> Duration {
    let base_delay = config
        .base_delay_ms
        .saturating_mul(2u64.saturating_pow(attempt));
    let jitter_range = (base_delay as f64 * config.jitter_factor) as u64;
    let jitter = rand::rng().random_range(0..=jitter_range * 2) as i64 - jitter_range as i64;
    let delay_ms = (base_delay as i64 + jitter).max(0) as u64;
    Duration::from_millis(delay_ms)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast() -> RetryConfig {
        RetryConfig {
            max_attempts: 3,
            base_delay_ms: 1,
            jitter_factor: 0.0,
        }
    }

    fn unavailable() -> HarvestError {
        HarvestError::Status {
            url: "http://upstream/x".to_string(),
            status: reqwest::StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    #[test]
    fn test_status_classification() {
        assert!(matches!(
            status_error("u", reqwest::StatusCode::BAD_GATEWAY),
            RetryError::Retryable(_)
        ));
        assert!(matches!(
            status_error("u", reqwest::StatusCode::TOO_MANY_REQUESTS),
            RetryError::Retryable(_)
        ));
        assert!(matches!(
            status_error("u", reqwest::StatusCode::NOT_FOUND),
            RetryError::NonRetryable(_)
        ));
    }

    #[test]
    fn test_backoff_without_jitter_doubles() {
        let config = RetryConfig {
            max_attempts: 4,
            base_delay_ms: 100,
            jitter_factor: 0.0,
        };
        assert_eq!(backoff_with_jitter(0, &config), Duration::from_millis(100));
        assert_eq!(backoff_with_jitter(1, &config), Duration::from_millis(200));
        assert_eq!(backoff_with_jitter(3, &config), Duration::from_millis(800));
    }

    #[test]
    fn test_backoff_jitter_stays_in_range() {
        let config = RetryConfig::default();
        for _ in 0..50 {
            let delay = backoff_with_jitter(1, &config).as_millis();
            assert!((3000..=5000).contains(&delay), "{delay}");
        }
    }

    #[tokio::test]
    async fn test_recovers_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result = with_retry(
            move || async move {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(RetryError::Retryable(unavailable()))
                } else {
                    Ok(42)
                }
            },
            &fast(),
        )
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_with_last_error() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: Result<(), _> = with_retry(
            move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(RetryError::Retryable(unavailable()))
            },
            &fast(),
        )
        .await;

        assert!(matches!(
            result,
            Err(RetryError::Retryable(HarvestError::Status { .. }))
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_non_retryable_stops_immediately() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: Result<(), _> = with_retry(
            move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(status_error("u", reqwest::StatusCode::NOT_FOUND))
            },
            &fast(),
        )
        .await;

        assert!(matches!(result, Err(RetryError::NonRetryable(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
