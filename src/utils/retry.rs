use std::{fmt::Display, future::Future, time::Duration};
use tokio::time::sleep;
use tracing::{error, warn};

use crate::models::common::RetryConfig;
use crate::utils::strip_html;

/// Run `operation` until it succeeds or `config.max_attempts` is reached,
/// returning the last error in the latter case.
pub async fn retry<F, Fut, T, E>(operation: F, config: &RetryConfig, context: &str) -> Result<T, E>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let mut attempt = 1;
    let mut delay = config.base_delay_ms;

    loop {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) => {
                if attempt >= config.max_attempts {
                    error!(
                        "Operation '{}' failed after {} attempts. Final error: {}",
                        context,
                        attempt,
                        strip_html(&e.to_string())
                    );
                    return Err(e);
                }

                warn!(
                    "Attempt {}/{} for '{}' failed: {}. Retrying in {}ms...",
                    attempt,
                    config.max_attempts,
                    context,
                    strip_html(&e.to_string()),
                    delay
                );

                sleep(Duration::from_millis(delay)).await;

                // Exponential backoff with full jitter
                // https://aws.amazon.com/blogs/architecture/exponential-backoff-and-jitter/
                let next_delay = delay as f64 * config.exponential;
                delay = std::cmp::min(
                    config.max_delay_ms,
                    (fastrand::f64() * next_delay) as u64,
                );
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_config(max_attempts: u32) -> RetryConfig {
        RetryConfig {
            max_attempts,
            base_delay_ms: 1,
            max_delay_ms: 2,
            exponential: 2.0,
        }
    }

    #[tokio::test]
    async fn succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, String> = retry(
            || async {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                if n < 3 { Err(format!("attempt {n}")) } else { Ok(n) }
            },
            &fast_config(5),
            "flaky",
        )
        .await;

        assert_eq!(result, Ok(3));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_with_last_error() {
        let calls = AtomicU32::new(0);
        let result: Result<(), String> = retry(
            || async {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                Err(format!("attempt {n}"))
            },
            &fast_config(2),
            "always_fails",
        )
        .await;

        assert_eq!(result, Err("attempt 2".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
