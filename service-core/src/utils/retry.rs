//! Bounded retry for startup-time work such as opening connection pools.
//!
//! Attempts are spaced by a fixed delay; there is no backoff growth. This is
//! meant for bootstrapping only, never for per-request calls.

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

/// How many times to try and how long to wait in between.
#[derive(Clone, Debug)]
pub struct FixedRetry {
    /// Total number of attempts, including the first one.
    pub attempts: u32,
    /// Pause between two consecutive attempts.
    pub delay: Duration,
}

impl FixedRetry {
    pub fn new(attempts: u32, delay: Duration) -> Self {
        Self { attempts, delay }
    }
}

/// Run `f` until it succeeds or the attempts are exhausted.
///
/// Returns the last error when every attempt failed. A config with zero
/// attempts still runs `f` once.
///
/// # Example
/// ```ignore
/// let pool = do_with_tries(&FixedRetry::new(6, Duration::from_secs(5)), "postgres_connect", || async {
///     PgPoolOptions::new().connect(url).await
/// })
/// .await?;
/// ```
pub async fn do_with_tries<F, Fut, T, E>(
    config: &FixedRetry,
    operation_name: &str,
    f: F,
) -> Result<T, E>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let attempts = config.attempts.max(1);
    let mut attempt = 1;

    loop {
        match f().await {
            Ok(result) => {
                if attempt > 1 {
                    info!(operation = operation_name, attempt, "Succeeded after retry");
                }
                return Ok(result);
            }
            Err(e) if attempt >= attempts => {
                warn!(
                    operation = operation_name,
                    attempt,
                    error = %e,
                    "Giving up after final attempt"
                );
                return Err(e);
            }
            Err(e) => {
                warn!(
                    operation = operation_name,
                    attempt,
                    error = %e,
                    delay_ms = config.delay.as_millis() as u64,
                    "Attempt failed, waiting before retry"
                );
                sleep(config.delay).await;
                attempt += 1;
            }
        }
    }
}
