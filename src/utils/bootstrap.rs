//! Bootstrap utilities for driver binaries.

use std::future::Future;

use backon::BackoffBuilder;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use super::retry::connection_backoff;
use crate::config::LOG_ENV_VAR;

/// Initialize tracing with the TPCC_LOG environment variable.
///
/// Defaults to "info" level if TPCC_LOG is not set.
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_env(LOG_ENV_VAR)
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Connect to a backend with exponential backoff retry.
///
/// # Arguments
/// * `backend` - Human-readable name for logging (e.g., "postgres")
/// * `connect` - Async function that attempts to establish a connection
///
/// # Returns
/// The connected handle on success, or the last error after max retries.
pub async fn connect_with_retry<T, E, F, Fut>(backend: &str, mut connect: F) -> Result<T, E>
where
    E: std::fmt::Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut delays = connection_backoff().build();
    let mut attempt: u32 = 1;

    loop {
        match connect().await {
            Ok(handle) => {
                info!(backend, attempt, "Connected");
                return Ok(handle);
            }
            Err(e) => match delays.next() {
                Some(delay) => {
                    warn!(backend, attempt, error = %e, ?delay, "Connection failed, retrying");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                None => {
                    error!(backend, attempts = attempt, error = %e, "Connection failed");
                    return Err(e);
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_connect_with_retry_recovers() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, String> = connect_with_retry("memory", || {
            let call = calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if call < 3 {
                    Err("refused".to_string())
                } else {
                    Ok(call)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
