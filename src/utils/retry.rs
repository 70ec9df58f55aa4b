//! Backoff builders.
//!
//! Uses `backon` for exponential backoff with jitter: one configurable
//! builder for transaction retries and a fixed one for connecting to a
//! backend at startup.

use std::time::Duration;

use backon::ExponentialBuilder;

use crate::config::RetryBackoffConfig;

/// Backoff between transaction attempts.
///
/// `max_times` is the number of delays, i.e. retries after the first
/// attempt.
pub fn trx_backoff(config: &RetryBackoffConfig, max_times: usize) -> ExponentialBuilder {
    let builder = ExponentialBuilder::default()
        .with_min_delay(config.min_delay())
        .with_max_delay(config.max_delay())
        .with_max_times(max_times);
    if config.jitter {
        builder.with_jitter()
    } else {
        builder
    }
}

/// Backoff for backend connection retries at startup.
///
/// - Min delay: 100ms
/// - Max delay: 5s
/// - Max attempts: 30
/// - Jitter enabled
pub fn connection_backoff() -> ExponentialBuilder {
    ExponentialBuilder::default()
        .with_min_delay(Duration::from_millis(100))
        .with_max_delay(Duration::from_secs(5))
        .with_max_times(30)
        .with_jitter()
}

#[cfg(test)]
mod tests {
    use backon::BackoffBuilder;

    use super::*;

    #[test]
    fn test_trx_backoff_yields_max_times_delays() {
        let config = RetryBackoffConfig {
            min_delay_ms: 1,
            max_delay_ms: 4,
            jitter: false,
        };
        let delays: Vec<Duration> = trx_backoff(&config, 4).build().collect();
        assert_eq!(delays.len(), 4);
        assert_eq!(delays[0], Duration::from_millis(1));
        assert!(delays.iter().all(|d| *d <= Duration::from_millis(4)));
    }

    #[test]
    fn test_zero_retries_yields_no_delay() {
        let delays = trx_backoff(&RetryBackoffConfig::default(), 0).build().count();
        assert_eq!(delays, 0);
    }
}
