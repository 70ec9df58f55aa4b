//! Orchestrator configuration.

use std::time::Duration;

use serde::Deserialize;

/// Per-worker executor settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Records buffered per table before a batch insert.
    pub batch_size: usize,
    /// Attempts per transaction in transactional mode.
    pub retries: u32,
    /// Bracket profile bodies with start/commit/rollback.
    pub transactions: bool,
    /// Districts visited by one Delivery call.
    pub districts_per_warehouse: u32,
    /// Customer credit marker that triggers the Payment data note.
    pub bad_credit: String,
    /// Maximum length of a customer's data field.
    pub customer_data_len: usize,
    /// Number of most recent orders Stock-Level inspects.
    pub stock_level_window: u32,
    /// Delay between retry attempts.
    pub retry_backoff: RetryBackoffConfig,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            batch_size: 512,
            retries: 10,
            transactions: false,
            districts_per_warehouse: 10,
            bad_credit: "BC".to_string(),
            customer_data_len: 500,
            stock_level_window: 20,
            retry_backoff: RetryBackoffConfig::default(),
        }
    }
}

/// Exponential backoff between retry attempts.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetryBackoffConfig {
    pub min_delay_ms: u64,
    pub max_delay_ms: u64,
    pub jitter: bool,
}

impl RetryBackoffConfig {
    pub fn min_delay(&self) -> Duration {
        Duration::from_millis(self.min_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }
}

impl Default for RetryBackoffConfig {
    fn default() -> Self {
        Self {
            min_delay_ms: 1,
            max_delay_ms: 100,
            jitter: true,
        }
    }
}
