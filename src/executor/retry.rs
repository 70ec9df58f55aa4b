//! The bounded retry loop every transactional profile body runs in.

use std::future::Future;

use backon::BackoffBuilder;
use tracing::{debug, error, warn};

use super::{Executor, Result, TrxContext, TrxError};
use crate::utils::retry::trx_backoff;

impl Executor {
    /// Whether bodies are bracketed with start/commit/rollback.
    ///
    /// Both the executor and the backend have to opt in.
    pub fn is_transactional(&self) -> bool {
        self.config.transactions && self.storage.supports_transactions()
    }

    /// Run `body` as one unit of work.
    ///
    /// Transactional mode brackets every attempt and retries retryable
    /// failures up to `retries` attempts in total, backing off between them.
    /// The loop stops at the first success. A failed commit is a failed
    /// attempt. Non-transactional mode runs `body` once.
    ///
    /// Returns the last error when every attempt failed.
    pub(crate) async fn run_in_trx<T, F, Fut>(
        &self,
        ctx: &TrxContext,
        profile: &'static str,
        mut body: F,
    ) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        if !self.is_transactional() {
            return run_cancellable(ctx, body()).await;
        }

        let mut delays = trx_backoff(
            &self.config.retry_backoff,
            self.config.retries.saturating_sub(1) as usize,
        )
        .build();
        let mut attempt: u32 = 1;

        loop {
            if ctx.is_cancelled() {
                return Err(TrxError::Cancelled);
            }

            let error = match self.attempt(ctx, body()).await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(profile, attempt, "Transaction succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(e) => e,
            };

            if !error.is_retryable() {
                debug!(profile, attempt, error = %error, "Transaction failed, not retryable");
                return Err(error);
            }

            match delays.next() {
                Some(delay) => {
                    warn!(
                        profile,
                        attempt,
                        kind = ?error.kind(),
                        error = %error,
                        "Transaction attempt failed, retrying"
                    );
                    tokio::select! {
                        _ = ctx.cancelled() => return Err(TrxError::Cancelled),
                        _ = tokio::time::sleep(delay) => {}
                    }
                    attempt += 1;
                }
                None => {
                    error!(
                        profile,
                        attempts = attempt,
                        error = %error,
                        "Transaction failed, retries exhausted"
                    );
                    return Err(error);
                }
            }
        }
    }

    /// One bracketed attempt. Anything but a committed success ends rolled
    /// back.
    async fn attempt<T>(
        &self,
        ctx: &TrxContext,
        body: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        self.storage.start_trx().await?;

        let outcome = match run_cancellable(ctx, body).await {
            Ok(value) => self
                .storage
                .commit_trx()
                .await
                .map(|()| value)
                .map_err(TrxError::from),
            Err(e) => Err(e),
        };

        if outcome.is_err() {
            if let Err(e) = self.storage.rollback_trx().await {
                warn!(error = %e, "Rollback failed");
            }
        }
        outcome
    }
}

/// Race `body` against cancellation. A cancelled body is dropped mid-call.
pub(crate) async fn run_cancellable<T>(
    ctx: &TrxContext,
    body: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::select! {
        biased;
        _ = ctx.cancelled() => Err(TrxError::Cancelled),
        result = body => result,
    }
}
