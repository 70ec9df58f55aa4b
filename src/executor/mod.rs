//! Transaction orchestrator.
//!
//! An [`Executor`] runs the five TPC-C profiles against one storage handle
//! and buffers load-phase inserts. It holds per-worker mutable state, so
//! every worker owns its own executor over its own
//! [`Storage::session`] handle:
//!
//! ```text
//! let storage = storage::connect(&config.storage).await?;
//! for _ in 0..workers {
//!     let executor = Executor::new(storage.session(), config.executor.clone());
//!     tokio::spawn(run_worker(executor));
//! }
//! ```

mod batch;
mod context;
mod error;
mod params;
mod profiles;
mod retry;

use std::sync::Arc;

use tracing::info;

pub use batch::BatchBuffer;
pub use context::{CancelHandle, TrxContext};
pub use error::{Result, TrxError};
pub use params::{
    CustomerSelector, DeliveredOrder, DeliveryOutcome, DeliveryParams, NewOrderOutcome,
    NewOrderParams, OrderItem, OrderStatusOutcome, OrderStatusParams, PaymentOutcome,
    PaymentParams, StockLevelOutcome, StockLevelParams,
};

use crate::config::ExecutorConfig;
use crate::models::{Record, Table};
use crate::storage::{self, Storage};

/// Per-worker TPC-C transaction driver.
pub struct Executor {
    storage: Arc<dyn Storage>,
    config: ExecutorConfig,
    buffer: BatchBuffer,
}

impl Executor {
    pub fn new(storage: Arc<dyn Storage>, config: ExecutorConfig) -> Self {
        let buffer = BatchBuffer::new(config.batch_size);
        Self {
            storage,
            config,
            buffer,
        }
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    pub fn change_batch_size(&mut self, batch_size: usize) {
        self.config.batch_size = batch_size;
        self.buffer.set_batch_size(batch_size);
    }

    pub fn change_retries(&mut self, retries: u32) {
        self.config.retries = retries;
    }

    /// Records buffered for `table` and not yet written.
    pub fn pending(&self, table: Table) -> usize {
        self.buffer.pending(table)
    }

    /// Insert one record immediately.
    pub async fn save(&self, record: impl Into<Record>) -> storage::Result<()> {
        self.storage.insert_one(&record.into()).await
    }

    /// Buffer one record for a batched insert.
    pub async fn save_batch(&mut self, record: impl Into<Record>) -> storage::Result<()> {
        self.buffer
            .push(self.storage.as_ref(), record.into())
            .await
    }

    /// Write whatever is buffered for `table`.
    pub async fn flush(&mut self, table: Table) -> storage::Result<usize> {
        self.buffer.flush(self.storage.as_ref(), table).await
    }

    /// Write every buffered table. Call at the end of a load.
    pub async fn flush_all(&mut self) -> storage::Result<usize> {
        self.buffer.flush_all(self.storage.as_ref()).await
    }

    pub async fn create_schema(&self) -> storage::Result<()> {
        info!("Creating schema");
        self.storage.create_schema().await
    }

    pub async fn create_indexes(&self) -> storage::Result<()> {
        info!("Creating indexes");
        self.storage.create_indexes().await
    }
}

#[cfg(test)]
mod tests;
