//! Per-table insert buffering for the load phase.

use std::collections::HashMap;

use tracing::debug;

use crate::models::{Record, Table};
use crate::storage::{Result, Storage};

/// Pending records per table.
///
/// Each append checks its table's buffer: when the buffered count is a
/// multiple of the batch size the buffer is written with one
/// `insert_batch` call and cleared. Nothing else flushes; a partial batch
/// stays buffered until [`BatchBuffer::flush`] or
/// [`BatchBuffer::flush_all`] is called.
#[derive(Debug)]
pub struct BatchBuffer {
    batch_size: usize,
    pending: HashMap<Table, Vec<Record>>,
}

impl BatchBuffer {
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size,
            pending: HashMap::new(),
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Applies to the next append; already buffered records stay put.
    pub fn set_batch_size(&mut self, batch_size: usize) {
        self.batch_size = batch_size;
    }

    pub fn pending(&self, table: Table) -> usize {
        self.pending.get(&table).map_or(0, Vec::len)
    }

    pub fn total_pending(&self) -> usize {
        self.pending.values().map(Vec::len).sum()
    }

    /// Buffer `record`, writing its table's batch if it just filled up.
    pub async fn push(&mut self, storage: &dyn Storage, record: Record) -> Result<()> {
        let table = record.table();
        let buffered = {
            let buffer = self.pending.entry(table).or_default();
            buffer.push(record);
            buffer.len()
        };

        // A batch size of zero writes every record as it arrives.
        if buffered % self.batch_size.max(1) == 0 {
            self.flush(storage, table).await?;
        }
        Ok(())
    }

    /// Write and clear one table's buffer. Returns the number of records
    /// written.
    ///
    /// On failure the records stay buffered.
    pub async fn flush(&mut self, storage: &dyn Storage, table: Table) -> Result<usize> {
        let records = match self.pending.get_mut(&table) {
            Some(buffer) if !buffer.is_empty() => std::mem::take(buffer),
            _ => return Ok(0),
        };

        debug!(%table, count = records.len(), "Flushing batch");
        match storage.insert_batch(table, &records).await {
            Ok(()) => Ok(records.len()),
            Err(e) => {
                let buffer = self.pending.entry(table).or_default();
                let newer = std::mem::replace(buffer, records);
                buffer.extend(newer);
                Err(e)
            }
        }
    }

    /// Flush every table in [`Table::ALL`] order, stopping at the first
    /// failure.
    pub async fn flush_all(&mut self, storage: &dyn Storage) -> Result<usize> {
        let mut written = 0;
        for table in Table::ALL {
            written += self.flush(storage, table).await?;
        }
        Ok(written)
    }
}
