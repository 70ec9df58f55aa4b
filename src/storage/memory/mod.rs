//! In-memory storage backend.
//!
//! All sessions share one state behind an async mutex. A transaction holds
//! that lock for its whole duration, which makes transactions serializable,
//! and keeps a snapshot to restore on rollback. Outside a transaction every
//! call takes the lock once, so single calls (the order counter, the queue
//! claim) are atomic on their own.

mod state;

use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

use self::state::{MemoryState, RowKey};
use super::{helpers, ErrorKind, Result, Storage, StorageError};
use crate::models::{
    Customer, District, History, Item, NewOrder, Order, OrderLine, Record, Stock, StockUpdate,
    Table, Warehouse,
};

struct ActiveTrx {
    guard: OwnedMutexGuard<MemoryState>,
    snapshot: MemoryState,
}

/// Errors queued per operation name by [`MemoryStorage::fail_next`].
#[derive(Default)]
struct FaultPlan {
    pending: Mutex<HashMap<&'static str, VecDeque<ErrorKind>>>,
}

impl FaultPlan {
    async fn check(&self, operation: &'static str) -> Result<()> {
        let mut pending = self.pending.lock().await;
        match pending.get_mut(operation).and_then(VecDeque::pop_front) {
            Some(kind) => Err(injected(operation, kind)),
            None => Ok(()),
        }
    }
}

fn injected(operation: &'static str, kind: ErrorKind) -> StorageError {
    match kind {
        ErrorKind::NotFound => StorageError::not_found(operation, "injected"),
        ErrorKind::Conflict => StorageError::conflict(operation, "injected"),
        ErrorKind::InvalidItem | ErrorKind::Transport => {
            StorageError::Transport(format!("injected fault in {operation}"))
        }
    }
}

#[derive(Default)]
struct TrxCounters {
    started: AtomicU32,
    committed: AtomicU32,
    rolled_back: AtomicU32,
}

/// Transaction bracketing calls observed across all sessions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrxStats {
    pub started: u32,
    pub committed: u32,
    pub rolled_back: u32,
}

/// In-process storage with native (serializable) transactions.
pub struct MemoryStorage {
    state: Arc<Mutex<MemoryState>>,
    trx: Mutex<Option<ActiveTrx>>,
    transactions: bool,
    atomic_claim: bool,
    faults: Arc<FaultPlan>,
    counters: Arc<TrxCounters>,
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self {
            state: Arc::default(),
            trx: Mutex::new(None),
            transactions: true,
            atomic_claim: false,
            faults: Arc::default(),
            counters: Arc::default(),
        }
    }
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// With transactions disabled the bracketing calls are no-ops.
    pub fn with_transactions(mut self, transactions: bool) -> Self {
        self.transactions = transactions;
        self
    }

    /// Remove new-order entries in the claiming call instead of in
    /// `delete_new_order`.
    pub fn with_atomic_claim(mut self, atomic_claim: bool) -> Self {
        self.atomic_claim = atomic_claim;
        self
    }

    /// Make the next `count` calls of `operation` fail with `kind`.
    ///
    /// `operation` is the trait method name, e.g. `"commit_trx"`.
    pub async fn fail_next(&self, operation: &'static str, count: usize, kind: ErrorKind) {
        let mut pending = self.faults.pending.lock().await;
        pending
            .entry(operation)
            .or_default()
            .extend(std::iter::repeat(kind).take(count));
    }

    pub fn trx_stats(&self) -> TrxStats {
        TrxStats {
            started: self.counters.started.load(Ordering::SeqCst),
            committed: self.counters.committed.load(Ordering::SeqCst),
            rolled_back: self.counters.rolled_back.load(Ordering::SeqCst),
        }
    }

    /// Number of rows currently stored for `table`. Injected faults never
    /// apply here.
    pub async fn row_count(&self, table: Table) -> usize {
        self.inspect(|state| state.row_count(table)).await
    }

    /// Run `f` against the state after consuming any fault queued for
    /// `operation`.
    async fn with_state<T, F>(&self, operation: &'static str, f: F) -> Result<T>
    where
        T: Send,
        F: FnOnce(&mut MemoryState) -> Result<T> + Send,
    {
        self.faults.check(operation).await?;
        self.inspect(f).await
    }

    /// Run `f` against the session's transaction state, or against the
    /// shared state under a short-lived lock when no transaction is open.
    async fn inspect<T, F>(&self, f: F) -> T
    where
        T: Send,
        F: FnOnce(&mut MemoryState) -> T + Send,
    {
        let mut trx = self.trx.lock().await;
        match trx.as_mut() {
            Some(active) => f(&mut active.guard),
            None => {
                let mut state = self.state.lock().await;
                f(&mut state)
            }
        }
    }
}

fn district_key(warehouse_id: u32, district_id: u32) -> String {
    format!("w={warehouse_id} d={district_id}")
}

fn customer_key(customer_id: u32, warehouse_id: u32, district_id: u32) -> String {
    format!("w={warehouse_id} d={district_id} c={customer_id}")
}

fn order_key(order_id: u32, warehouse_id: u32, district_id: u32) -> String {
    format!("w={warehouse_id} d={district_id} o={order_id}")
}

fn district_mut(state: &mut MemoryState, w: u32, d: u32) -> Result<&mut District> {
    state
        .districts
        .get_mut(&(w, d))
        .ok_or_else(|| StorageError::not_found("district", district_key(w, d)))
}

fn customer_mut(state: &mut MemoryState, c: u32, w: u32, d: u32) -> Result<&mut Customer> {
    state
        .customers
        .get_mut(&(w, d, c))
        .ok_or_else(|| StorageError::not_found("customer", customer_key(c, w, d)))
}

fn order_ref(state: &MemoryState, o: u32, w: u32, d: u32) -> Result<&Order> {
    state
        .orders
        .get(&(w, d, o))
        .ok_or_else(|| StorageError::not_found("order", order_key(o, w, d)))
}

#[async_trait]
impl Storage for MemoryStorage {
    fn session(&self) -> Arc<dyn Storage> {
        Arc::new(MemoryStorage {
            state: Arc::clone(&self.state),
            trx: Mutex::new(None),
            transactions: self.transactions,
            atomic_claim: self.atomic_claim,
            faults: Arc::clone(&self.faults),
            counters: Arc::clone(&self.counters),
        })
    }

    fn supports_transactions(&self) -> bool {
        self.transactions
    }

    async fn start_trx(&self) -> Result<()> {
        self.faults.check("start_trx").await?;
        if !self.transactions {
            return Ok(());
        }
        let mut trx = self.trx.lock().await;
        if trx.is_some() {
            return Err(StorageError::Transport(
                "transaction already open on this session".to_string(),
            ));
        }
        let guard = Arc::clone(&self.state).lock_owned().await;
        let snapshot = MemoryState::clone(&guard);
        *trx = Some(ActiveTrx { guard, snapshot });
        self.counters.started.fetch_add(1, Ordering::SeqCst);
        debug!("memory transaction started");
        Ok(())
    }

    async fn commit_trx(&self) -> Result<()> {
        self.faults.check("commit_trx").await?;
        if self.trx.lock().await.take().is_some() {
            self.counters.committed.fetch_add(1, Ordering::SeqCst);
            debug!("memory transaction committed");
        }
        Ok(())
    }

    async fn rollback_trx(&self) -> Result<()> {
        if let Some(mut active) = self.trx.lock().await.take() {
            *active.guard = std::mem::take(&mut active.snapshot);
            self.counters.rolled_back.fetch_add(1, Ordering::SeqCst);
            debug!("memory transaction rolled back");
        }
        Ok(())
    }

    async fn create_schema(&self) -> Result<()> {
        Ok(())
    }

    async fn create_indexes(&self) -> Result<()> {
        Ok(())
    }

    async fn insert_one(&self, record: &Record) -> Result<()> {
        let record = record.clone();
        self.with_state("insert_one", move |state| {
            if let Some(key) = RowKey::of(&record) {
                if state.contains(&key) {
                    return Err(StorageError::conflict(
                        record.table().as_str(),
                        format!("duplicate key {key:?}"),
                    ));
                }
            }
            state.put(record);
            Ok(())
        })
        .await
    }

    async fn insert_batch(&self, table: Table, records: &[Record]) -> Result<()> {
        let records = records.to_vec();
        self.with_state("insert_batch", move |state| {
            let total = records.len();
            let mut seen = BTreeSet::new();
            let mut failed = 0;
            let mut first_reason = None;
            for record in &records {
                let reason = if record.table() != table {
                    Some(format!("record for {} in {} batch", record.table(), table))
                } else {
                    RowKey::of(record)
                        .filter(|key| state.contains(key) || !seen.insert(*key))
                        .map(|key| format!("duplicate key {key:?}"))
                };
                if let Some(reason) = reason {
                    failed += 1;
                    first_reason.get_or_insert(reason);
                }
            }
            if let Some(reason) = first_reason {
                return Err(StorageError::BatchRejected {
                    table,
                    failed,
                    total,
                    reason,
                });
            }
            for record in records {
                state.put(record);
            }
            Ok(())
        })
        .await
    }

    async fn increment_district_order_id(
        &self,
        warehouse_id: u32,
        district_id: u32,
    ) -> Result<u32> {
        self.with_state("increment_district_order_id", |state| {
            let district = district_mut(state, warehouse_id, district_id)?;
            let order_id = district.d_next_o_id;
            district.d_next_o_id += 1;
            Ok(order_id)
        })
        .await
    }

    async fn get_new_order(
        &self,
        warehouse_id: u32,
        district_id: u32,
    ) -> Result<Option<NewOrder>> {
        let atomic_claim = self.atomic_claim;
        self.with_state("get_new_order", move |state| {
            let oldest = state.oldest_new_order(warehouse_id, district_id);
            if let (true, Some(entry)) = (atomic_claim, oldest) {
                state
                    .new_orders
                    .remove(&(entry.no_w_id, entry.no_d_id, entry.no_o_id));
            }
            Ok(oldest)
        })
        .await
    }

    async fn check_new_order(
        &self,
        warehouse_id: u32,
        district_id: u32,
    ) -> Result<Option<NewOrder>> {
        self.with_state("check_new_order", |state| {
            Ok(state.oldest_new_order(warehouse_id, district_id))
        })
        .await
    }

    async fn delete_new_order(
        &self,
        order_id: u32,
        warehouse_id: u32,
        district_id: u32,
    ) -> Result<()> {
        if self.atomic_claim {
            return Ok(());
        }
        self.with_state("delete_new_order", |state| {
            if state
                .new_orders
                .remove(&(warehouse_id, district_id, order_id))
            {
                Ok(())
            } else {
                Err(StorageError::not_found(
                    "new_order",
                    order_key(order_id, warehouse_id, district_id),
                ))
            }
        })
        .await
    }

    async fn get_customer(
        &self,
        customer_id: u32,
        warehouse_id: u32,
        district_id: u32,
    ) -> Result<Customer> {
        self.with_state("get_customer", |state| {
            customer_mut(state, customer_id, warehouse_id, district_id).map(|c| c.clone())
        })
        .await
    }

    async fn get_customer_by_name(
        &self,
        last_name: &str,
        warehouse_id: u32,
        district_id: u32,
    ) -> Result<Customer> {
        let last_name = last_name.to_string();
        self.with_state("get_customer_by_name", move |state| {
            let candidates = state
                .district_customers(warehouse_id, district_id)
                .filter(|c| c.c_last == last_name)
                .cloned()
                .collect();
            helpers::select_median(candidates).ok_or_else(|| {
                StorageError::not_found(
                    "customer",
                    format!("{} last={last_name}", district_key(warehouse_id, district_id)),
                )
            })
        })
        .await
    }

    async fn get_customer_id_order(
        &self,
        order_id: u32,
        warehouse_id: u32,
        district_id: u32,
    ) -> Result<u32> {
        self.with_state("get_customer_id_order", |state| {
            order_ref(state, order_id, warehouse_id, district_id).map(|o| o.o_c_id)
        })
        .await
    }

    async fn update_orders(
        &self,
        order_id: u32,
        warehouse_id: u32,
        district_id: u32,
        carrier_id: u32,
        delivery_date: DateTime<Utc>,
    ) -> Result<()> {
        self.with_state("update_orders", |state| {
            let order = state
                .orders
                .get_mut(&(warehouse_id, district_id, order_id))
                .ok_or_else(|| {
                    StorageError::not_found(
                        "order",
                        order_key(order_id, warehouse_id, district_id),
                    )
                })?;
            order.o_carrier_id = Some(carrier_id);
            for line in &mut order.order_lines {
                line.ol_delivery_d = Some(delivery_date);
            }
            Ok(())
        })
        .await
    }

    async fn sum_ol_amount(
        &self,
        order_id: u32,
        warehouse_id: u32,
        district_id: u32,
    ) -> Result<f64> {
        self.with_state("sum_ol_amount", |state| {
            order_ref(state, order_id, warehouse_id, district_id).map(Order::total_amount)
        })
        .await
    }

    async fn update_customer(
        &self,
        customer_id: u32,
        warehouse_id: u32,
        district_id: u32,
        amount: f64,
    ) -> Result<()> {
        self.with_state("update_customer", |state| {
            let customer = customer_mut(state, customer_id, warehouse_id, district_id)?;
            customer.c_balance += amount;
            customer.c_delivery_cnt += 1;
            Ok(())
        })
        .await
    }

    async fn get_next_order_id(&self, warehouse_id: u32, district_id: u32) -> Result<u32> {
        self.with_state("get_next_order_id", |state| {
            district_mut(state, warehouse_id, district_id).map(|d| d.d_next_o_id)
        })
        .await
    }

    async fn get_stock_count(
        &self,
        order_id_lt: u32,
        order_id_ge: u32,
        threshold: i32,
        warehouse_id: u32,
        district_id: u32,
    ) -> Result<u64> {
        self.with_state("get_stock_count", |state| {
            let items: BTreeSet<u32> = state
                .district_orders(warehouse_id, district_id)
                .filter(|o| o.o_id >= order_id_ge && o.o_id < order_id_lt)
                .flat_map(|o| o.order_lines.iter().map(|line| line.ol_i_id))
                .collect();
            let low = items
                .into_iter()
                .filter(|item_id| {
                    state
                        .stock
                        .get(&(warehouse_id, *item_id))
                        .is_some_and(|s| s.s_quantity < threshold)
                })
                .count();
            Ok(low as u64)
        })
        .await
    }

    async fn get_last_order(
        &self,
        customer_id: u32,
        warehouse_id: u32,
        district_id: u32,
    ) -> Result<Order> {
        self.with_state("get_last_order", |state| {
            state
                .district_orders(warehouse_id, district_id)
                .rev()
                .find(|o| o.o_c_id == customer_id)
                .cloned()
                .ok_or_else(|| {
                    StorageError::not_found(
                        "order",
                        format!(
                            "last of {}",
                            customer_key(customer_id, warehouse_id, district_id)
                        ),
                    )
                })
        })
        .await
    }

    async fn get_order_lines(
        &self,
        order_id: u32,
        warehouse_id: u32,
        district_id: u32,
    ) -> Result<Vec<OrderLine>> {
        self.with_state("get_order_lines", |state| {
            order_ref(state, order_id, warehouse_id, district_id)
                .map(|o| o.order_lines.clone())
        })
        .await
    }

    async fn get_warehouse(&self, warehouse_id: u32) -> Result<Warehouse> {
        self.with_state("get_warehouse", |state| {
            state
                .warehouses
                .get(&warehouse_id)
                .cloned()
                .ok_or_else(|| StorageError::not_found("warehouse", format!("w={warehouse_id}")))
        })
        .await
    }

    async fn update_warehouse_balance(&self, warehouse_id: u32, amount: f64) -> Result<()> {
        self.with_state("update_warehouse_balance", |state| {
            let warehouse = state.warehouses.get_mut(&warehouse_id).ok_or_else(|| {
                StorageError::not_found("warehouse", format!("w={warehouse_id}"))
            })?;
            warehouse.w_ytd += amount;
            Ok(())
        })
        .await
    }

    async fn get_district(&self, warehouse_id: u32, district_id: u32) -> Result<District> {
        self.with_state("get_district", |state| {
            district_mut(state, warehouse_id, district_id).map(|d| d.clone())
        })
        .await
    }

    async fn update_district_balance(
        &self,
        warehouse_id: u32,
        district_id: u32,
        amount: f64,
    ) -> Result<()> {
        self.with_state("update_district_balance", |state| {
            district_mut(state, warehouse_id, district_id)?.d_ytd += amount;
            Ok(())
        })
        .await
    }

    async fn insert_history(&self, history: &History) -> Result<()> {
        let history = history.clone();
        self.with_state("insert_history", move |state| {
            state.history.push(history);
            Ok(())
        })
        .await
    }

    async fn update_credit(
        &self,
        customer_id: u32,
        warehouse_id: u32,
        district_id: u32,
        amount: f64,
        data: Option<&str>,
    ) -> Result<()> {
        let data = data.map(str::to_string);
        self.with_state("update_credit", move |state| {
            let customer = customer_mut(state, customer_id, warehouse_id, district_id)?;
            customer.c_balance -= amount;
            customer.c_ytd_payment += amount;
            customer.c_payment_cnt += 1;
            if let Some(data) = data {
                customer.c_data = data;
            }
            Ok(())
        })
        .await
    }

    async fn create_order(&self, order: &Order) -> Result<()> {
        let order = order.clone();
        self.with_state("create_order", move |state| {
            let entry = order.new_order_entry();
            let keys = [
                RowKey::Order(order.o_w_id, order.o_d_id, order.o_id),
                RowKey::NewOrder(entry.no_w_id, entry.no_d_id, entry.no_o_id),
            ];
            if let Some(key) = keys.iter().find(|key| state.contains(key)) {
                return Err(StorageError::conflict(
                    "orders",
                    format!("duplicate key {key:?}"),
                ));
            }
            state.put(Record::NewOrder(entry));
            state.put(Record::Order(order));
            Ok(())
        })
        .await
    }

    async fn get_items(&self, item_ids: &[u32]) -> Result<Vec<Item>> {
        let item_ids = item_ids.to_vec();
        self.with_state("get_items", move |state| {
            Ok(item_ids
                .iter()
                .filter_map(|id| state.items.get(id).cloned())
                .collect())
        })
        .await
    }

    async fn get_stock_info(&self, _district_id: u32, keys: &[(u32, u32)]) -> Result<Vec<Stock>> {
        let keys = keys.to_vec();
        self.with_state("get_stock_info", move |state| {
            Ok(keys
                .iter()
                .filter_map(|&(item_id, supply_w_id)| {
                    state.stock.get(&(supply_w_id, item_id)).cloned()
                })
                .collect())
        })
        .await
    }

    async fn update_stocks(&self, updates: &[StockUpdate]) -> Result<()> {
        let updates = updates.to_vec();
        self.with_state("update_stocks", move |state| {
            if let Some(missing) = updates
                .iter()
                .find(|u| !state.stock.contains_key(&(u.s_w_id, u.s_i_id)))
            {
                return Err(StorageError::not_found(
                    "stock",
                    format!("w={} i={}", missing.s_w_id, missing.s_i_id),
                ));
            }
            for update in updates {
                if let Some(row) = state.stock.get_mut(&(update.s_w_id, update.s_i_id)) {
                    row.s_quantity = update.s_quantity;
                    row.s_ytd = update.s_ytd;
                    row.s_order_cnt = update.s_order_cnt;
                    row.s_remote_cnt = update.s_remote_cnt;
                }
            }
            Ok(())
        })
        .await
    }
}
