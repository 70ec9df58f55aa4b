//! Storage trait definition.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::Result;
use crate::models::{
    Customer, District, History, Item, NewOrder, Order, OrderLine, Record, Stock, StockUpdate,
    Table, Warehouse,
};

/// Interface every backend implements for the TPC-C profiles.
///
/// Each call appears atomic to the caller whatever the backend guarantees
/// natively. Backends without multi-statement transactions treat the
/// bracketing calls as no-ops and instead rely on single-operation atomic
/// primitives for the order-id counter and the new-order claim.
///
/// Identifiers are passed as `(…, warehouse_id, district_id)` in the same
/// order for every entity keyed below a district.
///
/// Implementations:
/// - `MemoryStorage`: in-process store
/// - `SqliteStorage` / `PostgresStorage`: relational, native transactions
/// - `ElasticsearchStorage`: search index, versioned documents
#[async_trait]
pub trait Storage: Send + Sync {
    /// Open a handle for one worker.
    ///
    /// Handles share the backend's connections and data but each carries its
    /// own transaction scope, so one orchestrator per handle may run in
    /// parallel with others.
    fn session(&self) -> Arc<dyn Storage>;

    /// Whether `start_trx` / `commit_trx` / `rollback_trx` are real.
    fn supports_transactions(&self) -> bool;

    async fn start_trx(&self) -> Result<()>;

    async fn commit_trx(&self) -> Result<()>;

    async fn rollback_trx(&self) -> Result<()>;

    /// Create tables / collections. Idempotent.
    async fn create_schema(&self) -> Result<()>;

    /// Create secondary indexes. Idempotent.
    async fn create_indexes(&self) -> Result<()>;

    /// Insert a single record. Insert-only: an existing key is a conflict.
    async fn insert_one(&self, record: &Record) -> Result<()>;

    /// Insert records bound for `table`.
    ///
    /// Either every record is stored or an error is returned; records are
    /// never silently dropped.
    async fn insert_batch(&self, table: Table, records: &[Record]) -> Result<()>;

    /// Atomically advance the district's order counter.
    ///
    /// Returns the pre-increment value, which is the id assigned to the
    /// order being created.
    async fn increment_district_order_id(&self, warehouse_id: u32, district_id: u32)
        -> Result<u32>;

    /// Claim the oldest undelivered order of a district.
    ///
    /// With atomic claims enabled the entry is removed by this call, so two
    /// concurrent claimants never receive the same order. Otherwise the entry
    /// is locked for the current transaction and removed by
    /// [`Storage::delete_new_order`]. `None` when the queue is empty.
    async fn get_new_order(&self, warehouse_id: u32, district_id: u32)
        -> Result<Option<NewOrder>>;

    /// Peek at the oldest undelivered order without claiming it.
    async fn check_new_order(
        &self,
        warehouse_id: u32,
        district_id: u32,
    ) -> Result<Option<NewOrder>>;

    /// Remove a queue entry. A no-op when atomic claims already removed it.
    async fn delete_new_order(&self, order_id: u32, warehouse_id: u32, district_id: u32)
        -> Result<()>;

    async fn get_customer(&self, customer_id: u32, warehouse_id: u32, district_id: u32)
        -> Result<Customer>;

    /// Resolve a customer by last name.
    ///
    /// Candidates are ordered by customer id and the one at position
    /// `(n - 1) / 2` is returned.
    async fn get_customer_by_name(
        &self,
        last_name: &str,
        warehouse_id: u32,
        district_id: u32,
    ) -> Result<Customer>;

    /// Customer id that placed an order.
    async fn get_customer_id_order(
        &self,
        order_id: u32,
        warehouse_id: u32,
        district_id: u32,
    ) -> Result<u32>;

    /// Set the carrier and stamp every line's delivery date.
    async fn update_orders(
        &self,
        order_id: u32,
        warehouse_id: u32,
        district_id: u32,
        carrier_id: u32,
        delivery_date: DateTime<Utc>,
    ) -> Result<()>;

    async fn sum_ol_amount(&self, order_id: u32, warehouse_id: u32, district_id: u32)
        -> Result<f64>;

    /// Credit a delivered order's total to the customer.
    async fn update_customer(
        &self,
        customer_id: u32,
        warehouse_id: u32,
        district_id: u32,
        amount: f64,
    ) -> Result<()>;

    async fn get_next_order_id(&self, warehouse_id: u32, district_id: u32) -> Result<u32>;

    /// Count distinct items referenced by orders with ids in
    /// `[order_id_ge, order_id_lt)` whose home-warehouse stock is below
    /// `threshold`.
    async fn get_stock_count(
        &self,
        order_id_lt: u32,
        order_id_ge: u32,
        threshold: i32,
        warehouse_id: u32,
        district_id: u32,
    ) -> Result<u64>;

    /// The customer's order with the highest id.
    async fn get_last_order(&self, customer_id: u32, warehouse_id: u32, district_id: u32)
        -> Result<Order>;

    /// Lines of an order in ascending line-number order.
    async fn get_order_lines(
        &self,
        order_id: u32,
        warehouse_id: u32,
        district_id: u32,
    ) -> Result<Vec<OrderLine>>;

    async fn get_warehouse(&self, warehouse_id: u32) -> Result<Warehouse>;

    async fn update_warehouse_balance(&self, warehouse_id: u32, amount: f64) -> Result<()>;

    async fn get_district(&self, warehouse_id: u32, district_id: u32) -> Result<District>;

    async fn update_district_balance(
        &self,
        warehouse_id: u32,
        district_id: u32,
        amount: f64,
    ) -> Result<()>;

    async fn insert_history(&self, history: &History) -> Result<()>;

    /// Apply a payment to a customer in one write: balance decreases by
    /// `amount`, year-to-date payment and payment count increase, and the
    /// data field is replaced when `data` is given.
    async fn update_credit(
        &self,
        customer_id: u32,
        warehouse_id: u32,
        district_id: u32,
        amount: f64,
        data: Option<&str>,
    ) -> Result<()>;

    /// Store an order, its lines and its new-order queue entry as one unit.
    async fn create_order(&self, order: &Order) -> Result<()>;

    /// Fetch catalog items. Unknown ids are absent from the result.
    async fn get_items(&self, item_ids: &[u32]) -> Result<Vec<Item>>;

    /// Fetch stock rows for `(item_id, supply_warehouse_id)` pairs.
    /// Rows that do not exist are absent from the result.
    async fn get_stock_info(&self, district_id: u32, keys: &[(u32, u32)]) -> Result<Vec<Stock>>;

    async fn update_stocks(&self, updates: &[StockUpdate]) -> Result<()>;
}
