//! Unified SQL Storage implementation.
//!
//! Uses a macro to generate implementations for each SQL backend,
//! eliminating code duplication while maintaining type safety.
//!
//! Values are inlined into the statement text by sea-query. A session that
//! has opened a transaction owns it until commit or rollback; every other
//! call runs on the pool. A transaction dropped while still open (a
//! cancelled call, a failed commit) is rolled back by sqlx before its
//! connection is reused.

use std::collections::BTreeMap;
use std::marker::PhantomData;

use sea_query::{Iden, InsertStatement, Query, SimpleExpr};
use sqlx::{Pool, Transaction};
use tokio::sync::Mutex;

use super::schema;
use super::SqlDatabase;
use crate::models::{self, Record, Table};
use crate::storage::helpers::format_timestamp;

/// SQL-based implementation of Storage.
///
/// This generic implementation works with any SQL database that implements
/// the `SqlDatabase` trait (PostgreSQL, SQLite).
pub struct SqlStorage<DB: SqlDatabase> {
    pool: Pool<DB::Db>,
    trx: Mutex<Option<Transaction<'static, DB::Db>>>,
    transactions: bool,
    atomic_claim: bool,
    _marker: PhantomData<DB>,
}

impl<DB: SqlDatabase> SqlStorage<DB> {
    /// Create a new SQL storage with the given pool.
    pub fn new(pool: Pool<DB::Db>) -> Self {
        Self {
            pool,
            trx: Mutex::new(None),
            transactions: true,
            atomic_claim: false,
            _marker: PhantomData,
        }
    }

    /// With transactions disabled the bracketing calls are no-ops.
    pub fn with_transactions(mut self, transactions: bool) -> Self {
        self.transactions = transactions;
        self
    }

    /// Delete new-order entries in the claiming statement.
    pub fn with_atomic_claim(mut self, atomic_claim: bool) -> Self {
        self.atomic_claim = atomic_claim;
        self
    }

    /// Get the underlying pool.
    pub fn pool(&self) -> &Pool<DB::Db> {
        &self.pool
    }

    fn session_handle(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            trx: Mutex::new(None),
            transactions: self.transactions,
            atomic_claim: self.atomic_claim,
            _marker: PhantomData,
        }
    }

    /// One INSERT per table touched, one row per record. Orders also insert
    /// their lines.
    fn insert_statements(records: &[Record]) -> Vec<String> {
        let mut statements: BTreeMap<Table, InsertStatement> = BTreeMap::new();
        for record in records {
            match record {
                Record::Warehouse(w) => {
                    insert_into(
                        &mut statements,
                        Table::Warehouse,
                        schema::Warehouse::Table,
                        schema::Warehouse::COLUMNS,
                    )
                    .values_panic(warehouse_values(w));
                }
                Record::District(d) => {
                    insert_into(
                        &mut statements,
                        Table::District,
                        schema::District::Table,
                        schema::District::COLUMNS,
                    )
                    .values_panic(district_values(d));
                }
                Record::Customer(c) => {
                    insert_into(
                        &mut statements,
                        Table::Customer,
                        schema::Customer::Table,
                        schema::Customer::COLUMNS,
                    )
                    .values_panic(customer_values(c));
                }
                Record::History(h) => {
                    insert_into(
                        &mut statements,
                        Table::History,
                        schema::History::Table,
                        schema::History::COLUMNS,
                    )
                    .values_panic(history_values(h));
                }
                Record::NewOrder(n) => {
                    insert_into(
                        &mut statements,
                        Table::NewOrder,
                        schema::NewOrder::Table,
                        schema::NewOrder::COLUMNS,
                    )
                    .values_panic(new_order_values(n));
                }
                Record::Order(o) => {
                    insert_into(
                        &mut statements,
                        Table::Orders,
                        schema::Orders::Table,
                        schema::Orders::COLUMNS,
                    )
                    .values_panic(order_values(o));
                    for line in &o.order_lines {
                        insert_into(
                            &mut statements,
                            Table::OrderLine,
                            schema::OrderLine::Table,
                            schema::OrderLine::COLUMNS,
                        )
                        .values_panic(order_line_values(line));
                    }
                }
                Record::Item(i) => {
                    insert_into(
                        &mut statements,
                        Table::Item,
                        schema::Item::Table,
                        schema::Item::COLUMNS,
                    )
                    .values_panic(item_values(i));
                }
                Record::Stock(s) => {
                    insert_into(
                        &mut statements,
                        Table::Stock,
                        schema::Stock::Table,
                        schema::Stock::COLUMNS,
                    )
                    .values_panic(stock_values(s));
                }
            }
        }
        statements.into_values().map(DB::build_insert).collect()
    }
}

fn insert_into<T, const N: usize>(
    statements: &mut BTreeMap<Table, InsertStatement>,
    table: Table,
    iden: T,
    columns: [T; N],
) -> &mut InsertStatement
where
    T: Iden + 'static,
{
    statements
        .entry(table)
        .or_insert_with(|| Query::insert().into_table(iden).columns(columns).to_owned())
}

fn warehouse_values(w: &models::Warehouse) -> [SimpleExpr; 9] {
    [
        w.w_id.into(),
        w.w_name.as_str().into(),
        w.w_street_1.as_str().into(),
        w.w_street_2.as_str().into(),
        w.w_city.as_str().into(),
        w.w_state.as_str().into(),
        w.w_zip.as_str().into(),
        w.w_tax.into(),
        w.w_ytd.into(),
    ]
}

fn district_values(d: &models::District) -> [SimpleExpr; 11] {
    [
        d.d_id.into(),
        d.d_w_id.into(),
        d.d_name.as_str().into(),
        d.d_street_1.as_str().into(),
        d.d_street_2.as_str().into(),
        d.d_city.as_str().into(),
        d.d_state.as_str().into(),
        d.d_zip.as_str().into(),
        d.d_tax.into(),
        d.d_ytd.into(),
        d.d_next_o_id.into(),
    ]
}

fn customer_values(c: &models::Customer) -> [SimpleExpr; 21] {
    [
        c.c_id.into(),
        c.c_d_id.into(),
        c.c_w_id.into(),
        c.c_first.as_str().into(),
        c.c_middle.as_str().into(),
        c.c_last.as_str().into(),
        c.c_street_1.as_str().into(),
        c.c_street_2.as_str().into(),
        c.c_city.as_str().into(),
        c.c_state.as_str().into(),
        c.c_zip.as_str().into(),
        c.c_phone.as_str().into(),
        format_timestamp(&c.c_since).into(),
        c.c_credit.as_str().into(),
        c.c_credit_lim.into(),
        c.c_discount.into(),
        c.c_balance.into(),
        c.c_ytd_payment.into(),
        c.c_payment_cnt.into(),
        c.c_delivery_cnt.into(),
        c.c_data.as_str().into(),
    ]
}

fn history_values(h: &models::History) -> [SimpleExpr; 8] {
    [
        h.h_c_id.into(),
        h.h_c_d_id.into(),
        h.h_c_w_id.into(),
        h.h_d_id.into(),
        h.h_w_id.into(),
        format_timestamp(&h.h_date).into(),
        h.h_amount.into(),
        h.h_data.as_str().into(),
    ]
}

fn new_order_values(n: &models::NewOrder) -> [SimpleExpr; 3] {
    [n.no_o_id.into(), n.no_d_id.into(), n.no_w_id.into()]
}

fn order_values(o: &models::Order) -> [SimpleExpr; 8] {
    [
        o.o_id.into(),
        o.o_d_id.into(),
        o.o_w_id.into(),
        o.o_c_id.into(),
        format_timestamp(&o.o_entry_d).into(),
        o.o_carrier_id.into(),
        o.o_ol_cnt.into(),
        i32::from(o.o_all_local).into(),
    ]
}

fn order_line_values(l: &models::OrderLine) -> [SimpleExpr; 10] {
    [
        l.ol_o_id.into(),
        l.ol_d_id.into(),
        l.ol_w_id.into(),
        l.ol_number.into(),
        l.ol_i_id.into(),
        l.ol_supply_w_id.into(),
        l.ol_delivery_d.as_ref().map(format_timestamp).into(),
        l.ol_quantity.into(),
        l.ol_amount.into(),
        l.ol_dist_info.as_str().into(),
    ]
}

fn item_values(i: &models::Item) -> [SimpleExpr; 5] {
    [
        i.i_id.into(),
        i.i_im_id.into(),
        i.i_name.as_str().into(),
        i.i_price.into(),
        i.i_data.as_str().into(),
    ]
}

fn stock_values(s: &models::Stock) -> [SimpleExpr; 17] {
    [
        s.s_i_id.into(),
        s.s_w_id.into(),
        s.s_quantity.into(),
        s.s_dist_01.as_str().into(),
        s.s_dist_02.as_str().into(),
        s.s_dist_03.as_str().into(),
        s.s_dist_04.as_str().into(),
        s.s_dist_05.as_str().into(),
        s.s_dist_06.as_str().into(),
        s.s_dist_07.as_str().into(),
        s.s_dist_08.as_str().into(),
        s.s_dist_09.as_str().into(),
        s.s_dist_10.as_str().into(),
        s.s_ytd.into(),
        s.s_order_cnt.into(),
        s.s_remote_cnt.into(),
        s.s_data.as_str().into(),
    ]
}

/// Macro to implement Storage for a specific SQL backend.
///
/// This eliminates duplication between PostgreSQL and SQLite implementations
/// while maintaining full type safety.
macro_rules! impl_sql_storage {
    ($db_type:ty, $row:ty, $feature:literal) => {
        #[cfg(feature = $feature)]
        impl SqlStorage<$db_type> {
            async fn execute(&self, sql: String) -> crate::storage::Result<u64> {
                tracing::debug!(sql = %sql, "execute");
                let mut trx = self.trx.lock().await;
                let result = match trx.as_mut() {
                    Some(trx) => sqlx::query(&sql).execute(&mut **trx).await?,
                    None => sqlx::query(&sql).execute(&self.pool).await?,
                };
                Ok(result.rows_affected())
            }

            async fn fetch_optional(&self, sql: String) -> crate::storage::Result<Option<$row>> {
                tracing::debug!(sql = %sql, "fetch_optional");
                let mut trx = self.trx.lock().await;
                let row = match trx.as_mut() {
                    Some(trx) => sqlx::query(&sql).fetch_optional(&mut **trx).await?,
                    None => sqlx::query(&sql).fetch_optional(&self.pool).await?,
                };
                Ok(row)
            }

            async fn fetch_all(&self, sql: String) -> crate::storage::Result<Vec<$row>> {
                tracing::debug!(sql = %sql, "fetch_all");
                let mut trx = self.trx.lock().await;
                let rows = match trx.as_mut() {
                    Some(trx) => sqlx::query(&sql).fetch_all(&mut **trx).await?,
                    None => sqlx::query(&sql).fetch_all(&self.pool).await?,
                };
                Ok(rows)
            }

            /// Run statements as one unit: inside the session's transaction
            /// when one is open, otherwise inside a transaction of their own.
            /// Returns rows affected per statement.
            async fn execute_unit(
                &self,
                statements: Vec<String>,
            ) -> crate::storage::Result<Vec<u64>> {
                let mut affected = Vec::with_capacity(statements.len());
                let mut guard = self.trx.lock().await;
                if let Some(trx) = guard.as_mut() {
                    for sql in &statements {
                        tracing::debug!(sql = %sql, "execute");
                        affected.push(sqlx::query(sql).execute(&mut **trx).await?.rows_affected());
                    }
                    return Ok(affected);
                }
                drop(guard);

                if let [sql] = statements.as_slice() {
                    tracing::debug!(sql = %sql, "execute");
                    affected.push(sqlx::query(sql).execute(&self.pool).await?.rows_affected());
                    return Ok(affected);
                }

                let mut trx = self.pool.begin_with(<$db_type as SqlDatabase>::BEGIN).await?;
                for sql in &statements {
                    tracing::debug!(sql = %sql, "execute");
                    affected.push(sqlx::query(sql).execute(&mut *trx).await?.rows_affected());
                }
                trx.commit().await?;
                Ok(affected)
            }
        }

        #[cfg(feature = $feature)]
        #[async_trait::async_trait]
        impl crate::storage::Storage for SqlStorage<$db_type> {
            fn session(&self) -> std::sync::Arc<dyn crate::storage::Storage> {
                std::sync::Arc::new(self.session_handle())
            }

            fn supports_transactions(&self) -> bool {
                self.transactions
            }

            async fn start_trx(&self) -> crate::storage::Result<()> {
                if !self.transactions {
                    return Ok(());
                }
                let mut guard = self.trx.lock().await;
                if guard.is_some() {
                    return Err(crate::storage::StorageError::Transport(
                        "transaction already open on this session".to_string(),
                    ));
                }
                *guard = Some(self.pool.begin_with(<$db_type as SqlDatabase>::BEGIN).await?);
                tracing::debug!("transaction started");
                Ok(())
            }

            async fn commit_trx(&self) -> crate::storage::Result<()> {
                let Some(trx) = self.trx.lock().await.take() else {
                    return Ok(());
                };
                trx.commit().await?;
                tracing::debug!("transaction committed");
                Ok(())
            }

            async fn rollback_trx(&self) -> crate::storage::Result<()> {
                let Some(trx) = self.trx.lock().await.take() else {
                    return Ok(());
                };
                trx.rollback().await?;
                tracing::debug!("transaction rolled back");
                Ok(())
            }

            async fn create_schema(&self) -> crate::storage::Result<()> {
                for ddl in schema::CREATE_TABLES {
                    self.execute(String::from(*ddl)).await?;
                }
                tracing::info!(tables = schema::CREATE_TABLES.len(), "Schema created");
                Ok(())
            }

            async fn create_indexes(&self) -> crate::storage::Result<()> {
                for ddl in schema::CREATE_INDEXES {
                    self.execute(String::from(*ddl)).await?;
                }
                tracing::info!(indexes = schema::CREATE_INDEXES.len(), "Indexes created");
                Ok(())
            }

            async fn insert_one(&self, record: &Record) -> crate::storage::Result<()> {
                let statements = Self::insert_statements(std::slice::from_ref(record));
                self.execute_unit(statements).await?;
                Ok(())
            }

            async fn insert_batch(
                &self,
                table: Table,
                records: &[Record],
            ) -> crate::storage::Result<()> {
                let misplaced: Vec<&Record> =
                    records.iter().filter(|r| r.table() != table).collect();
                if let Some(first) = misplaced.first() {
                    return Err(crate::storage::StorageError::BatchRejected {
                        table,
                        failed: misplaced.len(),
                        total: records.len(),
                        reason: format!("record for {} in {} batch", first.table(), table),
                    });
                }
                if records.is_empty() {
                    return Ok(());
                }
                self.execute_unit(Self::insert_statements(records)).await?;
                Ok(())
            }

            async fn increment_district_order_id(
                &self,
                warehouse_id: u32,
                district_id: u32,
            ) -> crate::storage::Result<u32> {
                use sea_query::{Expr, Query};

                use super::rows::RowExt;
                use schema::District;

                let stmt = Query::update()
                    .table(District::Table)
                    .value(District::DNextOId, Expr::col(District::DNextOId).add(1))
                    .and_where(Expr::col(District::DWId).eq(warehouse_id))
                    .and_where(Expr::col(District::DId).eq(district_id))
                    .returning_col(District::DNextOId)
                    .to_owned();

                let row = self.fetch_optional(<$db_type>::build_update(stmt)).await?;
                match row {
                    Some(row) => Ok(row.id("d_next_o_id")? - 1),
                    None => Err(crate::storage::StorageError::not_found(
                        "district",
                        format!("w={warehouse_id} d={district_id}"),
                    )),
                }
            }

            async fn get_new_order(
                &self,
                warehouse_id: u32,
                district_id: u32,
            ) -> crate::storage::Result<Option<models::NewOrder>> {
                use sea_query::{Expr, Order as SortOrder, Query};

                use schema::NewOrder;

                // sea-query statements are not Send; render before awaiting.
                let sql = {
                    let mut oldest = Query::select()
                        .column(NewOrder::NoOId)
                        .from(NewOrder::Table)
                        .and_where(Expr::col(NewOrder::NoWId).eq(warehouse_id))
                        .and_where(Expr::col(NewOrder::NoDId).eq(district_id))
                        .order_by(NewOrder::NoOId, SortOrder::Asc)
                        .limit(1)
                        .to_owned();
                    <$db_type>::lock_unclaimed(&mut oldest);

                    if self.atomic_claim {
                        let stmt = Query::delete()
                            .from_table(NewOrder::Table)
                            .and_where(Expr::col(NewOrder::NoWId).eq(warehouse_id))
                            .and_where(Expr::col(NewOrder::NoDId).eq(district_id))
                            .and_where(Expr::col(NewOrder::NoOId).in_subquery(oldest))
                            .returning(Query::returning().columns(NewOrder::COLUMNS))
                            .to_owned();
                        <$db_type>::build_delete(stmt)
                    } else {
                        oldest.columns([NewOrder::NoDId, NewOrder::NoWId]);
                        <$db_type>::build_select(oldest)
                    }
                };

                self.fetch_optional(sql)
                    .await?
                    .map(|row| super::rows::new_order(&row))
                    .transpose()
            }

            async fn check_new_order(
                &self,
                warehouse_id: u32,
                district_id: u32,
            ) -> crate::storage::Result<Option<models::NewOrder>> {
                use sea_query::{Expr, Order as SortOrder, Query};

                use schema::NewOrder;

                let stmt = Query::select()
                    .columns(NewOrder::COLUMNS)
                    .from(NewOrder::Table)
                    .and_where(Expr::col(NewOrder::NoWId).eq(warehouse_id))
                    .and_where(Expr::col(NewOrder::NoDId).eq(district_id))
                    .order_by(NewOrder::NoOId, SortOrder::Asc)
                    .limit(1)
                    .to_owned();

                self.fetch_optional(<$db_type>::build_select(stmt))
                    .await?
                    .map(|row| super::rows::new_order(&row))
                    .transpose()
            }

            async fn delete_new_order(
                &self,
                order_id: u32,
                warehouse_id: u32,
                district_id: u32,
            ) -> crate::storage::Result<()> {
                use sea_query::{Expr, Query};

                use schema::NewOrder;

                if self.atomic_claim {
                    return Ok(());
                }

                let stmt = Query::delete()
                    .from_table(NewOrder::Table)
                    .and_where(Expr::col(NewOrder::NoWId).eq(warehouse_id))
                    .and_where(Expr::col(NewOrder::NoDId).eq(district_id))
                    .and_where(Expr::col(NewOrder::NoOId).eq(order_id))
                    .to_owned();

                match self.execute(<$db_type>::build_delete(stmt)).await? {
                    0 => Err(crate::storage::StorageError::not_found(
                        "new_order",
                        format!("w={warehouse_id} d={district_id} o={order_id}"),
                    )),
                    _ => Ok(()),
                }
            }

            async fn get_customer(
                &self,
                customer_id: u32,
                warehouse_id: u32,
                district_id: u32,
            ) -> crate::storage::Result<models::Customer> {
                use sea_query::{Expr, Query};

                use schema::Customer;

                let stmt = Query::select()
                    .columns(Customer::COLUMNS)
                    .from(Customer::Table)
                    .and_where(Expr::col(Customer::CWId).eq(warehouse_id))
                    .and_where(Expr::col(Customer::CDId).eq(district_id))
                    .and_where(Expr::col(Customer::CId).eq(customer_id))
                    .to_owned();

                match self.fetch_optional(<$db_type>::build_select(stmt)).await? {
                    Some(row) => super::rows::customer(&row),
                    None => Err(crate::storage::StorageError::not_found(
                        "customer",
                        format!("w={warehouse_id} d={district_id} c={customer_id}"),
                    )),
                }
            }

            async fn get_customer_by_name(
                &self,
                last_name: &str,
                warehouse_id: u32,
                district_id: u32,
            ) -> crate::storage::Result<models::Customer> {
                use sea_query::{Expr, Order as SortOrder, Query};

                use schema::Customer;

                let stmt = Query::select()
                    .columns(Customer::COLUMNS)
                    .from(Customer::Table)
                    .and_where(Expr::col(Customer::CWId).eq(warehouse_id))
                    .and_where(Expr::col(Customer::CDId).eq(district_id))
                    .and_where(Expr::col(Customer::CLast).eq(last_name))
                    .order_by(Customer::CId, SortOrder::Asc)
                    .to_owned();

                let candidates = self
                    .fetch_all(<$db_type>::build_select(stmt))
                    .await?
                    .iter()
                    .map(super::rows::customer)
                    .collect::<crate::storage::Result<Vec<_>>>()?;

                crate::storage::helpers::select_median(candidates).ok_or_else(|| {
                    crate::storage::StorageError::not_found(
                        "customer",
                        format!("w={warehouse_id} d={district_id} last={last_name}"),
                    )
                })
            }

            async fn get_customer_id_order(
                &self,
                order_id: u32,
                warehouse_id: u32,
                district_id: u32,
            ) -> crate::storage::Result<u32> {
                use sea_query::{Expr, Query};

                use super::rows::RowExt;
                use schema::Orders;

                let stmt = Query::select()
                    .column(Orders::OCId)
                    .from(Orders::Table)
                    .and_where(Expr::col(Orders::OWId).eq(warehouse_id))
                    .and_where(Expr::col(Orders::ODId).eq(district_id))
                    .and_where(Expr::col(Orders::OId).eq(order_id))
                    .to_owned();

                match self.fetch_optional(<$db_type>::build_select(stmt)).await? {
                    Some(row) => row.id("o_c_id"),
                    None => Err(crate::storage::StorageError::not_found(
                        "order",
                        format!("w={warehouse_id} d={district_id} o={order_id}"),
                    )),
                }
            }

            async fn update_orders(
                &self,
                order_id: u32,
                warehouse_id: u32,
                district_id: u32,
                carrier_id: u32,
                delivery_date: chrono::DateTime<chrono::Utc>,
            ) -> crate::storage::Result<()> {
                use sea_query::{Expr, Query};

                use schema::{OrderLine, Orders};

                let order = Query::update()
                    .table(Orders::Table)
                    .value(Orders::OCarrierId, carrier_id)
                    .and_where(Expr::col(Orders::OWId).eq(warehouse_id))
                    .and_where(Expr::col(Orders::ODId).eq(district_id))
                    .and_where(Expr::col(Orders::OId).eq(order_id))
                    .to_owned();
                let lines = Query::update()
                    .table(OrderLine::Table)
                    .value(OrderLine::OlDeliveryD, format_timestamp(&delivery_date))
                    .and_where(Expr::col(OrderLine::OlWId).eq(warehouse_id))
                    .and_where(Expr::col(OrderLine::OlDId).eq(district_id))
                    .and_where(Expr::col(OrderLine::OlOId).eq(order_id))
                    .to_owned();

                let affected = self
                    .execute_unit(vec![
                        <$db_type>::build_update(order),
                        <$db_type>::build_update(lines),
                    ])
                    .await?;
                if affected.first() == Some(&0) {
                    return Err(crate::storage::StorageError::not_found(
                        "order",
                        format!("w={warehouse_id} d={district_id} o={order_id}"),
                    ));
                }
                Ok(())
            }

            async fn sum_ol_amount(
                &self,
                order_id: u32,
                warehouse_id: u32,
                district_id: u32,
            ) -> crate::storage::Result<f64> {
                use sea_query::{Alias, Expr, Query};

                use super::rows::RowExt;
                use schema::OrderLine;

                let stmt = Query::select()
                    .expr_as(Expr::col(OrderLine::OlAmount).sum(), Alias::new("total"))
                    .from(OrderLine::Table)
                    .and_where(Expr::col(OrderLine::OlWId).eq(warehouse_id))
                    .and_where(Expr::col(OrderLine::OlDId).eq(district_id))
                    .and_where(Expr::col(OrderLine::OlOId).eq(order_id))
                    .to_owned();

                match self.fetch_optional(<$db_type>::build_select(stmt)).await? {
                    Some(row) => Ok(row.opt_float("total")?.unwrap_or_default()),
                    None => Ok(0.0),
                }
            }

            async fn update_customer(
                &self,
                customer_id: u32,
                warehouse_id: u32,
                district_id: u32,
                amount: f64,
            ) -> crate::storage::Result<()> {
                use sea_query::{Expr, Query};

                use schema::Customer;

                let stmt = Query::update()
                    .table(Customer::Table)
                    .value(Customer::CBalance, Expr::col(Customer::CBalance).add(amount))
                    .value(Customer::CDeliveryCnt, Expr::col(Customer::CDeliveryCnt).add(1))
                    .and_where(Expr::col(Customer::CWId).eq(warehouse_id))
                    .and_where(Expr::col(Customer::CDId).eq(district_id))
                    .and_where(Expr::col(Customer::CId).eq(customer_id))
                    .to_owned();

                match self.execute(<$db_type>::build_update(stmt)).await? {
                    0 => Err(crate::storage::StorageError::not_found(
                        "customer",
                        format!("w={warehouse_id} d={district_id} c={customer_id}"),
                    )),
                    _ => Ok(()),
                }
            }

            async fn get_next_order_id(
                &self,
                warehouse_id: u32,
                district_id: u32,
            ) -> crate::storage::Result<u32> {
                use sea_query::{Expr, Query};

                use super::rows::RowExt;
                use schema::District;

                let stmt = Query::select()
                    .column(District::DNextOId)
                    .from(District::Table)
                    .and_where(Expr::col(District::DWId).eq(warehouse_id))
                    .and_where(Expr::col(District::DId).eq(district_id))
                    .to_owned();

                match self.fetch_optional(<$db_type>::build_select(stmt)).await? {
                    Some(row) => row.id("d_next_o_id"),
                    None => Err(crate::storage::StorageError::not_found(
                        "district",
                        format!("w={warehouse_id} d={district_id}"),
                    )),
                }
            }

            async fn get_stock_count(
                &self,
                order_id_lt: u32,
                order_id_ge: u32,
                threshold: i32,
                warehouse_id: u32,
                district_id: u32,
            ) -> crate::storage::Result<u64> {
                use sea_query::{Expr, Query};

                use schema::{OrderLine, Stock};

                let stmt = Query::select()
                    .distinct()
                    .column((Stock::Table, Stock::SIId))
                    .from(OrderLine::Table)
                    .inner_join(
                        Stock::Table,
                        Expr::col((Stock::Table, Stock::SIId))
                            .equals((OrderLine::Table, OrderLine::OlIId)),
                    )
                    .and_where(Expr::col((OrderLine::Table, OrderLine::OlWId)).eq(warehouse_id))
                    .and_where(Expr::col((OrderLine::Table, OrderLine::OlDId)).eq(district_id))
                    .and_where(Expr::col((OrderLine::Table, OrderLine::OlOId)).lt(order_id_lt))
                    .and_where(Expr::col((OrderLine::Table, OrderLine::OlOId)).gte(order_id_ge))
                    .and_where(Expr::col((Stock::Table, Stock::SWId)).eq(warehouse_id))
                    .and_where(Expr::col((Stock::Table, Stock::SQuantity)).lt(threshold))
                    .to_owned();

                let rows = self.fetch_all(<$db_type>::build_select(stmt)).await?;
                Ok(rows.len() as u64)
            }

            async fn get_last_order(
                &self,
                customer_id: u32,
                warehouse_id: u32,
                district_id: u32,
            ) -> crate::storage::Result<models::Order> {
                use sea_query::{Expr, Order as SortOrder, Query};

                use schema::Orders;

                let stmt = Query::select()
                    .columns(Orders::COLUMNS)
                    .from(Orders::Table)
                    .and_where(Expr::col(Orders::OWId).eq(warehouse_id))
                    .and_where(Expr::col(Orders::ODId).eq(district_id))
                    .and_where(Expr::col(Orders::OCId).eq(customer_id))
                    .order_by(Orders::OId, SortOrder::Desc)
                    .limit(1)
                    .to_owned();

                let mut order = match self.fetch_optional(<$db_type>::build_select(stmt)).await? {
                    Some(row) => super::rows::order(&row)?,
                    None => {
                        return Err(crate::storage::StorageError::not_found(
                            "order",
                            format!("last of w={warehouse_id} d={district_id} c={customer_id}"),
                        ))
                    }
                };
                order.order_lines = self
                    .get_order_lines(order.o_id, warehouse_id, district_id)
                    .await?;
                Ok(order)
            }

            async fn get_order_lines(
                &self,
                order_id: u32,
                warehouse_id: u32,
                district_id: u32,
            ) -> crate::storage::Result<Vec<models::OrderLine>> {
                use sea_query::{Expr, Order as SortOrder, Query};

                use schema::OrderLine;

                let stmt = Query::select()
                    .columns(OrderLine::COLUMNS)
                    .from(OrderLine::Table)
                    .and_where(Expr::col(OrderLine::OlWId).eq(warehouse_id))
                    .and_where(Expr::col(OrderLine::OlDId).eq(district_id))
                    .and_where(Expr::col(OrderLine::OlOId).eq(order_id))
                    .order_by(OrderLine::OlNumber, SortOrder::Asc)
                    .to_owned();

                self.fetch_all(<$db_type>::build_select(stmt))
                    .await?
                    .iter()
                    .map(super::rows::order_line)
                    .collect()
            }

            async fn get_warehouse(
                &self,
                warehouse_id: u32,
            ) -> crate::storage::Result<models::Warehouse> {
                use sea_query::{Expr, Query};

                use schema::Warehouse;

                let stmt = Query::select()
                    .columns(Warehouse::COLUMNS)
                    .from(Warehouse::Table)
                    .and_where(Expr::col(Warehouse::WId).eq(warehouse_id))
                    .to_owned();

                match self.fetch_optional(<$db_type>::build_select(stmt)).await? {
                    Some(row) => super::rows::warehouse(&row),
                    None => Err(crate::storage::StorageError::not_found(
                        "warehouse",
                        format!("w={warehouse_id}"),
                    )),
                }
            }

            async fn update_warehouse_balance(
                &self,
                warehouse_id: u32,
                amount: f64,
            ) -> crate::storage::Result<()> {
                use sea_query::{Expr, Query};

                use schema::Warehouse;

                let stmt = Query::update()
                    .table(Warehouse::Table)
                    .value(Warehouse::WYtd, Expr::col(Warehouse::WYtd).add(amount))
                    .and_where(Expr::col(Warehouse::WId).eq(warehouse_id))
                    .to_owned();

                match self.execute(<$db_type>::build_update(stmt)).await? {
                    0 => Err(crate::storage::StorageError::not_found(
                        "warehouse",
                        format!("w={warehouse_id}"),
                    )),
                    _ => Ok(()),
                }
            }

            async fn get_district(
                &self,
                warehouse_id: u32,
                district_id: u32,
            ) -> crate::storage::Result<models::District> {
                use sea_query::{Expr, Query};

                use schema::District;

                let stmt = Query::select()
                    .columns(District::COLUMNS)
                    .from(District::Table)
                    .and_where(Expr::col(District::DWId).eq(warehouse_id))
                    .and_where(Expr::col(District::DId).eq(district_id))
                    .to_owned();

                match self.fetch_optional(<$db_type>::build_select(stmt)).await? {
                    Some(row) => super::rows::district(&row),
                    None => Err(crate::storage::StorageError::not_found(
                        "district",
                        format!("w={warehouse_id} d={district_id}"),
                    )),
                }
            }

            async fn update_district_balance(
                &self,
                warehouse_id: u32,
                district_id: u32,
                amount: f64,
            ) -> crate::storage::Result<()> {
                use sea_query::{Expr, Query};

                use schema::District;

                let stmt = Query::update()
                    .table(District::Table)
                    .value(District::DYtd, Expr::col(District::DYtd).add(amount))
                    .and_where(Expr::col(District::DWId).eq(warehouse_id))
                    .and_where(Expr::col(District::DId).eq(district_id))
                    .to_owned();

                match self.execute(<$db_type>::build_update(stmt)).await? {
                    0 => Err(crate::storage::StorageError::not_found(
                        "district",
                        format!("w={warehouse_id} d={district_id}"),
                    )),
                    _ => Ok(()),
                }
            }

            async fn insert_history(
                &self,
                history: &models::History,
            ) -> crate::storage::Result<()> {
                let statements = Self::insert_statements(&[Record::History(history.clone())]);
                self.execute_unit(statements).await?;
                Ok(())
            }

            async fn update_credit(
                &self,
                customer_id: u32,
                warehouse_id: u32,
                district_id: u32,
                amount: f64,
                data: Option<&str>,
            ) -> crate::storage::Result<()> {
                use sea_query::{Expr, Query};

                use schema::Customer;

                let sql = {
                    let mut stmt = Query::update()
                        .table(Customer::Table)
                        .value(Customer::CBalance, Expr::col(Customer::CBalance).sub(amount))
                        .value(Customer::CYtdPayment, Expr::col(Customer::CYtdPayment).add(amount))
                        .value(Customer::CPaymentCnt, Expr::col(Customer::CPaymentCnt).add(1))
                        .and_where(Expr::col(Customer::CWId).eq(warehouse_id))
                        .and_where(Expr::col(Customer::CDId).eq(district_id))
                        .and_where(Expr::col(Customer::CId).eq(customer_id))
                        .to_owned();
                    if let Some(data) = data {
                        stmt.value(Customer::CData, data);
                    }
                    <$db_type>::build_update(stmt)
                };

                match self.execute(sql).await? {
                    0 => Err(crate::storage::StorageError::not_found(
                        "customer",
                        format!("w={warehouse_id} d={district_id} c={customer_id}"),
                    )),
                    _ => Ok(()),
                }
            }

            async fn create_order(&self, order: &models::Order) -> crate::storage::Result<()> {
                let records = [
                    Record::Order(order.clone()),
                    Record::NewOrder(order.new_order_entry()),
                ];
                self.execute_unit(Self::insert_statements(&records)).await?;
                Ok(())
            }

            async fn get_items(
                &self,
                item_ids: &[u32],
            ) -> crate::storage::Result<Vec<models::Item>> {
                use sea_query::{Expr, Query};

                use schema::Item;

                if item_ids.is_empty() {
                    return Ok(Vec::new());
                }

                let stmt = Query::select()
                    .columns(Item::COLUMNS)
                    .from(Item::Table)
                    .and_where(Expr::col(Item::IId).is_in(item_ids.iter().copied()))
                    .to_owned();

                self.fetch_all(<$db_type>::build_select(stmt))
                    .await?
                    .iter()
                    .map(super::rows::item)
                    .collect()
            }

            async fn get_stock_info(
                &self,
                _district_id: u32,
                keys: &[(u32, u32)],
            ) -> crate::storage::Result<Vec<models::Stock>> {
                use sea_query::{Cond, Expr, Query};

                use schema::Stock;

                if keys.is_empty() {
                    return Ok(Vec::new());
                }

                let sql = {
                    let mut any = Cond::any();
                    for &(item_id, supply_w_id) in keys {
                        any = any.add(
                            Cond::all()
                                .add(Expr::col(Stock::SIId).eq(item_id))
                                .add(Expr::col(Stock::SWId).eq(supply_w_id)),
                        );
                    }
                    let mut stmt = Query::select()
                        .columns(Stock::COLUMNS)
                        .from(Stock::Table)
                        .cond_where(any)
                        .to_owned();
                    <$db_type>::lock_rows(&mut stmt);
                    <$db_type>::build_select(stmt)
                };

                self.fetch_all(sql)
                    .await?
                    .iter()
                    .map(super::rows::stock)
                    .collect()
            }

            async fn update_stocks(
                &self,
                updates: &[models::StockUpdate],
            ) -> crate::storage::Result<()> {
                use sea_query::{Expr, Query};

                use schema::Stock;

                if updates.is_empty() {
                    return Ok(());
                }

                let statements = updates
                    .iter()
                    .map(|u| {
                        let stmt = Query::update()
                            .table(Stock::Table)
                            .value(Stock::SQuantity, u.s_quantity)
                            .value(Stock::SYtd, u.s_ytd)
                            .value(Stock::SOrderCnt, u.s_order_cnt)
                            .value(Stock::SRemoteCnt, u.s_remote_cnt)
                            .and_where(Expr::col(Stock::SIId).eq(u.s_i_id))
                            .and_where(Expr::col(Stock::SWId).eq(u.s_w_id))
                            .to_owned();
                        <$db_type>::build_update(stmt)
                    })
                    .collect();

                let affected = self.execute_unit(statements).await?;
                if let Some(index) = affected.iter().position(|&n| n == 0) {
                    let missing = &updates[index];
                    return Err(crate::storage::StorageError::not_found(
                        "stock",
                        format!("w={} i={}", missing.s_w_id, missing.s_i_id),
                    ));
                }
                Ok(())
            }
        }
    };
}

// Generate implementations for each SQL backend
impl_sql_storage!(super::postgres::Postgres, sqlx::postgres::PgRow, "postgres");
impl_sql_storage!(super::sqlite::Sqlite, sqlx::sqlite::SqliteRow, "sqlite");
