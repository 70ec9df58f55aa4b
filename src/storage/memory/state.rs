//! Tables held by the in-memory backend.

use std::collections::{BTreeMap, BTreeSet};

use crate::models::{
    Customer, District, History, Item, NewOrder, Order, Record, Stock, Table, Warehouse,
};

/// Primary key of a stored row. History rows have none.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(super) enum RowKey {
    Warehouse(u32),
    District(u32, u32),
    Customer(u32, u32, u32),
    NewOrder(u32, u32, u32),
    Order(u32, u32, u32),
    Item(u32),
    Stock(u32, u32),
}

impl RowKey {
    pub(super) fn of(record: &Record) -> Option<RowKey> {
        match record {
            Record::Warehouse(w) => Some(RowKey::Warehouse(w.w_id)),
            Record::District(d) => Some(RowKey::District(d.d_w_id, d.d_id)),
            Record::Customer(c) => Some(RowKey::Customer(c.c_w_id, c.c_d_id, c.c_id)),
            Record::History(_) => None,
            Record::NewOrder(n) => Some(RowKey::NewOrder(n.no_w_id, n.no_d_id, n.no_o_id)),
            Record::Order(o) => Some(RowKey::Order(o.o_w_id, o.o_d_id, o.o_id)),
            Record::Item(i) => Some(RowKey::Item(i.i_id)),
            Record::Stock(s) => Some(RowKey::Stock(s.s_w_id, s.s_i_id)),
        }
    }
}

/// All rows, keyed warehouse-first so district scans are range queries.
///
/// Orders embed their lines.
#[derive(Debug, Clone, Default)]
pub(super) struct MemoryState {
    pub warehouses: BTreeMap<u32, Warehouse>,
    pub districts: BTreeMap<(u32, u32), District>,
    pub customers: BTreeMap<(u32, u32, u32), Customer>,
    pub history: Vec<History>,
    pub new_orders: BTreeSet<(u32, u32, u32)>,
    pub orders: BTreeMap<(u32, u32, u32), Order>,
    pub items: BTreeMap<u32, Item>,
    pub stock: BTreeMap<(u32, u32), Stock>,
}

impl MemoryState {
    pub fn contains(&self, key: &RowKey) -> bool {
        match *key {
            RowKey::Warehouse(w) => self.warehouses.contains_key(&w),
            RowKey::District(w, d) => self.districts.contains_key(&(w, d)),
            RowKey::Customer(w, d, c) => self.customers.contains_key(&(w, d, c)),
            RowKey::NewOrder(w, d, o) => self.new_orders.contains(&(w, d, o)),
            RowKey::Order(w, d, o) => self.orders.contains_key(&(w, d, o)),
            RowKey::Item(i) => self.items.contains_key(&i),
            RowKey::Stock(w, i) => self.stock.contains_key(&(w, i)),
        }
    }

    /// Store a record without checking for an existing key.
    pub fn put(&mut self, record: Record) {
        match record {
            Record::Warehouse(w) => {
                self.warehouses.insert(w.w_id, w);
            }
            Record::District(d) => {
                self.districts.insert((d.d_w_id, d.d_id), d);
            }
            Record::Customer(c) => {
                self.customers.insert((c.c_w_id, c.c_d_id, c.c_id), c);
            }
            Record::History(h) => self.history.push(h),
            Record::NewOrder(n) => {
                self.new_orders.insert((n.no_w_id, n.no_d_id, n.no_o_id));
            }
            Record::Order(mut o) => {
                o.order_lines.sort_by_key(|line| line.ol_number);
                self.orders.insert((o.o_w_id, o.o_d_id, o.o_id), o);
            }
            Record::Item(i) => {
                self.items.insert(i.i_id, i);
            }
            Record::Stock(s) => {
                self.stock.insert((s.s_w_id, s.s_i_id), s);
            }
        }
    }

    /// Oldest queued order of a district.
    pub fn oldest_new_order(&self, warehouse_id: u32, district_id: u32) -> Option<NewOrder> {
        self.new_orders
            .range((warehouse_id, district_id, 0)..=(warehouse_id, district_id, u32::MAX))
            .next()
            .map(|&(w, d, o)| NewOrder {
                no_o_id: o,
                no_d_id: d,
                no_w_id: w,
            })
    }

    pub fn district_orders(
        &self,
        warehouse_id: u32,
        district_id: u32,
    ) -> impl DoubleEndedIterator<Item = &Order> {
        self.orders
            .range((warehouse_id, district_id, 0)..=(warehouse_id, district_id, u32::MAX))
            .map(|(_, order)| order)
    }

    pub fn district_customers(
        &self,
        warehouse_id: u32,
        district_id: u32,
    ) -> impl Iterator<Item = &Customer> {
        self.customers
            .range((warehouse_id, district_id, 0)..=(warehouse_id, district_id, u32::MAX))
            .map(|(_, customer)| customer)
    }

    pub fn row_count(&self, table: Table) -> usize {
        match table {
            Table::Warehouse => self.warehouses.len(),
            Table::District => self.districts.len(),
            Table::Customer => self.customers.len(),
            Table::History => self.history.len(),
            Table::NewOrder => self.new_orders.len(),
            Table::Orders => self.orders.len(),
            Table::OrderLine => self.orders.values().map(|o| o.order_lines.len()).sum(),
            Table::Item => self.items.len(),
            Table::Stock => self.stock.len(),
        }
    }
}
