//! TPC-C entity types.
//!
//! Field names follow the TPC-C column names. Serialized documents use the
//! upper-case column names (`W_ID`, `D_NEXT_O_ID`, ...) so that document and
//! search backends store the same shape the relational schema exposes.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Number of district-specific distribution strings carried by a stock row.
pub const DISTRICTS_PER_STOCK: u32 = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct Warehouse {
    pub w_id: u32,
    pub w_name: String,
    pub w_street_1: String,
    pub w_street_2: String,
    pub w_city: String,
    pub w_state: String,
    pub w_zip: String,
    pub w_tax: f64,
    /// Year-to-date revenue.
    pub w_ytd: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct District {
    pub d_id: u32,
    pub d_w_id: u32,
    pub d_name: String,
    pub d_street_1: String,
    pub d_street_2: String,
    pub d_city: String,
    pub d_state: String,
    pub d_zip: String,
    pub d_tax: f64,
    pub d_ytd: f64,
    /// Next order id to assign. Only ever advanced by
    /// [`crate::storage::Storage::increment_district_order_id`].
    pub d_next_o_id: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct Customer {
    pub c_id: u32,
    pub c_d_id: u32,
    pub c_w_id: u32,
    pub c_first: String,
    pub c_middle: String,
    pub c_last: String,
    pub c_street_1: String,
    pub c_street_2: String,
    pub c_city: String,
    pub c_state: String,
    pub c_zip: String,
    pub c_phone: String,
    pub c_since: DateTime<Utc>,
    /// Credit marker: `"GC"` (good) or `"BC"` (bad).
    pub c_credit: String,
    pub c_credit_lim: f64,
    pub c_discount: f64,
    pub c_balance: f64,
    pub c_ytd_payment: f64,
    pub c_payment_cnt: u32,
    pub c_delivery_cnt: u32,
    pub c_data: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct History {
    pub h_c_id: u32,
    pub h_c_d_id: u32,
    pub h_c_w_id: u32,
    pub h_d_id: u32,
    pub h_w_id: u32,
    pub h_date: DateTime<Utc>,
    pub h_amount: f64,
    pub h_data: String,
}

/// Queue entry for an order that has not been delivered yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct NewOrder {
    pub no_o_id: u32,
    pub no_d_id: u32,
    pub no_w_id: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct Order {
    pub o_id: u32,
    pub o_d_id: u32,
    pub o_w_id: u32,
    pub o_c_id: u32,
    pub o_entry_d: DateTime<Utc>,
    /// Unset until the order is delivered.
    pub o_carrier_id: Option<u32>,
    pub o_ol_cnt: u32,
    pub o_all_local: bool,
    /// Lines in ascending `ol_number` order.
    #[serde(rename = "ORDER_LINE", default)]
    pub order_lines: Vec<OrderLine>,
}

impl Order {
    /// The queue entry created alongside this order.
    pub fn new_order_entry(&self) -> NewOrder {
        NewOrder {
            no_o_id: self.o_id,
            no_d_id: self.o_d_id,
            no_w_id: self.o_w_id,
        }
    }

    /// Sum of all line amounts.
    pub fn total_amount(&self) -> f64 {
        self.order_lines.iter().map(|line| line.ol_amount).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct OrderLine {
    pub ol_o_id: u32,
    pub ol_d_id: u32,
    pub ol_w_id: u32,
    pub ol_number: u32,
    pub ol_i_id: u32,
    pub ol_supply_w_id: u32,
    /// Unset until the order is delivered.
    pub ol_delivery_d: Option<DateTime<Utc>>,
    pub ol_quantity: i32,
    pub ol_amount: f64,
    pub ol_dist_info: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct Item {
    pub i_id: u32,
    pub i_im_id: u32,
    pub i_name: String,
    pub i_price: f64,
    pub i_data: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct Stock {
    pub s_i_id: u32,
    pub s_w_id: u32,
    pub s_quantity: i32,
    pub s_dist_01: String,
    pub s_dist_02: String,
    pub s_dist_03: String,
    pub s_dist_04: String,
    pub s_dist_05: String,
    pub s_dist_06: String,
    pub s_dist_07: String,
    pub s_dist_08: String,
    pub s_dist_09: String,
    pub s_dist_10: String,
    pub s_ytd: i32,
    pub s_order_cnt: u32,
    pub s_remote_cnt: u32,
    pub s_data: String,
}

impl Stock {
    /// District-specific distribution info. Districts past the tenth share
    /// the last column.
    pub fn dist_info(&self, district_id: u32) -> &str {
        match district_id {
            1 => &self.s_dist_01,
            2 => &self.s_dist_02,
            3 => &self.s_dist_03,
            4 => &self.s_dist_04,
            5 => &self.s_dist_05,
            6 => &self.s_dist_06,
            7 => &self.s_dist_07,
            8 => &self.s_dist_08,
            9 => &self.s_dist_09,
            _ => &self.s_dist_10,
        }
    }

    /// Apply one ordered line to this row and return the write to persist.
    ///
    /// Quantity follows the TPC-C wrap-around rule: decrement when at least
    /// ten units would remain, otherwise restock by `91 - quantity`.
    pub fn apply_order_line(&mut self, quantity: i32, remote: bool) -> StockUpdate {
        self.s_quantity = restocked_quantity(self.s_quantity, quantity);
        self.s_ytd += quantity;
        self.s_order_cnt += 1;
        if remote {
            self.s_remote_cnt += 1;
        }
        StockUpdate {
            s_i_id: self.s_i_id,
            s_w_id: self.s_w_id,
            s_quantity: self.s_quantity,
            s_ytd: self.s_ytd,
            s_order_cnt: self.s_order_cnt,
            s_remote_cnt: self.s_remote_cnt,
        }
    }
}

/// New stock level after ordering `ordered` units from `current`.
pub fn restocked_quantity(current: i32, ordered: i32) -> i32 {
    if current >= ordered + 10 {
        current - ordered
    } else {
        current + 91 - ordered
    }
}

/// Absolute values written back to a stock row by New-Order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockUpdate {
    pub s_i_id: u32,
    pub s_w_id: u32,
    pub s_quantity: i32,
    pub s_ytd: i32,
    pub s_order_cnt: u32,
    pub s_remote_cnt: u32,
}

/// Logical table / collection / index names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Table {
    Warehouse,
    District,
    Customer,
    History,
    NewOrder,
    Orders,
    OrderLine,
    Item,
    Stock,
}

impl Table {
    pub const ALL: [Table; 9] = [
        Table::Warehouse,
        Table::District,
        Table::Customer,
        Table::History,
        Table::NewOrder,
        Table::Orders,
        Table::OrderLine,
        Table::Item,
        Table::Stock,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Table::Warehouse => "warehouse",
            Table::District => "district",
            Table::Customer => "customer",
            Table::History => "history",
            Table::NewOrder => "new_order",
            Table::Orders => "orders",
            Table::OrderLine => "order_line",
            Table::Item => "item",
            Table::Stock => "stock",
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A row to insert through `insert_one` / `insert_batch`.
///
/// Orders carry their lines; inserting an order inserts its lines too.
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Warehouse(Warehouse),
    District(District),
    Customer(Customer),
    History(History),
    NewOrder(NewOrder),
    Order(Order),
    Item(Item),
    Stock(Stock),
}

impl Record {
    pub fn table(&self) -> Table {
        match self {
            Record::Warehouse(_) => Table::Warehouse,
            Record::District(_) => Table::District,
            Record::Customer(_) => Table::Customer,
            Record::History(_) => Table::History,
            Record::NewOrder(_) => Table::NewOrder,
            Record::Order(_) => Table::Orders,
            Record::Item(_) => Table::Item,
            Record::Stock(_) => Table::Stock,
        }
    }
}

impl From<Warehouse> for Record {
    fn from(value: Warehouse) -> Self {
        Record::Warehouse(value)
    }
}

impl From<District> for Record {
    fn from(value: District) -> Self {
        Record::District(value)
    }
}

impl From<Customer> for Record {
    fn from(value: Customer) -> Self {
        Record::Customer(value)
    }
}

impl From<History> for Record {
    fn from(value: History) -> Self {
        Record::History(value)
    }
}

impl From<NewOrder> for Record {
    fn from(value: NewOrder) -> Self {
        Record::NewOrder(value)
    }
}

impl From<Order> for Record {
    fn from(value: Order) -> Self {
        Record::Order(value)
    }
}

impl From<Item> for Record {
    fn from(value: Item) -> Self {
        Record::Item(value)
    }
}

impl From<Stock> for Record {
    fn from(value: Stock) -> Self {
        Record::Stock(value)
    }
}
