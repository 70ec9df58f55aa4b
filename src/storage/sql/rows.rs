//! Row decoding.
//!
//! Ids and counters are stored as 32-bit signed integers (the widest type
//! both dialects share without casts) and widened back to the entity types.

use sqlx::Row;

use crate::models::{Customer, District, Item, NewOrder, Order, OrderLine, Stock, Warehouse};
use crate::storage::helpers::{parse_optional_timestamp, parse_timestamp};
use crate::storage::Result;

/// Typed column access implemented for each backend's row type.
pub(super) trait RowExt: Row {
    fn int(&self, column: &str) -> Result<i32>;
    fn opt_int(&self, column: &str) -> Result<Option<i32>>;
    fn big_int(&self, column: &str) -> Result<i64>;
    fn float(&self, column: &str) -> Result<f64>;
    fn opt_float(&self, column: &str) -> Result<Option<f64>>;
    fn text(&self, column: &str) -> Result<String>;
    fn opt_text(&self, column: &str) -> Result<Option<String>>;

    fn id(&self, column: &str) -> Result<u32> {
        Ok(self.int(column)? as u32)
    }
}

macro_rules! impl_row_ext {
    ($row:ty, $feature:literal) => {
        #[cfg(feature = $feature)]
        impl RowExt for $row {
            fn int(&self, column: &str) -> Result<i32> {
                Ok(self.try_get(column)?)
            }

            fn opt_int(&self, column: &str) -> Result<Option<i32>> {
                Ok(self.try_get(column)?)
            }

            fn big_int(&self, column: &str) -> Result<i64> {
                Ok(self.try_get(column)?)
            }

            fn float(&self, column: &str) -> Result<f64> {
                Ok(self.try_get(column)?)
            }

            fn opt_float(&self, column: &str) -> Result<Option<f64>> {
                Ok(self.try_get(column)?)
            }

            fn text(&self, column: &str) -> Result<String> {
                Ok(self.try_get(column)?)
            }

            fn opt_text(&self, column: &str) -> Result<Option<String>> {
                Ok(self.try_get(column)?)
            }
        }
    };
}

impl_row_ext!(sqlx::postgres::PgRow, "postgres");
impl_row_ext!(sqlx::sqlite::SqliteRow, "sqlite");

pub(super) fn warehouse(row: &impl RowExt) -> Result<Warehouse> {
    Ok(Warehouse {
        w_id: row.id("w_id")?,
        w_name: row.text("w_name")?,
        w_street_1: row.text("w_street_1")?,
        w_street_2: row.text("w_street_2")?,
        w_city: row.text("w_city")?,
        w_state: row.text("w_state")?,
        w_zip: row.text("w_zip")?,
        w_tax: row.float("w_tax")?,
        w_ytd: row.float("w_ytd")?,
    })
}

pub(super) fn district(row: &impl RowExt) -> Result<District> {
    Ok(District {
        d_id: row.id("d_id")?,
        d_w_id: row.id("d_w_id")?,
        d_name: row.text("d_name")?,
        d_street_1: row.text("d_street_1")?,
        d_street_2: row.text("d_street_2")?,
        d_city: row.text("d_city")?,
        d_state: row.text("d_state")?,
        d_zip: row.text("d_zip")?,
        d_tax: row.float("d_tax")?,
        d_ytd: row.float("d_ytd")?,
        d_next_o_id: row.id("d_next_o_id")?,
    })
}

pub(super) fn customer(row: &impl RowExt) -> Result<Customer> {
    Ok(Customer {
        c_id: row.id("c_id")?,
        c_d_id: row.id("c_d_id")?,
        c_w_id: row.id("c_w_id")?,
        c_first: row.text("c_first")?,
        c_middle: row.text("c_middle")?,
        c_last: row.text("c_last")?,
        c_street_1: row.text("c_street_1")?,
        c_street_2: row.text("c_street_2")?,
        c_city: row.text("c_city")?,
        c_state: row.text("c_state")?,
        c_zip: row.text("c_zip")?,
        c_phone: row.text("c_phone")?,
        c_since: parse_timestamp(&row.text("c_since")?)?,
        c_credit: row.text("c_credit")?,
        c_credit_lim: row.float("c_credit_lim")?,
        c_discount: row.float("c_discount")?,
        c_balance: row.float("c_balance")?,
        c_ytd_payment: row.float("c_ytd_payment")?,
        c_payment_cnt: row.id("c_payment_cnt")?,
        c_delivery_cnt: row.id("c_delivery_cnt")?,
        c_data: row.text("c_data")?,
    })
}

pub(super) fn new_order(row: &impl RowExt) -> Result<NewOrder> {
    Ok(NewOrder {
        no_o_id: row.id("no_o_id")?,
        no_d_id: row.id("no_d_id")?,
        no_w_id: row.id("no_w_id")?,
    })
}

/// Order header. Lines are fetched separately.
pub(super) fn order(row: &impl RowExt) -> Result<Order> {
    Ok(Order {
        o_id: row.id("o_id")?,
        o_d_id: row.id("o_d_id")?,
        o_w_id: row.id("o_w_id")?,
        o_c_id: row.id("o_c_id")?,
        o_entry_d: parse_timestamp(&row.text("o_entry_d")?)?,
        o_carrier_id: row.opt_int("o_carrier_id")?.map(|id| id as u32),
        o_ol_cnt: row.id("o_ol_cnt")?,
        o_all_local: row.int("o_all_local")? != 0,
        order_lines: Vec::new(),
    })
}

pub(super) fn order_line(row: &impl RowExt) -> Result<OrderLine> {
    Ok(OrderLine {
        ol_o_id: row.id("ol_o_id")?,
        ol_d_id: row.id("ol_d_id")?,
        ol_w_id: row.id("ol_w_id")?,
        ol_number: row.id("ol_number")?,
        ol_i_id: row.id("ol_i_id")?,
        ol_supply_w_id: row.id("ol_supply_w_id")?,
        ol_delivery_d: parse_optional_timestamp(row.opt_text("ol_delivery_d")?.as_deref())?,
        ol_quantity: row.int("ol_quantity")?,
        ol_amount: row.float("ol_amount")?,
        ol_dist_info: row.text("ol_dist_info")?,
    })
}

pub(super) fn item(row: &impl RowExt) -> Result<Item> {
    Ok(Item {
        i_id: row.id("i_id")?,
        i_im_id: row.id("i_im_id")?,
        i_name: row.text("i_name")?,
        i_price: row.float("i_price")?,
        i_data: row.text("i_data")?,
    })
}

pub(super) fn stock(row: &impl RowExt) -> Result<Stock> {
    Ok(Stock {
        s_i_id: row.id("s_i_id")?,
        s_w_id: row.id("s_w_id")?,
        s_quantity: row.int("s_quantity")?,
        s_dist_01: row.text("s_dist_01")?,
        s_dist_02: row.text("s_dist_02")?,
        s_dist_03: row.text("s_dist_03")?,
        s_dist_04: row.text("s_dist_04")?,
        s_dist_05: row.text("s_dist_05")?,
        s_dist_06: row.text("s_dist_06")?,
        s_dist_07: row.text("s_dist_07")?,
        s_dist_08: row.text("s_dist_08")?,
        s_dist_09: row.text("s_dist_09")?,
        s_dist_10: row.text("s_dist_10")?,
        s_ytd: row.int("s_ytd")?,
        s_order_cnt: row.id("s_order_cnt")?,
        s_remote_cnt: row.id("s_remote_cnt")?,
        s_data: row.text("s_data")?,
    })
}
