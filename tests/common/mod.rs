//! Shared fixtures for integration tests.
//!
//! Builders produce minimal valid TPC-C rows. Tests that share one backend
//! keep apart by using distinct warehouse ids.

#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};

use tpcc_driver::models::{
    Customer, District, Item, NewOrder, Order, OrderLine, Record, Stock, Warehouse,
};
use tpcc_driver::storage::Storage;

/// Noon on the given day of March 2024.
pub fn at(day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, day, 12, 0, 0).unwrap()
}

pub fn warehouse(w_id: u32) -> Warehouse {
    Warehouse {
        w_id,
        w_name: format!("wh-{w_id}"),
        w_street_1: "1 Main St".to_string(),
        w_street_2: String::new(),
        w_city: "Springfield".to_string(),
        w_state: "IL".to_string(),
        w_zip: "123411111".to_string(),
        w_tax: 0.1,
        w_ytd: 300_000.0,
    }
}

pub fn district(w_id: u32, d_id: u32, next_o_id: u32) -> District {
    District {
        d_id,
        d_w_id: w_id,
        d_name: format!("dist-{d_id}"),
        d_street_1: String::new(),
        d_street_2: String::new(),
        d_city: String::new(),
        d_state: String::new(),
        d_zip: String::new(),
        d_tax: 0.05,
        d_ytd: 30_000.0,
        d_next_o_id: next_o_id,
    }
}

pub fn customer(w_id: u32, d_id: u32, c_id: u32, first: &str, last: &str) -> Customer {
    Customer {
        c_id,
        c_d_id: d_id,
        c_w_id: w_id,
        c_first: first.to_string(),
        c_middle: "OE".to_string(),
        c_last: last.to_string(),
        c_street_1: String::new(),
        c_street_2: String::new(),
        c_city: String::new(),
        c_state: String::new(),
        c_zip: String::new(),
        c_phone: "5551234".to_string(),
        c_since: at(1),
        c_credit: "GC".to_string(),
        c_credit_lim: 50_000.0,
        c_discount: 0.1,
        c_balance: -10.0,
        c_ytd_payment: 10.0,
        c_payment_cnt: 1,
        c_delivery_cnt: 0,
        c_data: "initial".to_string(),
    }
}

pub fn item(i_id: u32, price: f64) -> Item {
    Item {
        i_id,
        i_im_id: i_id,
        i_name: format!("item-{i_id}"),
        i_price: price,
        i_data: "original".to_string(),
    }
}

pub fn stock(w_id: u32, i_id: u32, quantity: i32) -> Stock {
    let dist = |d: u32| format!("s-{w_id}-{i_id}-{d:02}");
    Stock {
        s_i_id: i_id,
        s_w_id: w_id,
        s_quantity: quantity,
        s_dist_01: dist(1),
        s_dist_02: dist(2),
        s_dist_03: dist(3),
        s_dist_04: dist(4),
        s_dist_05: dist(5),
        s_dist_06: dist(6),
        s_dist_07: dist(7),
        s_dist_08: dist(8),
        s_dist_09: dist(9),
        s_dist_10: dist(10),
        s_ytd: 0,
        s_order_cnt: 0,
        s_remote_cnt: 0,
        s_data: String::new(),
    }
}

/// An undelivered order with one line per `(item_id, quantity, amount)`.
pub fn order(w_id: u32, d_id: u32, o_id: u32, c_id: u32, lines: &[(u32, i32, f64)]) -> Order {
    Order {
        o_id,
        o_d_id: d_id,
        o_w_id: w_id,
        o_c_id: c_id,
        o_entry_d: at(2),
        o_carrier_id: None,
        o_ol_cnt: lines.len() as u32,
        o_all_local: true,
        order_lines: (1..)
            .zip(lines)
            .map(|(number, &(item_id, quantity, amount))| OrderLine {
                ol_o_id: o_id,
                ol_d_id: d_id,
                ol_w_id: w_id,
                ol_number: number,
                ol_i_id: item_id,
                ol_supply_w_id: w_id,
                ol_delivery_d: None,
                ol_quantity: quantity,
                ol_amount: amount,
                ol_dist_info: format!("s-{w_id}-{item_id}-{d_id:02}"),
            })
            .collect(),
    }
}

pub fn new_order(w_id: u32, d_id: u32, o_id: u32) -> NewOrder {
    NewOrder {
        no_o_id: o_id,
        no_d_id: d_id,
        no_w_id: w_id,
    }
}

/// Insert records one at a time.
pub async fn insert_all(store: &dyn Storage, records: Vec<Record>) {
    for record in records {
        let table = record.table();
        store
            .insert_one(&record)
            .await
            .unwrap_or_else(|e| panic!("insert into {table} failed: {e}"));
    }
}
