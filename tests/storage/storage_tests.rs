//! Storage interface tests.
//!
//! These tests verify the contract of the Storage trait. Every backend runs
//! them through `run_storage_tests!`. Each test owns a distinct warehouse id
//! (and item id range) so they can share one database.

use tpcc_driver::models::{Record, StockUpdate, Table};
use tpcc_driver::storage::{ErrorKind, Storage};

use crate::common::*;

// =============================================================================
// Inserts
// =============================================================================

pub async fn test_insert_one_rejects_duplicate_key(store: &dyn Storage) {
    let w = 1;
    store.insert_one(&warehouse(w).into()).await.unwrap();

    let err = store.insert_one(&warehouse(w).into()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict, "duplicate insert: {err}");

    let stored = store.get_warehouse(w).await.unwrap();
    assert_eq!(stored, warehouse(w));
}

pub async fn test_insert_batch_stores_every_record(store: &dyn Storage) {
    let w = 2;
    let customers: Vec<Record> = (1..=5)
        .map(|c| customer(w, 1, c, &format!("F{c}"), "BATCH").into())
        .collect();

    store.insert_batch(Table::Customer, &customers).await.unwrap();

    for c in 1..=5 {
        let stored = store.get_customer(c, w, 1).await.unwrap();
        assert_eq!(stored.c_first, format!("F{c}"));
    }
}

pub async fn test_insert_batch_reports_rejected_records(store: &dyn Storage) {
    let w = 3;
    store
        .insert_one(&customer(w, 1, 1, "A", "DUP").into())
        .await
        .unwrap();

    let records: Vec<Record> = vec![
        customer(w, 1, 1, "A", "DUP").into(),
        customer(w, 1, 2, "B", "DUP").into(),
    ];
    let err = store
        .insert_batch(Table::Customer, &records)
        .await
        .unwrap_err();
    assert_ne!(err.kind(), ErrorKind::NotFound, "batch failure: {err}");
}

// =============================================================================
// District counter
// =============================================================================

pub async fn test_increment_returns_pre_increment_value(store: &dyn Storage) {
    let w = 4;
    store.insert_one(&district(w, 1, 21).into()).await.unwrap();

    assert_eq!(store.increment_district_order_id(w, 1).await.unwrap(), 21);
    assert_eq!(store.increment_district_order_id(w, 1).await.unwrap(), 22);
    assert_eq!(store.get_next_order_id(w, 1).await.unwrap(), 23);
    assert_eq!(store.get_district(w, 1).await.unwrap().d_next_o_id, 23);
}

pub async fn test_increment_missing_district_is_not_found(store: &dyn Storage) {
    let err = store.increment_district_order_id(5, 9).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

// =============================================================================
// Customers
// =============================================================================

pub async fn test_customer_by_name_picks_median(store: &dyn Storage) {
    let w = 6;
    insert_all(
        store,
        vec![
            customer(w, 1, 1, "CARL", "ODD").into(),
            customer(w, 1, 2, "ANNA", "ODD").into(),
            customer(w, 1, 3, "BEN", "ODD").into(),
            customer(w, 1, 4, "DORA", "EVEN").into(),
            customer(w, 1, 5, "ALAN", "EVEN").into(),
            customer(w, 1, 6, "CLEO", "EVEN").into(),
            customer(w, 1, 7, "BART", "EVEN").into(),
            customer(w, 2, 8, "ZED", "ODD").into(),
        ],
    )
    .await;

    // ids 1, 2, 3 -> 2; first names play no part
    let odd = store.get_customer_by_name("ODD", w, 1).await.unwrap();
    assert_eq!(odd.c_id, 2);
    assert_eq!(odd.c_first, "ANNA");

    // ids 4, 5, 6, 7 -> lower median 5
    let even = store.get_customer_by_name("EVEN", w, 1).await.unwrap();
    assert_eq!(even.c_id, 5);

    let err = store.get_customer_by_name("NOBODY", w, 1).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

pub async fn test_missing_rows_are_not_found(store: &dyn Storage) {
    let w = 7;
    for err in [
        store.get_warehouse(w).await.unwrap_err(),
        store.get_district(w, 1).await.map(|_| ()).unwrap_err(),
        store.get_customer(1, w, 1).await.map(|_| ()).unwrap_err(),
        store.get_last_order(1, w, 1).await.map(|_| ()).unwrap_err(),
        store.get_customer_id_order(1, w, 1).await.map(|_| ()).unwrap_err(),
    ] {
        assert_eq!(err.kind(), ErrorKind::NotFound, "{err}");
    }
}

// =============================================================================
// Orders
// =============================================================================

pub async fn test_order_round_trip(store: &dyn Storage) {
    let w = 8;
    let placed = order(w, 1, 30, 4, &[(801, 3, 7.5), (802, 1, 4.0), (803, 10, 25.0)]);
    store.create_order(&placed).await.unwrap();
    store
        .create_order(&order(w, 1, 29, 4, &[(801, 1, 2.5)]))
        .await
        .unwrap();

    let last = store.get_last_order(4, w, 1).await.unwrap();
    assert_eq!(last.o_id, 30);
    assert_eq!(last.o_ol_cnt, 3);
    assert_eq!(last.o_carrier_id, None);

    let lines = store.get_order_lines(30, w, 1).await.unwrap();
    assert_eq!(lines, placed.order_lines);

    assert_eq!(store.get_customer_id_order(30, w, 1).await.unwrap(), 4);
    assert!((store.sum_ol_amount(30, w, 1).await.unwrap() - 36.5).abs() < 1e-9);

    let queued = store.check_new_order(w, 1).await.unwrap();
    assert_eq!(queued, Some(new_order(w, 1, 29)));
}

pub async fn test_create_order_twice_is_conflict(store: &dyn Storage) {
    let w = 9;
    let placed = order(w, 1, 5, 1, &[(901, 1, 1.0)]);
    store.create_order(&placed).await.unwrap();

    let err = store.create_order(&placed).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict, "{err}");
}

pub async fn test_new_order_queue_is_claimed_oldest_first(store: &dyn Storage) {
    let w = 10;
    for o_id in [7, 8] {
        store
            .create_order(&order(w, 1, o_id, 1, &[(1001, 1, 1.0)]))
            .await
            .unwrap();
    }

    for expected in [7, 8] {
        assert_eq!(
            store.check_new_order(w, 1).await.unwrap(),
            Some(new_order(w, 1, expected))
        );
        let claimed = store.get_new_order(w, 1).await.unwrap();
        assert_eq!(claimed, Some(new_order(w, 1, expected)));
        store.delete_new_order(expected, w, 1).await.unwrap();
    }

    assert_eq!(store.get_new_order(w, 1).await.unwrap(), None);
    assert_eq!(store.check_new_order(w, 1).await.unwrap(), None);
    assert_eq!(store.get_new_order(w, 2).await.unwrap(), None);
}

pub async fn test_delivery_writes(store: &dyn Storage) {
    let w = 11;
    store
        .insert_one(&customer(w, 1, 3, "ANNA", "DELIVER").into())
        .await
        .unwrap();
    store
        .create_order(&order(w, 1, 40, 3, &[(1101, 2, 5.0), (1102, 1, 1.5)]))
        .await
        .unwrap();

    store.update_orders(40, w, 1, 7, at(5)).await.unwrap();
    store.update_customer(3, w, 1, 6.5).await.unwrap();

    let delivered = store.get_last_order(3, w, 1).await.unwrap();
    assert_eq!(delivered.o_carrier_id, Some(7));
    let lines = store.get_order_lines(40, w, 1).await.unwrap();
    assert_eq!(lines.len(), 2);
    assert!(lines.iter().all(|line| line.ol_delivery_d == Some(at(5))));

    let credited = store.get_customer(3, w, 1).await.unwrap();
    assert!((credited.c_balance - -3.5).abs() < 1e-9);
    assert_eq!(credited.c_delivery_cnt, 1);
}

// =============================================================================
// Payment
// =============================================================================

pub async fn test_payment_writes(store: &dyn Storage) {
    let w = 12;
    insert_all(
        store,
        vec![
            warehouse(w).into(),
            district(w, 1, 1).into(),
            customer(w, 1, 1, "GOOD", "PAYER").into(),
            customer(w, 1, 2, "BAD", "PAYER").into(),
        ],
    )
    .await;

    store.update_warehouse_balance(w, 25.0).await.unwrap();
    store.update_district_balance(w, 1, 25.0).await.unwrap();
    store.update_credit(1, w, 1, 25.0, None).await.unwrap();
    store
        .update_credit(2, w, 1, 5.0, Some("2 1 12 1 12 5.00|initial"))
        .await
        .unwrap();

    assert!((store.get_warehouse(w).await.unwrap().w_ytd - 300_025.0).abs() < 1e-9);
    assert!((store.get_district(w, 1).await.unwrap().d_ytd - 30_025.0).abs() < 1e-9);

    let good = store.get_customer(1, w, 1).await.unwrap();
    assert!((good.c_balance - -35.0).abs() < 1e-9);
    assert!((good.c_ytd_payment - 35.0).abs() < 1e-9);
    assert_eq!(good.c_payment_cnt, 2);
    assert_eq!(good.c_data, "initial");

    let bad = store.get_customer(2, w, 1).await.unwrap();
    assert!((bad.c_balance - -15.0).abs() < 1e-9);
    assert_eq!(bad.c_data, "2 1 12 1 12 5.00|initial");

    store
        .insert_history(&tpcc_driver::models::History {
            h_c_id: 1,
            h_c_d_id: 1,
            h_c_w_id: w,
            h_d_id: 1,
            h_w_id: w,
            h_date: at(6),
            h_amount: 25.0,
            h_data: format!("wh-{w}    dist-1"),
        })
        .await
        .unwrap();
}

pub async fn test_update_missing_customer_is_not_found(store: &dyn Storage) {
    let err = store.update_credit(99, 13, 1, 1.0, None).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

// =============================================================================
// Items and stock
// =============================================================================

pub async fn test_items_and_stock(store: &dyn Storage) {
    let w = 14;
    insert_all(
        store,
        vec![
            item(1401, 2.5).into(),
            item(1402, 4.0).into(),
            stock(w, 1401, 50).into(),
            stock(w, 1402, 12).into(),
        ],
    )
    .await;

    let mut items = store.get_items(&[1401, 1402, 1499]).await.unwrap();
    items.sort_by_key(|item| item.i_id);
    assert_eq!(items, vec![item(1401, 2.5), item(1402, 4.0)]);

    let rows = store
        .get_stock_info(3, &[(1401, w), (1402, w), (1401, w + 100)])
        .await
        .unwrap();
    assert_eq!(rows.len(), 2);

    let mut row = rows.into_iter().find(|s| s.s_i_id == 1401).unwrap();
    assert_eq!(row.dist_info(3), format!("s-{w}-1401-03"));
    let update = row.apply_order_line(4, false);
    store.update_stocks(&[update]).await.unwrap();

    let stored = store.get_stock_info(3, &[(1401, w)]).await.unwrap().remove(0);
    assert_eq!(stored.s_quantity, 46);
    assert_eq!(stored.s_ytd, 4);
    assert_eq!(stored.s_order_cnt, 1);
}

pub async fn test_update_missing_stock_is_not_found(store: &dyn Storage) {
    let missing = StockUpdate {
        s_i_id: 1599,
        s_w_id: 15,
        s_quantity: 10,
        s_ytd: 1,
        s_order_cnt: 1,
        s_remote_cnt: 0,
    };
    let err = store.update_stocks(&[missing]).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

pub async fn test_stock_count_covers_recent_orders(store: &dyn Storage) {
    let w = 16;
    insert_all(
        store,
        vec![
            district(w, 1, 25).into(),
            stock(w, 1601, 5).into(),
            stock(w, 1602, 8).into(),
            stock(w, 1603, 30).into(),
            stock(w, 1604, 1).into(),
        ],
    )
    .await;
    // 1604 is low but only ordered outside the window.
    for placed in [
        order(w, 1, 20, 1, &[(1604, 1, 1.0)]),
        order(w, 1, 22, 1, &[(1601, 1, 1.0), (1603, 1, 1.0)]),
        order(w, 1, 23, 1, &[(1601, 2, 2.0), (1602, 1, 1.0)]),
        order(w, 1, 24, 1, &[(1603, 1, 1.0)]),
    ] {
        store.create_order(&placed).await.unwrap();
    }

    let next = store.get_next_order_id(w, 1).await.unwrap();
    assert_eq!(next, 25);
    assert_eq!(store.get_stock_count(next, 21, 10, w, 1).await.unwrap(), 2);
    assert_eq!(store.get_stock_count(next, 21, 31, w, 1).await.unwrap(), 3);
    assert_eq!(store.get_stock_count(next, 0, 10, w, 1).await.unwrap(), 3);
    assert_eq!(store.get_stock_count(next, 24, 10, w, 1).await.unwrap(), 0);
}

// =============================================================================
// Transactions
// =============================================================================

pub async fn test_rollback_discards_writes(store: &dyn Storage) {
    if !store.supports_transactions() {
        return;
    }
    let w = 17;
    store.insert_one(&district(w, 1, 3).into()).await.unwrap();

    store.start_trx().await.unwrap();
    store.increment_district_order_id(w, 1).await.unwrap();
    store
        .create_order(&order(w, 1, 3, 1, &[(1701, 1, 1.0)]))
        .await
        .unwrap();
    store.rollback_trx().await.unwrap();

    assert_eq!(store.get_next_order_id(w, 1).await.unwrap(), 3);
    assert_eq!(store.check_new_order(w, 1).await.unwrap(), None);

    store.start_trx().await.unwrap();
    store.increment_district_order_id(w, 1).await.unwrap();
    store.commit_trx().await.unwrap();
    assert_eq!(store.get_next_order_id(w, 1).await.unwrap(), 4);
}

pub async fn test_bracketing_is_harmless_without_transactions(store: &dyn Storage) {
    if store.supports_transactions() {
        return;
    }
    let w = 18;
    store.insert_one(&district(w, 1, 3).into()).await.unwrap();

    store.start_trx().await.unwrap();
    store.increment_district_order_id(w, 1).await.unwrap();
    store.rollback_trx().await.unwrap();
    store.commit_trx().await.unwrap();

    assert_eq!(store.get_next_order_id(w, 1).await.unwrap(), 4);
}

/// Run the whole contract suite against one store.
#[macro_export]
macro_rules! run_storage_tests {
    ($store:expr) => {
        use $crate::storage::storage_tests::*;

        test_insert_one_rejects_duplicate_key($store).await;
        println!("  test_insert_one_rejects_duplicate_key: PASSED");

        test_insert_batch_stores_every_record($store).await;
        println!("  test_insert_batch_stores_every_record: PASSED");

        test_insert_batch_reports_rejected_records($store).await;
        println!("  test_insert_batch_reports_rejected_records: PASSED");

        test_increment_returns_pre_increment_value($store).await;
        println!("  test_increment_returns_pre_increment_value: PASSED");

        test_increment_missing_district_is_not_found($store).await;
        println!("  test_increment_missing_district_is_not_found: PASSED");

        test_customer_by_name_picks_median($store).await;
        println!("  test_customer_by_name_picks_median: PASSED");

        test_missing_rows_are_not_found($store).await;
        println!("  test_missing_rows_are_not_found: PASSED");

        test_order_round_trip($store).await;
        println!("  test_order_round_trip: PASSED");

        test_create_order_twice_is_conflict($store).await;
        println!("  test_create_order_twice_is_conflict: PASSED");

        test_new_order_queue_is_claimed_oldest_first($store).await;
        println!("  test_new_order_queue_is_claimed_oldest_first: PASSED");

        test_delivery_writes($store).await;
        println!("  test_delivery_writes: PASSED");

        test_payment_writes($store).await;
        println!("  test_payment_writes: PASSED");

        test_update_missing_customer_is_not_found($store).await;
        println!("  test_update_missing_customer_is_not_found: PASSED");

        test_items_and_stock($store).await;
        println!("  test_items_and_stock: PASSED");

        test_update_missing_stock_is_not_found($store).await;
        println!("  test_update_missing_stock_is_not_found: PASSED");

        test_stock_count_covers_recent_orders($store).await;
        println!("  test_stock_count_covers_recent_orders: PASSED");

        test_rollback_discards_writes($store).await;
        println!("  test_rollback_discards_writes: PASSED");

        test_bracketing_is_harmless_without_transactions($store).await;
        println!("  test_bracketing_is_harmless_without_transactions: PASSED");
    };
}
