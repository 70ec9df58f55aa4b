use chrono::{DateTime, TimeZone, Utc};

use super::*;
use crate::config::RetryBackoffConfig;
use crate::models::{Customer, District, Item, Stock, Warehouse};
use crate::storage::{ErrorKind, MemoryStorage, TrxStats};

fn at(day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, day, 12, 0, 0).unwrap()
}

fn config() -> ExecutorConfig {
    ExecutorConfig {
        transactions: true,
        retries: 3,
        districts_per_warehouse: 2,
        retry_backoff: RetryBackoffConfig {
            min_delay_ms: 0,
            max_delay_ms: 0,
            jitter: false,
        },
        ..ExecutorConfig::default()
    }
}

fn warehouse(w_id: u32) -> Warehouse {
    Warehouse {
        w_id,
        w_name: format!("wh-{w_id}"),
        w_street_1: String::new(),
        w_street_2: String::new(),
        w_city: String::new(),
        w_state: String::new(),
        w_zip: String::new(),
        w_tax: 0.1,
        w_ytd: 300_000.0,
    }
}

fn district(w_id: u32, d_id: u32) -> District {
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
        d_next_o_id: 21,
    }
}

fn customer(c_id: u32, d_id: u32, first: &str, last: &str, credit: &str) -> Customer {
    Customer {
        c_id,
        c_d_id: d_id,
        c_w_id: 1,
        c_first: first.to_string(),
        c_middle: "OE".to_string(),
        c_last: last.to_string(),
        c_street_1: String::new(),
        c_street_2: String::new(),
        c_city: String::new(),
        c_state: String::new(),
        c_zip: String::new(),
        c_phone: String::new(),
        c_since: at(1),
        c_credit: credit.to_string(),
        c_credit_lim: 50_000.0,
        c_discount: 0.2,
        c_balance: -10.0,
        c_ytd_payment: 10.0,
        c_payment_cnt: 1,
        c_delivery_cnt: 0,
        c_data: "old data".to_string(),
    }
}

fn item(i_id: u32, price: f64) -> Item {
    Item {
        i_id,
        i_im_id: i_id,
        i_name: format!("item-{i_id}"),
        i_price: price,
        i_data: String::new(),
    }
}

fn stock(w_id: u32, i_id: u32, quantity: i32) -> Stock {
    let dist = |d: u32| format!("dist-info-{w_id}-{i_id}-{d:02}");
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

/// Warehouses 1 and 2, districts 1 and 2 of warehouse 1 with next order id
/// 21, items 10 and 11.
async fn seeded() -> (Arc<MemoryStorage>, Executor) {
    seeded_with(config()).await
}

async fn seeded_with(config: ExecutorConfig) -> (Arc<MemoryStorage>, Executor) {
    let store = Arc::new(MemoryStorage::new());
    let mut executor = Executor::new(store.clone(), config);
    executor.change_batch_size(100);

    for record in [
        Record::from(warehouse(1)),
        warehouse(2).into(),
        district(1, 1).into(),
        district(1, 2).into(),
        customer(1, 1, "ANNA", "BAR", "GC").into(),
        customer(2, 1, "BEN", "BAR", "GC").into(),
        customer(3, 1, "CARL", "OUGHT", "BC").into(),
        customer(4, 1, "CLEO", "BAR", "GC").into(),
        customer(5, 1, "DORA", "ABLE", "GC").into(),
        customer(1, 2, "EVE", "ABLE", "GC").into(),
        item(10, 2.5).into(),
        item(11, 4.0).into(),
        stock(1, 10, 50).into(),
        stock(1, 11, 12).into(),
        stock(2, 10, 20).into(),
    ] {
        executor.save_batch(record).await.unwrap();
    }
    executor.flush_all().await.unwrap();
    (store, executor)
}

fn new_order(d_id: u32, c_id: u32, items: &[(u32, u32, i32)]) -> NewOrderParams {
    NewOrderParams {
        warehouse_id: 1,
        district_id: d_id,
        customer_id: c_id,
        entry_date: at(2),
        items: items
            .iter()
            .map(|&(item_id, supply_warehouse_id, quantity)| OrderItem {
                item_id,
                supply_warehouse_id,
                quantity,
            })
            .collect(),
    }
}

async fn stock_row(store: &MemoryStorage, w_id: u32, i_id: u32) -> Stock {
    store
        .get_stock_info(1, &[(i_id, w_id)])
        .await
        .unwrap()
        .remove(0)
}

fn stats(started: u32, committed: u32, rolled_back: u32) -> TrxStats {
    TrxStats {
        started,
        committed,
        rolled_back,
    }
}

// ============================================================================
// New-Order
// ============================================================================

#[tokio::test]
async fn test_new_order_uses_counter_value_and_decrements_stock() {
    let (store, executor) = seeded().await;
    let ctx = TrxContext::background();

    let outcome = executor
        .new_order(&ctx, &new_order(1, 5, &[(10, 1, 3)]))
        .await
        .unwrap();

    let order = &outcome.order;
    assert_eq!(order.o_id, 21);
    assert!(order.o_all_local);
    assert_eq!(order.o_ol_cnt, 1);
    assert_eq!(order.order_lines[0].ol_amount, 7.5);
    assert_eq!(order.order_lines[0].ol_dist_info, "dist-info-1-10-01");
    assert!((outcome.total_amount - 7.5 * 0.8 * 1.15).abs() < 1e-9);

    let stock = stock_row(&store, 1, 10).await;
    assert_eq!(stock.s_quantity, 47);
    assert_eq!(stock.s_ytd, 3);
    assert_eq!(stock.s_order_cnt, 1);
    assert_eq!(stock.s_remote_cnt, 0);

    assert_eq!(store.get_next_order_id(1, 1).await.unwrap(), 22);
    let queued = store.check_new_order(1, 1).await.unwrap().unwrap();
    assert_eq!(queued.no_o_id, 21);
    assert_eq!(store.trx_stats(), stats(1, 1, 0));
}

#[tokio::test]
async fn test_new_order_restocks_and_counts_remote_lines() {
    let (store, executor) = seeded().await;

    let outcome = executor
        .new_order(
            &TrxContext::background(),
            &new_order(1, 5, &[(11, 1, 5), (10, 2, 4)]),
        )
        .await
        .unwrap();

    assert!(!outcome.order.o_all_local);
    let numbers: Vec<u32> = outcome.order.order_lines.iter().map(|l| l.ol_number).collect();
    assert_eq!(numbers, vec![1, 2]);

    assert_eq!(stock_row(&store, 1, 11).await.s_quantity, 12 + 91 - 5);
    let remote = stock_row(&store, 2, 10).await;
    assert_eq!(remote.s_quantity, 16);
    assert_eq!(remote.s_remote_cnt, 1);
}

#[tokio::test]
async fn test_consecutive_orders_get_increasing_ids() {
    let (store, executor) = seeded().await;
    let ctx = TrxContext::background();

    for expected in 21..26 {
        let outcome = executor
            .new_order(&ctx, &new_order(1, 1, &[(10, 1, 1)]))
            .await
            .unwrap();
        assert_eq!(outcome.order.o_id, expected);
    }
    assert_eq!(store.get_next_order_id(1, 1).await.unwrap(), 26);
    assert_eq!(store.row_count(Table::Orders).await, 5);
    assert_eq!(store.row_count(Table::NewOrder).await, 5);
}

#[tokio::test]
async fn test_invalid_item_is_retried_and_rolled_back() {
    let (store, executor) = seeded().await;

    let err = executor
        .new_order(
            &TrxContext::background(),
            &new_order(1, 5, &[(10, 1, 1), (999, 1, 1)]),
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        TrxError::InvalidItem {
            requested: 2,
            found: 1
        }
    ));
    assert_eq!(store.trx_stats(), stats(3, 0, 3));
    assert_eq!(store.get_next_order_id(1, 1).await.unwrap(), 21);
    assert_eq!(stock_row(&store, 1, 10).await.s_quantity, 50);
    assert_eq!(store.row_count(Table::Orders).await, 0);
}

// ============================================================================
// Retry loop
// ============================================================================

#[tokio::test]
async fn test_conflict_is_retried_until_success() {
    let (store, executor) = seeded().await;
    store.fail_next("get_district", 2, ErrorKind::Conflict).await;

    let outcome = executor
        .new_order(&TrxContext::background(), &new_order(1, 5, &[(10, 1, 3)]))
        .await
        .unwrap();

    assert_eq!(outcome.order.o_id, 21);
    assert_eq!(store.trx_stats(), stats(3, 1, 2));
}

#[tokio::test]
async fn test_not_found_is_not_retried() {
    let (store, executor) = seeded().await;

    let err = executor
        .new_order(&TrxContext::background(), &new_order(1, 99, &[(10, 1, 3)]))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(store.trx_stats(), stats(1, 0, 1));
    assert_eq!(store.get_next_order_id(1, 1).await.unwrap(), 21);
}

#[tokio::test]
async fn test_exhausted_retries_return_last_error() {
    let (store, executor) = seeded().await;
    store.fail_next("get_warehouse", 5, ErrorKind::Transport).await;

    let err = executor
        .new_order(&TrxContext::background(), &new_order(1, 5, &[(10, 1, 3)]))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Transport);
    assert_eq!(store.trx_stats(), stats(3, 0, 3));
}

#[tokio::test]
async fn test_failed_commit_counts_as_failed_attempt() {
    let (store, executor) = seeded().await;
    store.fail_next("commit_trx", 1, ErrorKind::Transport).await;

    let outcome = executor
        .new_order(&TrxContext::background(), &new_order(1, 5, &[(10, 1, 3)]))
        .await
        .unwrap();

    assert_eq!(outcome.order.o_id, 21);
    assert_eq!(store.trx_stats(), stats(2, 1, 1));
    assert_eq!(stock_row(&store, 1, 10).await.s_quantity, 47);
}

#[tokio::test]
async fn test_non_transactional_mode_runs_once() {
    let (store, executor) = seeded_with(ExecutorConfig {
        transactions: false,
        ..config()
    })
    .await;
    assert!(!executor.is_transactional());
    store.fail_next("get_warehouse", 1, ErrorKind::Conflict).await;

    let err = executor
        .new_order(&TrxContext::background(), &new_order(1, 5, &[(10, 1, 3)]))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert_eq!(store.trx_stats(), stats(0, 0, 0));

    executor
        .new_order(&TrxContext::background(), &new_order(1, 5, &[(10, 1, 3)]))
        .await
        .unwrap();
    assert_eq!(store.trx_stats(), stats(0, 0, 0));
}

#[tokio::test]
async fn test_storage_without_transactions_disables_bracketing() {
    let store = Arc::new(MemoryStorage::new().with_transactions(false));
    let executor = Executor::new(store, config());
    assert!(!executor.is_transactional());
}

#[tokio::test]
async fn test_cancelled_context_stops_before_first_attempt() {
    let (store, executor) = seeded().await;
    let (ctx, handle) = TrxContext::new();
    handle.cancel();

    let err = executor
        .new_order(&ctx, &new_order(1, 5, &[(10, 1, 3)]))
        .await
        .unwrap_err();

    assert!(matches!(err, TrxError::Cancelled));
    assert!(!err.is_retryable());
    assert_eq!(store.trx_stats(), stats(0, 0, 0));
}

#[tokio::test]
async fn test_cancel_mid_body_rolls_back_without_retry() {
    let (store, executor) = seeded().await;
    let (ctx, handle) = TrxContext::new();
    let entered = Arc::new(tokio::sync::Notify::new());
    let calls = std::sync::atomic::AtomicU32::new(0);

    let canceller = {
        let entered = entered.clone();
        tokio::spawn(async move {
            entered.notified().await;
            handle.cancel();
        })
    };

    let err = executor
        .run_in_trx(&ctx, "test", || {
            calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            let storage = executor.storage().clone();
            let entered = entered.clone();
            async move {
                storage.update_warehouse_balance(1, 50.0).await?;
                entered.notify_one();
                std::future::pending::<()>().await;
                Ok::<(), TrxError>(())
            }
        })
        .await
        .unwrap_err();
    canceller.await.unwrap();

    assert!(matches!(err, TrxError::Cancelled));
    assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    assert_eq!(store.trx_stats(), stats(1, 0, 1));
    // the write made before the cancel was undone
    assert_eq!(store.get_warehouse(1).await.unwrap().w_ytd, 300_000.0);
}

#[tokio::test]
async fn test_context_cancel_wakes_waiters() {
    let (ctx, handle) = TrxContext::new();
    let waiter = {
        let ctx = ctx.clone();
        tokio::spawn(async move { ctx.cancelled().await })
    };
    assert!(!ctx.is_cancelled());

    handle.cancel();
    waiter.await.unwrap();
    assert!(ctx.is_cancelled());
    assert!(!TrxContext::background().is_cancelled());
}

#[test]
fn test_error_kinds() {
    let invalid = TrxError::InvalidItem {
        requested: 3,
        found: 2,
    };
    assert_eq!(invalid.kind(), ErrorKind::InvalidItem);
    assert!(invalid.is_retryable());

    let missing = TrxError::from(crate::storage::StorageError::not_found("customer", "c=1"));
    assert_eq!(missing.kind(), ErrorKind::NotFound);
    assert!(!missing.is_retryable());

    assert_eq!(TrxError::Cancelled.kind(), ErrorKind::Transport);
}

// ============================================================================
// Payment / Order-Status
// ============================================================================

fn payment(customer: CustomerSelector, amount: f64) -> PaymentParams {
    PaymentParams {
        warehouse_id: 1,
        district_id: 2,
        customer_warehouse_id: 1,
        customer_district_id: 1,
        customer,
        amount,
        date: at(3),
    }
}

#[tokio::test]
async fn test_payment_updates_balances_and_history() {
    let (store, executor) = seeded().await;

    let outcome = executor
        .payment(
            &TrxContext::background(),
            &payment(CustomerSelector::Id(5), 10.0),
        )
        .await
        .unwrap();

    assert_eq!(outcome.customer.c_id, 5);
    assert_eq!(outcome.customer.c_balance, -20.0);
    assert_eq!(outcome.customer.c_payment_cnt, 2);
    assert_eq!(outcome.customer.c_data, "old data");

    let stored = store.get_customer(5, 1, 1).await.unwrap();
    assert_eq!(stored.c_balance, -20.0);
    assert_eq!(stored.c_ytd_payment, 20.0);
    assert_eq!(stored.c_data, "old data");
    assert_eq!(store.get_warehouse(1).await.unwrap().w_ytd, 300_010.0);
    assert_eq!(store.get_district(1, 2).await.unwrap().d_ytd, 30_010.0);
    assert_eq!(store.row_count(Table::History).await, 1);
}

#[tokio::test]
async fn test_payment_bad_credit_prepends_note() {
    let (store, executor) = seeded().await;

    executor
        .payment(
            &TrxContext::background(),
            &payment(CustomerSelector::Id(3), 10.0),
        )
        .await
        .unwrap();

    let stored = store.get_customer(3, 1, 1).await.unwrap();
    assert_eq!(stored.c_data, "3 1 1 2 1 10.00|old data");
}

#[tokio::test]
async fn test_payment_note_is_truncated() {
    let (store, executor) = seeded_with(ExecutorConfig {
        customer_data_len: 12,
        ..config()
    })
    .await;

    let outcome = executor
        .payment(
            &TrxContext::background(),
            &payment(CustomerSelector::Id(3), 10.0),
        )
        .await
        .unwrap();

    assert_eq!(outcome.customer.c_data, "3 1 1 2 1 10");
    assert_eq!(store.get_customer(3, 1, 1).await.unwrap().c_data, "3 1 1 2 1 10");
}

#[tokio::test]
async fn test_payment_by_last_name_picks_median() {
    let (_store, executor) = seeded().await;

    let outcome = executor
        .payment(
            &TrxContext::background(),
            &payment(CustomerSelector::new(0, "BAR"), 1.0),
        )
        .await
        .unwrap();

    // ANNA(1), BEN(2), CLEO(4)
    assert_eq!(outcome.customer.c_id, 2);
}

#[tokio::test]
async fn test_order_status_reads_last_order_with_lines() {
    let (_store, executor) = seeded().await;
    let ctx = TrxContext::background();
    executor
        .new_order(&ctx, &new_order(1, 5, &[(10, 1, 1)]))
        .await
        .unwrap();
    executor
        .new_order(&ctx, &new_order(1, 5, &[(10, 1, 2), (11, 1, 1)]))
        .await
        .unwrap();

    let outcome = executor
        .order_status(
            &ctx,
            &OrderStatusParams {
                warehouse_id: 1,
                district_id: 1,
                customer: CustomerSelector::new(0, "ABLE"),
            },
        )
        .await
        .unwrap();

    assert_eq!(outcome.customer.c_id, 5);
    assert_eq!(outcome.order.o_id, 22);
    assert_eq!(outcome.order.order_lines.len(), 2);
    assert_eq!(outcome.order.order_lines[1].ol_i_id, 11);
}

#[tokio::test]
async fn test_order_status_without_orders_is_not_found() {
    let (_store, executor) = seeded().await;

    let err = executor
        .order_status(
            &TrxContext::background(),
            &OrderStatusParams {
                warehouse_id: 1,
                district_id: 1,
                customer: CustomerSelector::Id(1),
            },
        )
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::NotFound);
}

// ============================================================================
// Delivery / Stock-Level
// ============================================================================

fn delivery() -> DeliveryParams {
    DeliveryParams {
        warehouse_id: 1,
        carrier_id: 7,
        delivery_date: at(4),
    }
}

#[tokio::test]
async fn test_delivery_claims_oldest_order_and_skips_empty_districts() {
    let (store, executor) = seeded().await;
    let ctx = TrxContext::background();
    executor
        .new_order(&ctx, &new_order(1, 5, &[(10, 1, 2)]))
        .await
        .unwrap();
    executor
        .new_order(&ctx, &new_order(1, 5, &[(11, 1, 1)]))
        .await
        .unwrap();

    let outcome = executor.delivery(&ctx, &delivery()).await.unwrap();

    assert_eq!(
        outcome.delivered,
        vec![DeliveredOrder {
            district_id: 1,
            order_id: 21,
            customer_id: 5,
            amount: 5.0,
        }]
    );
    assert_eq!(outcome.skipped, vec![2]);

    assert_eq!(store.check_new_order(1, 1).await.unwrap().unwrap().no_o_id, 22);
    let lines = store.get_order_lines(21, 1, 1).await.unwrap();
    assert!(lines.iter().all(|l| l.ol_delivery_d == Some(at(4))));

    let customer = store.get_customer(5, 1, 1).await.unwrap();
    assert_eq!(customer.c_balance, -5.0);
    assert_eq!(customer.c_delivery_cnt, 1);
}

#[tokio::test]
async fn test_delivery_on_empty_queues_changes_nothing() {
    let (store, executor) = seeded().await;

    let outcome = executor
        .delivery(&TrxContext::background(), &delivery())
        .await
        .unwrap();

    assert!(outcome.delivered.is_empty());
    assert_eq!(outcome.skipped, vec![1, 2]);
    assert_eq!(store.row_count(Table::Orders).await, 0);
}

#[tokio::test]
async fn test_delivery_keeps_going_after_a_failed_district() {
    let (store, executor) = seeded().await;
    let ctx = TrxContext::background();
    executor
        .new_order(&ctx, &new_order(1, 5, &[(10, 1, 1)]))
        .await
        .unwrap();
    executor
        .new_order(&ctx, &new_order(2, 1, &[(10, 1, 1)]))
        .await
        .unwrap();
    store
        .fail_next("get_customer_id_order", 1, ErrorKind::NotFound)
        .await;

    let err = executor.delivery(&ctx, &delivery()).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert!(store.check_new_order(1, 1).await.unwrap().is_some());
    assert!(store.check_new_order(1, 2).await.unwrap().is_none());
}

#[tokio::test]
async fn test_stock_level_counts_recent_low_items() {
    let (_store, executor) = seeded().await;
    let ctx = TrxContext::background();
    executor
        .new_order(&ctx, &new_order(1, 5, &[(10, 1, 3), (11, 1, 5)]))
        .await
        .unwrap();

    let level = |threshold| StockLevelParams {
        warehouse_id: 1,
        district_id: 1,
        threshold,
    };

    // item 10 at 47, item 11 restocked to 98
    let low = executor.stock_level(&ctx, &level(50)).await.unwrap();
    assert_eq!(low.low_stock, 1);
    let low = executor.stock_level(&ctx, &level(99)).await.unwrap();
    assert_eq!(low.low_stock, 2);
    let low = executor.stock_level(&ctx, &level(10)).await.unwrap();
    assert_eq!(low.low_stock, 0);
}

#[tokio::test]
async fn test_stock_level_is_never_bracketed() {
    let (store, executor) = seeded().await;
    let before = store.trx_stats();

    executor
        .stock_level(
            &TrxContext::background(),
            &StockLevelParams {
                warehouse_id: 1,
                district_id: 1,
                threshold: 20,
            },
        )
        .await
        .unwrap();

    assert_eq!(store.trx_stats(), before);
}

// ============================================================================
// Batch buffer
// ============================================================================

#[tokio::test]
async fn test_save_batch_flushes_on_multiples_of_batch_size() {
    let store = Arc::new(MemoryStorage::new());
    let mut executor = Executor::new(store.clone(), config());
    executor.change_batch_size(2);

    for i_id in 1..=3 {
        executor.save_batch(item(i_id, 1.0)).await.unwrap();
    }
    assert_eq!(store.row_count(Table::Item).await, 2);
    assert_eq!(executor.pending(Table::Item), 1);

    assert_eq!(executor.flush(Table::Item).await.unwrap(), 1);
    assert_eq!(store.row_count(Table::Item).await, 3);
    assert_eq!(executor.flush(Table::Item).await.unwrap(), 0);
}

#[tokio::test]
async fn test_failed_flush_keeps_records_buffered() {
    let store = Arc::new(MemoryStorage::new());
    let mut executor = Executor::new(store.clone(), config());
    executor.save_batch(item(1, 1.0)).await.unwrap();
    executor.save_batch(warehouse(1)).await.unwrap();
    store.fail_next("insert_batch", 1, ErrorKind::Transport).await;

    assert!(executor.flush_all().await.is_err());
    assert_eq!(executor.pending(Table::Warehouse), 1);
    assert_eq!(executor.pending(Table::Item), 1);

    assert_eq!(executor.flush_all().await.unwrap(), 2);
    assert_eq!(executor.pending(Table::Item), 0);
    assert_eq!(store.row_count(Table::Warehouse).await, 1);
}

#[tokio::test]
async fn test_save_inserts_immediately() {
    let store = Arc::new(MemoryStorage::new());
    let mut executor = Executor::new(store.clone(), config());
    executor.change_retries(1);

    executor.save(item(7, 3.0)).await.unwrap();
    let err = executor.save(item(7, 3.0)).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert_eq!(executor.config().retries, 1);
    assert_eq!(store.get_items(&[7]).await.unwrap().len(), 1);
}
