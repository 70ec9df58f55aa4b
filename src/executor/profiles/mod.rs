//! The five TPC-C profiles, one `impl Executor` block each.

mod delivery;
mod new_order;
mod order_status;
mod payment;
mod stock_level;

use crate::models::Customer;
use crate::storage::{Result, Storage};

use super::CustomerSelector;

/// Resolve a customer of `(warehouse_id, district_id)`.
async fn resolve_customer(
    storage: &dyn Storage,
    selector: &CustomerSelector,
    warehouse_id: u32,
    district_id: u32,
) -> Result<Customer> {
    match selector {
        CustomerSelector::Id(customer_id) => {
            storage
                .get_customer(*customer_id, warehouse_id, district_id)
                .await
        }
        CustomerSelector::LastName(last_name) => {
            storage
                .get_customer_by_name(last_name, warehouse_id, district_id)
                .await
        }
    }
}
