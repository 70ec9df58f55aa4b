use std::collections::{HashMap, HashSet};

use crate::executor::{Executor, NewOrderOutcome, NewOrderParams, Result, TrxContext, TrxError};
use crate::models::{Item, Order, OrderLine, Stock};
use crate::storage::StorageError;

impl Executor {
    /// Place an order in one district.
    ///
    /// The order id is the district counter's pre-increment value. Stock for
    /// every line is written before the order, its lines and its queue entry
    /// are created together.
    #[tracing::instrument(
        name = "tpcc.new_order",
        skip_all,
        fields(w_id = params.warehouse_id, d_id = params.district_id, c_id = params.customer_id)
    )]
    pub async fn new_order(
        &self,
        ctx: &TrxContext,
        params: &NewOrderParams,
    ) -> Result<NewOrderOutcome> {
        self.run_in_trx(ctx, "new_order", || self.new_order_body(params))
            .await
    }

    async fn new_order_body(&self, params: &NewOrderParams) -> Result<NewOrderOutcome> {
        let storage = self.storage.as_ref();
        let (w_id, d_id) = (params.warehouse_id, params.district_id);

        let warehouse = storage.get_warehouse(w_id).await?;
        let district = storage.get_district(w_id, d_id).await?;
        let order_id = storage.increment_district_order_id(w_id, d_id).await?;
        let customer = storage.get_customer(params.customer_id, w_id, d_id).await?;
        let all_local = params.is_all_local();

        let item_ids: Vec<u32> = params.items.iter().map(|line| line.item_id).collect();
        let catalog: HashMap<u32, Item> = storage
            .get_items(&item_ids)
            .await?
            .into_iter()
            .map(|item| (item.i_id, item))
            .collect();
        let requested: HashSet<u32> = item_ids.iter().copied().collect();
        if requested.iter().any(|id| !catalog.contains_key(id)) {
            return Err(TrxError::InvalidItem {
                requested: requested.len(),
                found: catalog.len(),
            });
        }

        let keys: Vec<(u32, u32)> = params
            .items
            .iter()
            .map(|line| (line.item_id, line.supply_warehouse_id))
            .collect();
        let mut stocks: HashMap<(u32, u32), Stock> = storage
            .get_stock_info(d_id, &keys)
            .await?
            .into_iter()
            .map(|stock| ((stock.s_i_id, stock.s_w_id), stock))
            .collect();

        let mut updates = Vec::with_capacity(params.items.len());
        let mut lines = Vec::with_capacity(params.items.len());
        for (number, line) in (1..).zip(&params.items) {
            let item = catalog
                .get(&line.item_id)
                .ok_or(TrxError::InvalidItem {
                    requested: requested.len(),
                    found: catalog.len(),
                })?;
            let stock = stocks
                .get_mut(&(line.item_id, line.supply_warehouse_id))
                .ok_or_else(|| {
                    StorageError::not_found(
                        "stock",
                        format!("w={} i={}", line.supply_warehouse_id, line.item_id),
                    )
                })?;

            updates.push(stock.apply_order_line(line.quantity, line.supply_warehouse_id != w_id));
            lines.push(OrderLine {
                ol_o_id: order_id,
                ol_d_id: d_id,
                ol_w_id: w_id,
                ol_number: number,
                ol_i_id: line.item_id,
                ol_supply_w_id: line.supply_warehouse_id,
                ol_delivery_d: None,
                ol_quantity: line.quantity,
                ol_amount: item.i_price * f64::from(line.quantity),
                ol_dist_info: stock.dist_info(d_id).to_string(),
            });
        }

        storage.update_stocks(&updates).await?;

        let order = Order {
            o_id: order_id,
            o_d_id: d_id,
            o_w_id: w_id,
            o_c_id: customer.c_id,
            o_entry_d: params.entry_date,
            o_carrier_id: None,
            o_ol_cnt: lines.len() as u32,
            o_all_local: all_local,
            order_lines: lines,
        };
        storage.create_order(&order).await?;

        let total_amount = order.total_amount()
            * (1.0 - customer.c_discount)
            * (1.0 + warehouse.w_tax + district.d_tax);
        Ok(NewOrderOutcome {
            order,
            total_amount,
        })
    }
}
