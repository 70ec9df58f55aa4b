use tracing::{debug, warn};

use crate::executor::{
    DeliveredOrder, DeliveryOutcome, DeliveryParams, Executor, Result, TrxContext, TrxError,
};

impl Executor {
    /// Deliver the oldest undelivered order of every district in a
    /// warehouse.
    ///
    /// Each district is its own retried unit of work. Districts with an
    /// empty queue are skipped. A failed district does not stop the others;
    /// the last failure is returned once all districts were visited.
    /// Cancellation stops immediately.
    #[tracing::instrument(
        name = "tpcc.delivery",
        skip_all,
        fields(w_id = params.warehouse_id, carrier_id = params.carrier_id)
    )]
    pub async fn delivery(
        &self,
        ctx: &TrxContext,
        params: &DeliveryParams,
    ) -> Result<DeliveryOutcome> {
        let mut outcome = DeliveryOutcome::default();
        let mut last_error = None;

        for d_id in 1..=self.config.districts_per_warehouse {
            let delivered = self
                .run_in_trx(ctx, "delivery", || self.deliver_district(params, d_id))
                .await;

            match delivered {
                Ok(Some(order)) => outcome.delivered.push(order),
                Ok(None) => {
                    debug!(d_id, "No undelivered order, skipping district");
                    outcome.skipped.push(d_id);
                }
                Err(TrxError::Cancelled) => return Err(TrxError::Cancelled),
                Err(e) => {
                    warn!(d_id, error = %e, "District delivery failed");
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) => Err(e),
            None => Ok(outcome),
        }
    }

    async fn deliver_district(
        &self,
        params: &DeliveryParams,
        d_id: u32,
    ) -> Result<Option<DeliveredOrder>> {
        let storage = self.storage.as_ref();
        let w_id = params.warehouse_id;

        let Some(entry) = storage.get_new_order(w_id, d_id).await? else {
            return Ok(None);
        };
        let o_id = entry.no_o_id;

        let c_id = storage.get_customer_id_order(o_id, w_id, d_id).await?;
        let amount = storage.sum_ol_amount(o_id, w_id, d_id).await?;
        storage.delete_new_order(o_id, w_id, d_id).await?;
        storage
            .update_orders(o_id, w_id, d_id, params.carrier_id, params.delivery_date)
            .await?;
        storage.update_customer(c_id, w_id, d_id, amount).await?;

        Ok(Some(DeliveredOrder {
            district_id: d_id,
            order_id: o_id,
            customer_id: c_id,
            amount,
        }))
    }
}
