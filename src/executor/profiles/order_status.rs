use crate::executor::{Executor, OrderStatusOutcome, OrderStatusParams, Result, TrxContext};

use super::resolve_customer;

impl Executor {
    /// Read a customer's most recent order with its lines.
    #[tracing::instrument(
        name = "tpcc.order_status",
        skip_all,
        fields(w_id = params.warehouse_id, d_id = params.district_id)
    )]
    pub async fn order_status(
        &self,
        ctx: &TrxContext,
        params: &OrderStatusParams,
    ) -> Result<OrderStatusOutcome> {
        self.run_in_trx(ctx, "order_status", || self.order_status_body(params))
            .await
    }

    async fn order_status_body(&self, params: &OrderStatusParams) -> Result<OrderStatusOutcome> {
        let storage = self.storage.as_ref();
        let (w_id, d_id) = (params.warehouse_id, params.district_id);

        let customer = resolve_customer(storage, &params.customer, w_id, d_id).await?;
        let mut order = storage.get_last_order(customer.c_id, w_id, d_id).await?;
        order.order_lines = storage.get_order_lines(order.o_id, w_id, d_id).await?;

        Ok(OrderStatusOutcome { customer, order })
    }
}
