use crate::executor::retry::run_cancellable;
use crate::executor::{Executor, Result, StockLevelOutcome, StockLevelParams, TrxContext};

impl Executor {
    /// Count recently ordered items running low in the home warehouse.
    ///
    /// Never bracketed and never retried.
    #[tracing::instrument(
        name = "tpcc.stock_level",
        skip_all,
        fields(w_id = params.warehouse_id, d_id = params.district_id, threshold = params.threshold)
    )]
    pub async fn stock_level(
        &self,
        ctx: &TrxContext,
        params: &StockLevelParams,
    ) -> Result<StockLevelOutcome> {
        run_cancellable(ctx, self.stock_level_body(params)).await
    }

    async fn stock_level_body(&self, params: &StockLevelParams) -> Result<StockLevelOutcome> {
        let storage = self.storage.as_ref();
        let (w_id, d_id) = (params.warehouse_id, params.district_id);

        let next_o_id = storage.get_next_order_id(w_id, d_id).await?;
        let low_stock = storage
            .get_stock_count(
                next_o_id,
                next_o_id.saturating_sub(self.config.stock_level_window),
                params.threshold,
                w_id,
                d_id,
            )
            .await?;

        Ok(StockLevelOutcome { low_stock })
    }
}
