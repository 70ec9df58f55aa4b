use crate::executor::{Executor, PaymentOutcome, PaymentParams, Result, TrxContext};
use crate::models::{Customer, History};

use super::resolve_customer;

impl Executor {
    /// Record a customer payment against a warehouse and district.
    #[tracing::instrument(
        name = "tpcc.payment",
        skip_all,
        fields(w_id = params.warehouse_id, d_id = params.district_id, amount = params.amount)
    )]
    pub async fn payment(
        &self,
        ctx: &TrxContext,
        params: &PaymentParams,
    ) -> Result<PaymentOutcome> {
        self.run_in_trx(ctx, "payment", || self.payment_body(params))
            .await
    }

    async fn payment_body(&self, params: &PaymentParams) -> Result<PaymentOutcome> {
        let storage = self.storage.as_ref();
        let (w_id, d_id) = (params.warehouse_id, params.district_id);
        let amount = params.amount;

        let warehouse = storage.get_warehouse(w_id).await?;
        storage.update_warehouse_balance(w_id, amount).await?;

        let district = storage.get_district(w_id, d_id).await?;
        storage.update_district_balance(w_id, d_id, amount).await?;

        let mut customer = resolve_customer(
            storage,
            &params.customer,
            params.customer_warehouse_id,
            params.customer_district_id,
        )
        .await?;

        let note = (customer.c_credit == self.config.bad_credit)
            .then(|| self.credit_note(&customer, params));
        storage
            .update_credit(
                customer.c_id,
                customer.c_w_id,
                customer.c_d_id,
                amount,
                note.as_deref(),
            )
            .await?;

        storage
            .insert_history(&History {
                h_c_id: customer.c_id,
                h_c_d_id: customer.c_d_id,
                h_c_w_id: customer.c_w_id,
                h_d_id: d_id,
                h_w_id: w_id,
                h_date: params.date,
                h_amount: amount,
                h_data: format!("{}    {}", warehouse.w_name, district.d_name),
            })
            .await?;

        customer.c_balance -= amount;
        customer.c_ytd_payment += amount;
        customer.c_payment_cnt += 1;
        if let Some(note) = note {
            customer.c_data = note;
        }
        Ok(PaymentOutcome { customer })
    }

    /// Payment details prepended to a bad-credit customer's data, cut to
    /// the configured length.
    fn credit_note(&self, customer: &Customer, params: &PaymentParams) -> String {
        format!(
            "{} {} {} {} {} {:.2}|{}",
            customer.c_id,
            customer.c_d_id,
            customer.c_w_id,
            params.district_id,
            params.warehouse_id,
            params.amount,
            customer.c_data
        )
        .chars()
        .take(self.config.customer_data_len)
        .collect()
    }
}
