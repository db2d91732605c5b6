//! Payments sub-client.
//!
//! Money reads are never cached — a stale balance is worse than a slow one.

use crate::client::CohortlyClient;
use crate::domain::payment::{Balance, Payout, PayoutRequest, TransactionsResponse};
use crate::error::SdkError;
use rust_decimal::Decimal;

/// Sub-client for payment operations.
pub struct Payments<'a> {
    pub(crate) client: &'a CohortlyClient,
}

impl Payments<'_> {
    pub async fn balance(&self) -> Result<Balance, SdkError> {
        Ok(self.client.http.get("/payments/balance").await?)
    }

    pub async fn transactions(
        &self,
        page: Option<u32>,
    ) -> Result<TransactionsResponse, SdkError> {
        let page = page.map(|p| p.to_string());
        let mut params: Vec<(&str, &str)> = Vec::new();
        if let Some(p) = &page {
            params.push(("page", p));
        }
        Ok(self
            .client
            .http
            .get_with_query("/payments/transactions", &params)
            .await?)
    }

    /// Pay a participant. The idempotency key is generated here so a
    /// fallback-hop re-dispatch cannot double-spend.
    pub async fn create_payout(
        &self,
        study_id: &str,
        participant_id: &str,
        amount: Decimal,
        currency: &str,
    ) -> Result<Payout, SdkError> {
        let request = PayoutRequest {
            study_id: study_id.to_string(),
            participant_id: participant_id.to_string(),
            amount,
            currency: currency.to_string(),
            idempotency_key: uuid::Uuid::new_v4().to_string(),
        };
        Ok(self.client.http.post("/payments/payouts", &request).await?)
    }
}
