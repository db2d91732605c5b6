//! Payment domain — researcher balance, transactions, participant payouts.

#[cfg(feature = "http")]
pub mod client;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Researcher account balance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Balance {
    pub available: Decimal,
    /// Committed to in-flight payouts, not yet settled.
    pub pending: Decimal,
    pub currency: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Deposit,
    Payout,
    Fee,
    Refund,
}

/// A ledger entry on the researcher account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub kind: TransactionKind,
    pub amount: Decimal,
    pub currency: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Response for `GET /api/payments/transactions`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionsResponse {
    pub transactions: Vec<Transaction>,
    pub total: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayoutStatus {
    Pending,
    Processing,
    Paid,
    Failed,
}

/// A participant payout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payout {
    pub id: String,
    pub study_id: String,
    pub participant_id: String,
    pub status: PayoutStatus,
    pub amount: Decimal,
    pub currency: String,
    pub created_at: DateTime<Utc>,
}

/// Body for `POST /api/payments/payouts`.
///
/// `idempotency_key` makes the request safe to re-dispatch: the blanket
/// fallback-hop recovery can resend a payout whose first attempt died
/// mid-flight, and the backend deduplicates on the key.
#[derive(Debug, Clone, Serialize)]
pub struct PayoutRequest {
    pub study_id: String,
    pub participant_id: String,
    pub amount: Decimal,
    pub currency: String,
    pub idempotency_key: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_balance_decimal_string_serde() {
        // rust_decimal's serde-str feature: amounts travel as JSON strings.
        let balance: Balance = serde_json::from_str(
            r#"{"available": "120.50", "pending": "9.99", "currency": "USD"}"#,
        )
        .unwrap();
        assert_eq!(balance.available, Decimal::from_str("120.50").unwrap());
        assert_eq!(balance.pending, Decimal::from_str("9.99").unwrap());
    }

    #[test]
    fn test_transaction_kind_serde() {
        let kind: TransactionKind = serde_json::from_str("\"payout\"").unwrap();
        assert_eq!(kind, TransactionKind::Payout);
    }
}
