// 💸 Transaction Entity - immutable signed-amount record
// Positive amount = credit, negative = debit. Rows are never updated or deleted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A committed transaction row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub acc_id: i64,
    pub amount: i64,
    pub created: DateTime<Utc>,
}

/// Inbound body of the mutating call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TransactionRequest {
    pub acc_id: i64,
    pub amount: i64,
}

/// Statistics of one account's transactions over the current month
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyReport {
    pub sum: i64,
    pub count: i64,
    pub transactions: Vec<Transaction>,
}

impl MonthlyReport {
    pub fn from_transactions(transactions: Vec<Transaction>) -> Self {
        MonthlyReport {
            sum: transactions.iter().map(|tx| tx.amount).sum(),
            count: transactions.len() as i64,
            transactions,
        }
    }
}
