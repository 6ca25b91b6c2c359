//! Append-only ledger entries (`transactions` rows).

use serde::{Deserialize, Serialize};

use crate::{CommissionRate, GrantId, Money, Timestamp, TransactionId, UserId};

/// Why a balance moved.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ts_rs::TS)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Topup,
    Purchase,
    Earning,
    Refund,
    Commission,
}

crate::text_enum!(TransactionType, "transaction type", {
    Topup => "topup",
    Purchase => "purchase",
    Earning => "earning",
    Refund => "refund",
    Commission => "commission",
});

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ts_rs::TS)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
    Cancelled,
}

crate::text_enum!(TransactionStatus, "transaction status", {
    Pending => "pending",
    Completed => "completed",
    Failed => "failed",
    Cancelled => "cancelled",
});

/// A single ledger line. `amount` is negative for debits.
#[derive(Clone, Debug, Serialize, Deserialize, ts_rs::TS)]
pub struct LedgerEntry {
    pub id: TransactionId,
    pub user_id: UserId,
    pub amount: Money,
    pub kind: TransactionType,
    pub status: TransactionStatus,
    pub reference_id: Option<String>,
    /// Set on commission entries, for audit.
    pub commission_rate: Option<CommissionRate>,
    pub commission_amount: Option<Money>,
    /// Grant this entry settles, for purchase/earning/commission lines.
    pub grant_id: Option<GrantId>,
    pub notes: Option<String>,
    pub processed_by_admin_id: Option<UserId>,
    pub created_at: Timestamp,
}
