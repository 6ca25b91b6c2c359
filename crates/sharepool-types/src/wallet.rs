//! Topup requests: user claims of external payment awaiting admin review.

use serde::{Deserialize, Serialize};

use crate::{Money, Timestamp, TopupId, UserId};

/// `Pending -> Approved | Rejected`, one way.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ts_rs::TS)]
#[serde(rename_all = "snake_case")]
pub enum TopupStatus {
    Pending,
    Approved,
    Rejected,
}

crate::text_enum!(TopupStatus, "topup status", {
    Pending => "pending",
    Approved => "approved",
    Rejected => "rejected",
});

#[derive(Clone, Debug, Serialize, Deserialize, ts_rs::TS)]
pub struct TopupRequest {
    pub id: TopupId,
    pub user_id: UserId,
    pub amount: Money,
    /// Payment provider reference. Unique across all requests.
    pub transaction_id: String,
    pub screenshot_url: Option<String>,
    pub status: TopupStatus,
    pub reviewed_by_admin_id: Option<UserId>,
    pub review_notes: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
