//! Abuse reports against shared subscriptions.

use serde::{Deserialize, Serialize};

use crate::{ReportId, SubscriptionId, Timestamp, UserId};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ts_rs::TS)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Pending,
    Resolved,
    Dismissed,
}

crate::text_enum!(ReportStatus, "report status", {
    Pending => "pending",
    Resolved => "resolved",
    Dismissed => "dismissed",
});

#[derive(Clone, Debug, Serialize, Deserialize, ts_rs::TS)]
pub struct Report {
    pub id: ReportId,
    pub reported_by: UserId,
    pub subscription_id: SubscriptionId,
    pub reason: String,
    pub status: ReportStatus,
    pub resolved_by_admin_id: Option<UserId>,
    pub resolution_notes: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
