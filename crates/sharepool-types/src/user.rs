//! User accounts and roles.

use serde::{Deserialize, Serialize};

use crate::{Money, Timestamp, UserId};

/// Account role. Admins approve topups, verify offers and collect commission.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ts_rs::TS)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Admin,
}

crate::text_enum!(Role, "role", {
    User => "user",
    Admin => "admin",
});

/// A marketplace account. The password hash never leaves the database layer.
#[derive(Clone, Debug, Serialize, Deserialize, ts_rs::TS)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub role: Role,
    /// Wallet balance. Mutated only by the ledger; never negative.
    pub balance: Money,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}
