//! Swap request types

use super::item::ItemId;
use super::user::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Swap request identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SwapId(Uuid);

impl SwapId {
    pub fn generate() -> Self {
        SwapId(Uuid::new_v4())
    }
}

impl fmt::Display for SwapId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Status of a swap request; `Accepted` and `Rejected` are terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwapStatus {
    Pending,
    Accepted,
    Rejected,
}

impl fmt::Display for SwapStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SwapStatus::Pending => f.write_str("pending"),
            SwapStatus::Accepted => f.write_str("accepted"),
            SwapStatus::Rejected => f.write_str("rejected"),
        }
    }
}

/// A direct item-for-item swap proposal
///
/// The requester offers `requester_item_id` in exchange for the owner's
/// `owner_item_id`.
#[derive(Debug, Clone, PartialEq)]
pub struct SwapRequest {
    pub id: SwapId,
    pub requester_id: UserId,
    pub requester_item_id: ItemId,
    pub owner_id: UserId,
    pub owner_item_id: ItemId,
    pub status: SwapStatus,
    pub created_at: DateTime<Utc>,
}

impl SwapRequest {
    /// Build a pending swap request
    pub fn pending(
        requester_id: UserId,
        requester_item_id: ItemId,
        owner_id: UserId,
        owner_item_id: ItemId,
    ) -> Self {
        SwapRequest {
            id: SwapId::generate(),
            requester_id,
            requester_item_id,
            owner_id,
            owner_item_id,
            status: SwapStatus::Pending,
            created_at: Utc::now(),
        }
    }

    /// Whether `user` is one of the two parties
    pub fn involves(&self, user: &UserId) -> bool {
        &self.owner_id == user || &self.requester_id == user
    }
}
