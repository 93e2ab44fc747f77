//! Pure status transition rules
//!
//! Item: `available -> swapped`, `available -> rejected`.
//! Swap: `pending -> accepted`, `pending -> rejected`.
//!
//! Nothing leaves a terminal status. These functions perform no I/O and touch
//! no other entity; the engine sequences multi-entity consequences.

use crate::types::{InvalidTransition, ItemStatus, SwapStatus};

/// Validate an item status change and return the new status
pub fn transition_item(from: ItemStatus, to: ItemStatus) -> Result<ItemStatus, InvalidTransition> {
    match (from, to) {
        (ItemStatus::Available, ItemStatus::Swapped)
        | (ItemStatus::Available, ItemStatus::Rejected) => Ok(to),
        _ => Err(InvalidTransition {
            kind: "item",
            from: from.to_string(),
            to: to.to_string(),
        }),
    }
}

/// Validate a swap status change and return the new status
pub fn transition_swap(from: SwapStatus, to: SwapStatus) -> Result<SwapStatus, InvalidTransition> {
    match (from, to) {
        (SwapStatus::Pending, SwapStatus::Accepted) | (SwapStatus::Pending, SwapStatus::Rejected) => {
            Ok(to)
        }
        _ => Err(InvalidTransition {
            kind: "swap",
            from: from.to_string(),
            to: to.to_string(),
        }),
    }
}

/// Validate setting the approval flag
///
/// Approval is monotonic and only granted to items that are still available.
pub fn approve(is_approved: bool, status: ItemStatus) -> Result<bool, InvalidTransition> {
    if !is_approved && status == ItemStatus::Available {
        Ok(true)
    } else {
        Err(InvalidTransition {
            kind: "item",
            from: if is_approved {
                "approved".to_string()
            } else {
                status.to_string()
            },
            to: "approved".to_string(),
        })
    }
}
