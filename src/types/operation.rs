//! Operation-log records
//!
//! An operation log is a sequence of actions taken by named actors. Items and
//! swaps get their ids from the engine at creation time, so the log refers to
//! them by caller-chosen labels instead.

use super::item::Listing;
use super::user::UserId;

/// One action in an operation log
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// First authentication of the actor
    Register { email: String },

    /// Seed the actor as an admin
    Admin { email: String },

    /// Submit a listing and bind the new item to `label`
    List { label: String, listing: Listing },

    /// Approve the item bound to `item`
    Approve { item: String },

    /// Take down the item bound to `item`
    RejectListing { item: String },

    /// Redeem the item bound to `item`
    Redeem { item: String },

    /// Offer item `offer` for item `target`, binding the new swap to `label`
    Propose {
        offer: String,
        target: String,
        label: String,
    },

    /// Accept the swap bound to `swap`
    Accept { swap: String },

    /// Decline the swap bound to `swap`
    RejectSwap { swap: String },
}

impl Operation {
    /// Name used in the `op` column
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Register { .. } => "register",
            Operation::Admin { .. } => "admin",
            Operation::List { .. } => "list",
            Operation::Approve { .. } => "approve",
            Operation::RejectListing { .. } => "reject_listing",
            Operation::Redeem { .. } => "redeem",
            Operation::Propose { .. } => "propose",
            Operation::Accept { .. } => "accept",
            Operation::RejectSwap { .. } => "reject_swap",
        }
    }
}

/// An operation and the user performing it
#[derive(Debug, Clone, PartialEq)]
pub struct OperationRecord {
    pub actor: UserId,
    pub operation: Operation,
}

impl OperationRecord {
    pub fn new(actor: impl Into<UserId>, operation: Operation) -> Self {
        Self {
            actor: actor.into(),
            operation,
        }
    }
}
