//! Error types for the exchange engine
//!
//! # Error Categories
//!
//! - **Store errors** (`StoreError`): optimistic-concurrency failures reported by the ledger
//! - **Transition errors** (`InvalidTransition`): illegal status changes rejected by the state machines
//! - **Exchange errors** (`ExchangeError`): everything an engine operation can return to its caller
//! - **Replay errors** (`ReplayError`): problems with an operation-log record, on top of engine failures
//!
//! Only `StoreError::Conflict` is ever retried, and only inside the engine.
//! Everything else surfaces synchronously to the caller.

use super::entity::EntityKey;
use super::item::{ItemId, ItemStatus};
use super::user::{Points, UserId};
use thiserror::Error;

/// Failure of a ledger store write
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The entity moved past the expected version, or does not exist
    #[error("Version conflict on {key}")]
    Conflict {
        /// First key that failed validation
        key: EntityKey,
    },

    /// `create` was called for a key that is already taken
    #[error("{key} already exists")]
    AlreadyExists {
        key: EntityKey,
    },
}

/// A status change the state machine does not allow
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Cannot move {kind} from {from} to {to}")]
pub struct InvalidTransition {
    /// "item" or "swap"
    pub kind: &'static str,
    pub from: String,
    pub to: String,
}

/// Error returned by exchange engine operations
///
/// Every failed operation leaves the ledger exactly as it was.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExchangeError {
    /// Referenced entity does not exist
    #[error("{entity} not found")]
    NotFound {
        entity: EntityKey,
    },

    /// Actor lacks the role or ownership the operation requires
    #[error("User {actor} is not allowed to {action}")]
    Forbidden {
        actor: UserId,
        action: &'static str,
    },

    /// A status or approval precondition does not hold
    #[error("Invalid state for {entity}: {reason}")]
    InvalidState {
        entity: EntityKey,
        reason: String,
    },

    /// Redeemer cannot cover the cost
    #[error("Insufficient points for user {user}: balance {balance}, cost {cost}")]
    InsufficientFunds {
        user: UserId,
        balance: Points,
        cost: Points,
    },

    /// Uploader tried to redeem their own item
    #[error("User {user} cannot redeem their own item {item}")]
    SelfRedeem {
        user: UserId,
        item: ItemId,
    },

    /// Both items of a proposed swap belong to the requester
    #[error("User {user} cannot swap with their own item {item}")]
    SelfSwap {
        user: UserId,
        item: ItemId,
    },

    /// Offered item is not owned by the requester
    #[error("User {user} does not own item {item}")]
    NotOwner {
        user: UserId,
        item: ItemId,
    },

    /// Item is not (or no longer) open for consumption
    #[error("Item {item} is unavailable ({status}{})", approval_note(.approved))]
    ItemUnavailable {
        item: ItemId,
        status: ItemStatus,
        approved: bool,
    },

    /// Optimistic retries exhausted
    #[error("{operation} gave up after {attempts} conflicting attempts")]
    Contention {
        operation: &'static str,
        attempts: u32,
    },

    /// Listing rejected before reaching the ledger
    #[error("Invalid listing: {field} is required")]
    InvalidListing {
        field: &'static str,
    },

    /// Crediting the user would overflow their balance
    #[error("Balance overflow for user {user}")]
    BalanceOverflow {
        user: UserId,
    },

    /// A create collided with an existing key
    #[error("{entity} already exists")]
    Duplicate {
        entity: EntityKey,
    },
}

fn approval_note(approved: &bool) -> &'static str {
    if *approved {
        ""
    } else {
        ", not approved"
    }
}

impl ExchangeError {
    pub fn not_found(entity: EntityKey) -> Self {
        ExchangeError::NotFound { entity }
    }

    pub fn forbidden(actor: &UserId, action: &'static str) -> Self {
        ExchangeError::Forbidden {
            actor: actor.clone(),
            action,
        }
    }

    pub fn invalid_state(entity: EntityKey, reason: impl Into<String>) -> Self {
        ExchangeError::InvalidState {
            entity,
            reason: reason.into(),
        }
    }

    pub fn insufficient_funds(user: &UserId, balance: Points, cost: Points) -> Self {
        ExchangeError::InsufficientFunds {
            user: user.clone(),
            balance,
            cost,
        }
    }

    pub fn item_unavailable(item: ItemId, status: ItemStatus, approved: bool) -> Self {
        ExchangeError::ItemUnavailable {
            item,
            status,
            approved,
        }
    }

    pub fn contention(operation: &'static str, attempts: u32) -> Self {
        ExchangeError::Contention {
            operation,
            attempts,
        }
    }

    /// Whether the caller should re-fetch state before trying again
    pub fn requires_refresh(&self) -> bool {
        matches!(
            self,
            ExchangeError::ItemUnavailable { .. } | ExchangeError::Contention { .. }
        )
    }
}

/// Problem applying one operation-log record
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReplayError {
    #[error("Unknown operation '{op}'")]
    UnknownOp {
        op: String,
    },

    #[error("'{op}' requires the '{field}' column")]
    MissingField {
        op: &'static str,
        field: &'static str,
    },

    #[error("No {kind} registered under label '{label}'")]
    UnknownLabel {
        kind: &'static str,
        label: String,
    },

    #[error("Label '{label}' is already bound to a {kind}")]
    DuplicateLabel {
        kind: &'static str,
        label: String,
    },

    #[error(transparent)]
    Exchange(#[from] ExchangeError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::not_found(
        ExchangeError::not_found(EntityKey::User(UserId::new("ghost"))),
        "user ghost not found"
    )]
    #[case::forbidden(
        ExchangeError::forbidden(&UserId::new("bob"), "approve listings"),
        "User bob is not allowed to approve listings"
    )]
    #[case::insufficient_funds(
        ExchangeError::insufficient_funds(&UserId::new("u1"), 5, 10),
        "Insufficient points for user u1: balance 5, cost 10"
    )]
    #[case::contention(
        ExchangeError::contention("redeem", 5),
        "redeem gave up after 5 conflicting attempts"
    )]
    #[case::invalid_listing(
        ExchangeError::InvalidListing { field: "title" },
        "Invalid listing: title is required"
    )]
    #[case::balance_overflow(
        ExchangeError::BalanceOverflow { user: UserId::new("u2") },
        "Balance overflow for user u2"
    )]
    fn test_error_display(#[case] error: ExchangeError, #[case] expected: &str) {
        assert_eq!(error.to_string(), expected);
    }

    #[test]
    fn test_item_unavailable_mentions_missing_approval() {
        let item = ItemId::generate();

        let unapproved = ExchangeError::item_unavailable(item, ItemStatus::Available, false);
        assert_eq!(
            unapproved.to_string(),
            format!("Item {} is unavailable (available, not approved)", item)
        );

        let swapped = ExchangeError::item_unavailable(item, ItemStatus::Swapped, true);
        assert_eq!(
            swapped.to_string(),
            format!("Item {} is unavailable (swapped)", item)
        );
    }

    #[rstest]
    #[case::unavailable(ExchangeError::item_unavailable(ItemId::generate(), ItemStatus::Swapped, true), true)]
    #[case::contention(ExchangeError::contention("accept_swap", 5), true)]
    #[case::funds(ExchangeError::insufficient_funds(&UserId::new("u1"), 0, 10), false)]
    #[case::listing(ExchangeError::InvalidListing { field: "description" }, false)]
    fn test_requires_refresh(#[case] error: ExchangeError, #[case] expected: bool) {
        assert_eq!(error.requires_refresh(), expected);
    }

    #[test]
    fn test_replay_error_wraps_exchange_error_transparently() {
        let inner = ExchangeError::contention("redeem", 5);
        let error: ReplayError = inner.clone().into();

        assert_eq!(error, ReplayError::Exchange(inner.clone()));
        assert_eq!(error.to_string(), inner.to_string());
    }

    #[test]
    fn test_transition_error_display() {
        let error = InvalidTransition {
            kind: "item",
            from: "swapped".to_string(),
            to: "rejected".to_string(),
        };
        assert_eq!(error.to_string(), "Cannot move item from swapped to rejected");
    }
}
