//! Types module
//!
//! Contains core data structures used throughout the application.
//! This module organizes types into logical submodules:
//! - `user`: Users, roles and point balances
//! - `item`: Listed items, their status, and listing submissions
//! - `swap`: Swap requests
//! - `operation`: Operation-log records replayed against the engine
//! - `entity`: Keys, versions and the tagged entity the ledger stores
//! - `error`: Error types for the exchange engine

pub mod entity;
pub mod error;
pub mod item;
pub mod operation;
pub mod swap;
pub mod user;

pub use entity::{ConditionalWrite, Entity, EntityKey, EntityKind, Version, Versioned};
pub use error::{ExchangeError, InvalidTransition, ReplayError, StoreError};
pub use item::{Item, ItemId, ItemStatus, Listing};
pub use operation::{Operation, OperationRecord};
pub use swap::{SwapId, SwapRequest, SwapStatus};
pub use user::{Points, Role, User, UserId};
