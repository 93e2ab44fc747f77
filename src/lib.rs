//! Swap Exchange Engine Library
//! # Overview
//!
//! Transactional core of a clothing-swap marketplace. Users earn points on
//! registration, list garments, and either redeem listed items for points or
//! trade items directly. Every mutation runs as an optimistic logical
//! transaction over a versioned ledger, so concurrent requests can never
//! double-spend a balance or consume an item twice.
//!
//! # Architecture
//!
//! - [`types`] - Users, items, swap requests, ledger keys and error types
//! - [`core`] - Business logic components:
//!   - [`core::ledger`] - Per-entity versioned store with all-or-nothing commits
//!   - [`core::state_machine`] - Item and swap status transitions
//!   - [`core::engine`] - Redeem, swap and moderation operations
//!   - [`core::catalog`] - Read-only catalog and dashboard queries
//!   - [`core::replay`] - Operation-log replay by label
//! - [`io`] - Operation-log CSV parsing and report output
//! - [`strategy`] - Sync and async replay pipelines
//! - [`cli`] - CLI arguments parsing
//!
//! # Operations
//!
//! - **Redeem**: Spend points on an approved item; points move to its uploader
//! - **ProposeSwap**: Offer one of your items for someone else's
//! - **AcceptSwap / RejectSwap**: Decide a pending swap
//! - **ApproveListing / RejectListing**: Admin moderation of submitted items
//!
//! # Invariants
//!
//! - Balances never go negative, and redemptions conserve total points
//! - An item leaves `available` at most once
//! - A failed operation leaves no partial writes behind

pub mod cli;
pub mod core;
pub mod io;
pub mod strategy;
pub mod types;

pub use core::{Catalog, ExchangeConfig, ExchangeEngine, LedgerStore, MemoryLedger, Replayer};
pub use io::write_report_csv;
pub use types::{
    ExchangeError, Item, ItemId, ItemStatus, Listing, Points, Role, SwapId, SwapRequest,
    SwapStatus, User, UserId,
};
