//! Core business logic module
//!
//! This module contains the exchange components:
//! - `traits` - The `LedgerStore` storage seam
//! - `ledger` - In-memory versioned store
//! - `state_machine` - Item and swap status transitions
//! - `config` - Business constants and retry bound
//! - `engine` - Exchange operations as optimistic logical transactions
//! - `catalog` - Read-only queries
//! - `replay` - Label-based operation-log replay
//! - `batch_processor` - Concurrent per-actor replay on tokio

pub mod batch_processor;
pub mod catalog;
pub mod config;
pub mod engine;
pub mod ledger;
pub mod replay;
pub mod state_machine;
pub mod traits;

pub use batch_processor::{BatchProcessor, ProcessingResult};
pub use catalog::Catalog;
pub use config::ExchangeConfig;
pub use engine::{ExchangeEngine, Transaction};
pub use ledger::MemoryLedger;
pub use replay::Replayer;
pub use traits::LedgerStore;
