//! Processing strategy module for operation-log replay
//!
//! This module defines the Strategy pattern for complete replay pipelines,
//! covering CSV parsing, engine processing and report output. Different
//! implementations (synchronous, asynchronous batch) can be selected at runtime.

use crate::cli::{ReportKind, StrategyType};
use crate::core::config::ExchangeConfig;
use crate::core::replay::Replayer;
use crate::core::traits::LedgerStore;
use crate::io::csv_format::write_report_csv;
use std::io::Write;
use std::path::Path;

pub mod r#async;
pub mod sync;

pub use self::r#async::{AsyncProcessingStrategy, BatchConfig};
pub use sync::SyncProcessingStrategy;

/// Settings shared by every strategy
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReplaySettings {
    /// Engine constants and retry bound
    pub exchange: ExchangeConfig,
    /// Which report to write once the log is replayed
    pub report: ReportKind,
}

impl Default for ReplaySettings {
    fn default() -> Self {
        Self {
            exchange: ExchangeConfig::default(),
            report: ReportKind::Users,
        }
    }
}

/// Processing strategy trait for complete replay pipelines
///
/// Each strategy reads operation records from a CSV file, applies them to a
/// fresh ledger, and writes the selected report to output.
pub trait ProcessingStrategy: Send + Sync {
    /// Replay the operation log at `input_path` and write a report to `output`
    ///
    /// # Arguments
    ///
    /// * `input_path` - Path to the input CSV file containing operation records
    /// * `output` - Mutable reference to a writer for the report
    ///
    /// # Returns
    ///
    /// * `Ok(())` if the log was replayed, even if some records were rejected
    /// * `Err(String)` if a fatal error occurred (file not found, I/O error, etc.)
    ///
    /// Individual record failures are logged at `warn` and never cause this
    /// method to return an error.
    fn process(&self, input_path: &Path, output: &mut dyn Write) -> Result<(), String>;
}

/// Write the selected report for the replayer's current state
pub fn write_report<S: LedgerStore + ?Sized>(
    replayer: &Replayer<S>,
    kind: ReportKind,
    output: &mut dyn Write,
) -> Result<(), String> {
    match kind {
        ReportKind::Users => write_report_csv(&replayer.user_rows(), output),
        ReportKind::Items => write_report_csv(&replayer.item_rows(), output),
        ReportKind::Swaps => write_report_csv(&replayer.swap_rows(), output),
    }
}

/// Create a processing strategy based on the specified strategy type
///
/// # Arguments
///
/// * `strategy_type` - The type of processing strategy to create (Sync or Async)
/// * `config` - Optional configuration for async batch processing (ignored for sync)
/// * `settings` - Engine configuration and report selection
///
/// # Returns
///
/// A boxed trait object implementing the ProcessingStrategy trait
pub fn create_strategy(
    strategy_type: StrategyType,
    config: Option<BatchConfig>,
    settings: ReplaySettings,
) -> Box<dyn ProcessingStrategy> {
    match strategy_type {
        StrategyType::Sync => Box::new(SyncProcessingStrategy::new(settings)),
        StrategyType::Async => {
            let config = config.unwrap_or_default();
            Box::new(AsyncProcessingStrategy::new(config, settings))
        }
    }
}
