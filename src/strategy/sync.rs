//! Synchronous processing strategy
//!
//! Replays the operation log on the calling thread, one record at a time, in
//! file order. This strategy produces the reference output for a log: no two
//! records ever race.
//!
//! # Design
//!
//! The SyncProcessingStrategy focuses on orchestration, delegating:
//! - CSV parsing to `SyncReader` (iterator interface)
//! - Label resolution and engine calls to `Replayer`
//! - CSV output to `csv_format::write_report_csv`

use crate::core::replay::Replayer;
use crate::io::sync_reader::SyncReader;
use crate::strategy::{write_report, ProcessingStrategy, ReplaySettings};
use std::io::Write;
use std::path::Path;

/// Synchronous processing strategy
///
/// # Examples
///
/// ```no_run
/// use swap_exchange_engine::strategy::{ProcessingStrategy, ReplaySettings, SyncProcessingStrategy};
/// use std::path::Path;
/// use std::io;
///
/// let strategy = SyncProcessingStrategy::new(ReplaySettings::default());
/// let mut output = io::stdout();
///
/// strategy.process(Path::new("operations.csv"), &mut output)
///     .expect("Replay failed");
/// ```
#[derive(Debug, Clone)]
pub struct SyncProcessingStrategy {
    settings: ReplaySettings,
}

impl SyncProcessingStrategy {
    pub fn new(settings: ReplaySettings) -> Self {
        Self { settings }
    }
}

impl ProcessingStrategy for SyncProcessingStrategy {
    /// Replay the log sequentially and write the report
    ///
    /// 1. Creates a SyncReader to stream records from the CSV file
    /// 2. Creates a Replayer over a fresh in-memory ledger
    /// 3. Applies each record, logging and skipping failures
    /// 4. Writes the selected report
    fn process(&self, input_path: &Path, output: &mut dyn Write) -> Result<(), String> {
        let replayer = Replayer::in_memory(self.settings.exchange.clone());
        let reader = SyncReader::new(input_path)?;

        for result in reader {
            match result {
                Ok(record) => {
                    if let Err(e) = replayer.apply(&record) {
                        tracing::warn!(
                            op = record.operation.name(),
                            actor = %record.actor,
                            error = %e,
                            "Record rejected"
                        );
                    }
                }
                Err(e) => tracing::warn!(error = %e, "Skipping record"),
            }
        }

        write_report(&replayer, self.settings.report, output)
    }
}
