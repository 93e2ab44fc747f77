//! Asynchronous batch processing strategy
//!
//! This module provides a multi-threaded implementation of the
//! ProcessingStrategy trait. Records are read in batches and each batch is
//! replayed with actor-based partitioning.
//!
//! # Architecture
//!
//! ```text
//! AsyncProcessingStrategy
//!     ├── BatchConfig (batch_size, max_concurrent_batches)
//!     ├── AsyncReader (batch CSV reading)
//!     └── BatchProcessor (actor partitioning + tokio tasks)
//!         └── Replayer (labels, engine, catalog)
//!             └── MemoryLedger (per-entity versioned slots)
//! ```
//!
//! # Ordering
//!
//! - Batches run one after another; a batch finishes before the next is read
//! - Within a batch, each actor's records keep their file order
//! - Records of different actors in the same batch run concurrently
//!
//! With `batch_size = 1` the replay is fully sequential and matches the sync
//! strategy record for record.

use crate::core::batch_processor::BatchProcessor;
use crate::core::replay::Replayer;
use crate::io::async_reader::AsyncReader;
use crate::strategy::{write_report, ProcessingStrategy, ReplaySettings};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

/// Configuration for batch processing
///
/// Controls how records are batched and the number of worker threads.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatchConfig {
    /// Number of records per batch
    pub batch_size: usize,
    /// Number of runtime worker threads
    pub max_concurrent_batches: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            max_concurrent_batches: num_cpus::get(),
        }
    }
}

impl BatchConfig {
    /// Create a new BatchConfig with custom values
    ///
    /// Zero values fall back to the defaults with a warning.
    pub fn new(batch_size: usize, max_concurrent_batches: usize) -> Self {
        let default = Self::default();

        let batch_size = if batch_size == 0 {
            tracing::warn!(
                "Invalid batch_size ({}), using default ({})",
                batch_size,
                default.batch_size
            );
            default.batch_size
        } else {
            batch_size
        };

        let max_concurrent_batches = if max_concurrent_batches == 0 {
            tracing::warn!(
                "Invalid max_concurrent_batches ({}), using default ({})",
                max_concurrent_batches,
                default.max_concurrent_batches
            );
            default.max_concurrent_batches
        } else {
            max_concurrent_batches
        };

        Self {
            batch_size,
            max_concurrent_batches,
        }
    }
}

/// Asynchronous batch processing strategy
#[derive(Debug, Clone)]
pub struct AsyncProcessingStrategy {
    config: BatchConfig,
    settings: ReplaySettings,
}

impl AsyncProcessingStrategy {
    /// Create a new AsyncProcessingStrategy
    ///
    /// # Arguments
    ///
    /// * `config` - BatchConfig with batch_size and max_concurrent_batches
    /// * `settings` - Engine configuration and report selection
    pub fn new(config: BatchConfig, settings: ReplaySettings) -> Self {
        Self { config, settings }
    }
}

impl ProcessingStrategy for AsyncProcessingStrategy {
    /// Replay the log in batches and write the report
    ///
    /// 1. Creates a tokio multi-threaded runtime
    /// 2. Creates a shared Replayer and a BatchProcessor over it
    /// 3. Reads records in batches using AsyncReader
    /// 4. Replays each batch, waiting for it to finish before the next
    /// 5. Writes the selected report
    fn process(&self, input_path: &Path, output: &mut dyn Write) -> Result<(), String> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(self.config.max_concurrent_batches)
            .build()
            .map_err(|e| format!("Failed to create tokio runtime: {}", e))?;

        runtime.block_on(async {
            let replayer = Arc::new(Replayer::in_memory(self.settings.exchange.clone()));
            let processor = BatchProcessor::new(Arc::clone(&replayer));

            let file = tokio::fs::File::open(input_path)
                .await
                .map_err(|e| format!("Failed to open file '{}': {}", input_path.display(), e))?;

            // csv-async reads futures::io, tokio files need the compat layer
            let compat_file = tokio_util::compat::TokioAsyncReadCompatExt::compat(file);
            let mut reader = AsyncReader::new(compat_file);

            loop {
                let batch = reader.read_batch(self.config.batch_size).await;
                if batch.is_empty() {
                    break;
                }

                for processed in processor.process_batch(batch).await {
                    if let Err(e) = processed.result {
                        tracing::warn!(
                            op = processed.record.operation.name(),
                            actor = %processed.record.actor,
                            error = %e,
                            "Record rejected"
                        );
                    }
                }
            }

            write_report(replayer.as_ref(), self.settings.report, output)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::ReportKind;
    use rstest::rstest;
    use std::io::Write;
    use tempfile::NamedTempFile;

    /// Helper function to create a temporary CSV file for testing
    fn create_temp_csv(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        file.write_all(content.as_bytes())
            .expect("Failed to write to temp file");
        file.flush().expect("Failed to flush temp file");
        file
    }

    #[rstest]
    #[case::custom(250, 3, 250, 3)]
    #[case::zero_batch_size(0, 3, 1000, 3)]
    #[case::zero_threads(250, 0, 250, num_cpus::get())]
    fn test_batch_config_new(
        #[case] batch_size: usize,
        #[case] threads: usize,
        #[case] expected_batch_size: usize,
        #[case] expected_threads: usize,
    ) {
        let config = BatchConfig::new(batch_size, threads);
        assert_eq!(config.batch_size, expected_batch_size);
        assert_eq!(config.max_concurrent_batches, expected_threads);
    }

    #[test]
    fn test_async_strategy_handles_missing_file() {
        let strategy = AsyncProcessingStrategy::new(BatchConfig::default(), ReplaySettings::default());
        let mut output = Vec::new();

        let result = strategy.process(Path::new("nonexistent.csv"), &mut output);
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("Failed to open file"));
    }

    #[test]
    fn test_async_strategy_single_record_batches_are_sequential() {
        // Cross-actor dependencies only hold when batches are one record long
        let content = "op,actor,target,offer,label,email,title,description\n\
            admin,root,,,,root@example.com\n\
            register,u1,,,,u1@example.com\n\
            register,u2,,,,u2@example.com\n\
            list,u1,,,shirt,,Shirt,Linen\n\
            list,u2,,,jacket,,Jacket,Denim\n\
            propose,u1,jacket,shirt,s1\n\
            accept,u2,s1\n";
        let file = create_temp_csv(content);
        let strategy = AsyncProcessingStrategy::new(
            BatchConfig::new(1, 2),
            ReplaySettings {
                report: ReportKind::Swaps,
                ..ReplaySettings::default()
            },
        );
        let mut output = Vec::new();

        strategy.process(file.path(), &mut output).unwrap();

        assert_eq!(
            String::from_utf8(output).unwrap(),
            "swap,requester,requester_item,owner,owner_item,status\n\
             s1,u1,shirt,u2,jacket,accepted\n"
        );
    }

    #[test]
    fn test_async_strategy_keeps_actor_order_within_a_batch() {
        // Each actor only depends on its own earlier records
        let content = "op,actor,target,offer,label,email,title,description\n\
            register,u1,,,,u1@example.com\n\
            register,u2,,,,u2@example.com\n\
            list,u1,,,a,,Hat,Wool\n\
            list,u2,,,b,,Scarf,Silk\n\
            reject_listing,u1,a\n";
        let file = create_temp_csv(content);
        let strategy = AsyncProcessingStrategy::new(
            BatchConfig::new(100, 4),
            ReplaySettings {
                report: ReportKind::Items,
                ..ReplaySettings::default()
            },
        );
        let mut output = Vec::new();

        strategy.process(file.path(), &mut output).unwrap();

        assert_eq!(
            String::from_utf8(output).unwrap(),
            "item,uploader,title,approved,status\n\
             a,u1,Hat,false,available\n\
             b,u2,Scarf,false,available\n"
        );
    }
}
