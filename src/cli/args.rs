use crate::core::config::ExchangeConfig;
use crate::strategy::{BatchConfig, ReplaySettings};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Replay a clothing-swap operation log and print the resulting state
#[derive(Parser, Debug)]
#[command(name = "exchange-engine")]
#[command(about = "Replay a clothing-swap operation log and print the resulting state", long_about = None)]
pub struct CliArgs {
    /// Input CSV file path containing operation records
    #[arg(value_name = "INPUT", help = "Path to the input CSV file")]
    pub input_file: PathBuf,

    /// Replay strategy
    #[arg(
        long = "strategy",
        value_name = "STRATEGY",
        default_value = "sync",
        help = "Replay strategy: 'sync' for file order or 'async' for concurrent per-actor batches"
    )]
    pub strategy: StrategyType,

    /// Number of records per batch (async mode only)
    #[arg(
        long = "batch-size",
        value_name = "SIZE",
        help = "Number of records per batch (default: 1000)"
    )]
    pub batch_size: Option<usize>,

    /// Number of runtime worker threads (async mode only)
    #[arg(
        long = "max-concurrent",
        value_name = "COUNT",
        help = "Number of worker threads replaying actors concurrently (default: CPU cores)"
    )]
    pub max_concurrent_batches: Option<usize>,

    /// Optimistic attempts per operation before giving up
    #[arg(
        long = "max-attempts",
        value_name = "COUNT",
        help = "Attempts per operation before it fails with contention (default: 5)"
    )]
    pub max_attempts: Option<u32>,

    /// Report written to stdout after replay
    #[arg(
        long = "report",
        value_name = "REPORT",
        default_value = "users",
        help = "Report to print: 'users', 'items' or 'swaps'"
    )]
    pub report: ReportKind,

    /// Log filter for stderr output
    #[arg(
        long = "log-level",
        value_name = "LEVEL",
        default_value = "warn",
        help = "Log filter (e.g. 'info', 'debug'); RUST_LOG takes precedence when set"
    )]
    pub log_level: String,
}

/// Available replay strategies
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum StrategyType {
    Sync,
    Async,
}

/// Reports the replay driver can print
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ReportKind {
    Users,
    Items,
    Swaps,
}

impl CliArgs {
    /// Create a BatchConfig from CLI arguments
    ///
    /// Missing values use the defaults; zeros fall back to the defaults with
    /// a warning.
    pub fn to_batch_config(&self) -> BatchConfig {
        if self.batch_size.is_some() || self.max_concurrent_batches.is_some() {
            let default = BatchConfig::default();
            BatchConfig::new(
                self.batch_size.unwrap_or(default.batch_size),
                self.max_concurrent_batches
                    .unwrap_or(default.max_concurrent_batches),
            )
        } else {
            BatchConfig::default()
        }
    }

    /// Create the engine and report settings from CLI arguments
    pub fn to_replay_settings(&self) -> ReplaySettings {
        let exchange = match self.max_attempts {
            Some(max_attempts) => ExchangeConfig::with_max_attempts(max_attempts),
            None => ExchangeConfig::default(),
        };

        ReplaySettings {
            exchange,
            report: self.report,
        }
    }
}
