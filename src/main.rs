//! Swap Exchange Engine CLI
//!
//! Replays a clothing-swap operation log from a CSV file and prints the
//! resulting state as CSV.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- operations.csv > users.csv
//! cargo run -- --report items operations.csv > items.csv
//! cargo run -- --strategy async --batch-size 500 --max-concurrent 8 operations.csv
//! cargo run -- --log-level debug --max-attempts 10 operations.csv
//! ```
//!
//! # Processing Strategies
//!
//! - **sync**: Records applied in file order on one thread (default)
//! - **async**: Batches replayed with concurrent per-actor tasks
//!
//! # Exit Codes
//!
//! - 0: Success, including logs with rejected records
//! - 1: Error (missing arguments, file not found, output not writable, etc.)

use std::process;
use swap_exchange_engine::cli;
use swap_exchange_engine::strategy;
use tracing_subscriber::EnvFilter;

fn main() {
    let args = cli::parse_args();

    // RUST_LOG wins over --log-level; stdout is reserved for the report
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&args.log_level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let strategy = {
        let config = if matches!(args.strategy, cli::StrategyType::Async) {
            Some(args.to_batch_config())
        } else {
            None
        };
        strategy::create_strategy(args.strategy, config, args.to_replay_settings())
    };

    let mut output = std::io::stdout();
    if let Err(e) = strategy.process(&args.input_file, &mut output) {
        tracing::error!(error = %e, "Replay failed");
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
