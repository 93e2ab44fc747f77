//! Benchmark suite for comparing replay strategies
//!
//! Compares the synchronous and asynchronous strategies using the divan
//! benchmarking framework.
//!
//! # Running Benchmarks
//!
//! ```bash
//! cargo bench
//! ```
//!
//! # Workload
//!
//! Operation logs are generated into temporary files before timing starts.
//! Each log registers sellers and buyers, lists and approves one item per
//! buyer, then has every buyer redeem an item listed by a different seller
//! and propose a swap. Buyers mostly act on distinct entities, so the async
//! strategy can spread them across worker threads.

use std::io::Write;
use std::path::Path;
use swap_exchange_engine::cli::StrategyType;
use swap_exchange_engine::strategy::{create_strategy, BatchConfig, ReplaySettings};
use tempfile::NamedTempFile;

fn main() {
    divan::main();
}

/// Build an operation log with `buyers` buyers and return it as a temp file
fn generate_log(buyers: usize) -> NamedTempFile {
    let sellers = (buyers / 10).max(1);
    let mut csv = String::from("op,actor,target,offer,label,email,title,description\n");

    csv.push_str("admin,root,,,,root@example.com\n");
    for s in 0..sellers {
        csv.push_str(&format!("register,seller{s},,,,seller{s}@example.com\n"));
    }
    for b in 0..buyers {
        csv.push_str(&format!("register,buyer{b},,,,buyer{b}@example.com\n"));
        csv.push_str(&format!(
            "list,seller{},,,stock{b},,Stock {b},Cotton\n",
            b % sellers
        ));
        csv.push_str(&format!("list,buyer{b},,,own{b},,Own {b},Wool\n"));
        csv.push_str(&format!("approve,root,stock{b}\n"));
    }
    for b in 0..buyers {
        csv.push_str(&format!("redeem,buyer{b},stock{b}\n"));
        let partner = (b + 1) % buyers;
        csv.push_str(&format!("propose,buyer{b},own{partner},own{b},swap{b}\n"));
    }

    let mut file = NamedTempFile::new().expect("Failed to create temp file");
    file.write_all(csv.as_bytes())
        .expect("Failed to write to temp file");
    file.flush().expect("Failed to flush temp file");
    file
}

fn replay(strategy_type: StrategyType, config: Option<BatchConfig>, path: &Path) {
    let strategy = create_strategy(strategy_type, config, ReplaySettings::default());
    let mut output = Vec::new();

    strategy.process(path, &mut output).expect("Replay failed");
}

#[divan::bench(args = [100, 1_000, 10_000])]
fn sync_strategy(bencher: divan::Bencher, buyers: usize) {
    let log = generate_log(buyers);
    bencher.bench(|| replay(StrategyType::Sync, None, log.path()));
}

#[divan::bench(args = [100, 1_000, 10_000])]
fn async_strategy(bencher: divan::Bencher, buyers: usize) {
    let log = generate_log(buyers);
    bencher.bench(|| {
        replay(
            StrategyType::Async,
            Some(BatchConfig::default()),
            log.path(),
        )
    });
}
