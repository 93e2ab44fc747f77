//! Batch replay with actor-based partitioning
//!
//! This module provides the `BatchProcessor` struct, which replays batches of
//! operation records concurrently while keeping each actor's records in order.
//!
//! # Design
//!
//! A batch is partitioned by actor. Each actor's records run sequentially in
//! one tokio task; different actors run concurrently and may race on shared
//! items and swaps. Those races are settled by the engine's optimistic
//! transactions, not by the processor.
//!
//! Records of different actors in the same batch have no ordering between
//! them. A record that depends on another actor's earlier record (approving a
//! listing submitted in the same batch, say) may fail if it runs first.
//!
//! # Architecture
//!
//! ```text
//! BatchProcessor
//!     └── Arc<Replayer<S>>  (engine, catalog and label bindings)
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use crate::core::replay::Replayer;
use crate::core::traits::LedgerStore;
use crate::types::{OperationRecord, ReplayError, UserId};

/// Result of replaying a single record
#[derive(Debug, Clone)]
pub struct ProcessingResult {
    /// The record that was replayed
    pub record: OperationRecord,

    /// The result of replaying it
    pub result: Result<(), ReplayError>,
}

/// Batch processor with actor-based partitioning
pub struct BatchProcessor<S: ?Sized> {
    replayer: Arc<Replayer<S>>,
}

impl<S: ?Sized> Clone for BatchProcessor<S> {
    fn clone(&self) -> Self {
        Self {
            replayer: Arc::clone(&self.replayer),
        }
    }
}

impl<S: LedgerStore + ?Sized + 'static> BatchProcessor<S> {
    /// Create a new BatchProcessor
    ///
    /// # Arguments
    ///
    /// * `replayer` - Shared replayer every task applies records through
    pub fn new(replayer: Arc<Replayer<S>>) -> Self {
        Self { replayer }
    }

    pub fn replayer(&self) -> &Arc<Replayer<S>> {
        &self.replayer
    }

    /// Partition a batch of records by actor
    ///
    /// # Returns
    ///
    /// A HashMap from actor to that actor's records, in their original order.
    /// Every record appears in exactly one partition.
    pub fn partition_by_actor(
        &self,
        batch: Vec<OperationRecord>,
    ) -> HashMap<UserId, Vec<OperationRecord>> {
        let mut actor_batches: HashMap<UserId, Vec<OperationRecord>> = HashMap::new();

        for record in batch {
            actor_batches
                .entry(record.actor.clone())
                .or_default()
                .push(record);
        }

        actor_batches
    }

    /// Replay one actor's records sequentially
    ///
    /// Failures are captured per record and do not stop the remaining ones.
    ///
    /// # Returns
    ///
    /// One `ProcessingResult` per record, in input order.
    pub async fn process_actor_records(
        &self,
        records: Vec<OperationRecord>,
    ) -> Vec<ProcessingResult> {
        let mut results = Vec::with_capacity(records.len());

        for record in records {
            let result = self.replayer.apply(&record);
            results.push(ProcessingResult { record, result });
        }

        results
    }

    /// Replay a batch with actor-based partitioning
    ///
    /// This method:
    /// 1. Partitions the batch by actor
    /// 2. Spawns a tokio task per actor
    /// 3. Waits for every task to complete
    ///
    /// # Returns
    ///
    /// One `ProcessingResult` per record. Results of different actors come
    /// back in no particular order.
    pub async fn process_batch(&self, batch: Vec<OperationRecord>) -> Vec<ProcessingResult> {
        let actor_batches = self.partition_by_actor(batch);

        let mut tasks = Vec::with_capacity(actor_batches.len());
        for (_actor, records) in actor_batches {
            let processor = self.clone();
            tasks.push(tokio::spawn(async move {
                processor.process_actor_records(records).await
            }));
        }

        let mut results = Vec::new();
        for task in tasks {
            match task.await {
                Ok(actor_results) => results.extend(actor_results),
                Err(e) => tracing::error!(error = %e, "Replay task panicked"),
            }
        }

        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::ExchangeConfig;
    use crate::core::ledger::MemoryLedger;
    use crate::types::{ExchangeError, Listing, Operation};

    fn processor() -> BatchProcessor<MemoryLedger> {
        BatchProcessor::new(Arc::new(Replayer::in_memory(ExchangeConfig::default())))
    }

    fn register(actor: &str) -> OperationRecord {
        OperationRecord::new(
            actor,
            Operation::Register {
                email: format!("{}@example.com", actor),
            },
        )
    }

    fn list(actor: &str, label: &str) -> OperationRecord {
        OperationRecord::new(
            actor,
            Operation::List {
                label: label.to_string(),
                listing: Listing {
                    title: label.to_string(),
                    description: "Folded neatly".to_string(),
                    ..Listing::default()
                },
            },
        )
    }

    fn redeem(actor: &str, item: &str) -> OperationRecord {
        OperationRecord::new(
            actor,
            Operation::Redeem {
                item: item.to_string(),
            },
        )
    }

    #[test]
    fn test_processor_is_cloneable_and_shares_replayer() {
        let processor = processor();
        let cloned = processor.clone();

        assert!(Arc::ptr_eq(processor.replayer(), cloned.replayer()));
    }

    #[test]
    fn test_partition_by_actor_empty_batch() {
        let partitions = processor().partition_by_actor(Vec::new());
        assert!(partitions.is_empty());
    }

    #[test]
    fn test_partition_by_actor_maintains_order() {
        let batch = vec![
            register("u1"),
            register("u2"),
            list("u1", "a"),
            list("u2", "b"),
            list("u1", "c"),
        ];

        let partitions = processor().partition_by_actor(batch);

        assert_eq!(partitions.len(), 2);
        let u1 = &partitions[&UserId::new("u1")];
        assert_eq!(u1.len(), 3);
        assert_eq!(u1[0], register("u1"));
        assert_eq!(u1[1], list("u1", "a"));
        assert_eq!(u1[2], list("u1", "c"));
        assert_eq!(partitions[&UserId::new("u2")].len(), 2);
    }

    #[tokio::test]
    async fn test_process_actor_records_continues_after_error() {
        let processor = processor();

        let results = processor
            .process_actor_records(vec![
                register("u1"),
                redeem("u1", "missing"),
                list("u1", "a"),
            ])
            .await;

        assert_eq!(results.len(), 3);
        assert!(results[0].result.is_ok());
        assert!(matches!(
            results[1].result,
            Err(ReplayError::UnknownLabel { .. })
        ));
        assert!(results[2].result.is_ok());
    }

    #[tokio::test]
    async fn test_process_batch_all_records_processed() {
        let processor = processor();
        let batch: Vec<_> = (0..20).map(|n| register(&format!("u{}", n))).collect();

        let results = processor.process_batch(batch).await;

        assert_eq!(results.len(), 20);
        assert!(results.iter().all(|r| r.result.is_ok()));
        assert_eq!(processor.replayer().catalog().users().len(), 20);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_process_batch_racing_redeems_have_one_winner() {
        let processor = processor();
        let mut setup = vec![
            OperationRecord::new(
                "root",
                Operation::Admin {
                    email: "root@example.com".to_string(),
                },
            ),
            register("seller"),
            list("seller", "coat"),
            OperationRecord::new(
                "root",
                Operation::Approve {
                    item: "coat".to_string(),
                },
            ),
        ];
        let buyers: Vec<String> = (0..10).map(|n| format!("b{}", n)).collect();
        setup.extend(buyers.iter().map(|b| register(b)));
        for result in processor.process_actor_records(setup).await {
            assert!(result.result.is_ok());
        }

        let batch = buyers.iter().map(|b| redeem(b, "coat")).collect();
        let results = processor.process_batch(batch).await;

        let winners = results.iter().filter(|r| r.result.is_ok()).count();
        assert_eq!(winners, 1);
        assert!(results.iter().filter(|r| r.result.is_err()).all(|r| matches!(
            r.result,
            Err(ReplayError::Exchange(ExchangeError::ItemUnavailable { .. }))
                | Err(ReplayError::Exchange(ExchangeError::Contention { .. }))
        )));
        // 1 admin + 1 seller + 10 buyers, one bonus each
        assert_eq!(processor.replayer().catalog().total_points(), 120);
    }
}
