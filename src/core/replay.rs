//! Operation-log replay
//!
//! `Replayer` applies `OperationRecord`s to an `ExchangeEngine`. Items and
//! swaps are identified in the log by labels; the replayer binds each label to
//! the id the engine generated and resolves later references through it.
//!
//! Both label maps are `DashMap`s, so one replayer can be shared by the
//! concurrent per-actor workers of the batch processor.

use crate::core::catalog::Catalog;
use crate::core::config::ExchangeConfig;
use crate::core::engine::ExchangeEngine;
use crate::core::ledger::MemoryLedger;
use crate::core::traits::LedgerStore;
use crate::io::csv_format::{ItemRow, SwapRow, UserRow};
use crate::types::{ItemId, Operation, OperationRecord, ReplayError, Role, SwapId};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;

/// Applies operation records and remembers label bindings
pub struct Replayer<S: ?Sized> {
    engine: ExchangeEngine<S>,
    catalog: Catalog<S>,
    items: DashMap<String, ItemId>,
    swaps: DashMap<String, SwapId>,
}

impl Replayer<MemoryLedger> {
    /// Replayer over a fresh in-memory ledger
    pub fn in_memory(config: ExchangeConfig) -> Self {
        Self::new(ExchangeEngine::new(Arc::new(MemoryLedger::new()), config))
    }
}

impl<S: LedgerStore + ?Sized> Replayer<S> {
    pub fn new(engine: ExchangeEngine<S>) -> Self {
        let catalog = Catalog::new(Arc::clone(engine.store()));
        Self {
            engine,
            catalog,
            items: DashMap::new(),
            swaps: DashMap::new(),
        }
    }

    pub fn engine(&self) -> &ExchangeEngine<S> {
        &self.engine
    }

    pub fn catalog(&self) -> &Catalog<S> {
        &self.catalog
    }

    /// Id bound to an item label
    pub fn item_id(&self, label: &str) -> Result<ItemId, ReplayError> {
        self.items
            .get(label)
            .map(|entry| *entry.value())
            .ok_or_else(|| ReplayError::UnknownLabel {
                kind: "item",
                label: label.to_string(),
            })
    }

    /// Id bound to a swap label
    pub fn swap_id(&self, label: &str) -> Result<SwapId, ReplayError> {
        self.swaps
            .get(label)
            .map(|entry| *entry.value())
            .ok_or_else(|| ReplayError::UnknownLabel {
                kind: "swap",
                label: label.to_string(),
            })
    }

    fn ensure_unbound<V>(
        map: &DashMap<String, V>,
        label: &str,
        kind: &'static str,
    ) -> Result<(), ReplayError> {
        if map.contains_key(label) {
            Err(ReplayError::DuplicateLabel {
                kind,
                label: label.to_string(),
            })
        } else {
            Ok(())
        }
    }

    /// Apply one record
    ///
    /// # Arguments
    ///
    /// * `record` - The operation and the actor performing it
    ///
    /// # Returns
    ///
    /// * `Ok(())` - The engine accepted the operation
    /// * `Err(ReplayError)` - A label could not be resolved or bound, or the
    ///   engine rejected the operation. The ledger is unchanged in that case.
    pub fn apply(&self, record: &OperationRecord) -> Result<(), ReplayError> {
        let actor = &record.actor;

        match &record.operation {
            Operation::Register { email } => {
                self.engine.register_user(actor.clone(), email)?;
            }
            Operation::Admin { email } => {
                self.engine.provision_user(actor.clone(), email, Role::Admin)?;
            }
            Operation::List { label, listing } => {
                Self::ensure_unbound(&self.items, label, "item")?;
                let id = self.engine.submit_listing(actor, listing.clone())?;
                match self.items.entry(label.clone()) {
                    Entry::Vacant(entry) => {
                        entry.insert(id);
                    }
                    // Another worker bound the label while we were submitting
                    Entry::Occupied(_) => {
                        return Err(ReplayError::DuplicateLabel {
                            kind: "item",
                            label: label.clone(),
                        });
                    }
                }
            }
            Operation::Approve { item } => {
                self.engine.approve_listing(self.item_id(item)?, actor)?;
            }
            Operation::RejectListing { item } => {
                self.engine.reject_listing(self.item_id(item)?, actor)?;
            }
            Operation::Redeem { item } => {
                self.engine.redeem(self.item_id(item)?, actor)?;
            }
            Operation::Propose {
                offer,
                target,
                label,
            } => {
                Self::ensure_unbound(&self.swaps, label, "swap")?;
                let offered = self.item_id(offer)?;
                let wanted = self.item_id(target)?;
                let id = self.engine.propose_swap(actor, offered, wanted)?;
                match self.swaps.entry(label.clone()) {
                    Entry::Vacant(entry) => {
                        entry.insert(id);
                    }
                    Entry::Occupied(_) => {
                        return Err(ReplayError::DuplicateLabel {
                            kind: "swap",
                            label: label.clone(),
                        });
                    }
                }
            }
            Operation::Accept { swap } => {
                self.engine.accept_swap(self.swap_id(swap)?, actor)?;
            }
            Operation::RejectSwap { swap } => {
                self.engine.reject_swap(self.swap_id(swap)?, actor)?;
            }
        }

        tracing::debug!(op = record.operation.name(), actor = %actor, "Applied record");
        Ok(())
    }

    /// Current state of every user
    pub fn user_rows(&self) -> Vec<UserRow> {
        self.catalog
            .users()
            .into_iter()
            .map(|user| UserRow {
                user: user.id.to_string(),
                email: user.email,
                role: user.role,
                points: user.points_balance,
            })
            .collect()
    }

    /// Current state of every labeled item
    pub fn item_rows(&self) -> Vec<ItemRow> {
        let labels = self.item_labels();

        self.catalog
            .all_items()
            .into_iter()
            .filter_map(|item| {
                let label = labels.get(&item.id)?.clone();
                Some(ItemRow {
                    item: label,
                    uploader: item.uploader_id.to_string(),
                    title: item.title,
                    approved: item.is_approved,
                    status: item.status,
                })
            })
            .collect()
    }

    /// Current state of every labeled swap, with item ids shown as labels
    pub fn swap_rows(&self) -> Vec<SwapRow> {
        let item_labels = self.item_labels();
        let swap_labels: HashMap<SwapId, String> = self
            .swaps
            .iter()
            .map(|entry| (*entry.value(), entry.key().clone()))
            .collect();
        let item_label = |id: ItemId| {
            item_labels
                .get(&id)
                .cloned()
                .unwrap_or_else(|| id.to_string())
        };

        self.catalog
            .all_swaps()
            .into_iter()
            .filter_map(|swap| {
                let label = swap_labels.get(&swap.id)?.clone();
                Some(SwapRow {
                    swap: label,
                    requester: swap.requester_id.to_string(),
                    requester_item: item_label(swap.requester_item_id),
                    owner: swap.owner_id.to_string(),
                    owner_item: item_label(swap.owner_item_id),
                    status: swap.status,
                })
            })
            .collect()
    }

    fn item_labels(&self) -> HashMap<ItemId, String> {
        self.items
            .iter()
            .map(|entry| (*entry.value(), entry.key().clone()))
            .collect()
    }
}
