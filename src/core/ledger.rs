//! In-memory ledger store with per-entity optimistic versioning
//!
//! This module provides `MemoryLedger`, the default `LedgerStore`.
//!
//! # Design
//!
//! Entities live in a `DashMap` keyed by `EntityKey`. Each value is a slot: an
//! `Arc<Mutex<Versioned<Entity>>>`. The map is only used to find slots; all
//! reads and writes of an entity go through its own mutex, so there is no
//! global lock.
//!
//! A multi-entity commit:
//! 1. sorts its writes by key and rejects duplicate keys
//! 2. clones the slot handles out of the map (no map guard is held afterwards)
//! 3. locks every slot in key order
//! 4. validates every expected version
//! 5. applies all writes, or none if any version was stale
//!
//! Locking in a single global order makes overlapping commits deadlock-free,
//! and holding every lock until all writes are applied means no reader can see
//! half of a commit on a single entity.

use crate::core::traits::LedgerStore;
use crate::types::{ConditionalWrite, Entity, EntityKey, EntityKind, StoreError, Version, Versioned};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::Arc;

type Slot = Arc<Mutex<Versioned<Entity>>>;

/// Thread-safe in-memory `LedgerStore`
#[derive(Debug, Default)]
pub struct MemoryLedger {
    /// Slot per entity; DashMap shards keep lookups of different keys apart
    slots: DashMap<EntityKey, Slot>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self {
            slots: DashMap::new(),
        }
    }

    /// Number of stored entities of every kind
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    fn slot(&self, key: &EntityKey) -> Option<Slot> {
        self.slots.get(key).map(|entry| Arc::clone(entry.value()))
    }
}

impl LedgerStore for MemoryLedger {
    fn get(&self, key: &EntityKey) -> Option<Versioned<Entity>> {
        let slot = self.slot(key)?;
        let current = slot.lock().clone();
        Some(current)
    }

    fn create(&self, entity: Entity) -> Result<EntityKey, StoreError> {
        let key = entity.key();
        match self.slots.entry(key.clone()) {
            Entry::Occupied(_) => Err(StoreError::AlreadyExists { key }),
            Entry::Vacant(vacant) => {
                vacant.insert(Arc::new(Mutex::new(Versioned::new(entity, 1))));
                Ok(key)
            }
        }
    }

    fn commit(&self, writes: Vec<ConditionalWrite>) -> Result<Vec<Version>, StoreError> {
        let mut staged: Vec<(usize, EntityKey, ConditionalWrite)> = writes
            .into_iter()
            .enumerate()
            .map(|(index, write)| (index, write.key(), write))
            .collect();
        staged.sort_by(|a, b| a.1.cmp(&b.1));

        // The same entity twice in one commit can never validate consistently
        if let Some(pair) = staged.windows(2).find(|pair| pair[0].1 == pair[1].1) {
            return Err(StoreError::Conflict {
                key: pair[1].1.clone(),
            });
        }

        let slots = staged
            .iter()
            .map(|(_, key, _)| {
                self.slot(key)
                    .ok_or_else(|| StoreError::Conflict { key: key.clone() })
            })
            .collect::<Result<Vec<Slot>, StoreError>>()?;

        let mut guards: Vec<_> = slots.iter().map(|slot| slot.lock()).collect();

        for (guard, (_, key, write)) in guards.iter().zip(&staged) {
            if guard.version != write.expected {
                return Err(StoreError::Conflict { key: key.clone() });
            }
        }

        let mut versions = vec![0; staged.len()];
        for (guard, (index, _, write)) in guards.iter_mut().zip(staged) {
            guard.value = write.entity;
            guard.version += 1;
            versions[index] = guard.version;
        }

        Ok(versions)
    }

    fn scan(&self, kind: EntityKind) -> Vec<Versioned<Entity>> {
        // Collect handles first so no map guard is held while locking slots
        let slots: Vec<Slot> = self
            .slots
            .iter()
            .filter(|entry| entry.key().kind() == kind)
            .map(|entry| Arc::clone(entry.value()))
            .collect();

        slots.iter().map(|slot| slot.lock().clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Item, ItemId, Listing, Role, User, UserId};
    use std::thread;

    fn user(id: &str, points: u64) -> User {
        User::new(UserId::new(id), format!("{}@example.com", id), Role::User, points)
    }

    fn item(uploader: &str) -> Item {
        Item::from_listing(
            ItemId::generate(),
            UserId::new(uploader),
            Listing {
                title: "Coat".to_string(),
                description: "Warm".to_string(),
                ..Listing::default()
            },
        )
    }

    fn points_of(ledger: &MemoryLedger, id: &str) -> u64 {
        ledger
            .get(&EntityKey::User(UserId::new(id)))
            .and_then(Versioned::into_user)
            .map(|user| user.value.points_balance)
            .unwrap()
    }

    #[test]
    fn test_new_ledger_is_empty() {
        let ledger = MemoryLedger::new();
        assert!(ledger.is_empty());
        assert_eq!(ledger.scan(EntityKind::User).len(), 0);
    }

    #[test]
    fn test_create_starts_at_version_one() {
        let ledger = MemoryLedger::new();

        let key = ledger.create(user("u1", 10).into()).unwrap();
        let stored = ledger.get(&key).unwrap();

        assert_eq!(stored.version, 1);
        assert_eq!(stored.into_user().unwrap().value.points_balance, 10);
    }

    #[test]
    fn test_create_rejects_duplicate_key() {
        let ledger = MemoryLedger::new();
        ledger.create(user("u1", 10).into()).unwrap();

        let result = ledger.create(user("u1", 99).into());

        assert_eq!(
            result,
            Err(StoreError::AlreadyExists {
                key: EntityKey::User(UserId::new("u1"))
            })
        );
        assert_eq!(points_of(&ledger, "u1"), 10);
    }

    #[test]
    fn test_get_missing_returns_none() {
        let ledger = MemoryLedger::new();
        assert!(ledger.get(&EntityKey::User(UserId::new("nobody"))).is_none());
    }

    #[test]
    fn test_conditional_write_bumps_version() {
        let ledger = MemoryLedger::new();
        ledger.create(user("u1", 10).into()).unwrap();

        let version = ledger.conditional_write(1, user("u1", 7).into()).unwrap();

        assert_eq!(version, 2);
        assert_eq!(points_of(&ledger, "u1"), 7);
    }

    #[test]
    fn test_conditional_write_with_stale_version_conflicts() {
        let ledger = MemoryLedger::new();
        ledger.create(user("u1", 10).into()).unwrap();
        ledger.conditional_write(1, user("u1", 7).into()).unwrap();

        let result = ledger.conditional_write(1, user("u1", 3).into());

        assert!(matches!(result, Err(StoreError::Conflict { .. })));
        assert_eq!(points_of(&ledger, "u1"), 7);
    }

    #[test]
    fn test_conditional_write_to_missing_entity_conflicts() {
        let ledger = MemoryLedger::new();

        let result = ledger.conditional_write(1, user("ghost", 3).into());

        assert!(matches!(result, Err(StoreError::Conflict { .. })));
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_commit_applies_every_write() {
        let ledger = MemoryLedger::new();
        ledger.create(user("u1", 10).into()).unwrap();
        ledger.create(user("u2", 10).into()).unwrap();
        let coat = item("u2");
        let coat_key = ledger.create(coat.clone().into()).unwrap();

        let mut swapped = coat;
        swapped.status = crate::types::ItemStatus::Swapped;
        let versions = ledger
            .commit(vec![
                ConditionalWrite::new(1, user("u1", 0)),
                ConditionalWrite::new(1, user("u2", 20)),
                ConditionalWrite::new(1, swapped),
            ])
            .unwrap();

        assert_eq!(versions, vec![2, 2, 2]);
        assert_eq!(points_of(&ledger, "u1"), 0);
        assert_eq!(points_of(&ledger, "u2"), 20);
        let stored = ledger.get(&coat_key).and_then(Versioned::into_item).unwrap();
        assert_eq!(stored.value.status, crate::types::ItemStatus::Swapped);
    }

    #[test]
    fn test_commit_with_one_stale_write_applies_nothing() {
        let ledger = MemoryLedger::new();
        ledger.create(user("u1", 10).into()).unwrap();
        ledger.create(user("u2", 10).into()).unwrap();
        ledger.conditional_write(1, user("u2", 12).into()).unwrap();

        let result = ledger.commit(vec![
            ConditionalWrite::new(1, user("u1", 0)),
            ConditionalWrite::new(1, user("u2", 22)),
        ]);

        assert_eq!(
            result,
            Err(StoreError::Conflict {
                key: EntityKey::User(UserId::new("u2"))
            })
        );
        assert_eq!(points_of(&ledger, "u1"), 10);
        assert_eq!(points_of(&ledger, "u2"), 12);
    }

    #[test]
    fn test_commit_with_missing_entity_applies_nothing() {
        let ledger = MemoryLedger::new();
        ledger.create(user("u1", 10).into()).unwrap();

        let result = ledger.commit(vec![
            ConditionalWrite::new(1, user("u1", 0)),
            ConditionalWrite::new(1, user("ghost", 10)),
        ]);

        assert!(matches!(result, Err(StoreError::Conflict { .. })));
        assert_eq!(points_of(&ledger, "u1"), 10);
    }

    #[test]
    fn test_commit_rejects_duplicate_keys() {
        let ledger = MemoryLedger::new();
        ledger.create(user("u1", 10).into()).unwrap();

        let result = ledger.commit(vec![
            ConditionalWrite::new(1, user("u1", 5)),
            ConditionalWrite::new(1, user("u1", 6)),
        ]);

        assert!(matches!(result, Err(StoreError::Conflict { .. })));
        assert_eq!(points_of(&ledger, "u1"), 10);
    }

    #[test]
    fn test_scan_filters_by_kind() {
        let ledger = MemoryLedger::new();
        ledger.create(user("u1", 10).into()).unwrap();
        ledger.create(user("u2", 10).into()).unwrap();
        ledger.create(item("u1").into()).unwrap();

        assert_eq!(ledger.scan(EntityKind::User).len(), 2);
        assert_eq!(ledger.scan(EntityKind::Item).len(), 1);
        assert_eq!(ledger.scan(EntityKind::Swap).len(), 0);
        assert_eq!(ledger.len(), 3);
    }

    // Concurrent access tests
    // Each thread retries its read-modify-write until its conditional write
    // wins. No increment may be lost.
    #[test]
    fn test_concurrent_conditional_writes_lose_no_updates() {
        let ledger = Arc::new(MemoryLedger::new());
        ledger.create(user("u1", 0).into()).unwrap();
        let key = EntityKey::User(UserId::new("u1"));

        let mut handles = vec![];
        for _ in 0..8 {
            let ledger = Arc::clone(&ledger);
            let key = key.clone();
            handles.push(thread::spawn(move || {
                for _ in 0..100 {
                    loop {
                        let current = ledger.get(&key).and_then(Versioned::into_user).unwrap();
                        let mut next = current.value;
                        next.points_balance += 1;
                        if ledger.conditional_write(current.version, next.into()).is_ok() {
                            break;
                        }
                    }
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        let stored = ledger.get(&key).unwrap();
        assert_eq!(stored.version, 801);
        assert_eq!(points_of(&ledger, "u1"), 800);
    }

    #[test]
    fn test_concurrent_transfers_conserve_total() {
        let ledger = Arc::new(MemoryLedger::new());
        let ids = ["a", "b", "c", "d"];
        for id in ids {
            ledger.create(user(id, 100).into()).unwrap();
        }

        let mut handles = vec![];
        for t in 0..8 {
            let ledger = Arc::clone(&ledger);
            handles.push(thread::spawn(move || {
                for n in 0..200 {
                    let from = ids[(t + n) % ids.len()];
                    let to = ids[(t + n + 1) % ids.len()];
                    loop {
                        let payer = ledger
                            .get(&EntityKey::User(UserId::new(from)))
                            .and_then(Versioned::into_user)
                            .unwrap();
                        let payee = ledger
                            .get(&EntityKey::User(UserId::new(to)))
                            .and_then(Versioned::into_user)
                            .unwrap();
                        if payer.value.points_balance == 0 {
                            break;
                        }
                        let mut debited = payer.value.clone();
                        debited.points_balance -= 1;
                        let mut credited = payee.value.clone();
                        credited.points_balance += 1;
                        let result = ledger.commit(vec![
                            ConditionalWrite::new(payer.version, debited),
                            ConditionalWrite::new(payee.version, credited),
                        ]);
                        if result.is_ok() {
                            break;
                        }
                    }
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        let total: u64 = ids.iter().map(|id| points_of(&ledger, id)).sum();
        assert_eq!(total, 400);
    }
}
