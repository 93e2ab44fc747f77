//! Storage seam for the exchange engine
//!
//! The engine only ever talks to a `LedgerStore`. Any backing store that can
//! keep a version per document and check it on write can implement it.

use crate::types::{ConditionalWrite, Entity, EntityKey, EntityKind, StoreError, Version, Versioned};

/// Keyed, versioned storage for users, items and swap requests
///
/// Implementations must be safe to share across threads. The engine builds
/// all of its consistency guarantees on `conditional_write` and `commit`.
pub trait LedgerStore: Send + Sync {
    /// Read an entity and the version it is currently at
    fn get(&self, key: &EntityKey) -> Option<Versioned<Entity>>;

    /// Insert a new entity at version 1
    ///
    /// Fails with `StoreError::AlreadyExists` if the key is taken.
    fn create(&self, entity: Entity) -> Result<EntityKey, StoreError>;

    /// Replace one entity if it is still at `expected`
    ///
    /// Returns the new version. Fails with `StoreError::Conflict` if the
    /// entity was written since it was read, or does not exist.
    fn conditional_write(&self, expected: Version, entity: Entity) -> Result<Version, StoreError> {
        let key = entity.key();
        self.commit(vec![ConditionalWrite { expected, entity }])?
            .into_iter()
            .next()
            .ok_or(StoreError::Conflict { key })
    }

    /// Apply a set of conditional writes all-or-nothing
    ///
    /// Either every write's expected version matches and all are applied, or
    /// none is applied and the first stale key is reported. On success the
    /// new versions are returned in the order the writes were given.
    fn commit(&self, writes: Vec<ConditionalWrite>) -> Result<Vec<Version>, StoreError>;

    /// Snapshot every entity of one kind
    ///
    /// Not transactional: concurrent commits may be partially visible.
    fn scan(&self, kind: EntityKind) -> Vec<Versioned<Entity>>;
}
