//! Keyed, versioned entities as held by the ledger store
//!
//! The store is kind-agnostic: it keeps `Entity` values under `EntityKey`s and
//! tracks a version counter per key. Typed accessors on `Versioned<Entity>`
//! let the engine get back to `User`, `Item` and `SwapRequest`.

use super::item::{Item, ItemId};
use super::swap::{SwapId, SwapRequest};
use super::user::{User, UserId};
use std::fmt;

/// Per-entity write counter
///
/// A freshly created entity is at version 1. Every successful write bumps it by one.
pub type Version = u64;

/// Collection an entity lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EntityKind {
    User,
    Item,
    Swap,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::User => f.write_str("user"),
            EntityKind::Item => f.write_str("item"),
            EntityKind::Swap => f.write_str("swap"),
        }
    }
}

/// Fully qualified entity address
///
/// The derived ordering (kind first, then id) is the lock order used by
/// multi-entity commits.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EntityKey {
    User(UserId),
    Item(ItemId),
    Swap(SwapId),
}

impl EntityKey {
    pub fn kind(&self) -> EntityKind {
        match self {
            EntityKey::User(_) => EntityKind::User,
            EntityKey::Item(_) => EntityKind::Item,
            EntityKey::Swap(_) => EntityKind::Swap,
        }
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKey::User(id) => write!(f, "user {}", id),
            EntityKey::Item(id) => write!(f, "item {}", id),
            EntityKey::Swap(id) => write!(f, "swap {}", id),
        }
    }
}

/// Any value the ledger can hold
#[derive(Debug, Clone, PartialEq)]
pub enum Entity {
    User(User),
    Item(Item),
    Swap(SwapRequest),
}

impl Entity {
    pub fn key(&self) -> EntityKey {
        match self {
            Entity::User(user) => EntityKey::User(user.id.clone()),
            Entity::Item(item) => EntityKey::Item(item.id),
            Entity::Swap(swap) => EntityKey::Swap(swap.id),
        }
    }
}

impl From<User> for Entity {
    fn from(user: User) -> Self {
        Entity::User(user)
    }
}

impl From<Item> for Entity {
    fn from(item: Item) -> Self {
        Entity::Item(item)
    }
}

impl From<SwapRequest> for Entity {
    fn from(swap: SwapRequest) -> Self {
        Entity::Swap(swap)
    }
}

/// A value together with the version it was read at
#[derive(Debug, Clone, PartialEq)]
pub struct Versioned<T> {
    pub value: T,
    pub version: Version,
}

impl<T> Versioned<T> {
    pub fn new(value: T, version: Version) -> Self {
        Versioned { value, version }
    }
}

impl Versioned<Entity> {
    /// Narrow to a user, if this is one
    pub fn into_user(self) -> Option<Versioned<User>> {
        match self.value {
            Entity::User(user) => Some(Versioned::new(user, self.version)),
            _ => None,
        }
    }

    pub fn into_item(self) -> Option<Versioned<Item>> {
        match self.value {
            Entity::Item(item) => Some(Versioned::new(item, self.version)),
            _ => None,
        }
    }

    pub fn into_swap(self) -> Option<Versioned<SwapRequest>> {
        match self.value {
            Entity::Swap(swap) => Some(Versioned::new(swap, self.version)),
            _ => None,
        }
    }
}

/// One staged write of a logical transaction
///
/// Succeeds only if the stored entity is still at `expected`.
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionalWrite {
    pub expected: Version,
    pub entity: Entity,
}

impl ConditionalWrite {
    pub fn new(expected: Version, entity: impl Into<Entity>) -> Self {
        ConditionalWrite {
            expected,
            entity: entity.into(),
        }
    }

    pub fn key(&self) -> EntityKey {
        self.entity.key()
    }
}
