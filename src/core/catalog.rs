//! Read-only views over the ledger
//!
//! This module provides the `Catalog` struct: the public catalog, the admin
//! approval queue, a user's own items and the swaps they are part of.
//!
//! # Consistency
//!
//! Queries scan the store without a transaction, so a result can lag a
//! concurrent commit or show it only in part. They never feed a decision
//! back into the engine; every mutation re-reads and re-validates.
//!
//! Every list is sorted by creation time, then by id, so equal timestamps
//! still render in a stable order.

use crate::core::traits::LedgerStore;
use crate::types::{
    EntityKey, EntityKind, ExchangeError, Item, Points, SwapRequest, SwapStatus, User, UserId,
    Versioned,
};
use std::sync::Arc;

/// Query facade sharing a store with an `ExchangeEngine`
pub struct Catalog<S: ?Sized> {
    store: Arc<S>,
}

impl<S: ?Sized> Clone for Catalog<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: LedgerStore + ?Sized> Catalog<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    fn items(&self) -> Vec<Item> {
        let mut items: Vec<Item> = self
            .store
            .scan(EntityKind::Item)
            .into_iter()
            .filter_map(Versioned::into_item)
            .map(|item| item.value)
            .collect();
        items.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        items
    }

    fn swaps(&self) -> Vec<SwapRequest> {
        let mut swaps: Vec<SwapRequest> = self
            .store
            .scan(EntityKind::Swap)
            .into_iter()
            .filter_map(Versioned::into_swap)
            .map(|swap| swap.value)
            .collect();
        swaps.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        swaps
    }

    /// Items anyone may redeem or ask to swap for
    ///
    /// # Returns
    ///
    /// Every approved item whose status is `available`.
    pub fn public_catalog(&self) -> Vec<Item> {
        self.items().into_iter().filter(Item::is_listed).collect()
    }

    /// Admin moderation queue
    ///
    /// # Arguments
    ///
    /// * `actor` - The user asking; must be an admin
    ///
    /// # Returns
    ///
    /// * `Ok(items)` - Unapproved items that are still available
    /// * `Err(ExchangeError::Forbidden)` - The actor is unknown or not an admin
    pub fn pending_approvals(&self, actor: &UserId) -> Result<Vec<Item>, ExchangeError> {
        let is_admin = self
            .store
            .get(&EntityKey::User(actor.clone()))
            .and_then(Versioned::into_user)
            .is_some_and(|user| user.value.is_admin());
        if !is_admin {
            return Err(ExchangeError::forbidden(actor, "review pending listings"));
        }

        Ok(self
            .items()
            .into_iter()
            .filter(Item::is_pending_approval)
            .collect())
    }

    /// Every item `user` uploaded, whatever its status
    pub fn items_owned_by(&self, user: &UserId) -> Vec<Item> {
        self.items()
            .into_iter()
            .filter(|item| &item.uploader_id == user)
            .collect()
    }

    /// Pending swaps where `user` owns the wanted item
    ///
    /// Decided swaps drop out; they no longer wait on the owner.
    pub fn incoming_swaps(&self, user: &UserId) -> Vec<SwapRequest> {
        self.swaps()
            .into_iter()
            .filter(|swap| &swap.owner_id == user && swap.status == SwapStatus::Pending)
            .collect()
    }

    /// Swaps `user` proposed, whatever their status
    pub fn outgoing_swaps(&self, user: &UserId) -> Vec<SwapRequest> {
        self.swaps()
            .into_iter()
            .filter(|swap| &swap.requester_id == user)
            .collect()
    }

    /// All swaps, oldest first
    pub fn all_swaps(&self) -> Vec<SwapRequest> {
        self.swaps()
    }

    /// All items, oldest first
    pub fn all_items(&self) -> Vec<Item> {
        self.items()
    }

    /// All registered users, oldest first
    pub fn users(&self) -> Vec<User> {
        let mut users: Vec<User> = self
            .store
            .scan(EntityKind::User)
            .into_iter()
            .filter_map(Versioned::into_user)
            .map(|user| user.value)
            .collect();
        users.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        users
    }

    /// Sum of every balance
    ///
    /// Redemptions only move points, so this only grows with registrations.
    /// Saturates rather than wrapping.
    pub fn total_points(&self) -> Points {
        self.users()
            .iter()
            .fold(0, |total: Points, user| total.saturating_add(user.points_balance))
    }
}
