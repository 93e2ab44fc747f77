//! Exchange engine: every operation that mutates shared economic state
//!
//! This module provides the `ExchangeEngine` struct, which coordinates users,
//! items and swap requests through a `LedgerStore`.
//!
//! # Logical transactions
//!
//! Each mutating operation runs as a logical transaction:
//! 1. Read the current version of every entity it will touch
//! 2. Validate the business preconditions against those reads
//! 3. Stage one conditional write per touched entity
//! 4. Commit all staged writes at once
//!
//! If the commit reports a version conflict, the whole operation restarts
//! from fresh reads, up to `max_attempts` times, then fails with
//! `ExchangeError::Contention`. A failed validation aborts immediately without
//! writing anything. Apart from the admin role check, every entity an
//! operation reads is also one it writes, so a successful commit proves none
//! of its reads went stale.
//!
//! # Architecture
//!
//! ```text
//! ExchangeEngine
//!     ├── Arc<S: LedgerStore>  (versioned users, items, swaps)
//!     └── ExchangeConfig       (bonus, redemption cost, retry bound)
//! ```
//!
//! # Thread Safety
//!
//! The engine is cheap to clone and all clones share one store. Callers in
//! different threads may race on the same entities; the store's conditional
//! writes decide a single winner per contested version.

use crate::core::config::ExchangeConfig;
use crate::core::state_machine;
use crate::core::traits::LedgerStore;
use crate::types::{
    ConditionalWrite, Entity, EntityKey, ExchangeError, InvalidTransition, Item, ItemId,
    ItemStatus, Listing, Points, Role, StoreError, SwapId, SwapRequest, SwapStatus, User, UserId,
    Version, Versioned,
};
use std::fmt;
use std::sync::Arc;

/// One attempt of a logical transaction
///
/// Reads go straight to the store; writes are staged and only reach the
/// store through a single all-or-nothing commit.
pub struct Transaction<'a, S: ?Sized> {
    store: &'a S,
    writes: Vec<ConditionalWrite>,
}

impl<'a, S: LedgerStore + ?Sized> Transaction<'a, S> {
    fn new(store: &'a S) -> Self {
        Self {
            store,
            writes: Vec::new(),
        }
    }

    pub fn user(&self, id: &UserId) -> Result<Versioned<User>, ExchangeError> {
        let key = EntityKey::User(id.clone());
        self.store
            .get(&key)
            .and_then(Versioned::into_user)
            .ok_or_else(|| ExchangeError::not_found(key))
    }

    pub fn item(&self, id: ItemId) -> Result<Versioned<Item>, ExchangeError> {
        let key = EntityKey::Item(id);
        self.store
            .get(&key)
            .and_then(Versioned::into_item)
            .ok_or_else(|| ExchangeError::not_found(key))
    }

    pub fn swap(&self, id: SwapId) -> Result<Versioned<SwapRequest>, ExchangeError> {
        let key = EntityKey::Swap(id);
        self.store
            .get(&key)
            .and_then(Versioned::into_swap)
            .ok_or_else(|| ExchangeError::not_found(key))
    }

    /// Stage a write that only applies if the entity is still at `expected`
    pub fn write(&mut self, expected: Version, entity: impl Into<Entity>) {
        self.writes.push(ConditionalWrite::new(expected, entity));
    }

    fn commit(self) -> Result<(), StoreError> {
        if self.writes.is_empty() {
            return Ok(());
        }
        self.store.commit(self.writes).map(|_| ())
    }
}

/// Orchestrates redemptions, swaps and listing decisions
pub struct ExchangeEngine<S: ?Sized> {
    store: Arc<S>,
    config: ExchangeConfig,
}

impl<S: ?Sized> Clone for ExchangeEngine<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            config: self.config.clone(),
        }
    }
}

impl<S: ?Sized> fmt::Debug for ExchangeEngine<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExchangeEngine")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn invalid_state(entity: EntityKey, error: InvalidTransition) -> ExchangeError {
    ExchangeError::invalid_state(entity, error.to_string())
}

fn require_available(item: &Item) -> Result<(), ExchangeError> {
    if !item.status.is_terminal() {
        Ok(())
    } else {
        Err(ExchangeError::item_unavailable(
            item.id,
            item.status,
            item.is_approved,
        ))
    }
}

impl<S: LedgerStore + ?Sized> ExchangeEngine<S> {
    /// Create an engine over a shared store
    pub fn new(store: Arc<S>, config: ExchangeConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Run `body` as a logical transaction with bounded optimistic retries
    ///
    /// `body` must be free of side effects other than staging writes on the
    /// transaction it is given, since it may run several times.
    fn transact<T, F>(&self, operation: &'static str, mut body: F) -> Result<T, ExchangeError>
    where
        F: FnMut(&mut Transaction<'_, S>) -> Result<T, ExchangeError>,
    {
        let max_attempts = self.config.max_attempts.max(1);

        for attempt in 1..=max_attempts {
            let mut txn = Transaction::new(self.store.as_ref());
            let output = body(&mut txn)?;

            match txn.commit() {
                Ok(()) => {
                    tracing::debug!(operation, attempt, "Transaction committed");
                    return Ok(output);
                }
                Err(StoreError::Conflict { key }) => {
                    tracing::debug!(operation, attempt, %key, "Version conflict, retrying");
                }
                Err(StoreError::AlreadyExists { key }) => {
                    return Err(ExchangeError::Duplicate { entity: key });
                }
            }
        }

        tracing::warn!(operation, max_attempts, "Retries exhausted");
        Err(ExchangeError::contention(operation, max_attempts))
    }

    fn require_admin(
        txn: &Transaction<'_, S>,
        actor: &UserId,
        action: &'static str,
    ) -> Result<(), ExchangeError> {
        match txn.user(actor) {
            Ok(user) if user.value.is_admin() => Ok(()),
            _ => Err(ExchangeError::forbidden(actor, action)),
        }
    }

    /// Current state of a user
    pub fn user(&self, id: &UserId) -> Result<User, ExchangeError> {
        Transaction::new(self.store.as_ref())
            .user(id)
            .map(|user| user.value)
    }

    /// Current state of an item
    pub fn item(&self, id: ItemId) -> Result<Item, ExchangeError> {
        Transaction::new(self.store.as_ref())
            .item(id)
            .map(|item| item.value)
    }

    /// Current state of a swap request
    pub fn swap(&self, id: SwapId) -> Result<SwapRequest, ExchangeError> {
        Transaction::new(self.store.as_ref())
            .swap(id)
            .map(|swap| swap.value)
    }

    /// First-authentication hook
    ///
    /// Creates the user with the registration bonus and the `user` role, or
    /// returns the existing record unchanged.
    pub fn register_user(&self, id: UserId, email: &str) -> Result<User, ExchangeError> {
        self.provision_user(id, email, Role::User)
    }

    /// Create a user with an explicit role
    ///
    /// Used by the identity provider to seed admins. Idempotent like
    /// `register_user`: an existing user keeps its balance and role.
    pub fn provision_user(&self, id: UserId, email: &str, role: Role) -> Result<User, ExchangeError> {
        let key = EntityKey::User(id.clone());
        if let Some(existing) = self.store.get(&key).and_then(Versioned::into_user) {
            return Ok(existing.value);
        }

        let user = User::new(id, email, role, self.config.registration_bonus);
        match self.store.create(user.clone().into()) {
            Ok(_) => {
                tracing::info!(user = %user.id, %role, bonus = user.points_balance, "Registered user");
                Ok(user)
            }
            // Lost a registration race; the winner's record stands
            Err(StoreError::AlreadyExists { key }) => self
                .store
                .get(&key)
                .and_then(Versioned::into_user)
                .map(|existing| existing.value)
                .ok_or_else(|| ExchangeError::not_found(key)),
            Err(StoreError::Conflict { key }) => Err(ExchangeError::Duplicate { entity: key }),
        }
    }

    /// Create a new item awaiting approval
    ///
    /// # Errors
    ///
    /// - `InvalidListing` if the title or description is blank
    /// - `NotFound` if the uploader is not registered
    pub fn submit_listing(&self, uploader: &UserId, listing: Listing) -> Result<ItemId, ExchangeError> {
        if let Some(field) = listing.missing_field() {
            return Err(ExchangeError::InvalidListing { field });
        }
        self.user(uploader)?;

        let item = Item::from_listing(ItemId::generate(), uploader.clone(), listing);
        let id = item.id;
        self.store
            .create(item.into())
            .map_err(|error| match error {
                StoreError::AlreadyExists { key } | StoreError::Conflict { key } => {
                    ExchangeError::Duplicate { entity: key }
                }
            })?;

        tracing::info!(item = %id, uploader = %uploader, "Listing submitted");
        Ok(id)
    }

    /// Admin approval of a pending listing
    ///
    /// # Errors
    ///
    /// - `Forbidden` if `actor` is not an admin
    /// - `NotFound` if the item does not exist
    /// - `InvalidState` if the item was already approved or is no longer available
    pub fn approve_listing(&self, item_id: ItemId, actor: &UserId) -> Result<(), ExchangeError> {
        self.transact("approve_listing", |txn| {
            Self::require_admin(txn, actor, "approve listings")?;
            let item = txn.item(item_id)?;

            let approved = state_machine::approve(item.value.is_approved, item.value.status)
                .map_err(|e| invalid_state(EntityKey::Item(item_id), e))?;

            let mut next = item.value;
            next.is_approved = approved;
            txn.write(item.version, next);
            Ok(())
        })?;

        tracing::info!(item = %item_id, admin = %actor, "Listing approved");
        Ok(())
    }

    /// Admin takedown of an available listing
    ///
    /// Rejecting an already rejected item succeeds without writing anything,
    /// so the call is safe to retry.
    ///
    /// # Errors
    ///
    /// - `Forbidden` if `actor` is not an admin
    /// - `NotFound` if the item does not exist
    /// - `InvalidState` if the item was already swapped
    pub fn reject_listing(&self, item_id: ItemId, actor: &UserId) -> Result<(), ExchangeError> {
        let changed = self.transact("reject_listing", |txn| {
            Self::require_admin(txn, actor, "reject listings")?;
            let item = txn.item(item_id)?;

            if item.value.status == ItemStatus::Rejected {
                return Ok(false);
            }

            let status = state_machine::transition_item(item.value.status, ItemStatus::Rejected)
                .map_err(|e| invalid_state(EntityKey::Item(item_id), e))?;

            let mut next = item.value;
            next.status = status;
            txn.write(item.version, next);
            Ok(true)
        })?;

        if changed {
            tracing::info!(item = %item_id, admin = %actor, "Listing rejected");
        } else {
            tracing::debug!(item = %item_id, "Listing already rejected");
        }
        Ok(())
    }

    /// Spend the configured flat cost on an approved, available item
    pub fn redeem(&self, item_id: ItemId, redeemer: &UserId) -> Result<(), ExchangeError> {
        self.redeem_with_cost(item_id, redeemer, self.config.redemption_cost)
    }

    /// Move `cost` points from the redeemer to the uploader and consume the item
    ///
    /// All three writes commit together or not at all.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the item, redeemer or uploader does not exist
    /// - `ItemUnavailable` if the item is not approved or no longer available
    /// - `SelfRedeem` if the redeemer uploaded the item
    /// - `InsufficientFunds` if the redeemer's balance is below `cost`
    /// - `BalanceOverflow` if the uploader cannot be credited
    /// - `Contention` if retries were exhausted
    pub fn redeem_with_cost(
        &self,
        item_id: ItemId,
        redeemer: &UserId,
        cost: Points,
    ) -> Result<(), ExchangeError> {
        self.transact("redeem", |txn| {
            let item = txn.item(item_id)?;
            if !item.value.is_listed() {
                return Err(ExchangeError::item_unavailable(
                    item_id,
                    item.value.status,
                    item.value.is_approved,
                ));
            }
            if &item.value.uploader_id == redeemer {
                return Err(ExchangeError::SelfRedeem {
                    user: redeemer.clone(),
                    item: item_id,
                });
            }

            let buyer = txn.user(redeemer)?;
            let seller = txn.user(&item.value.uploader_id)?;

            let debited = buyer
                .value
                .points_balance
                .checked_sub(cost)
                .ok_or_else(|| {
                    ExchangeError::insufficient_funds(redeemer, buyer.value.points_balance, cost)
                })?;
            let credited = seller
                .value
                .points_balance
                .checked_add(cost)
                .ok_or_else(|| ExchangeError::BalanceOverflow {
                    user: seller.value.id.clone(),
                })?;
            let status = state_machine::transition_item(item.value.status, ItemStatus::Swapped)
                .map_err(|e| invalid_state(EntityKey::Item(item_id), e))?;

            let mut buyer_next = buyer.value;
            buyer_next.points_balance = debited;
            let mut seller_next = seller.value;
            seller_next.points_balance = credited;
            let mut item_next = item.value;
            item_next.status = status;

            txn.write(buyer.version, buyer_next);
            txn.write(seller.version, seller_next);
            txn.write(item.version, item_next);
            Ok(())
        })?;

        tracing::info!(item = %item_id, redeemer = %redeemer, cost, "Item redeemed");
        Ok(())
    }

    /// Offer `requester_item_id` in exchange for `owner_item_id`
    ///
    /// # Errors
    ///
    /// - `NotFound` if the requester or either item does not exist
    /// - `NotOwner` if the requester does not own the offered item
    /// - `SelfSwap` if the requester also owns the wanted item
    /// - `ItemUnavailable` if either item is no longer available
    pub fn propose_swap(
        &self,
        requester: &UserId,
        requester_item_id: ItemId,
        owner_item_id: ItemId,
    ) -> Result<SwapId, ExchangeError> {
        self.user(requester)?;
        let offered = self.item(requester_item_id)?;
        if &offered.uploader_id != requester {
            return Err(ExchangeError::NotOwner {
                user: requester.clone(),
                item: requester_item_id,
            });
        }

        let wanted = self.item(owner_item_id)?;
        if &wanted.uploader_id == requester {
            return Err(ExchangeError::SelfSwap {
                user: requester.clone(),
                item: owner_item_id,
            });
        }

        require_available(&offered)?;
        require_available(&wanted)?;

        let swap = SwapRequest::pending(
            requester.clone(),
            requester_item_id,
            wanted.uploader_id,
            owner_item_id,
        );
        let id = swap.id;
        self.store
            .create(swap.into())
            .map_err(|error| match error {
                StoreError::AlreadyExists { key } | StoreError::Conflict { key } => {
                    ExchangeError::Duplicate { entity: key }
                }
            })?;

        tracing::info!(swap = %id, requester = %requester, "Swap proposed");
        Ok(id)
    }

    /// Owner accepts a pending swap; both items are consumed
    ///
    /// If either item was consumed in the meantime the swap stays pending and
    /// `ItemUnavailable` is returned.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the swap or one of its items does not exist
    /// - `Forbidden` if `actor` is not the swap's owner
    /// - `InvalidState` if the swap is no longer pending
    /// - `ItemUnavailable` if either item is no longer available
    /// - `Contention` if retries were exhausted
    pub fn accept_swap(&self, swap_id: SwapId, actor: &UserId) -> Result<(), ExchangeError> {
        self.transact("accept_swap", |txn| {
            let swap = txn.swap(swap_id)?;
            if &swap.value.owner_id != actor {
                return Err(ExchangeError::forbidden(actor, "accept this swap"));
            }
            let swap_status = state_machine::transition_swap(swap.value.status, SwapStatus::Accepted)
                .map_err(|e| invalid_state(EntityKey::Swap(swap_id), e))?;

            let offered = txn.item(swap.value.requester_item_id)?;
            let wanted = txn.item(swap.value.owner_item_id)?;
            require_available(&offered.value)?;
            require_available(&wanted.value)?;

            let mut offered_next = offered.value;
            offered_next.status =
                state_machine::transition_item(offered_next.status, ItemStatus::Swapped)
                    .map_err(|e| invalid_state(EntityKey::Item(offered_next.id), e))?;
            let mut wanted_next = wanted.value;
            wanted_next.status =
                state_machine::transition_item(wanted_next.status, ItemStatus::Swapped)
                    .map_err(|e| invalid_state(EntityKey::Item(wanted_next.id), e))?;
            let mut swap_next = swap.value;
            swap_next.status = swap_status;

            txn.write(swap.version, swap_next);
            txn.write(offered.version, offered_next);
            txn.write(wanted.version, wanted_next);
            Ok(())
        })?;

        tracing::info!(swap = %swap_id, owner = %actor, "Swap accepted");
        Ok(())
    }

    /// Either party declines a pending swap; items are untouched
    ///
    /// # Errors
    ///
    /// - `NotFound` if the swap does not exist
    /// - `Forbidden` if `actor` is neither the owner nor the requester
    /// - `InvalidState` if the swap is no longer pending
    pub fn reject_swap(&self, swap_id: SwapId, actor: &UserId) -> Result<(), ExchangeError> {
        self.transact("reject_swap", |txn| {
            let swap = txn.swap(swap_id)?;
            if !swap.value.involves(actor) {
                return Err(ExchangeError::forbidden(actor, "reject this swap"));
            }
            let status = state_machine::transition_swap(swap.value.status, SwapStatus::Rejected)
                .map_err(|e| invalid_state(EntityKey::Swap(swap_id), e))?;

            let mut next = swap.value;
            next.status = status;
            txn.write(swap.version, next);
            Ok(())
        })?;

        tracing::info!(swap = %swap_id, actor = %actor, "Swap rejected");
        Ok(())
    }
}
