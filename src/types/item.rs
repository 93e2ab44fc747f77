//! Item-related types
//!
//! An item is a listed piece of clothing. Its approval flag and status are
//! owned by the exchange engine; everything else is fixed at listing time.

use super::user::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Item identifier, assigned when the listing is submitted
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ItemId(Uuid);

impl ItemId {
    /// Allocate a fresh random id
    pub fn generate() -> Self {
        ItemId(Uuid::new_v4())
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Lifecycle status of an item
///
/// `Swapped` and `Rejected` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    /// Listed and not yet consumed
    Available,

    /// Consumed by exactly one redemption or accepted swap
    Swapped,

    /// Taken down by an admin
    Rejected,
}

impl ItemStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, ItemStatus::Available)
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemStatus::Available => f.write_str("available"),
            ItemStatus::Swapped => f.write_str("swapped"),
            ItemStatus::Rejected => f.write_str("rejected"),
        }
    }
}

/// Fields supplied by the listing submission surface
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Listing {
    pub title: String,
    pub description: String,
    pub category: String,
    pub size: String,
    pub condition: String,
    /// Image URLs in display order
    pub images: Vec<String>,
}

impl Listing {
    /// Check the required fields
    ///
    /// Returns the name of the first missing field.
    pub fn missing_field(&self) -> Option<&'static str> {
        if self.title.trim().is_empty() {
            Some("title")
        } else if self.description.trim().is_empty() {
            Some("description")
        } else {
            None
        }
    }
}

/// A listed item
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    pub id: ItemId,

    /// Owning user
    pub uploader_id: UserId,

    pub title: String,
    pub description: String,
    pub category: String,
    pub size: String,
    pub condition: String,
    pub images: Vec<String>,

    /// Set once by an admin; never reverts to false
    pub is_approved: bool,

    pub status: ItemStatus,

    pub created_at: DateTime<Utc>,
}

impl Item {
    /// Build a new, unapproved, available item from a listing
    pub fn from_listing(id: ItemId, uploader_id: UserId, listing: Listing) -> Self {
        Item {
            id,
            uploader_id,
            title: listing.title,
            description: listing.description,
            category: listing.category,
            size: listing.size,
            condition: listing.condition,
            images: listing.images,
            is_approved: false,
            status: ItemStatus::Available,
            created_at: Utc::now(),
        }
    }

    /// Visible in the public catalog and open to redemption
    pub fn is_listed(&self) -> bool {
        self.is_approved && self.status == ItemStatus::Available
    }

    /// Waiting in the admin approval queue
    pub fn is_pending_approval(&self) -> bool {
        !self.is_approved && self.status == ItemStatus::Available
    }
}
