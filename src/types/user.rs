//! User-related types
//!
//! Users are created on first authentication and only ever mutated by the
//! exchange engine. They are never deleted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Point balance. Unsigned, so a negative balance is unrepresentable.
pub type Points = u64;

/// Opaque user identity handed over by the identity provider
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        UserId(id.into())
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        UserId::new(id)
    }
}

/// Access role of a user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Regular marketplace participant
    User,
    /// May approve and reject listings
    Admin,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => f.write_str("user"),
            Role::Admin => f.write_str("admin"),
        }
    }
}

/// Marketplace participant and holder of a point balance
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    /// Identity-provider id
    pub id: UserId,

    pub email: String,

    /// Spendable points. Changes only through registration and redemption.
    pub points_balance: Points,

    pub role: Role,

    pub created_at: DateTime<Utc>,
}

impl User {
    /// Create a user with the given starting balance
    pub fn new(id: UserId, email: impl Into<String>, role: Role, points_balance: Points) -> Self {
        User {
            id,
            email: email.into(),
            points_balance,
            role,
            created_at: Utc::now(),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}
