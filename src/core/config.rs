//! Business constants and retry bound for the exchange engine

use crate::types::Points;

/// Points granted to every newly registered user
pub const REGISTRATION_BONUS: Points = 10;

/// Flat cost of redeeming any item
pub const REDEMPTION_COST: Points = 10;

/// Attempts a logical transaction gets before failing with `Contention`
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Engine configuration
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExchangeConfig {
    pub registration_bonus: Points,
    pub redemption_cost: Points,
    /// Upper bound on optimistic attempts per operation (at least 1)
    pub max_attempts: u32,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            registration_bonus: REGISTRATION_BONUS,
            redemption_cost: REDEMPTION_COST,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl ExchangeConfig {
    /// Default constants with a custom retry bound
    ///
    /// A bound of zero would make every operation fail, so it falls back to
    /// the default.
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        let default = Self::default();

        let max_attempts = if max_attempts == 0 {
            tracing::warn!(
                "Invalid max_attempts ({}), using default ({})",
                max_attempts,
                default.max_attempts
            );
            default.max_attempts
        } else {
            max_attempts
        };

        Self {
            max_attempts,
            ..default
        }
    }
}
