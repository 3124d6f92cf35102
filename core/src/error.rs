//! Error taxonomy for the raffle core.
//!
//! Every fallible core operation returns [`CoreError`]. The taxonomy mirrors
//! how callers must react: validation and not-found errors are rejected
//! before any mutation, conflicts are retryable, insufficient inventory is
//! terminal for the attempt, upstream (gateway) errors surface only after
//! compensation has run, and invariant violations indicate data corruption
//! and abort the operation.

use crate::types::RaffleId;
use thiserror::Error;

/// Result alias used across the core crate.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Error type for all core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Malformed or out-of-policy input, rejected before any mutation.
    #[error("validation error: {0}")]
    Validation(String),

    /// Requested quantity is not one of the allowed purchase increments.
    #[error("invalid quantity {quantity}: allowed increments are {allowed:?}")]
    InvalidQuantity {
        /// The rejected quantity
        quantity: u32,
        /// Increments the configuration permits
        allowed: Vec<u32>,
    },

    /// A referenced entity does not exist.
    #[error("{resource} {id} not found")]
    NotFound {
        /// Entity kind, e.g. `"Raffle"` or `"Payment"`
        resource: &'static str,
        /// Identifier that failed to resolve
        id: String,
    },

    /// The raffle's sales window has closed.
    #[error("raffle {0} has ended; tickets can no longer be purchased")]
    RaffleClosed(RaffleId),

    /// Fewer free numbers than requested; terminal for this attempt.
    #[error("insufficient inventory: requested {requested}, available {available}")]
    InsufficientInventory {
        /// Numbers the caller asked for
        requested: u32,
        /// Free numbers at the time of the last attempt
        available: u32,
    },

    /// Ticket state changed under a competing writer; the caller may retry.
    #[error("conflicting update: {0}")]
    Conflict(String),

    /// No committed tickets exist, so no winner can be drawn.
    #[error("no tickets sold for raffle {0}")]
    NoTicketsSold(RaffleId),

    /// The raffle already has a recorded winner; re-draws are a hard error.
    #[error("winner already drawn for raffle {0}")]
    AlreadyDrawn(RaffleId),

    /// Payment-gateway failure or timeout, surfaced after compensation.
    #[error("payment gateway error: {0}")]
    Upstream(String),

    /// A state transition that must never happen was requested (e.g. commit
    /// of a non-Reserved slot). Logged loudly; the operation aborts.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    /// Storage-layer failure; the enclosing sequence is rolled back.
    #[error("storage error: {0}")]
    Storage(String),
}

impl CoreError {
    /// Shorthand for a [`CoreError::NotFound`].
    #[must_use]
    pub fn not_found(resource: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            resource,
            id: id.to_string(),
        }
    }

    /// Whether the caller may meaningfully retry the same operation.
    ///
    /// Conflicts and upstream failures are transient; everything else is
    /// either terminal for the attempt or a caller bug.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict(_) | Self::Upstream(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_classification() {
        assert!(CoreError::Conflict("slot changed".into()).is_retryable());
        assert!(CoreError::Upstream("timeout".into()).is_retryable());
        assert!(!CoreError::InsufficientInventory {
            requested: 10,
            available: 3
        }
        .is_retryable());
        assert!(!CoreError::not_found("Raffle", "abc").is_retryable());
    }

    #[test]
    fn not_found_message_names_resource_and_id() {
        let err = CoreError::not_found("Payment", "txn-42");
        assert_eq!(err.to_string(), "Payment txn-42 not found");
    }
}
